//! The layer: spec data plus the delegate every mutation goes through.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use crate::data::{LayerData, SpecType, fields};
use crate::delegate::{DelegateId, LayerStateDelegate, SimpleStateDelegate};
use crate::error::LayerError;
use crate::path::Path;
use crate::value::{TimeCode, Value};

/// One batch of changes observed on a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerNotice {
    /// Changed spec paths in first-change order, without duplicates.
    pub changed: Vec<Path>,
}

/// A hierarchical, field-addressed document.
///
/// Reads go straight to [`LayerData`]. Mutations go through the installed
/// [`LayerStateDelegate`]. Each effective mutation is reported as a
/// [`LayerNotice`]; inside a change block (see [`ChangeBlock`]) all changes
/// up to the outermost close are reported as one notice.
pub struct Layer {
    identifier: String,
    data: LayerData,
    delegate: Box<dyn LayerStateDelegate>,
    change_depth: u32,
    pending: Vec<Path>,
    notices: Vec<LayerNotice>,
}

impl Layer {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            data: LayerData::new(),
            delegate: Box::new(SimpleStateDelegate::new()),
            change_depth: 0,
            pending: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn data(&self) -> &LayerData {
        &self.data
    }

    pub fn has_spec(&self, path: &Path) -> bool {
        self.data.has_spec(path)
    }

    pub fn field(&self, path: &Path, field: &str) -> Option<&Value> {
        self.data.field(path, field)
    }

    pub fn time_sample(&self, path: &Path, time: TimeCode) -> Option<&Value> {
        self.data.time_sample(path, time)
    }

    // -- Delegate --

    pub fn delegate_id(&self) -> DelegateId {
        self.delegate.id()
    }

    /// Installs `delegate` and hands back the one it replaced.
    pub fn replace_delegate(
        &mut self,
        delegate: Box<dyn LayerStateDelegate>,
    ) -> Box<dyn LayerStateDelegate> {
        mem::replace(&mut self.delegate, delegate)
    }

    /// Installs the delegate built by `wrap` around the current one and
    /// returns the id of the new root.
    pub fn wrap_delegate(
        &mut self,
        wrap: impl FnOnce(Box<dyn LayerStateDelegate>) -> Box<dyn LayerStateDelegate>,
    ) -> DelegateId {
        let current = self.replace_delegate(Box::new(SimpleStateDelegate::new()));
        self.delegate = wrap(current);
        self.delegate.id()
    }

    /// Removes delegate `id` from the installed chain, wherever it sits.
    pub fn unlink_delegate(&mut self, id: DelegateId) {
        let current = self.replace_delegate(Box::new(SimpleStateDelegate::new()));
        self.delegate = current.unlink(id);
    }

    pub fn is_dirty(&self) -> bool {
        self.delegate.is_dirty()
    }

    /// Resets the dirty flag, e.g. after the layer was saved.
    pub fn mark_clean(&mut self) {
        self.delegate.mark_clean();
    }

    // -- Change notification --

    /// Opens a change block. Prefer [`ChangeBlock`].
    pub fn begin_changes(&mut self) {
        self.change_depth += 1;
    }

    /// Closes a change block; the outermost close emits one notice.
    pub fn end_changes(&mut self) {
        let Some(depth) = self.change_depth.checked_sub(1) else {
            log::warn!("{}: unbalanced end_changes", self.identifier);
            return;
        };
        self.change_depth = depth;
        if depth == 0 && !self.pending.is_empty() {
            let changed = mem::take(&mut self.pending);
            self.notices.push(LayerNotice { changed });
        }
    }

    /// Drains the notices emitted so far.
    pub fn take_notices(&mut self) -> Vec<LayerNotice> {
        mem::take(&mut self.notices)
    }

    fn did_change(&mut self, changed: bool, path: &Path) -> bool {
        if !changed {
            return false;
        }
        if self.change_depth == 0 {
            self.notices.push(LayerNotice {
                changed: vec![path.clone()],
            });
        } else if !self.pending.contains(path) {
            self.pending.push(path.clone());
        }
        true
    }

    // -- Primitive mutations (routed through the delegate) --

    pub fn set_field(&mut self, path: &Path, field: &str, value: Option<Value>) -> bool {
        let changed = self.delegate.set_field(&mut self.data, path, field, value);
        self.did_change(changed, path)
    }

    pub fn set_field_dict_value_by_key(
        &mut self,
        path: &Path,
        field: &str,
        key: &str,
        value: Option<Value>,
    ) -> bool {
        let changed =
            self.delegate
                .set_field_dict_value_by_key(&mut self.data, path, field, key, value);
        self.did_change(changed, path)
    }

    pub fn set_time_sample(&mut self, path: &Path, time: TimeCode, value: Option<Value>) -> bool {
        let changed = self
            .delegate
            .set_time_sample(&mut self.data, path, time, value);
        self.did_change(changed, path)
    }

    pub fn create_spec(&mut self, path: &Path, spec_type: SpecType, inert: bool) -> bool {
        let changed = self
            .delegate
            .create_spec(&mut self.data, path, spec_type, inert);
        self.did_change(changed, path)
    }

    pub fn delete_spec(&mut self, path: &Path, inert: bool) -> bool {
        let changed = self.delegate.delete_spec(&mut self.data, path, inert);
        self.did_change(changed, path)
    }

    pub fn move_spec(&mut self, old_path: &Path, new_path: &Path) -> bool {
        let changed = self.delegate.move_spec(&mut self.data, old_path, new_path);
        self.did_change(changed, old_path) && self.did_change(true, new_path)
    }

    pub fn push_child(&mut self, parent: &Path, field: &str, key: &str) -> bool {
        let changed = self.delegate.push_child(&mut self.data, parent, field, key);
        self.did_change(changed, parent)
    }

    pub fn pop_child(&mut self, parent: &Path, field: &str, key: &str) -> bool {
        let changed = self.delegate.pop_child(&mut self.data, parent, field, key);
        self.did_change(changed, parent)
    }

    // -- Editing API --

    /// Creates a prim and registers it in its parent's `primChildren`.
    pub fn create_prim(&mut self, path: &Path) -> Result<(), LayerError> {
        if !path.is_prim() {
            return Err(LayerError::NotAPrim(path.clone()));
        }
        self.create_child_spec(path, SpecType::Prim, fields::PRIM_CHILDREN)
    }

    /// Creates an attribute and registers it in its prim's `propertyChildren`.
    pub fn create_attribute(&mut self, path: &Path) -> Result<(), LayerError> {
        if !path.is_property() {
            return Err(LayerError::NotAProperty(path.clone()));
        }
        self.create_child_spec(path, SpecType::Attribute, fields::PROPERTY_CHILDREN)
    }

    fn create_child_spec(
        &mut self,
        path: &Path,
        spec_type: SpecType,
        children_field: &str,
    ) -> Result<(), LayerError> {
        if self.has_spec(path) {
            return Err(LayerError::SpecExists(path.clone()));
        }
        let parent = self.existing_parent(path)?;
        self.create_spec(path, spec_type, false);
        self.push_child(&parent, children_field, path.name());
        Ok(())
    }

    /// Removes a prim or property, its subtree and its entry in the parent's
    /// children list.
    pub fn remove_spec(&mut self, path: &Path) -> Result<(), LayerError> {
        if path.is_absolute_root() || !self.has_spec(path) {
            return Err(LayerError::SpecNotFound(path.clone()));
        }
        let parent = self.existing_parent(path)?;
        self.detach_child(&parent, children_field(path), path.name());
        self.delete_spec(path, false);
        Ok(())
    }

    /// Moves (renames or reparents) a prim together with its subtree.
    pub fn move_prim(&mut self, from: &Path, to: &Path) -> Result<(), LayerError> {
        if !from.is_prim() {
            return Err(LayerError::NotAPrim(from.clone()));
        }
        if !to.is_prim() {
            return Err(LayerError::NotAPrim(to.clone()));
        }
        if !self.has_spec(from) {
            return Err(LayerError::SpecNotFound(from.clone()));
        }
        if self.has_spec(to) {
            return Err(LayerError::SpecExists(to.clone()));
        }
        if to.has_prefix(from) {
            return Err(LayerError::InvalidMove {
                from: from.clone(),
                to: to.clone(),
            });
        }
        let old_parent = self.existing_parent(from)?;
        let new_parent = self.existing_parent(to)?;

        self.detach_child(&old_parent, fields::PRIM_CHILDREN, from.name());
        self.move_spec(from, to);
        self.push_child(&new_parent, fields::PRIM_CHILDREN, to.name());
        Ok(())
    }

    fn existing_parent(&self, path: &Path) -> Result<Path, LayerError> {
        path.parent()
            .filter(|parent| self.has_spec(parent))
            .ok_or_else(|| LayerError::ParentNotFound(path.clone()))
    }

    /// Removes `name` from a children list: a pop when it is last, a rewrite
    /// of the whole list otherwise.
    fn detach_child(&mut self, parent: &Path, field: &str, name: &str) {
        let children = self.data.children(parent, field);
        if children.last().map(String::as_str) == Some(name) {
            self.pop_child(parent, field, name);
            return;
        }
        let remaining: Vec<String> = children.iter().filter(|c| *c != name).cloned().collect();
        if remaining.len() == children.len() {
            return;
        }
        let value = (!remaining.is_empty()).then_some(Value::TokenList(remaining));
        self.set_field(parent, field, value);
    }
}

fn children_field(path: &Path) -> &'static str {
    if path.is_property() {
        fields::PROPERTY_CHILDREN
    } else {
        fields::PRIM_CHILDREN
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("identifier", &self.identifier)
            .field("specs", &self.data.len())
            .field("delegate", &self.delegate.id())
            .field("change_depth", &self.change_depth)
            .finish()
    }
}

/// Shared, single-threaded handle to a [`Layer`].
#[derive(Clone)]
pub struct LayerHandle(Rc<RefCell<Layer>>);

impl LayerHandle {
    pub fn new(layer: Layer) -> Self {
        Self(Rc::new(RefCell::new(layer)))
    }

    /// Creates an empty layer with the given identifier.
    pub fn create(identifier: impl Into<String>) -> Self {
        Self::new(Layer::new(identifier))
    }

    pub fn borrow(&self) -> Ref<'_, Layer> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Layer> {
        self.0.borrow_mut()
    }

    pub fn downgrade(&self) -> WeakLayer {
        WeakLayer(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &LayerHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(layer) => write!(f, "LayerHandle({})", layer.identifier()),
            Err(_) => f.write_str("LayerHandle(<borrowed>)"),
        }
    }
}

/// Non-owning handle to a [`Layer`]; recorded history never keeps a layer
/// alive.
#[derive(Clone, Default)]
pub struct WeakLayer(Weak<RefCell<Layer>>);

impl WeakLayer {
    pub fn upgrade(&self) -> Option<LayerHandle> {
        self.0.upgrade().map(LayerHandle)
    }

    pub fn points_to(&self, layer: &LayerHandle) -> bool {
        Weak::ptr_eq(&self.0, &Rc::downgrade(&layer.0))
    }
}

impl fmt::Debug for WeakLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(layer) => write!(f, "Weak{layer:?}"),
            None => f.write_str("WeakLayer(<expired>)"),
        }
    }
}

/// Batches the notices of a set of layers while alive.
///
/// Opening borrows each layer only briefly; mutations may go through the
/// handles while the block is open.
pub struct ChangeBlock {
    layers: Vec<LayerHandle>,
}

impl ChangeBlock {
    pub fn new(layers: impl IntoIterator<Item = LayerHandle>) -> Self {
        let mut unique: Vec<LayerHandle> = Vec::new();
        for layer in layers {
            if !unique.iter().any(|l| l.ptr_eq(&layer)) {
                layer.borrow_mut().begin_changes();
                unique.push(layer);
            }
        }
        Self { layers: unique }
    }
}

impl Drop for ChangeBlock {
    fn drop(&mut self) {
        for layer in self.layers.iter().rev() {
            layer.borrow_mut().end_changes();
        }
    }
}

impl fmt::Debug for ChangeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBlock")
            .field("layers", &self.layers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(text: &str) -> Path {
        Path::new(text).unwrap()
    }

    fn prim_children(layer: &Layer, path: &str) -> Vec<String> {
        layer.data().children(&p(path), fields::PRIM_CHILDREN).to_vec()
    }

    #[test]
    fn create_prim_registers_child() {
        let mut layer = Layer::new("test");
        layer.create_prim(&p("/World")).unwrap();
        layer.create_prim(&p("/World/Cube")).unwrap();
        assert_eq!(prim_children(&layer, "/"), ["World"]);
        assert_eq!(prim_children(&layer, "/World"), ["Cube"]);
        assert_eq!(
            layer.create_prim(&p("/World")),
            Err(LayerError::SpecExists(p("/World")))
        );
        assert_eq!(
            layer.create_prim(&p("/Missing/Cube")),
            Err(LayerError::ParentNotFound(p("/Missing/Cube")))
        );
        assert_eq!(
            layer.create_prim(&p("/World.x")),
            Err(LayerError::NotAPrim(p("/World.x")))
        );
    }

    #[test]
    fn create_attribute_registers_property() {
        let mut layer = Layer::new("test");
        layer.create_prim(&p("/World")).unwrap();
        layer.create_attribute(&p("/World.size")).unwrap();
        assert_eq!(
            layer.data().children(&p("/World"), fields::PROPERTY_CHILDREN),
            ["size".to_owned()]
        );
        assert_eq!(
            layer.create_attribute(&p("/World")),
            Err(LayerError::NotAProperty(p("/World")))
        );
    }

    #[test]
    fn remove_spec_rewrites_children_list() {
        let mut layer = Layer::new("test");
        for path in ["/A", "/B", "/C"] {
            layer.create_prim(&p(path)).unwrap();
        }
        layer.remove_spec(&p("/B")).unwrap();
        assert_eq!(prim_children(&layer, "/"), ["A", "C"]);
        layer.remove_spec(&p("/C")).unwrap();
        layer.remove_spec(&p("/A")).unwrap();
        assert_eq!(layer.field(&p("/"), fields::PRIM_CHILDREN), None);
        assert_eq!(
            layer.remove_spec(&p("/A")),
            Err(LayerError::SpecNotFound(p("/A")))
        );
    }

    #[test]
    fn move_prim_updates_both_parents() {
        let mut layer = Layer::new("test");
        for path in ["/A", "/A/Child", "/B"] {
            layer.create_prim(&p(path)).unwrap();
        }
        layer.move_prim(&p("/A/Child"), &p("/B/Moved")).unwrap();
        assert!(layer.has_spec(&p("/B/Moved")));
        assert!(prim_children(&layer, "/A").is_empty());
        assert_eq!(prim_children(&layer, "/B"), ["Moved"]);
        assert!(matches!(
            layer.move_prim(&p("/B"), &p("/B/Moved/Inner")),
            Err(LayerError::InvalidMove { .. })
        ));
    }

    #[test]
    fn notices_per_change_outside_block() {
        let mut layer = Layer::new("test");
        layer.create_prim(&p("/A")).unwrap();
        assert_eq!(layer.take_notices().len(), 2);
        assert!(layer.take_notices().is_empty());
    }

    #[test]
    fn change_block_batches_notices() {
        let handle = LayerHandle::create("test");
        {
            let _block = ChangeBlock::new([handle.clone(), handle.clone()]);
            let mut layer = handle.borrow_mut();
            layer.create_prim(&p("/A")).unwrap();
            layer.set_field(&p("/A"), "active", Some(true.into()));
            assert!(layer.take_notices().is_empty());
        }
        let notices = handle.borrow_mut().take_notices();
        assert_eq!(
            notices,
            vec![LayerNotice {
                changed: vec![p("/A"), p("/")],
            }]
        );
    }

    #[test]
    fn no_op_mutations_are_silent() {
        let mut layer = Layer::new("test");
        assert!(!layer.set_field(&p("/Missing"), "active", Some(true.into())));
        assert!(!layer.is_dirty());
        assert!(layer.take_notices().is_empty());
    }

    #[test]
    fn dirty_flag_follows_delegate() {
        let mut layer = Layer::new("test");
        layer.create_prim(&p("/A")).unwrap();
        assert!(layer.is_dirty());
        layer.mark_clean();
        assert!(!layer.is_dirty());
    }

    #[test]
    fn replace_delegate_returns_previous() {
        let mut layer = Layer::new("test");
        let original = layer.delegate_id();
        let previous = layer.replace_delegate(Box::new(SimpleStateDelegate::new()));
        assert_eq!(previous.id(), original);
        assert_ne!(layer.delegate_id(), original);
    }

    #[test]
    fn weak_layer_expires_with_layer() {
        let handle = LayerHandle::create("test");
        let weak = handle.downgrade();
        assert!(weak.points_to(&handle));
        drop(handle);
        assert!(weak.upgrade().is_none());
    }
}
