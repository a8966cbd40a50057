//! The mutation hook of a layer.
//!
//! Every mutating call on a [`Layer`](crate::Layer) is routed through the
//! layer's installed [`LayerStateDelegate`], and the delegate, not the layer,
//! performs the change on [`LayerData`]. A fresh layer carries a
//! [`SimpleStateDelegate`] that writes straight through and tracks the dirty
//! flag.
//!
//! Delegates may wrap the delegate they replace, forming a chain. The chain
//! always bottoms out in a delegate that writes the data.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::data::{LayerData, SpecType};
use crate::path::Path;
use crate::value::{TimeCode, Value};

static NEXT_DELEGATE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a delegate instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelegateId(u64);

impl DelegateId {
    /// Hands out a fresh id.
    pub fn next() -> Self {
        Self(NEXT_DELEGATE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DelegateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delegate#{}", self.0)
    }
}

/// Receives every mutation of a layer and performs it on the layer's data.
///
/// Each primitive returns `true` if the data changed.
pub trait LayerStateDelegate {
    fn id(&self) -> DelegateId;

    /// Whether the layer changed since it was last marked clean.
    fn is_dirty(&self) -> bool;

    fn mark_clean(&mut self);

    fn set_field(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        field: &str,
        value: Option<Value>,
    ) -> bool;

    fn set_field_dict_value_by_key(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        field: &str,
        key: &str,
        value: Option<Value>,
    ) -> bool;

    fn set_time_sample(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        time: TimeCode,
        value: Option<Value>,
    ) -> bool;

    fn create_spec(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        spec_type: SpecType,
        inert: bool,
    ) -> bool;

    fn delete_spec(&mut self, data: &mut LayerData, path: &Path, inert: bool) -> bool;

    fn move_spec(&mut self, data: &mut LayerData, old_path: &Path, new_path: &Path) -> bool;

    fn push_child(&mut self, data: &mut LayerData, parent: &Path, field: &str, key: &str)
    -> bool;

    fn pop_child(&mut self, data: &mut LayerData, parent: &Path, field: &str, key: &str) -> bool;

    /// Removes the delegate `id` from the chain rooted at `self` and returns
    /// the new root. Unknown ids leave the chain unchanged.
    fn unlink(self: Box<Self>, id: DelegateId) -> Box<dyn LayerStateDelegate>;
}

/// Pass-through delegate: writes every mutation to the data and marks the
/// layer dirty on the first effective change.
#[derive(Debug)]
pub struct SimpleStateDelegate {
    id: DelegateId,
    dirty: bool,
}

impl SimpleStateDelegate {
    pub fn new() -> Self {
        Self {
            id: DelegateId::next(),
            dirty: false,
        }
    }

    fn touch(&mut self, changed: bool) -> bool {
        self.dirty |= changed;
        changed
    }
}

impl Default for SimpleStateDelegate {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStateDelegate for SimpleStateDelegate {
    fn id(&self) -> DelegateId {
        self.id
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn set_field(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        field: &str,
        value: Option<Value>,
    ) -> bool {
        let changed = data.set_field(path, field, value);
        self.touch(changed)
    }

    fn set_field_dict_value_by_key(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        field: &str,
        key: &str,
        value: Option<Value>,
    ) -> bool {
        let changed = data.set_dict_value(path, field, key, value);
        self.touch(changed)
    }

    fn set_time_sample(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        time: TimeCode,
        value: Option<Value>,
    ) -> bool {
        let changed = data.set_time_sample(path, time, value);
        self.touch(changed)
    }

    fn create_spec(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        spec_type: SpecType,
        inert: bool,
    ) -> bool {
        let changed = data.create_spec(path, spec_type, inert);
        self.touch(changed)
    }

    fn delete_spec(&mut self, data: &mut LayerData, path: &Path, inert: bool) -> bool {
        let changed = data.delete_spec(path, inert);
        self.touch(changed)
    }

    fn move_spec(&mut self, data: &mut LayerData, old_path: &Path, new_path: &Path) -> bool {
        let changed = data.move_spec(old_path, new_path);
        self.touch(changed)
    }

    fn push_child(
        &mut self,
        data: &mut LayerData,
        parent: &Path,
        field: &str,
        key: &str,
    ) -> bool {
        let changed = data.push_child(parent, field, key);
        self.touch(changed)
    }

    fn pop_child(&mut self, data: &mut LayerData, parent: &Path, field: &str, key: &str) -> bool {
        let changed = data.pop_child(parent, field, key);
        self.touch(changed)
    }

    fn unlink(self: Box<Self>, _id: DelegateId) -> Box<dyn LayerStateDelegate> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = SimpleStateDelegate::new();
        let b = SimpleStateDelegate::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn dirty_only_after_effective_change() {
        let mut data = LayerData::new();
        let mut delegate = SimpleStateDelegate::new();
        let path = Path::new("/A").unwrap();

        assert!(!delegate.set_field(&mut data, &path, "active", Some(true.into())));
        assert!(!delegate.is_dirty());

        assert!(delegate.create_spec(&mut data, &path, SpecType::Prim, false));
        assert!(delegate.is_dirty());

        delegate.mark_clean();
        assert!(!delegate.is_dirty());
    }

    #[test]
    fn unlink_on_leaf_keeps_it() {
        let delegate = SimpleStateDelegate::new();
        let id = delegate.id();
        let chain: Box<dyn LayerStateDelegate> = Box::new(delegate);
        assert_eq!(chain.unlink(id).id(), id);
    }
}
