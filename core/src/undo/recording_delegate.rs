//! The delegate that turns live layer mutations into instructions.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use stratum_layer::{
    DelegateId, LayerData, LayerStateDelegate, Path, SpecType, TimeCode, Value, WeakLayer,
};

use super::instruction::{Instruction, InstructionKind};
use super::instruction_store::InstructionStore;

/// Shared destination of every delegate installed by one recording pass.
///
/// Sharing one sink across layers keeps instructions in true chronological
/// order even when an edit touches several layers.
pub(crate) type InstructionSink = Rc<RefCell<InstructionStore>>;

/// Records every mutation of one layer, then forwards it to the delegate it
/// displaced.
///
/// The "before" state is read from the layer data, the mutation is passed
/// down the chain (the bottom of which writes the data and keeps the dirty
/// flag), and only mutations that actually changed the layer are recorded.
/// Recording and effecting happen in the same call.
pub struct RecordingDelegate {
    id: DelegateId,
    layer: WeakLayer,
    sink: InstructionSink,
    inner: Box<dyn LayerStateDelegate>,
}

impl RecordingDelegate {
    pub(crate) fn new(
        layer: WeakLayer,
        sink: InstructionSink,
        inner: Box<dyn LayerStateDelegate>,
    ) -> Self {
        Self {
            id: DelegateId::next(),
            layer,
            sink,
            inner,
        }
    }

    fn record(&self, changed: bool, kind: InstructionKind) -> bool {
        if changed {
            log::trace!("{}: recorded {} at {}", self.id, kind.name(), kind.path());
            self.sink
                .borrow_mut()
                .push(Instruction::new(self.layer.clone(), kind));
        }
        changed
    }
}

impl LayerStateDelegate for RecordingDelegate {
    fn id(&self) -> DelegateId {
        self.id
    }

    fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    fn mark_clean(&mut self) {
        self.inner.mark_clean();
    }

    fn set_field(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        field: &str,
        value: Option<Value>,
    ) -> bool {
        let previous_value = data.field(path, field).cloned();
        let changed = self.inner.set_field(data, path, field, value.clone());
        self.record(
            changed,
            InstructionKind::SetField {
                path: path.clone(),
                field: field.to_owned(),
                new_value: value,
                previous_value,
            },
        )
    }

    fn set_field_dict_value_by_key(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        field: &str,
        key: &str,
        value: Option<Value>,
    ) -> bool {
        let previous_value = data.dict_value(path, field, key).cloned();
        let changed =
            self.inner
                .set_field_dict_value_by_key(data, path, field, key, value.clone());
        self.record(
            changed,
            InstructionKind::SetDictValueByKey {
                path: path.clone(),
                field: field.to_owned(),
                key: key.to_owned(),
                new_value: value,
                previous_value,
            },
        )
    }

    fn set_time_sample(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        time: TimeCode,
        value: Option<Value>,
    ) -> bool {
        let had_prior_samples = data.has_time_samples(path);
        let previous_value = data.time_sample(path, time).cloned();
        let previous_was_keyframe = previous_value.is_some();
        let changed = self.inner.set_time_sample(data, path, time, value.clone());
        self.record(
            changed,
            InstructionKind::SetTimeSample {
                path: path.clone(),
                time,
                new_value: value,
                previous_value,
                had_prior_samples,
                previous_was_keyframe,
            },
        )
    }

    fn create_spec(
        &mut self,
        data: &mut LayerData,
        path: &Path,
        spec_type: SpecType,
        inert: bool,
    ) -> bool {
        let changed = self.inner.create_spec(data, path, spec_type, inert);
        self.record(
            changed,
            InstructionKind::CreateSpec {
                path: path.clone(),
                spec_type,
                inert,
            },
        )
    }

    fn delete_spec(&mut self, data: &mut LayerData, path: &Path, inert: bool) -> bool {
        let Some(deleted_spec_type) = data.spec_type(path) else {
            return self.inner.delete_spec(data, path, inert);
        };
        let snapshot = data.subtree(path);
        let changed = self.inner.delete_spec(data, path, inert);
        self.record(
            changed,
            InstructionKind::DeleteSpec {
                path: path.clone(),
                inert,
                deleted_spec_type,
                snapshot,
            },
        )
    }

    fn move_spec(&mut self, data: &mut LayerData, old_path: &Path, new_path: &Path) -> bool {
        let changed = self.inner.move_spec(data, old_path, new_path);
        self.record(
            changed,
            InstructionKind::MoveSpec {
                old_path: old_path.clone(),
                new_path: new_path.clone(),
            },
        )
    }

    fn push_child(
        &mut self,
        data: &mut LayerData,
        parent: &Path,
        field: &str,
        key: &str,
    ) -> bool {
        let changed = self.inner.push_child(data, parent, field, key);
        self.record(
            changed,
            InstructionKind::PushChild {
                parent_path: parent.clone(),
                field: field.to_owned(),
                child_key: key.to_owned(),
            },
        )
    }

    fn pop_child(&mut self, data: &mut LayerData, parent: &Path, field: &str, key: &str) -> bool {
        let changed = self.inner.pop_child(data, parent, field, key);
        self.record(
            changed,
            InstructionKind::PopChild {
                parent_path: parent.clone(),
                field: field.to_owned(),
                child_key: key.to_owned(),
            },
        )
    }

    fn unlink(self: Box<Self>, id: DelegateId) -> Box<dyn LayerStateDelegate> {
        let mut this = *self;
        if this.id == id {
            return this.inner;
        }
        this.inner = this.inner.unlink(id);
        Box::new(this)
    }
}

impl fmt::Debug for RecordingDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingDelegate")
            .field("id", &self.id)
            .field("layer", &self.layer)
            .field("inner", &self.inner.id())
            .finish()
    }
}
