//! Reversible elementary layer mutations.
//!
//! An [`Instruction`] is created by a
//! [`RecordingDelegate`](super::RecordingDelegate) at the moment the mutation
//! happens, and captures every "before" value it needs to undo itself. The
//! layer may have changed again by the time the instruction is reverted, so
//! nothing is re-queried at undo time.

use stratum_layer::{Layer, Path, SpecData, SpecType, TimeCode, Value, WeakLayer, fields};

/// One elementary mutation, with the state needed to invert it.
#[derive(Debug)]
pub enum InstructionKind {
    SetField {
        path: Path,
        field: String,
        new_value: Option<Value>,
        previous_value: Option<Value>,
    },
    SetDictValueByKey {
        path: Path,
        field: String,
        key: String,
        new_value: Option<Value>,
        previous_value: Option<Value>,
    },
    SetTimeSample {
        path: Path,
        time: TimeCode,
        new_value: Option<Value>,
        previous_value: Option<Value>,
        /// The attribute had a time-samples field before this call.
        had_prior_samples: bool,
        /// A sample existed at exactly `time` before this call.
        previous_was_keyframe: bool,
    },
    CreateSpec {
        path: Path,
        spec_type: SpecType,
        inert: bool,
    },
    DeleteSpec {
        path: Path,
        inert: bool,
        deleted_spec_type: SpecType,
        /// Every spec of the deleted subtree, parents first.
        snapshot: Vec<(Path, SpecData)>,
    },
    MoveSpec {
        old_path: Path,
        new_path: Path,
    },
    PushChild {
        parent_path: Path,
        field: String,
        child_key: String,
    },
    PopChild {
        parent_path: Path,
        field: String,
        child_key: String,
    },
}

impl InstructionKind {
    /// Short name of the mutation kind, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetField { .. } => "SetField",
            Self::SetDictValueByKey { .. } => "SetDictValueByKey",
            Self::SetTimeSample { .. } => "SetTimeSample",
            Self::CreateSpec { .. } => "CreateSpec",
            Self::DeleteSpec { .. } => "DeleteSpec",
            Self::MoveSpec { .. } => "MoveSpec",
            Self::PushChild { .. } => "PushChild",
            Self::PopChild { .. } => "PopChild",
        }
    }

    /// The spec the mutation targets.
    pub fn path(&self) -> &Path {
        match self {
            Self::SetField { path, .. }
            | Self::SetDictValueByKey { path, .. }
            | Self::SetTimeSample { path, .. }
            | Self::CreateSpec { path, .. }
            | Self::DeleteSpec { path, .. } => path,
            Self::MoveSpec { old_path, .. } => old_path,
            Self::PushChild { parent_path, .. } | Self::PopChild { parent_path, .. } => {
                parent_path
            }
        }
    }

    fn apply(&self, layer: &mut Layer) {
        match self {
            Self::SetField {
                path,
                field,
                new_value,
                ..
            } => {
                layer.set_field(path, field, new_value.clone());
            }
            Self::SetDictValueByKey {
                path,
                field,
                key,
                new_value,
                ..
            } => {
                layer.set_field_dict_value_by_key(path, field, key, new_value.clone());
            }
            Self::SetTimeSample {
                path,
                time,
                new_value,
                ..
            } => {
                layer.set_time_sample(path, *time, new_value.clone());
            }
            Self::CreateSpec {
                path,
                spec_type,
                inert,
            } => {
                layer.create_spec(path, *spec_type, *inert);
            }
            Self::DeleteSpec { path, inert, .. } => {
                layer.delete_spec(path, *inert);
            }
            Self::MoveSpec { old_path, new_path } => {
                layer.move_spec(old_path, new_path);
            }
            Self::PushChild {
                parent_path,
                field,
                child_key,
            } => {
                layer.push_child(parent_path, field, child_key);
            }
            Self::PopChild {
                parent_path,
                field,
                child_key,
            } => {
                layer.pop_child(parent_path, field, child_key);
            }
        }
    }

    fn revert(&self, layer: &mut Layer) {
        match self {
            Self::SetField {
                path,
                field,
                previous_value,
                ..
            } => {
                layer.set_field(path, field, previous_value.clone());
            }
            Self::SetDictValueByKey {
                path,
                field,
                key,
                previous_value,
                ..
            } => {
                layer.set_field_dict_value_by_key(path, field, key, previous_value.clone());
            }
            Self::SetTimeSample {
                path,
                time,
                previous_value,
                had_prior_samples,
                previous_was_keyframe,
                ..
            } => {
                if *previous_was_keyframe {
                    layer.set_time_sample(path, *time, previous_value.clone());
                } else if *had_prior_samples {
                    layer.set_time_sample(path, *time, None);
                } else {
                    layer.set_field(path, fields::TIME_SAMPLES, None);
                }
            }
            Self::CreateSpec { path, inert, .. } => {
                layer.delete_spec(path, *inert);
            }
            Self::DeleteSpec { snapshot, .. } => {
                // Each spec comes back with its own type and inert flag; the
                // instruction's `inert` is the deletion mode.
                for (spec_path, spec) in snapshot {
                    layer.create_spec(spec_path, spec.spec_type, spec.inert);
                    for (field, value) in &spec.fields {
                        layer.set_field(spec_path, field, Some(value.clone()));
                    }
                }
            }
            Self::MoveSpec { old_path, new_path } => {
                layer.move_spec(new_path, old_path);
            }
            Self::PushChild {
                parent_path,
                field,
                child_key,
            } => {
                layer.pop_child(parent_path, field, child_key);
            }
            Self::PopChild {
                parent_path,
                field,
                child_key,
            } => {
                layer.push_child(parent_path, field, child_key);
            }
        }
    }
}

/// A recorded mutation bound to the layer it was recorded on.
///
/// Holds the layer weakly: once the layer is gone, applying or reverting is
/// a no-op. Move-only.
#[derive(Debug)]
pub struct Instruction {
    layer: WeakLayer,
    kind: InstructionKind,
}

impl Instruction {
    pub fn new(layer: WeakLayer, kind: InstructionKind) -> Self {
        Self { layer, kind }
    }

    pub fn kind(&self) -> &InstructionKind {
        &self.kind
    }

    pub fn layer(&self) -> &WeakLayer {
        &self.layer
    }

    /// Performs the mutation again.
    pub fn apply(&self) {
        match self.layer.upgrade() {
            Some(layer) => self.kind.apply(&mut layer.borrow_mut()),
            None => log::debug!("skipping {}: layer expired", self.kind.name()),
        }
    }

    /// Restores the state from before the mutation.
    pub fn revert(&self) {
        match self.layer.upgrade() {
            Some(layer) => self.kind.revert(&mut layer.borrow_mut()),
            None => log::debug!("skipping revert of {}: layer expired", self.kind.name()),
        }
    }
}
