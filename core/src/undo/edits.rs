//! Ready-made [`LayerEdit`]s for common operations.
//!
//! Each edit mutates a single layer through the ordinary layer API and is
//! meant to be turned into a command with [`LayerEdit::into_command`] or
//! [`LayerCommand::new`](super::LayerCommand::new).

use stratum_layer::{LayerError, LayerHandle, Path, TimeCode, Value};

use super::command::LayerEdit;

/// Creates a prim under an existing parent.
#[derive(Debug)]
pub struct CreatePrim {
    layer: LayerHandle,
    path: Path,
}

impl CreatePrim {
    pub fn new(layer: &LayerHandle, path: Path) -> Self {
        Self {
            layer: layer.clone(),
            path,
        }
    }
}

impl LayerEdit for CreatePrim {
    fn layers(&self) -> Vec<LayerHandle> {
        vec![self.layer.clone()]
    }

    fn edit(&mut self) -> Result<(), LayerError> {
        self.layer.borrow_mut().create_prim(&self.path)
    }

    fn description(&self) -> &str {
        "Create prim"
    }
}

/// Removes a prim or property together with its subtree.
#[derive(Debug)]
pub struct RemovePrim {
    layer: LayerHandle,
    path: Path,
}

impl RemovePrim {
    pub fn new(layer: &LayerHandle, path: Path) -> Self {
        Self {
            layer: layer.clone(),
            path,
        }
    }
}

impl LayerEdit for RemovePrim {
    fn layers(&self) -> Vec<LayerHandle> {
        vec![self.layer.clone()]
    }

    fn edit(&mut self) -> Result<(), LayerError> {
        self.layer.borrow_mut().remove_spec(&self.path)
    }

    fn description(&self) -> &str {
        "Remove prim"
    }
}

/// Renames or reparents a prim.
#[derive(Debug)]
pub struct MovePrim {
    layer: LayerHandle,
    from: Path,
    to: Path,
}

impl MovePrim {
    pub fn new(layer: &LayerHandle, from: Path, to: Path) -> Self {
        Self {
            layer: layer.clone(),
            from,
            to,
        }
    }
}

impl LayerEdit for MovePrim {
    fn layers(&self) -> Vec<LayerHandle> {
        vec![self.layer.clone()]
    }

    fn edit(&mut self) -> Result<(), LayerError> {
        self.layer.borrow_mut().move_prim(&self.from, &self.to)
    }

    fn description(&self) -> &str {
        "Move prim"
    }
}

/// Sets or clears (`None`) one field of an existing spec.
#[derive(Debug)]
pub struct SetField {
    layer: LayerHandle,
    path: Path,
    field: String,
    value: Option<Value>,
}

impl SetField {
    pub fn new(
        layer: &LayerHandle,
        path: Path,
        field: impl Into<String>,
        value: Option<Value>,
    ) -> Self {
        Self {
            layer: layer.clone(),
            path,
            field: field.into(),
            value,
        }
    }
}

impl LayerEdit for SetField {
    fn layers(&self) -> Vec<LayerHandle> {
        vec![self.layer.clone()]
    }

    fn edit(&mut self) -> Result<(), LayerError> {
        let mut layer = self.layer.borrow_mut();
        if !layer.has_spec(&self.path) {
            return Err(LayerError::SpecNotFound(self.path.clone()));
        }
        layer.set_field(&self.path, &self.field, self.value.clone());
        Ok(())
    }

    fn description(&self) -> &str {
        "Set field"
    }
}

/// Sets or clears (`None`) the keyframe of an attribute at one time code.
#[derive(Debug)]
pub struct SetTimeSample {
    layer: LayerHandle,
    path: Path,
    time: TimeCode,
    value: Option<Value>,
}

impl SetTimeSample {
    pub fn new(layer: &LayerHandle, path: Path, time: TimeCode, value: Option<Value>) -> Self {
        Self {
            layer: layer.clone(),
            path,
            time,
            value,
        }
    }
}

impl LayerEdit for SetTimeSample {
    fn layers(&self) -> Vec<LayerHandle> {
        vec![self.layer.clone()]
    }

    fn edit(&mut self) -> Result<(), LayerError> {
        let mut layer = self.layer.borrow_mut();
        if !self.path.is_property() {
            return Err(LayerError::NotAProperty(self.path.clone()));
        }
        if !layer.has_spec(&self.path) {
            return Err(LayerError::SpecNotFound(self.path.clone()));
        }
        layer.set_time_sample(&self.path, self.time, self.value.clone());
        Ok(())
    }

    fn description(&self) -> &str {
        "Set keyframe"
    }
}
