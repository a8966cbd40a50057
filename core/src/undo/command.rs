//! Undo-stack entries.
//!
//! - [`Command`] — one reversible unit of the history (Command pattern)
//! - [`LayerEdit`] — the forward logic of an edit, written against the
//!   ordinary [`Layer`](stratum_layer::Layer) API
//! - [`LayerCommand`] — runs a [`LayerEdit`] under a recorder the first time
//!   and replays the recorded group afterwards
//! - [`RecordedCommand`] — a group whose effect already happened (the
//!   output of a [`SessionRecorder`](super::SessionRecorder))

use std::fmt;

use stratum_layer::{ChangeBlock, LayerError, LayerHandle};

use super::command_group::CommandGroup;
use super::recorder::GroupRecorder;

/// A reversible entry of the [`CommandStack`](super::CommandStack).
///
/// This trait is dyn-compatible so that different command types can share
/// one history as `Box<dyn Command>`.
pub trait Command: fmt::Debug {
    /// Performs the command (first run and redo).
    ///
    /// Returns whether the command should be kept in the history; a command
    /// that turned out to change nothing returns `false`.
    fn execute(&mut self) -> bool;

    /// Restores the state from before [`execute`](Self::execute).
    fn revert(&mut self);

    /// A short, human-readable description for display in the edit menu.
    fn description(&self) -> &str;
}

/// Forward logic of a layer edit.
///
/// Implementations mutate their layers through the regular layer API; they
/// never build instructions themselves.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug)]
/// struct Deactivate {
///     layer: LayerHandle,
///     path: Path,
/// }
///
/// impl LayerEdit for Deactivate {
///     fn layers(&self) -> Vec<LayerHandle> {
///         vec![self.layer.clone()]
///     }
///
///     fn edit(&mut self) -> Result<(), LayerError> {
///         self.layer
///             .borrow_mut()
///             .set_field(&self.path, fields::ACTIVE, Some(false.into()));
///         Ok(())
///     }
///
///     fn description(&self) -> &str {
///         "Deactivate prim"
///     }
/// }
///
/// stack.execute(Deactivate { layer, path }.into_command());
/// ```
pub trait LayerEdit: fmt::Debug {
    /// Layers the edit may mutate. Mutations of other layers are not
    /// recorded.
    fn layers(&self) -> Vec<LayerHandle>;

    fn edit(&mut self) -> Result<(), LayerError>;

    fn description(&self) -> &str;

    /// Wraps the edit in a [`LayerCommand`] ready for the stack.
    fn into_command(self) -> Box<dyn Command>
    where
        Self: Sized + 'static,
    {
        Box::new(LayerCommand::new(self))
    }
}

/// A [`LayerEdit`] paired with the group recorded while it ran.
#[derive(Debug)]
pub struct LayerCommand<E: LayerEdit> {
    edit: E,
    group: CommandGroup,
}

impl<E: LayerEdit> LayerCommand<E> {
    pub fn new(edit: E) -> Self {
        Self {
            edit,
            group: CommandGroup::new(),
        }
    }

    pub fn edit(&self) -> &E {
        &self.edit
    }

    pub fn group(&self) -> &CommandGroup {
        &self.group
    }

    fn record(&mut self) -> bool {
        let layers = self.edit.layers();
        let result = {
            let _changes = ChangeBlock::new(layers.iter().cloned());
            let _recorder = GroupRecorder::new(&mut self.group, &layers);
            self.edit.edit()
        };
        if let Err(err) = result {
            log::warn!("{} failed: {err}", self.edit.description());
            self.group.revert();
            self.group.clear();
            return false;
        }
        !self.group.is_empty()
    }
}

impl<E: LayerEdit> Command for LayerCommand<E> {
    fn execute(&mut self) -> bool {
        if self.group.is_empty() {
            return self.record();
        }
        self.group.apply();
        true
    }

    fn revert(&mut self) {
        self.group.revert();
    }

    fn description(&self) -> &str {
        self.edit.description()
    }
}

impl<F> LayerCommand<FnEdit<F>>
where
    F: FnOnce() -> Result<(), LayerError>,
{
    /// Builds a command from a closure run once under the recorder.
    pub fn from_fn(description: impl Into<String>, layers: &[LayerHandle], edit: F) -> Self {
        Self::new(FnEdit::new(description, layers, edit))
    }
}

/// A [`LayerEdit`] backed by a one-shot closure.
pub struct FnEdit<F> {
    description: String,
    layers: Vec<LayerHandle>,
    edit: Option<F>,
}

impl<F> FnEdit<F>
where
    F: FnOnce() -> Result<(), LayerError>,
{
    pub fn new(description: impl Into<String>, layers: &[LayerHandle], edit: F) -> Self {
        Self {
            description: description.into(),
            layers: layers.to_vec(),
            edit: Some(edit),
        }
    }
}

impl<F> LayerEdit for FnEdit<F>
where
    F: FnOnce() -> Result<(), LayerError>,
{
    fn layers(&self) -> Vec<LayerHandle> {
        self.layers.clone()
    }

    fn edit(&mut self) -> Result<(), LayerError> {
        match self.edit.take() {
            Some(edit) => edit(),
            None => Ok(()),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl<F> fmt::Debug for FnEdit<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEdit")
            .field("description", &self.description)
            .field("layers", &self.layers)
            .field("pending", &self.edit.is_some())
            .finish()
    }
}

/// A recorded group whose effect is already in the layers.
#[derive(Debug)]
pub struct RecordedCommand {
    description: String,
    group: CommandGroup,
}

impl RecordedCommand {
    pub fn new(description: impl Into<String>, group: CommandGroup) -> Self {
        Self {
            description: description.into(),
            group,
        }
    }

    pub fn group(&self) -> &CommandGroup {
        &self.group
    }
}

impl Command for RecordedCommand {
    fn execute(&mut self) -> bool {
        self.group.apply();
        !self.group.is_empty()
    }

    fn revert(&mut self) {
        self.group.revert();
    }

    fn description(&self) -> &str {
        &self.description
    }
}
