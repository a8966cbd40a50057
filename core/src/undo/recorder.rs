//! Scoped installation of recording delegates.
//!
//! - [`GroupRecorder`] — records into an existing, empty [`CommandGroup`]
//!   for as long as it lives
//! - [`SessionRecorder`] — owns its group, brackets an edit session with
//!   [`start_recording`](SessionRecorder::start_recording) /
//!   [`stop_recording`](SessionRecorder::stop_recording) and hands the result
//!   to a shared [`CommandStackHandle`] as one undo step when dropped
//!
//! Recorders never assume a layer had no delegate: each one wraps whatever
//! delegate is installed and, on exit, unlinks exactly its own delegate from
//! the chain. Nested recorders on the same layer therefore compose, and the
//! layer ends up with the very delegate it had before the outermost recorder
//! started.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use stratum_layer::{DelegateId, LayerHandle};

use super::command::RecordedCommand;
use super::command_group::CommandGroup;
use super::history::CommandStackHandle;
use super::instruction_store::InstructionStore;
use super::recording_delegate::{InstructionSink, RecordingDelegate};

/// Delegates installed for one recording pass.
struct Recording {
    sink: InstructionSink,
    installed: Vec<(LayerHandle, DelegateId)>,
}

impl Recording {
    fn begin(layers: &[LayerHandle]) -> Self {
        let sink: InstructionSink = Rc::new(RefCell::new(InstructionStore::new()));
        let mut installed: Vec<(LayerHandle, DelegateId)> = Vec::new();
        for layer in layers {
            if installed.iter().any(|(l, _)| l.ptr_eq(layer)) {
                continue;
            }
            let weak = layer.downgrade();
            let delegate_sink = sink.clone();
            let id = layer.borrow_mut().wrap_delegate(move |inner| {
                Box::new(RecordingDelegate::new(weak, delegate_sink, inner))
            });
            log::debug!("{id} recording {layer:?}");
            installed.push((layer.clone(), id));
        }
        Self { sink, installed }
    }

    /// Unlinks the delegates and returns what they recorded.
    fn finish(self) -> InstructionStore {
        for (layer, id) in self.installed.iter().rev() {
            layer.borrow_mut().unlink_delegate(*id);
            log::debug!("{id} detached from {layer:?}");
        }
        mem::take(&mut *self.sink.borrow_mut())
    }
}

/// Records every mutation of `layers` into `group` while alive.
///
/// A group can be populated by one recording pass only: if it already holds
/// instructions, nothing is installed and the layers keep their delegates.
pub struct GroupRecorder<'g> {
    group: &'g mut CommandGroup,
    recording: Option<Recording>,
}

impl<'g> GroupRecorder<'g> {
    pub fn new(group: &'g mut CommandGroup, layers: &[LayerHandle]) -> Self {
        let recording = if group.is_empty() {
            Some(Recording::begin(layers))
        } else {
            log::warn!(
                "refusing to record into a command group that already holds {} instructions",
                group.len()
            );
            None
        };
        Self { group, recording }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }
}

impl Drop for GroupRecorder<'_> {
    fn drop(&mut self) {
        if let Some(recording) = self.recording.take() {
            self.group.extend(recording.finish());
        }
    }
}

/// Records an edit session and stores it as a single undo step.
///
/// Dropping the recorder stops any active recording. If anything was
/// recorded, a [`RecordedCommand`] is pushed onto the stack without being
/// executed again (its effect already happened); an empty session leaves the
/// stack untouched.
///
/// The recorder holds a stack handle rather than a borrow, so sessions on
/// the same stack nest: each one pushes its own step when it ends.
///
/// # Example
///
/// ```ignore
/// let stack = CommandStackHandle::default();
/// let mut session = SessionRecorder::new(&stack, &[layer.clone()], "Drag handle");
/// session.start_recording();
/// layer.borrow_mut().set_field(&path, "default", Some(1.0.into()));
/// drop(session); // one undo step
/// ```
pub struct SessionRecorder {
    stack: CommandStackHandle,
    layers: Vec<LayerHandle>,
    description: String,
    group: CommandGroup,
    recording: Option<Recording>,
}

impl SessionRecorder {
    pub fn new(
        stack: &CommandStackHandle,
        layers: &[LayerHandle],
        description: impl Into<String>,
    ) -> Self {
        Self {
            stack: stack.clone(),
            layers: layers.to_vec(),
            description: description.into(),
            group: CommandGroup::new(),
            recording: None,
        }
    }

    /// Installs recording delegates on the session's layers. No-op while
    /// already recording.
    pub fn start_recording(&mut self) {
        if self.recording.is_none() {
            self.recording = Some(Recording::begin(&self.layers));
        }
    }

    /// Removes the delegates and keeps what they recorded. Recording can be
    /// started again; later passes append to the same undo step.
    pub fn stop_recording(&mut self) {
        if let Some(recording) = self.recording.take() {
            self.group.extend(recording.finish());
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Number of instructions recorded by finished passes.
    pub fn recorded_len(&self) -> usize {
        self.group.len()
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        self.stop_recording();
        if self.group.is_empty() {
            log::debug!("discarding empty session '{}'", self.description);
            return;
        }
        let Ok(mut stack) = self.stack.try_borrow_mut() else {
            log::warn!(
                "command stack is borrowed, dropping session '{}'",
                self.description
            );
            return;
        };
        let group = mem::take(&mut self.group);
        let description = mem::take(&mut self.description);
        stack.push_applied(Box::new(RecordedCommand::new(description, group)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::undo::CommandStack;
    use stratum_layer::{Path, fields};

    fn p(text: &str) -> Path {
        Path::new(text).unwrap()
    }

    #[test]
    fn group_recorder_fills_group_on_drop() {
        let layer = LayerHandle::create("test");
        let mut group = CommandGroup::new();
        {
            let recorder = GroupRecorder::new(&mut group, &[layer.clone()]);
            assert!(recorder.is_recording());
            layer.borrow_mut().create_prim(&p("/A")).unwrap();
        }
        assert_eq!(group.len(), 2);

        group.revert();
        assert!(!layer.borrow().has_spec(&p("/A")));
        group.apply();
        assert!(layer.borrow().has_spec(&p("/A")));
    }

    #[test]
    fn group_recorder_refuses_populated_group() {
        let layer = LayerHandle::create("test");
        let mut group = CommandGroup::new();
        {
            let _recorder = GroupRecorder::new(&mut group, &[layer.clone()]);
            layer.borrow_mut().create_prim(&p("/A")).unwrap();
        }
        let before = layer.borrow().delegate_id();
        {
            let recorder = GroupRecorder::new(&mut group, &[layer.clone()]);
            assert!(!recorder.is_recording());
            assert_eq!(layer.borrow().delegate_id(), before);
            layer.borrow_mut().create_prim(&p("/B")).unwrap();
        }
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn nested_recorders_restore_original_delegate() {
        let layer = LayerHandle::create("test");
        let original = layer.borrow().delegate_id();
        let mut outer_group = CommandGroup::new();
        let mut inner_group = CommandGroup::new();
        {
            let _outer = GroupRecorder::new(&mut outer_group, &[layer.clone()]);
            let outer_id = layer.borrow().delegate_id();
            assert_ne!(outer_id, original);
            {
                let _inner = GroupRecorder::new(&mut inner_group, &[layer.clone()]);
                layer.borrow_mut().create_prim(&p("/A")).unwrap();
            }
            assert_eq!(layer.borrow().delegate_id(), outer_id);
        }
        assert_eq!(layer.borrow().delegate_id(), original);
        assert_eq!(inner_group.len(), 2);
        assert_eq!(outer_group.len(), 2);
        assert!(layer.borrow().has_spec(&p("/A")));
    }

    #[test]
    fn recording_spans_layers_in_order() {
        let a = LayerHandle::create("a");
        let b = LayerHandle::create("b");
        let mut group = CommandGroup::new();
        {
            let _recorder = GroupRecorder::new(&mut group, &[a.clone(), b.clone(), a.clone()]);
            a.borrow_mut().create_prim(&p("/X")).unwrap();
            b.borrow_mut().create_prim(&p("/Y")).unwrap();
            a.borrow_mut()
                .set_field(&p("/X"), fields::ACTIVE, Some(false.into()));
        }
        let targets: Vec<bool> = group
            .instructions()
            .iter()
            .map(|i| i.layer().points_to(&a))
            .collect();
        assert_eq!(targets, [true, true, false, false, true]);
        assert_eq!(group.layers().len(), 2);

        group.revert();
        assert!(!a.borrow().has_spec(&p("/X")));
        assert!(!b.borrow().has_spec(&p("/Y")));
    }

    #[test]
    fn session_pushes_one_step() {
        let layer = LayerHandle::create("test");
        let stack = CommandStackHandle::default();
        {
            let mut session = SessionRecorder::new(&stack, &[layer.clone()], "Create");
            session.start_recording();
            assert!(session.is_recording());
            layer.borrow_mut().create_prim(&p("/A")).unwrap();
            layer.borrow_mut().create_prim(&p("/A/B")).unwrap();
        }
        let mut stack = stack.borrow_mut();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.undo_descriptions().collect::<Vec<_>>(), ["Create"]);

        assert!(stack.undo());
        assert!(!layer.borrow().has_spec(&p("/A")));
        assert!(stack.redo());
        assert!(layer.borrow().has_spec(&p("/A/B")));
    }

    #[test]
    fn empty_session_is_discarded() {
        let layer = LayerHandle::create("test");
        let stack = CommandStackHandle::default();
        {
            let mut session = SessionRecorder::new(&stack, &[layer.clone()], "Nothing");
            session.start_recording();
            session.stop_recording();
        }
        assert!(stack.borrow().is_empty());
    }

    #[test]
    fn mutations_outside_recording_are_not_captured() {
        let layer = LayerHandle::create("test");
        let original = layer.borrow().delegate_id();
        let stack = CommandStackHandle::default();
        {
            let mut session = SessionRecorder::new(&stack, &[layer.clone()], "Partial");
            layer.borrow_mut().create_prim(&p("/Before")).unwrap();
            session.start_recording();
            layer.borrow_mut().create_prim(&p("/During")).unwrap();
            session.stop_recording();
            assert_eq!(layer.borrow().delegate_id(), original);
            layer.borrow_mut().create_prim(&p("/After")).unwrap();
            assert_eq!(session.recorded_len(), 2);
        }
        assert!(stack.borrow_mut().undo());
        let layer = layer.borrow();
        assert!(layer.has_spec(&p("/Before")));
        assert!(!layer.has_spec(&p("/During")));
        assert!(layer.has_spec(&p("/After")));
    }

    #[test]
    fn session_on_borrowed_stack_is_dropped() {
        let layer = LayerHandle::create("test");
        let stack = CommandStackHandle::new(CommandStack::unbounded());
        let held = stack.clone();
        let guard = held.borrow();
        {
            let mut session = SessionRecorder::new(&stack, &[layer.clone()], "Blocked");
            session.start_recording();
            layer.borrow_mut().create_prim(&p("/A")).unwrap();
        }
        assert!(guard.is_empty());
        drop(guard);
        assert!(stack.borrow().is_empty());
        assert!(layer.borrow().has_spec(&p("/A")));
    }
}
