//! Linear undo/redo history.
//!
//! [`CommandStack`] keeps every retained [`Command`] in one sequence with a
//! cursor separating applied commands from undone ones. Executing a new
//! command after undoing discards the redo branch (standard editor behavior).

use std::cell::{BorrowMutError, Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use super::command::Command;

/// Default maximum number of undo steps.
pub const DEFAULT_MAX_UNDO: usize = 100;

/// Ordered history of commands with a cursor.
///
/// `cursor` points one past the last applied command, so
/// `history[..cursor]` can be undone and `history[cursor..]` redone. When the
/// history exceeds `max_undo`, the oldest command is dropped from the front
/// and the cursor shifts with it.
///
/// The stack is a plain value: whoever drives the edit loop owns it and
/// passes it by reference to commands and the deferred queue. Session
/// recorders need a [`CommandStackHandle`] instead.
///
/// # Example
///
/// ```ignore
/// let mut stack = CommandStack::new(50);
///
/// stack.execute(CreatePrim::new(&layer, path).into_command());
/// stack.undo();
/// stack.redo();
/// ```
pub struct CommandStack {
    history: VecDeque<Box<dyn Command>>,
    cursor: usize,
    max_undo: usize,
    /// Cursor value of the last save.
    ///
    /// `None` when never saved, or when the saved state can no longer be
    /// reached (its redo branch was discarded or it fell off the front).
    saved_cursor: Option<usize>,
}

impl CommandStack {
    /// Creates an empty stack keeping at most `max_undo` commands.
    pub fn new(max_undo: usize) -> Self {
        Self {
            history: VecDeque::new(),
            cursor: 0,
            max_undo,
            saved_cursor: Some(0),
        }
    }

    /// Creates an empty stack that never drops old commands.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Runs `command` and keeps it in the history if it asks to be retained.
    ///
    /// A retained command discards every undone command after the cursor.
    /// Returns whether the command was retained.
    pub fn execute(&mut self, mut command: Box<dyn Command>) -> bool {
        if !command.execute() {
            log::debug!("discarding '{}': nothing changed", command.description());
            return false;
        }
        self.push_applied(command);
        true
    }

    /// Appends a command whose effect already happened, without running it.
    pub fn push_applied(&mut self, command: Box<dyn Command>) {
        if self.cursor < self.history.len() {
            log::debug!(
                "discarding {} redo steps",
                self.history.len() - self.cursor
            );
            self.history.truncate(self.cursor);
            if let Some(saved) = self.saved_cursor
                && saved > self.cursor
            {
                self.saved_cursor = None;
            }
        }

        log::debug!("pushed '{}'", command.description());
        self.history.push_back(command);
        self.cursor = self.history.len();

        if self.history.len() > self.max_undo {
            self.history.pop_front();
            self.cursor -= 1;
            self.saved_cursor = match self.saved_cursor {
                Some(0) | None => None,
                Some(saved) => Some(saved - 1),
            };
        }
    }

    /// Reverts the command before the cursor. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let command = &mut self.history[self.cursor];
        log::debug!("undo '{}'", command.description());
        command.revert();
        true
    }

    /// Re-executes the command at the cursor. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(command) = self.history.get_mut(self.cursor) else {
            return false;
        };
        log::debug!("redo '{}'", command.description());
        command.execute();
        self.cursor += 1;
        true
    }

    /// Drops every command. The layers keep their current state.
    ///
    /// If the current state was the saved state it remains so; otherwise the
    /// save point is lost.
    pub fn clear_history(&mut self) {
        self.saved_cursor = if self.saved_cursor == Some(self.cursor) {
            Some(0)
        } else {
            None
        };
        self.history.clear();
        self.cursor = 0;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.history.len()
    }

    /// Number of retained commands, applied or undone.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn max_undo(&self) -> usize {
        self.max_undo
    }

    /// Descriptions of undoable commands, most recent first.
    pub fn undo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.history
            .range(..self.cursor)
            .rev()
            .map(|c| c.description())
    }

    /// Descriptions of redoable commands, next redo first.
    pub fn redo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.history.range(self.cursor..).map(|c| c.description())
    }

    /// Records the current state as the saved state.
    pub fn mark_saved(&mut self) {
        self.saved_cursor = Some(self.cursor);
    }

    /// Returns `true` if the layers differ from the last saved state, or the
    /// saved state is unreachable.
    pub fn has_unsaved_changes(&self) -> bool {
        self.saved_cursor != Some(self.cursor)
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO)
    }
}

impl fmt::Debug for CommandStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStack")
            .field("len", &self.history.len())
            .field("cursor", &self.cursor)
            .field("max_undo", &self.max_undo)
            .field("saved_cursor", &self.saved_cursor)
            .finish()
    }
}

/// Shared, single-threaded handle to a [`CommandStack`].
///
/// Session recorders keep a handle instead of borrowing the stack, so
/// several sessions on one stack can be open at the same time.
#[derive(Clone, Default)]
pub struct CommandStackHandle(Rc<RefCell<CommandStack>>);

impl CommandStackHandle {
    pub fn new(stack: CommandStack) -> Self {
        Self(Rc::new(RefCell::new(stack)))
    }

    pub fn borrow(&self) -> Ref<'_, CommandStack> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, CommandStack> {
        self.0.borrow_mut()
    }

    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, CommandStack>, BorrowMutError> {
        self.0.try_borrow_mut()
    }
}

impl fmt::Debug for CommandStackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(stack) => write!(f, "CommandStackHandle({stack:?})"),
            Err(_) => f.write_str("CommandStackHandle(<borrowed>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Appends its name on execute and removes it on revert.
    #[derive(Debug)]
    struct Push {
        name: &'static str,
        log: Log,
    }

    impl Command for Push {
        fn execute(&mut self) -> bool {
            self.log.borrow_mut().push(self.name.to_owned());
            true
        }

        fn revert(&mut self) {
            let popped = self.log.borrow_mut().pop();
            assert_eq!(popped.as_deref(), Some(self.name));
        }

        fn description(&self) -> &str {
            self.name
        }
    }

    #[derive(Debug)]
    struct Noop;

    impl Command for Noop {
        fn execute(&mut self) -> bool {
            false
        }

        fn revert(&mut self) {
            unreachable!("discarded commands are never reverted");
        }

        fn description(&self) -> &str {
            "Noop"
        }
    }

    fn push(name: &'static str, log: &Log) -> Box<dyn Command> {
        Box::new(Push {
            name,
            log: log.clone(),
        })
    }

    fn names(stack: &CommandStack) -> Vec<&str> {
        stack.history.iter().map(|c| c.description()).collect()
    }

    #[test]
    fn execute_applies_and_pushes() {
        let log = Log::default();
        let mut stack = CommandStack::default();
        assert!(stack.execute(push("c1", &log)));
        assert_eq!(*log.borrow(), ["c1"]);
        assert_eq!(stack.cursor(), 1);
        assert!(stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn undo_and_redo_move_cursor() {
        let log = Log::default();
        let mut stack = CommandStack::default();
        stack.execute(push("c1", &log));
        stack.execute(push("c2", &log));

        assert!(stack.undo());
        assert_eq!(*log.borrow(), ["c1"]);
        assert_eq!(stack.cursor(), 1);
        assert!(stack.redo());
        assert_eq!(*log.borrow(), ["c1", "c2"]);
        assert_eq!(stack.cursor(), 2);
    }

    #[test]
    fn new_command_truncates_redo_branch() {
        let log = Log::default();
        let mut stack = CommandStack::default();
        stack.execute(push("c1", &log));
        stack.execute(push("c2", &log));
        stack.execute(push("c3", &log));
        stack.undo();
        stack.undo();
        stack.execute(push("c4", &log));

        assert_eq!(names(&stack), ["c1", "c4"]);
        assert_eq!(stack.cursor(), 2);
        assert!(!stack.can_redo());
        assert_eq!(*log.borrow(), ["c1", "c4"]);
    }

    #[test]
    fn edges_are_idempotent() {
        let log = Log::default();
        let mut stack = CommandStack::default();
        assert!(!stack.undo());
        assert!(!stack.redo());

        stack.execute(push("c1", &log));
        assert!(!stack.redo());
        assert_eq!(stack.cursor(), 1);
        assert!(stack.undo());
        assert!(!stack.undo());
        assert_eq!(stack.cursor(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn discarded_command_leaves_redo_branch() {
        let log = Log::default();
        let mut stack = CommandStack::default();
        stack.execute(push("c1", &log));
        stack.undo();
        assert!(!stack.execute(Box::new(Noop)));
        assert_eq!(stack.len(), 1);
        assert!(stack.can_redo());
    }

    #[test]
    fn descriptions_follow_cursor() {
        let log = Log::default();
        let mut stack = CommandStack::default();
        stack.execute(push("c1", &log));
        stack.execute(push("c2", &log));
        stack.execute(push("c3", &log));
        stack.undo();

        assert_eq!(stack.undo_descriptions().collect::<Vec<_>>(), ["c2", "c1"]);
        assert_eq!(stack.redo_descriptions().collect::<Vec<_>>(), ["c3"]);
    }

    #[test]
    fn capacity_drops_oldest() {
        let log = Log::default();
        let mut stack = CommandStack::new(2);
        stack.execute(push("c1", &log));
        stack.execute(push("c2", &log));
        stack.execute(push("c3", &log));

        assert_eq!(names(&stack), ["c2", "c3"]);
        assert_eq!(stack.cursor(), 2);
        assert!(stack.undo());
        assert!(stack.undo());
        assert!(!stack.undo());
        assert_eq!(*log.borrow(), ["c1"]);
    }

    #[test]
    fn clear_history_keeps_layer_state() {
        let log = Log::default();
        let mut stack = CommandStack::default();
        stack.execute(push("c1", &log));
        stack.execute(push("c2", &log));
        stack.undo();
        stack.clear_history();

        assert!(stack.is_empty());
        assert_eq!(stack.cursor(), 0);
        assert!(!stack.undo());
        assert_eq!(*log.borrow(), ["c1"]);
    }

    #[test]
    fn save_point_tracking() {
        let log = Log::default();
        let mut stack = CommandStack::default();
        assert!(!stack.has_unsaved_changes());

        stack.execute(push("c1", &log));
        assert!(stack.has_unsaved_changes());
        stack.mark_saved();
        assert!(!stack.has_unsaved_changes());

        stack.undo();
        assert!(stack.has_unsaved_changes());
        stack.redo();
        assert!(!stack.has_unsaved_changes());
    }

    #[test]
    fn save_point_lost_with_redo_branch() {
        let log = Log::default();
        let mut stack = CommandStack::default();
        stack.execute(push("c1", &log));
        stack.mark_saved();
        stack.undo();
        stack.execute(push("c2", &log));
        stack.undo();
        assert!(stack.has_unsaved_changes());
    }

    #[test]
    fn save_point_lost_to_capacity() {
        let log = Log::default();
        let mut stack = CommandStack::new(1);
        stack.mark_saved();
        stack.execute(push("c1", &log));
        stack.execute(push("c2", &log));
        stack.undo();
        assert!(stack.has_unsaved_changes());
    }

    #[test]
    fn save_point_survives_clear_when_current() {
        let log = Log::default();
        let mut stack = CommandStack::default();
        stack.execute(push("c1", &log));
        stack.mark_saved();
        stack.clear_history();
        assert!(!stack.has_unsaved_changes());

        stack.execute(push("c2", &log));
        stack.clear_history();
        assert!(stack.has_unsaved_changes());
    }

    #[test]
    fn handle_shares_one_stack() {
        let log = Log::default();
        let handle = CommandStackHandle::default();
        let other = handle.clone();
        other.borrow_mut().execute(push("c1", &log));
        assert_eq!(handle.borrow().len(), 1);

        let held = handle.borrow();
        assert!(other.try_borrow_mut().is_err());
        drop(held);
        assert!(other.try_borrow_mut().is_ok());
    }

    #[test]
    fn debug_impl() {
        let stack = CommandStack::unbounded();
        let debug = format!("{stack:?}");
        assert!(debug.contains("CommandStack"));
        assert!(debug.contains("cursor"));
    }
}
