//! Queue for commands requested while the layers are being read.
//!
//! [`DeferredQueue`] uses interior mutability ([`RefCell`]) so that code
//! holding only `&self` (a view traversing a layer, say) can still request a
//! command. The owner of the [`CommandStack`] drains the queue once per pass,
//! outside any traversal, and runs every request through the stack.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::mem;

use super::command::Command;
use super::history::CommandStack;

type Build = Box<dyn FnOnce() -> Box<dyn Command>>;

/// Pass-based queue of deferred command requests.
///
/// Within one pass only the first request per command type is accepted;
/// repeated requests (re-entrant UI events, for instance) are dropped. The
/// command itself is built at the drain point, not when requested.
///
/// # Example
///
/// ```ignore
/// // While drawing the outliner:
/// queue.submit(|| LayerCommand::new(RemovePrim::new(&layer, path)));
///
/// // Between passes:
/// queue.run_pending(&mut stack);
/// ```
#[derive(Default)]
pub struct DeferredQueue {
    pending: RefCell<Vec<Build>>,
    seen: RefCell<HashSet<TypeId>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a command of type `C` for the next drain.
    ///
    /// Returns `false` if a `C` was already requested this pass; `build` is
    /// then dropped without running.
    pub fn submit<C, F>(&self, build: F) -> bool
    where
        C: Command + 'static,
        F: FnOnce() -> C + 'static,
    {
        let key = TypeId::of::<C>();
        if !self.seen.borrow_mut().insert(key) {
            log::debug!(
                "ignoring repeated {} request in this pass",
                std::any::type_name::<C>()
            );
            return false;
        }
        let build: Build = Box::new(move || -> Box<dyn Command> { Box::new(build()) });
        self.pending.borrow_mut().push(build);
        true
    }

    /// Builds and executes every pending request in submission order, then
    /// starts a new pass. Returns how many commands were retained.
    ///
    /// Requests made while draining belong to the next pass.
    pub fn run_pending(&self, stack: &mut CommandStack) -> usize {
        let pending = mem::take(&mut *self.pending.borrow_mut());
        self.seen.borrow_mut().clear();
        let mut retained = 0;
        for build in pending {
            if stack.execute(build()) {
                retained += 1;
            }
        }
        retained
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.len())
            .finish()
    }
}
