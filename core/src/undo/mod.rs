//! Undo/redo engine for layer edits.
//!
//! Call sites mutate layers through the ordinary layer API. While a recorder
//! is active, every mutation is routed through a [`RecordingDelegate`] that
//! turns it into a reversible [`Instruction`]; the instructions of one
//! logical operation form a [`CommandGroup`], and the groups live on a
//! linear [`CommandStack`].
//!
//! - [`Instruction`] — one elementary mutation plus its "before" state
//! - [`InstructionStore`] — ordered, type-erased storage of instructions
//! - [`CommandGroup`] — the reversible payload of one undo step
//! - [`RecordingDelegate`] — intercepts layer mutations and records them
//! - [`GroupRecorder`] / [`SessionRecorder`] — scoped installation of
//!   recording delegates
//! - [`Command`] — an undo-stack entry (Command pattern)
//! - [`CommandStack`] — linear history with a cursor
//! - [`DeferredQueue`] — requests made during traversal, run between passes
//!
//! # Recording
//!
//! Recorders never replace a delegate outright: they wrap whatever is
//! installed and, on exit, unlink exactly the delegate they added. Several
//! recorders may therefore watch the same layer at once; each records the
//! mutation and the layer data changes exactly once.
//!
//! # Robustness
//!
//! Nothing here returns an error. Instructions whose layer was dropped, or
//! whose target no longer exists, are skipped; an operation that recorded
//! nothing never becomes an undo step; undo and redo at the ends of the
//! history do nothing.

mod command;
mod command_group;
mod deferred;
pub mod edits;
mod history;
mod instruction;
mod instruction_store;
mod recorder;
mod recording_delegate;

pub use command::{Command, FnEdit, LayerCommand, LayerEdit, RecordedCommand};
pub use command_group::CommandGroup;
pub use deferred::DeferredQueue;
pub use history::{CommandStack, CommandStackHandle, DEFAULT_MAX_UNDO};
pub use instruction::{Instruction, InstructionKind};
pub use instruction_store::InstructionStore;
pub use recorder::{GroupRecorder, SessionRecorder};
pub use recording_delegate::RecordingDelegate;
