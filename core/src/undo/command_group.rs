//! The reversible payload of one undo step.

use stratum_layer::{ChangeBlock, LayerHandle};

use super::instruction_store::InstructionStore;

/// Ordered batch of instructions applied and reverted as one unit.
///
/// Both directions run inside a single [`ChangeBlock`] over every target
/// layer, so observers see one change per layer instead of one per
/// instruction.
#[derive(Debug, Default)]
pub struct CommandGroup {
    instructions: InstructionStore,
}

impl CommandGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn clear(&mut self) {
        self.instructions.clear();
    }

    pub fn instructions(&self) -> &InstructionStore {
        &self.instructions
    }

    pub fn layers(&self) -> Vec<LayerHandle> {
        self.instructions.layers()
    }

    pub(crate) fn extend(&mut self, mut recorded: InstructionStore) {
        self.instructions.append(&mut recorded);
    }

    /// Replays every instruction in recording order.
    pub fn apply(&self) {
        if self.is_empty() {
            return;
        }
        let _changes = ChangeBlock::new(self.layers());
        self.instructions.apply_all();
    }

    /// Undoes every instruction, last recorded first.
    pub fn revert(&self) {
        if self.is_empty() {
            return;
        }
        let _changes = ChangeBlock::new(self.layers());
        self.instructions.revert_all();
    }
}
