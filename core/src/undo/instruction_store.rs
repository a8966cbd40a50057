//! Insertion-ordered storage for recorded instructions.

use std::slice;

use stratum_layer::LayerHandle;

use super::instruction::Instruction;

/// Ordered sequence of [`Instruction`]s of any kind.
///
/// [`apply_all`](Self::apply_all) replays in insertion order,
/// [`revert_all`](Self::revert_all) in exact reverse order: a later
/// instruction may depend on the effect of an earlier one (create a spec,
/// then set one of its fields).
#[derive(Debug, Default)]
pub struct InstructionStore {
    instructions: Vec<Instruction>,
}

impl InstructionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Moves every instruction of `other` to the end of `self`.
    pub fn append(&mut self, other: &mut InstructionStore) {
        self.instructions.append(&mut other.instructions);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn clear(&mut self) {
        self.instructions.clear();
    }

    pub fn iter(&self) -> slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn apply_all(&self) {
        for instruction in &self.instructions {
            instruction.apply();
        }
    }

    pub fn revert_all(&self) {
        for instruction in self.instructions.iter().rev() {
            instruction.revert();
        }
    }

    /// Distinct live layers targeted by the stored instructions, in first-use
    /// order.
    pub fn layers(&self) -> Vec<LayerHandle> {
        let mut layers: Vec<LayerHandle> = Vec::new();
        for layer in self.instructions.iter().filter_map(|i| i.layer().upgrade()) {
            if !layers.iter().any(|l| l.ptr_eq(&layer)) {
                layers.push(layer);
            }
        }
        layers
    }
}

impl<'a> IntoIterator for &'a InstructionStore {
    type Item = &'a Instruction;
    type IntoIter = slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
