use super::*;
use crate::Error;
use crate::Weight;

/// Accumulated gradient per parameter, plus how many backward passes have
/// been added since the last clear.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    buffers: Vec<Vec<Weight>>,
    contributions: usize,
}

impl Gradients {
    pub fn zeros(parameters: &[Parameter]) -> Self {
        Self {
            buffers: parameters.iter().map(|p| vec![0.0; p.len()]).collect(),
            contributions: 0,
        }
    }
    pub fn buffers(&self) -> &[Vec<Weight>] {
        &self.buffers
    }
    pub fn buffer(&self, parameter: usize) -> &[Weight] {
        &self.buffers[parameter]
    }
    pub fn buffer_mut(&mut self, parameter: usize) -> &mut [Weight] {
        &mut self.buffers[parameter]
    }
    pub fn contributions(&self) -> usize {
        self.contributions
    }
    /// Mark one more backward pass as folded into the buffers.
    pub fn contribute(&mut self) {
        self.contributions += 1;
    }
    pub fn zero(&mut self) {
        self.buffers.iter_mut().for_each(|b| b.fill(0.0));
        self.contributions = 0;
    }
    pub fn is_zero(&self) -> bool {
        self.contributions == 0 && self.buffers.iter().flatten().all(|g| *g == 0.0)
    }
    pub fn numel(&self) -> usize {
        self.buffers.iter().map(Vec::len).sum()
    }
    /// All buffers concatenated in parameter order.
    pub fn flatten(&self) -> Vec<Weight> {
        self.buffers.iter().flatten().copied().collect()
    }
    /// Overwrite buffers from a flat vector laid out as [`Gradients::flatten`].
    pub fn assign(&mut self, flat: &[Weight]) -> crate::Result<()> {
        if flat.len() != self.numel() {
            return Err(Error::Protocol(format!(
                "gradient length {} does not match {} parameters",
                flat.len(),
                self.numel()
            )));
        }
        let mut rest = flat;
        for buffer in self.buffers.iter_mut() {
            let (head, tail) = rest.split_at(buffer.len());
            buffer.copy_from_slice(head);
            rest = tail;
        }
        Ok(())
    }
}
