/// One labelled image, borrowed from its dataset.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub pixels: &'a [f32],
    pub label: usize,
}

/// Indexed access to labelled samples.
pub trait Dataset: Send + Sync {
    fn len(&self) -> usize;
    /// Panics if `index >= len()`.
    fn get(&self, index: usize) -> Sample<'_>;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
