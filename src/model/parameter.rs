use crate::Weight;

/// A named, flattened parameter tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    values: Vec<Weight>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, values: Vec<Weight>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn values(&self) -> &[Weight] {
        &self.values
    }
    pub fn values_mut(&mut self) -> &mut [Weight] {
        &mut self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
