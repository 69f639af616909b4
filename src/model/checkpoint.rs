use super::*;
use crate::Error;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;

/// Parameter name to values.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Checkpoint {
    parameters: BTreeMap<String, Vec<f32>>,
}

impl From<&[Parameter]> for Checkpoint {
    fn from(parameters: &[Parameter]) -> Self {
        Self {
            parameters: parameters
                .iter()
                .map(|p| (p.name().to_string(), p.values().to_vec()))
                .collect(),
        }
    }
}

impl Checkpoint {
    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.parameters.get(name).map(Vec::as_slice)
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }
}

/// Destination for the end-of-run checkpoint.
pub trait Store: Send + Sync {
    fn write(&self, checkpoint: &Checkpoint) -> crate::Result<()>;
}

/// Pretty JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFile(PathBuf);

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
    pub fn path(&self) -> &Path {
        &self.0
    }
    pub fn read(&self) -> crate::Result<Checkpoint> {
        let file = File::open(&self.0).map_err(|e| self.fail(e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| self.fail(e))
    }
    fn fail(&self, reason: impl ToString) -> Error {
        Error::Checkpoint {
            path: self.0.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Store for JsonFile {
    fn write(&self, checkpoint: &Checkpoint) -> crate::Result<()> {
        let file = File::create(&self.0).map_err(|e| self.fail(e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), checkpoint).map_err(|e| self.fail(e))?;
        log::info!("checkpoint written to {}", self.0.display());
        Ok(())
    }
}
