use super::*;
use std::path::Path;
use std::path::PathBuf;

/// Default trace handler: logs the per-operation table and writes a
/// Chrome trace file per cycle.
#[derive(Debug, Clone)]
pub struct Emitter {
    dir: PathBuf,
    rows: usize,
}

impl Emitter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rows: crate::TRACE_ROW_LIMIT,
        }
    }
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl Handler for Emitter {
    fn ready(&mut self, trace: &Trace) -> crate::Result<()> {
        log::info!("profiled cycle {}\n{}", trace.cycle, trace.table(self.rows));
        let path = trace.export(&self.dir)?;
        log::info!("trace written to {}", path.display());
        Ok(())
    }
}
