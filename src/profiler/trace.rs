use crate::Error;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

/// One timed span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: &'static str,
    /// Profiler step the span was opened in.
    pub step: usize,
    /// Nesting level; top-level spans are zero.
    pub depth: usize,
    /// Offset from the sampler's origin.
    pub start: Duration,
    pub duration: Duration,
}

impl Event {
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }
    fn encloses(&self, other: &Event) -> bool {
        other.depth == self.depth + 1 && other.start >= self.start && other.end() <= self.end()
    }
}

/// Per-operation aggregate over a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub name: &'static str,
    pub calls: usize,
    pub total: Duration,
    /// Total minus time spent in directly nested spans.
    pub own: Duration,
}

/// Everything recorded during one active phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub cycle: usize,
    pub events: Vec<Event>,
}

impl Trace {
    fn own(&self, event: &Event) -> Duration {
        self.events
            .iter()
            .filter(|child| event.encloses(child))
            .map(|child| child.duration)
            .fold(event.duration, Duration::saturating_sub)
    }

    /// Aggregates by name, sorted by self time descending.
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = BTreeMap::<&'static str, Row>::new();
        for event in self.events.iter() {
            let own = self.own(event);
            let row = rows.entry(event.name).or_insert(Row {
                name: event.name,
                calls: 0,
                total: Duration::ZERO,
                own: Duration::ZERO,
            });
            row.calls += 1;
            row.total += event.duration;
            row.own += own;
        }
        let mut rows = rows.into_values().collect::<Vec<_>>();
        rows.sort_by(|a, b| b.own.cmp(&a.own).then(a.name.cmp(b.name)));
        rows
    }

    /// Box-drawn summary of the top `limit` rows.
    pub fn table(&self, limit: usize) -> String {
        let mut lines = Vec::new();
        lines.push("┌──────────────────────┬────────┬──────────────┬──────────────┐".to_string());
        lines.push("│ Name                 │  Calls │     Self (µs)│    Total (µs)│".to_string());
        lines.push("├──────────────────────┼────────┼──────────────┼──────────────┤".to_string());
        for row in self.rows().into_iter().take(limit) {
            lines.push(format!(
                "│ {:<20} │ {:>6} │ {:>12} │ {:>12} │",
                row.name,
                row.calls,
                row.own.as_micros(),
                row.total.as_micros()
            ));
        }
        lines.push("└──────────────────────┴────────┴──────────────┴──────────────┘".to_string());
        lines.join("\n")
    }

    /// Chrome trace-event JSON (complete events, microseconds).
    pub fn chrome(&self) -> serde_json::Value {
        let pid = std::process::id();
        serde_json::json!({
            "traceEvents": self.events.iter().map(|e| serde_json::json!({
                "name": e.name,
                "ph": "X",
                "ts": e.start.as_secs_f64() * 1e6,
                "dur": e.duration.as_secs_f64() * 1e6,
                "pid": pid,
                "tid": 0,
                "args": { "step": e.step, "cycle": self.cycle },
            })).collect::<Vec<_>>(),
            "displayTimeUnit": "ms",
        })
    }

    pub fn filename(&self) -> String {
        format!("trace_{}.json", self.cycle)
    }

    /// Write `trace_<cycle>.json` into `dir`, creating it if needed.
    pub fn export(&self, dir: &Path) -> crate::Result<PathBuf> {
        let path = dir.join(self.filename());
        std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::File::create(&path))
            .map_err(|e| Error::Trace(format!("{}: {}", path.display(), e)))
            .and_then(|file| {
                serde_json::to_writer(std::io::BufWriter::new(file), &self.chrome())
                    .map_err(|e| Error::Trace(format!("{}: {}", path.display(), e)))
            })?;
        Ok(path)
    }
}
