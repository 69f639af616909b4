use super::*;
use std::time::Instant;

/// Receives each completed trace cycle, synchronously, on the step that
/// completes it.
pub trait Handler: Send {
    fn ready(&mut self, trace: &Trace) -> crate::Result<()>;
}

impl<F> Handler for F
where
    F: FnMut(&Trace) -> crate::Result<()> + Send,
{
    fn ready(&mut self, trace: &Trace) -> crate::Result<()> {
        self(trace)
    }
}

/// An open span. Close it with [`Sampler::end`].
#[derive(Debug)]
#[must_use]
pub struct Span {
    name: &'static str,
    depth: usize,
    start: Instant,
}

/// Step-driven profiler state machine.
///
/// The step counter advances once per processed batch via
/// [`Sampler::step`] and is never reset, so cycles continue across epochs.
pub struct Sampler<H> {
    window: Window,
    handler: H,
    origin: Instant,
    step: usize,
    depth: usize,
    events: Vec<Event>,
    emitted: usize,
}

impl<H> Sampler<H>
where
    H: Handler,
{
    pub fn new(window: Window, handler: H) -> Self {
        Self {
            window,
            handler,
            origin: Instant::now(),
            step: 0,
            depth: 0,
            events: Vec::new(),
            emitted: 0,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
    pub fn handler(&self) -> &H {
        &self.handler
    }
    /// Steps taken so far.
    pub fn step_num(&self) -> usize {
        self.step
    }
    /// Cycles handed to the handler so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
    pub fn phase(&self) -> Phase {
        self.window.phase(self.step)
    }
    fn recording(&self) -> bool {
        matches!(self.phase(), Phase::Warmup | Phase::Active)
    }

    pub fn begin(&mut self, name: &'static str) -> Span {
        let depth = self.depth;
        self.depth += 1;
        Span {
            name,
            depth,
            start: Instant::now(),
        }
    }

    pub fn end(&mut self, span: Span) {
        let duration = span.start.elapsed();
        self.depth = span.depth;
        if self.recording() {
            self.events.push(Event {
                name: span.name,
                step: self.step,
                depth: span.depth,
                start: span.start.duration_since(self.origin),
                duration,
            });
        }
    }

    /// Time a synchronous operation.
    pub fn record<T>(&mut self, name: &'static str, f: impl FnOnce() -> T) -> T {
        let span = self.begin(name);
        let output = f();
        self.end(span);
        output
    }

    /// Close out the current step. Returns the cycle ordinal if this step
    /// completed an active phase and the trace was handed off.
    pub fn step(&mut self) -> crate::Result<Option<usize>> {
        let step = self.step;
        self.step += 1;
        match self.window.phase(step) {
            Phase::Active if self.window.completes(step) => {
                let cycle = self.window.ordinal(step).unwrap_or_default();
                let trace = Trace {
                    cycle,
                    events: std::mem::take(&mut self.events),
                };
                self.handler.ready(&trace)?;
                self.emitted += 1;
                Ok(Some(cycle))
            }
            Phase::Active => Ok(None),
            Phase::Idle | Phase::Warmup | Phase::Done => {
                self.events.clear();
                Ok(None)
            }
        }
    }
}
