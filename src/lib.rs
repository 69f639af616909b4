//! Distributed data-parallel training of an image classifier.
//!
//! One process per rank. Ranks rendezvous over TCP, train on disjoint
//! contiguous shards of the dataset, accumulate gradients locally and
//! average them across the group whenever the accumulation schedule
//! says to step. A step-sampling profiler captures per-operation timings
//! for a configurable window of batches.
pub mod config;
pub mod data;
pub mod error;
pub mod group;
#[cfg(feature = "cli")]
pub mod launch;
pub mod model;
pub mod profiler;
pub mod schedule;
pub mod training;

pub use error::Error;
pub use error::Result;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Zero-based identity of a participant in the process group.
pub type Rank = usize;
/// Negative log-likelihood of a sample or the mean over a batch.
pub type Loss = f32;
/// Parameter values, gradients, and optimizer state.
pub type Weight = f32;

// ============================================================================
// IMAGE GEOMETRY
// ============================================================================
/// Height and width of a single-channel input image.
pub const IMAGE_SIDE: usize = 28;
/// Flattened input width.
pub const PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;
/// Number of target classes.
pub const CLASSES: usize = 10;
/// Per-pixel normalization mean (MNIST training set).
pub const PIXEL_MEAN: f32 = 0.1307;
/// Per-pixel normalization standard deviation (MNIST training set).
pub const PIXEL_STD: f32 = 0.3081;
/// Training samples generated when no IDX directory is given.
pub const SYNTHETIC_TRAIN_SIZE: usize = 6000;
/// Test samples generated when no IDX directory is given.
pub const SYNTHETIC_TEST_SIZE: usize = 1000;

// ============================================================================
// PROCESS GROUP
// Rank 0 listens, every other rank dials in and introduces itself.
// ============================================================================
/// Coordination host used when none is configured.
pub const DEFAULT_ADDRESS: &str = "localhost";
/// Coordination port used when none is configured.
pub const DEFAULT_PORT: u16 = 8088;
/// Dial attempts a non-root rank makes before giving up on rendezvous.
pub const CONNECT_ATTEMPTS: usize = 200;
/// Pause between dial attempts.
pub const CONNECT_BACKOFF: std::time::Duration = std::time::Duration::from_millis(50);
/// Largest payload a peer may announce in one frame.
pub const MAX_FRAME_BYTES: usize = 1 << 28;

// ============================================================================
// OPTIMIZATION
// ============================================================================
/// Adadelta running-average coefficient.
pub const ADADELTA_RHO: Weight = 0.9;
/// Adadelta numerical floor inside the square roots.
pub const ADADELTA_EPS: Weight = 1e-6;
/// Epochs between learning rate decays.
pub const DECAY_STEP_SIZE: usize = 1;
/// Where rank 0 writes the trained parameters.
pub const CHECKPOINT_PATH: &str = "mnist_linear.json";

// ============================================================================
// PROFILER WINDOW
// One cycle = wait + warmup + active steps, repeated `repeat` times.
// ============================================================================
/// Steps ignored before the first cycle starts.
pub const TRACE_SKIP_FIRST: usize = 0;
/// Steps per cycle with the profiler idle.
pub const TRACE_WAIT: usize = 1;
/// Steps per cycle recorded and then discarded.
pub const TRACE_WARMUP: usize = 1;
/// Steps per cycle recorded and emitted.
pub const TRACE_ACTIVE: usize = 1;
/// Number of cycles before sampling stops for good. Zero never stops.
pub const TRACE_REPEAT: usize = 1;
/// Rows in the per-operation summary table.
pub const TRACE_ROW_LIMIT: usize = 10;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
/// The tag keeps files from concurrently running ranks apart.
#[cfg(feature = "cli")]
pub fn log(tag: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    std::fs::create_dir_all("logs").context("create logs directory")?;
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("time moves slow")?
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}-{}.log", time, tag)).context("create log file")?,
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).context("initialize logger")?;
    Ok(())
}
