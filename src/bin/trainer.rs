//! Trainer Binary
//!
//! Data-parallel training. Spawns one process per rank by default;
//! pass `--spawn 0 --rank <r>` to run a single externally launched rank.
use clap::Parser;
use ddptrain::config::Args;
use ddptrain::launch::Mode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mode = Mode::from_args(&args)?;
    ddptrain::log(&mode.tag())?;
    mode.run(args).await
}
