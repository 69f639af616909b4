use crate::Rank;
use crate::config::Args;
use crate::config::Config;
use crate::data::Dataset;
use crate::data::Images;
use crate::data::Split;
use crate::model::Adadelta;
use crate::model::JsonFile;
use crate::model::Linear;
use crate::profiler::Emitter;
use crate::training::Report;
use crate::training::Trainer;
use anyhow::Context;

/// How this process participates, parsed from command line arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Re-execute this binary once per rank and wait for all of them.
    Spawn,
    /// Train as a single rank of an externally launched group.
    Rank(Rank),
}

impl Mode {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        match (args.spawning(), args.rank) {
            (true, _) => Ok(Self::Spawn),
            (false, Some(rank)) => Ok(Self::Rank(rank)),
            (false, None) if !args.distributed() => Ok(Self::Rank(0)),
            (false, None) => Err(anyhow::anyhow!(
                "--rank (or LOCAL_RANK) is required when not spawning"
            )),
        }
    }

    /// Tag for this process's log file.
    pub fn tag(&self) -> String {
        match self {
            Self::Spawn => "spawn".to_string(),
            Self::Rank(rank) => format!("rank{}", rank),
        }
    }

    pub async fn run(self, args: Args) -> anyhow::Result<()> {
        match self {
            Self::Spawn => Self::spawn(&args).await,
            Self::Rank(rank) => Self::rank(&args, rank).await,
        }
    }

    /// Every child inherits our arguments with the rank pinned. If any
    /// child fails the rest are killed, since they would otherwise block
    /// forever in their next collective.
    async fn spawn(args: &Args) -> anyhow::Result<()> {
        let exe = std::env::current_exe().context("locate trainer executable")?;
        let forwarded = std::env::args_os().skip(1).collect::<Vec<_>>();
        log::info!("spawning {} ranks", args.world_size);
        let children = (0..args.world_size)
            .map(|rank| {
                tokio::process::Command::new(&exe)
                    .args(&forwarded)
                    .arg("--spawn")
                    .arg("0")
                    .arg("--rank")
                    .arg(rank.to_string())
                    .arg("--world-size")
                    .arg(args.world_size.to_string())
                    .arg("--address")
                    .arg(&args.address)
                    .arg("--port")
                    .arg(args.port.to_string())
                    .kill_on_drop(true)
                    .spawn()
                    .with_context(|| format!("spawn rank {}", rank))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        futures::future::try_join_all(children.into_iter().enumerate().map(
            |(rank, mut child)| async move {
                let status = child.wait().await.with_context(|| format!("wait for rank {}", rank))?;
                anyhow::ensure!(status.success(), "rank {} exited with {}", rank, status);
                Ok::<_, anyhow::Error>(())
            },
        ))
        .await?;
        log::info!("all {} ranks finished", args.world_size);
        Ok(())
    }

    async fn rank(args: &Args, rank: Rank) -> anyhow::Result<()> {
        let config = args.config(rank)?;
        let (train, test) = Self::datasets(args, config.seed)?;
        let (model, optimizer) = Self::replica(&config);
        let report = Trainer::new(
            config,
            model,
            optimizer,
            Emitter::new(args.trace_dir(rank)),
            train,
            test,
            Box::new(JsonFile::new(crate::CHECKPOINT_PATH)),
        )
        .await?
        .train()
        .await
        .with_context(|| format!("rank {} failed", rank))?;
        Self::summary(rank, &report);
        Ok(())
    }

    /// Model and optimizer as configured. Every rank seeds the same
    /// initial parameters.
    fn replica(config: &Config) -> (Linear, Adadelta) {
        (
            Linear::new(crate::PIXELS, crate::CLASSES, config.seed),
            Adadelta::new(config.lr),
        )
    }

    fn datasets(args: &Args, seed: u64) -> anyhow::Result<(Box<dyn Dataset>, Box<dyn Dataset>)> {
        match args.data.as_deref() {
            Some(dir) => {
                let train = Images::mnist(dir, Split::Train).context("load training images")?;
                let test = Images::mnist(dir, Split::Test).context("load test images")?;
                anyhow::ensure!(
                    train.width() == crate::PIXELS && test.width() == crate::PIXELS,
                    "expected {}x{} images",
                    crate::IMAGE_SIDE,
                    crate::IMAGE_SIDE
                );
                Ok((Box::new(train), Box::new(test)))
            }
            None => {
                log::warn!("no --data directory given, training on synthetic digits");
                Ok((
                    Box::new(Images::synthetic(crate::SYNTHETIC_TRAIN_SIZE, seed)),
                    Box::new(Images::synthetic(crate::SYNTHETIC_TEST_SIZE, seed + 1)),
                ))
            }
        }
    }

    fn summary(rank: Rank, report: &Report) {
        let accuracy = report
            .evaluations
            .last()
            .map(|e| format!("{:.2}%", 100.0 * e.accuracy()))
            .unwrap_or_else(|| "-".to_string());
        log::info!("┌────────────┬───────────────┐");
        log::info!("│ Rank       │ {:>13} │", rank);
        log::info!("├────────────┼───────────────┤");
        log::info!("│ Batches    │ {:>13} │", report.losses.len());
        log::info!("│ Steps      │ {:>13} │", report.steps);
        log::info!("│ Traces     │ {:>13} │", report.traces);
        log::info!("│ Accuracy   │ {:>13} │", accuracy);
        log::info!("└────────────┴───────────────┘");
    }
}
