use super::*;
use crate::Error;
use crate::Loss;
use crate::config::Config;
use crate::data::Dataset;
use crate::data::Shard;
use crate::group::Manager;
use crate::group::Membership;
use crate::model::Model;
use crate::model::Optimizer;
use crate::model::Replicated;
use crate::model::Store;
use crate::profiler::Handler;
use crate::profiler::Sampler;
use crate::schedule::StepLr;
use crate::schedule::Transition;
use std::ops::Range;
use std::time::Instant;

/// One rank's training run.
///
/// Owns the process group for its whole lifetime: joined in [`Trainer::new`]
/// and torn down at the end of [`Trainer::train`]. Every rank runs the same
/// number of rounds per epoch, so the all-reduces line up even when shards
/// differ in length.
pub struct Trainer<M, O, H> {
    config: Config,
    manager: Manager,
    membership: Membership,
    replica: Replicated<M>,
    optimizer: O,
    decay: StepLr,
    sampler: Sampler<H>,
    train: Box<dyn Dataset>,
    test: Box<dyn Dataset>,
    store: Box<dyn Store>,
}

impl<M, O, H> Trainer<M, O, H>
where
    M: Model,
    O: Optimizer,
    H: Handler,
{
    /// Join the configured group, if any, and assemble the run.
    pub async fn new(
        config: Config,
        model: M,
        optimizer: O,
        handler: H,
        train: Box<dyn Dataset>,
        test: Box<dyn Dataset>,
        store: Box<dyn Store>,
    ) -> crate::Result<Self> {
        let mut manager = Manager::default();
        let membership = match config.address.clone() {
            Some(address) => manager.initialize(address).await?,
            None => Membership::Local,
        };
        Ok(Self {
            decay: StepLr::new(config.gamma, crate::DECAY_STEP_SIZE),
            sampler: Sampler::new(config.window, handler),
            replica: Replicated::new(model),
            config,
            manager,
            membership,
            optimizer,
            train,
            test,
            store,
        })
    }

    pub fn membership(&self) -> Membership {
        self.membership
    }

    /// Run every epoch, save, and leave the group.
    ///
    /// On error the group is dropped without the teardown barrier. Peers
    /// see their connections close and fail out of their next collective.
    pub async fn train(mut self) -> crate::Result<Report> {
        let start = Instant::now();
        let mut losses = Vec::new();
        let mut evaluations = Vec::new();
        let mut steps = 0;
        let mut traces = 0;
        log::info!(
            "training rank {} of {} ({} batches per step)",
            self.membership.rank(),
            self.membership.world_size(),
            self.config.accumulation.period()
        );
        for epoch in 1..=self.config.epochs {
            let (epoch_steps, epoch_traces) = self.epoch(epoch, &mut losses).await?;
            steps += epoch_steps;
            traces += epoch_traces;
            let evaluation = self.evaluate()?;
            log::info!("{}", evaluation);
            evaluations.push(evaluation);
            self.decay.step(&mut self.optimizer);
        }
        self.save()?;
        if self.manager.is_active() {
            self.manager.destroy().await?;
        }
        log::info!("time spent: {:.2?}", start.elapsed());
        Ok(Report {
            losses,
            steps,
            evaluations,
            traces,
            parameters: self.replica.checkpoint(),
        })
    }

    /// Returns the optimizer steps taken and trace cycles emitted.
    async fn epoch(&mut self, epoch: usize, losses: &mut Vec<Loss>) -> crate::Result<(usize, usize)> {
        let rank = self.membership.rank();
        let world_size = self.membership.world_size();
        let shard = Shard::new(self.train.len(), rank, world_size)?;
        let rounds = Shard::rounds(self.train.len(), world_size, self.config.batch_size);
        let mut batches = shard.batches(self.config.batch_size)?;
        let mut steps = 0;
        let mut traces = 0;
        let mut last = Loss::NAN;
        for i in 0..rounds {
            let span = self.sampler.begin("train_step");
            let (loss, transition) = self.round(epoch, i, rounds, batches.next()).await?;
            if let Some(loss) = loss {
                losses.push(loss);
                last = loss;
            }
            steps += usize::from(transition == Transition::Step);
            self.sampler.end(span);
            traces += usize::from(self.sampler.step()?.is_some());
            if i % self.config.log_interval == 0 {
                log::info!(
                    "train epoch: {} [{}/{} ({:.0}%)]\tloss: {:.6}",
                    epoch,
                    (i * self.config.batch_size).min(shard.len()),
                    shard.len(),
                    100.0 * i as f32 / rounds as f32,
                    last
                );
                if self.config.dry_run {
                    break;
                }
            }
        }
        Ok((steps, traces))
    }

    /// Backward over `batch`, if this rank still has one, then step when
    /// the schedule says so. Gradients are zero after every step.
    async fn round(
        &mut self,
        epoch: usize,
        i: usize,
        rounds: usize,
        batch: Option<Range<usize>>,
    ) -> crate::Result<(Option<Loss>, Transition)> {
        let loss = match batch {
            Some(batch) => {
                let ref train = self.train;
                let loss = self
                    .sampler
                    .record("backward", || self.replica.backward(train.as_ref(), batch));
                if !loss.is_finite() {
                    return Err(Error::Numerical { loss, epoch, batch: i });
                }
                Some(loss)
            }
            None => None,
        };
        let transition = self.config.accumulation.transition(i, rounds);
        if let Transition::Step = transition {
            let sync = self.sampler.begin("synchronize");
            self.replica.synchronize(self.manager.collective()).await?;
            self.sampler.end(sync);
            self.sampler
                .record("optimizer.step", || self.replica.step(&mut self.optimizer));
            self.sampler.record("zero_grad", || self.replica.zero_grad());
        }
        Ok((loss, transition))
    }

    fn evaluate(&self) -> crate::Result<Evaluation> {
        let shard = Shard::new(
            self.test.len(),
            self.membership.rank(),
            self.membership.world_size(),
        )?;
        Evaluation::run(
            self.replica.model(),
            self.test.as_ref(),
            &shard,
            self.config.test_batch_size,
        )
    }

    /// Only the leader writes, so exactly one checkpoint exists per run.
    fn save(&self) -> crate::Result<()> {
        match self.config.save_model && self.membership.is_leader() {
            true => self.store.write(&self.replica.checkpoint()),
            false => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Images;
    use crate::data::Sample;
    use crate::group::Address;
    use crate::model::Adadelta;
    use crate::model::Checkpoint;
    use crate::model::JsonFile;
    use crate::model::Linear;
    use crate::profiler::Trace;
    use crate::profiler::Window;
    use crate::schedule::Accumulation;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    impl Store for Counting {
        fn write(&self, _: &Checkpoint) -> crate::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Poisoned(Vec<f32>);

    impl Dataset for Poisoned {
        fn len(&self) -> usize {
            8
        }
        fn get(&self, _: usize) -> Sample<'_> {
            Sample {
                pixels: &self.0,
                label: 0,
            }
        }
    }

    fn quiet(_: &Trace) -> crate::Result<()> {
        Ok(())
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn config(address: Option<Address>) -> Config {
        Config {
            batch_size: 32,
            test_batch_size: 100,
            epochs: 1,
            accumulation: Accumulation::new(2).unwrap(),
            save_model: true,
            window: Window::new(0, 1, 1, 1, 1).unwrap(),
            address,
            ..Config::default()
        }
    }

    async fn run(config: Config, store: Counting) -> crate::Result<Report> {
        let seed = config.seed;
        Trainer::new(
            config,
            Linear::new(crate::PIXELS, crate::CLASSES, seed),
            Adadelta::new(1.0),
            quiet,
            Box::new(Images::synthetic(256, seed)),
            Box::new(Images::synthetic(64, seed + 1)),
            Box::new(store),
        )
        .await?
        .train()
        .await
    }

    #[tokio::test]
    async fn single_process_epoch() {
        let store = Counting::default();
        let report = run(config(None), store.clone()).await.unwrap();
        assert_eq!(report.losses.len(), 8);
        assert_eq!(report.steps, 5);
        assert_eq!(report.evaluations.len(), 1);
        assert_eq!(report.evaluations[0].total(), 64);
        assert_eq!(report.traces, 1);
        assert_eq!(store.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gradients_clear_on_every_step() {
        let config = Config {
            accumulation: Accumulation::new(3).unwrap(),
            ..config(None)
        };
        let mut trainer = Trainer::new(
            config,
            Linear::new(crate::PIXELS, crate::CLASSES, 1),
            Adadelta::new(1.0),
            quiet,
            Box::new(Images::synthetic(256, 1)),
            Box::new(Images::synthetic(16, 2)),
            Box::new(Counting::default()),
        )
        .await
        .unwrap();
        let rounds = Shard::rounds(256, 1, 32);
        let mut batches = Shard::whole(256).batches(32).unwrap();
        let mut transitions = Vec::new();
        for i in 0..rounds {
            let before = trainer.replica.gradients().contributions();
            let (loss, transition) = trainer.round(1, i, rounds, batches.next()).await.unwrap();
            assert!(loss.is_some());
            match transition {
                Transition::Step => assert!(trainer.replica.gradients().is_zero()),
                Transition::Accumulate => {
                    assert_eq!(trainer.replica.gradients().contributions(), before + 1);
                    assert!(!trainer.replica.gradients().is_zero());
                }
            }
            transitions.push(transition);
        }
        let steps = transitions
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Transition::Step)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        assert_eq!(steps, vec![0, 3, 6, 7]);
    }

    #[tokio::test]
    async fn dry_run_stops_each_epoch_early() {
        let config = Config {
            dry_run: true,
            epochs: 2,
            ..config(None)
        };
        let report = run(config, Counting::default()).await.unwrap();
        assert_eq!(report.losses.len(), 2);
        assert_eq!(report.steps, 2);
        assert_eq!(report.evaluations.len(), 2);
    }

    #[tokio::test]
    async fn singleton_group_matches_local() {
        let local = run(config(None), Counting::default()).await.unwrap();
        let address = Address::new(0, 1, "127.0.0.1", free_port()).unwrap();
        let group = run(config(Some(address)), Counting::default()).await.unwrap();
        assert_eq!(local.losses, group.losses);
        assert_eq!(local.parameters, group.parameters);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn two_ranks_stay_in_lockstep() {
        let port = free_port();
        let store = Counting::default();
        let ranks = (0..2)
            .map(|rank| Address::new(rank, 2, "127.0.0.1", port).unwrap())
            .map(|address| tokio::spawn(run(config(Some(address)), store.clone())))
            .collect::<Vec<_>>();
        let mut reports = Vec::new();
        for rank in ranks {
            reports.push(rank.await.unwrap().unwrap());
        }
        assert_eq!(store.0.load(Ordering::SeqCst), 1);
        assert_eq!(reports[0].parameters, reports[1].parameters);
        assert_eq!(reports[0].steps, reports[1].steps);
        assert_eq!(reports[0].losses.len(), 4);
        assert_ne!(reports[0].losses, reports[1].losses);
        assert_eq!(reports[0].evaluations[0].total(), 32);
    }

    #[tokio::test]
    async fn uneven_shards_take_equal_steps() {
        let port = free_port();
        let handles = (0..3)
            .map(|rank| Address::new(rank, 3, "127.0.0.1", port).unwrap())
            .map(|address| {
                let config = Config {
                    batch_size: 10,
                    ..config(Some(address))
                };
                tokio::spawn(run(config, Counting::default()))
            })
            .collect::<Vec<_>>();
        let mut steps = Vec::new();
        for handle in handles {
            steps.push(handle.await.unwrap().unwrap().steps);
        }
        assert!(steps.iter().all(|s| *s == steps[0]));
    }

    #[tokio::test]
    async fn non_finite_loss_aborts() {
        let trainer = Trainer::new(
            config(None),
            Linear::new(crate::PIXELS, crate::CLASSES, 1),
            Adadelta::new(1.0),
            quiet,
            Box::new(Poisoned(vec![f32::NAN; crate::PIXELS])),
            Box::new(Images::synthetic(8, 1)),
            Box::new(Counting::default()),
        )
        .await
        .unwrap();
        assert!(matches!(
            trainer.train().await,
            Err(Error::Numerical { epoch: 1, batch: 0, .. })
        ));
    }

    #[tokio::test]
    async fn leader_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("model.json"));
        let report = Trainer::new(
            config(None),
            Linear::new(crate::PIXELS, crate::CLASSES, 1),
            Adadelta::new(1.0),
            quiet,
            Box::new(Images::synthetic(64, 1)),
            Box::new(Images::synthetic(16, 2)),
            Box::new(file.clone()),
        )
        .await
        .unwrap()
        .train()
        .await
        .unwrap();
        assert_eq!(file.read().unwrap(), report.parameters);
    }
}
