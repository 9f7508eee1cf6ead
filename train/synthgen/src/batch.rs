use std::{collections::BTreeMap, path::PathBuf, sync::mpsc, thread};

use log::{debug, info, warn};
use rand::{RngCore, SeedableRng, rngs::SmallRng};
use rand_xoshiro::SplitMix64;
use rayon::prelude::*;

use crate::{
    config::GeneratorConfig,
    corpus::Corpus,
    error::{ResourceError, RunError},
    generator::{SampleLabels, SampleOrchestrator, SampleResult},
    io::OutputWriter,
    render::Rasterize,
    sampler::{Overrides, ParameterSampler, RenderParameters, Resources},
};

/// Label groups collected across flushes, written once at the end.
#[derive(Debug, Default)]
pub struct LabelAccumulator {
    labels: Vec<SampleLabels>,
}

impl LabelAccumulator {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[SampleLabels] {
        &self.labels
    }
}

/// Releases items in index order, holding back any that arrive early.
#[derive(Debug)]
struct InOrder<T> {
    next: usize,
    pending: BTreeMap<usize, T>,
}

impl<T> InOrder<T> {
    fn new() -> Self {
        Self {
            next: 0,
            pending: BTreeMap::new(),
        }
    }

    fn push(&mut self, index: usize, item: T) -> Vec<(usize, T)> {
        self.pending.insert(index, item);
        let mut released = Vec::new();
        while let Some(item) = self.pending.remove(&self.next) {
            released.push((self.next, item));
            self.next += 1;
        }
        released
    }
}

/// Writes a batch of samples and moves their labels into `acc`.
pub fn flush(
    writer: &OutputWriter,
    batch: Vec<SampleResult>,
    mut acc: LabelAccumulator,
) -> Result<LabelAccumulator, RunError> {
    for sample in batch {
        writer.save_sample(&sample)?;
        acc.labels.push(sample.labels);
    }
    Ok(acc)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub requested: usize,
    pub written: usize,
    pub skipped: usize,
    pub seed: u64,
    pub labels_path: PathBuf,
}

/// Fans samples out over a worker pool and flushes them every
/// `save_interval` samples, in submission order. Workers never wait on a
/// flush; finished samples are reordered on the calling thread.
pub struct BatchRunner<R: Rasterize> {
    config: GeneratorConfig,
    rasterizer: R,
}

impl<R: Rasterize> BatchRunner<R> {
    pub fn new(config: GeneratorConfig, rasterizer: R) -> Self {
        Self { config, rasterizer }
    }

    pub fn run(&self, corpus: &Corpus) -> Result<RunSummary, RunError> {
        let cfg = &self.config;
        cfg.validate()?;
        if corpus.is_empty() && cfg.n > 0 {
            return Err(ResourceError::EmptyCorpus(corpus.source().to_path_buf()).into());
        }
        let resources = Resources::resolve(&cfg.font_source(), &cfg.background_source())?;

        let seed = cfg.seed.unwrap_or_else(rand::random);
        info!("seed {seed}");
        let mut rng = SmallRng::seed_from_u64(seed);
        let sampler = ParameterSampler::new(resources, Overrides::from(cfg));
        let params = sampler.sample(cfg.n, corpus, &mut rng);

        let mut seeds = SplitMix64::seed_from_u64(seed);
        let jobs: Vec<(RenderParameters, u64)> =
            params.into_iter().map(|p| (p, seeds.next_u64())).collect();

        let workers = cfg.num_procs.resolve();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
        info!("generating {} samples on {workers} worker(s)", jobs.len());

        let writer = OutputWriter::new(&cfg.out_dir, cfg.image_format);
        writer.init()?;
        let orchestrator =
            SampleOrchestrator::new(&self.rasterizer, cfg.canvas_shape(), cfg.mask_fill, cfg.blur_sigma);

        let total = jobs.len();
        let (tx, rx) = mpsc::channel();
        let (acc, skipped) = thread::scope(|scope| -> Result<_, RunError> {
            let (jobs, orchestrator, pool) = (&jobs, &orchestrator, &pool);
            scope.spawn(move || {
                pool.install(|| {
                    // stops early once the receiver is gone after a write error
                    jobs.par_iter()
                        .enumerate()
                        .try_for_each_with(tx, |tx, (i, (p, seed))| {
                            let result = orchestrator.produce(p, &mut SmallRng::seed_from_u64(*seed));
                            tx.send((i, result))
                        })
                })
            });

            let mut order = InOrder::new();
            let mut acc = LabelAccumulator::default();
            let mut ready = Vec::with_capacity(cfg.save_interval);
            let mut skipped = 0;
            for (i, result) in rx {
                for (i, result) in order.push(i, result) {
                    match result {
                        Ok(sample) => ready.push(sample),
                        Err(e) => {
                            warn!("skipping sample {:?}: {e}", jobs[i].0.text);
                            skipped += 1;
                        }
                    }
                    let done = i + 1;
                    if done % cfg.save_interval == 0 || done == total {
                        acc = flush(&writer, std::mem::take(&mut ready), acc)?;
                        info!("{done}/{total} samples processed");
                    }
                }
            }
            Ok((acc, skipped))
        })?;

        let labels_path = writer.write_labels(acc.labels())?;
        debug!("labels written to {}", labels_path.display());

        Ok(RunSummary {
            requested: cfg.n,
            written: acc.len(),
            skipped,
            seed,
            labels_path,
        })
    }
}
