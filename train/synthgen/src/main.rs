use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use synthgen::{BatchRunner, Corpus, GeneratorConfig, GlyphRenderer, RotationMode, WorkerCount};

#[derive(Parser, Debug)]
#[command(name = "synthgen", version, about = "Render Sinhala text onto backgrounds for OCR training")]
struct Cli {
    /// Newline-delimited text file
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// JSON file with generator options; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of samples
    #[arg(short = 'n', long)]
    samples: Option<usize>,

    /// Worker threads, -1 for all cores
    #[arg(long, allow_hyphen_values = true)]
    num_procs: Option<WorkerCount>,

    #[arg(long)]
    save_interval: Option<usize>,

    /// Output directory
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Font file or directory of fonts
    #[arg(long)]
    font: Option<PathBuf>,

    /// Background image or directory of images
    #[arg(long)]
    background: Option<PathBuf>,

    /// Canvas size as HEIGHTxWIDTH
    #[arg(long, value_parser = parse_shape)]
    shape: Option<(u32, u32)>,

    #[arg(long)]
    font_size: Option<u32>,

    /// Tilt every sample by a random angle in [-15, 15)
    #[arg(long)]
    rotate: bool,

    #[arg(long)]
    with_replacement: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, cfg: &mut GeneratorConfig) {
        cfg.corpus = self.corpus.or(cfg.corpus.take());
        if let Some(n) = self.samples {
            cfg.n = n;
        }
        if let Some(w) = self.num_procs {
            cfg.num_procs = w;
        }
        if let Some(s) = self.save_interval {
            cfg.save_interval = s;
        }
        if let Some(out) = self.out {
            cfg.out_dir = out;
        }
        if let Some(font) = self.font {
            cfg.font_dir = font;
        }
        if let Some(bg) = self.background {
            cfg.background_image_dir = bg;
        }
        if let Some(shape) = self.shape {
            cfg.shape = shape;
        }
        cfg.seed = self.seed.or(cfg.seed);
        cfg.font_size = self.font_size.or(cfg.font_size);
        if self.rotate {
            cfg.rotate_flag = RotationMode::DEFAULT_RANDOM;
        }
        cfg.sample_with_replace |= self.with_replacement;
    }
}

fn parse_shape(s: &str) -> Result<(u32, u32), String> {
    let (h, w) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("{s:?} is not HEIGHTxWIDTH"))?;
    let h = h.trim().parse().map_err(|e| format!("height: {e}"))?;
    let w = w.trim().parse().map_err(|e| format!("width: {e}"))?;
    Ok((h, w))
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    let corpus_path = config
        .corpus
        .clone()
        .context("no corpus given; pass --corpus or set \"corpus\" in the config")?;
    let corpus = Corpus::load(&corpus_path, config.min_text_length)
        .with_context(|| format!("loading corpus {}", corpus_path.display()))?;
    info!("{} usable lines in {}", corpus.len(), corpus_path.display());

    let runner = BatchRunner::new(config, GlyphRenderer);
    let summary = runner.run(&corpus)?;
    info!(
        "wrote {}/{} samples ({} skipped, seed {}), labels in {}",
        summary.written,
        summary.requested,
        summary.skipped,
        summary.seed,
        summary.labels_path.display()
    );
    Ok(())
}
