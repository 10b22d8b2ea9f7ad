//! Batch entrypoint: decode a WAV file, run it through the restoration
//! pipeline, and write the result back out as PCM16 WAV.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use wavemend::dsp::DEFAULT_SILENCE_THRESHOLD;
use wavemend::{
    init_tracing, wav, FrameTransform, GainTransform, ModelConfig, PassthroughTransform, Pipeline,
    ProcessingOptions,
};

/// CLI options for a single batch invocation.
#[derive(Debug, Parser, Clone)]
#[command(about = "Frame-based audio restoration", author, version)]
struct Cli {
    /// Input WAV file (canonical PCM16 mono)
    input: PathBuf,

    /// Output WAV file
    output: PathBuf,

    /// Rescale to unit peak before framing
    #[arg(long, default_value_t = false)]
    normalize: bool,

    /// Strip leading/trailing near-silence before framing
    #[arg(long = "trim-silence", default_value_t = false)]
    trim_silence: bool,

    /// Absolute-amplitude silence threshold used with --trim-silence
    #[arg(long, default_value_t = DEFAULT_SILENCE_THRESHOLD)]
    threshold: f32,

    /// Model input window size in samples
    #[arg(long = "frame-length")]
    frame_length: Option<usize>,

    /// Stride between window starts in samples
    #[arg(long = "hop-length")]
    hop_length: Option<usize>,

    /// YAML file with the model's frame geometry; flags above override it
    #[arg(long = "model-config", value_name = "PATH")]
    model_config: Option<PathBuf>,

    /// Apply a flat gain per frame instead of the passthrough transform
    #[arg(long)]
    gain: Option<f32>,

    /// Number of transform worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Write JSON trace logs
    #[arg(long = "logs", env = "WAVEMEND_LOGS", default_value_t = false)]
    logs: bool,

    /// Print invocation metrics as JSON on stdout
    #[arg(long = "print-metrics", default_value_t = false)]
    print_metrics: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.logs);

    let bytes = fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let signal = wav::decode(&bytes)
        .with_context(|| format!("failed to decode {}", cli.input.display()))?;
    info!(
        samples = signal.len(),
        sample_rate = signal.sample_rate,
        "decoded input"
    );

    let mut config = match &cli.model_config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yaml::from_str::<ModelConfig>(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => ModelConfig {
            sampling_rate: signal.sample_rate,
            ..ModelConfig::default()
        },
    };
    if let Some(frame_length) = cli.frame_length {
        config.frame_length = frame_length;
    }
    if let Some(hop_length) = cli.hop_length {
        config.hop_length = hop_length;
    }

    let transform: Arc<dyn FrameTransform> = match cli.gain {
        Some(gain) => Arc::new(GainTransform::new(gain)),
        None => Arc::new(PassthroughTransform),
    };

    let mut pipeline = Pipeline::new(config, transform)?;
    if let Some(workers) = cli.workers {
        pipeline = pipeline.with_workers(workers);
    }

    let options = ProcessingOptions {
        normalize: cli.normalize,
        trim_silence: cli.trim_silence,
        silence_threshold: cli.threshold,
    };
    let output = pipeline.process(&signal, &options)?;

    fs::write(&cli.output, wav::encode(&output.signal))
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!(
        samples = output.signal.len(),
        frames = output.metrics.frames_total,
        "wrote output"
    );

    if cli.print_metrics {
        println!("{}", serde_json::to_string_pretty(&output.metrics)?);
    }
    Ok(())
}
