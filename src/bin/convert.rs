//! VQ-CPC batch voice conversion CLI.
//!
//! Reads `speakers.csv` from the data directory and a synthesis list of
//! (mel_path, speaker) pairs, restores the encoder and vocoder checkpoints,
//! and writes one WAV file per entry to the output directory as
//! `<speaker>_<utterance_id>.wav`.
//!
//! Exit code 0 on success; any failure (missing file, unknown speaker,
//! malformed config) aborts the whole run with a non-zero exit code.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use vqcpc_rs::{
    audio::write_wav,
    config::Config,
    manifest::{self, SpeakerRegistry},
    pipeline::ConversionPipeline,
};

#[derive(Parser, Debug)]
#[command(
    name = "convert",
    about = "VQ-CPC batch voice conversion",
    long_about = "Convert a list of mel spectrograms into target-speaker speech.\n\
                  Each synthesis list row (mel_path, speaker) produces one WAV file\n\
                  named <speaker>_<utterance_id>.wav in the output directory."
)]
struct Args {
    /// Vocoder checkpoint path.
    #[arg(long)]
    checkpoint: PathBuf,

    /// CPC encoder checkpoint path.
    #[arg(long)]
    cpc_checkpoint: PathBuf,

    /// Directory containing speakers.csv.
    #[arg(long)]
    data_dir: PathBuf,

    /// Output directory for generated audio.
    #[arg(long)]
    out_dir: PathBuf,

    /// CSV manifest of (mel_path, speaker) pairs.
    #[arg(long)]
    synthesis_list: PathBuf,

    /// Configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Force CPU execution (otherwise CUDA if available).
    #[arg(long)]
    cpu: bool,

    /// Sampling seed. Omit for a random seed each run.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("failed to read {}", args.config.display()))?;

    let speakers = SpeakerRegistry::from_csv(args.data_dir.join("speakers.csv"))?;
    let entries = manifest::load_synthesis_list(&args.synthesis_list, &args.data_dir)?;
    tracing::info!(
        "{} synthesis entries, {} speakers",
        entries.len(),
        speakers.len()
    );

    let device = if args.cpu {
        candle_core::Device::Cpu
    } else {
        candle_core::Device::cuda_if_available(0)?
    };
    tracing::info!("Using device: {:?}", device);

    let seed = args.seed.unwrap_or_else(rand::random);

    let mut pipeline = ConversionPipeline::load(
        &config,
        &args.cpc_checkpoint,
        &args.checkpoint,
        speakers,
        &device,
        seed,
    )
    .map_err(|e| anyhow::anyhow!("failed to load pipeline: {e}"))?;

    std::fs::create_dir_all(&args.out_dir)?;

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} utterances ({eta})",
        )
        .context("failed to create progress bar template")?
        .progress_chars("█▉▊▋▌▍▎▏ "),
    );

    for entry in &entries {
        let samples = pipeline
            .convert(entry)
            .map_err(|e| anyhow::anyhow!("{}: {e}", entry.mel_path.display()))?;
        let path = entry.output_path(&args.out_dir)?;
        write_wav(&path, &samples, config.preprocessing.sample_rate)?;
        pb.inc(1);
    }
    pb.finish();

    tracing::info!(
        "Wrote {} files to {}",
        entries.len(),
        args.out_dir.display()
    );

    Ok(())
}
