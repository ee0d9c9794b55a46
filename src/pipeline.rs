//! End-to-end conversion pipeline.
//!
//! Orchestrates one synthesis request:
//! 1. Resolve the target speaker to its registry index
//! 2. Load the mel spectrogram array (`<stem>.mel.npy`)
//! 3. Encode mel → quantized latents + conditioning
//! 4. Autoregressively generate the waveform with the vocoder
//!
//! Both models are constructed once from the configuration and restored
//! from their checkpoints; the conversion loop never mutates them.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::LogitsProcessor;

use crate::Result;
use crate::config::Config;
use crate::manifest::{SpeakerRegistry, SynthesisEntry};
use crate::model::{checkpoint_var_builder, encoder::CpcEncoder, vocoder::Vocoder};

/// Loaded models plus the speaker registry, ready to convert entries.
pub struct ConversionPipeline {
    encoder: CpcEncoder,
    vocoder: Vocoder,
    speakers: SpeakerRegistry,
    device: Device,
    sampler: LogitsProcessor,
}

impl ConversionPipeline {
    /// Construct both models and restore their checkpoints.
    ///
    /// Both checkpoints are required: an encoder left at random
    /// initialization cannot produce usable conditioning.
    pub fn load(
        config: &Config,
        encoder_checkpoint: impl AsRef<Path>,
        vocoder_checkpoint: impl AsRef<Path>,
        speakers: SpeakerRegistry,
        device: &Device,
        seed: u64,
    ) -> Result<Self> {
        let encoder_checkpoint = encoder_checkpoint.as_ref();
        tracing::info!("Loading encoder checkpoint from {}", encoder_checkpoint.display());
        let vb = checkpoint_var_builder(encoder_checkpoint, device)?;
        let encoder = CpcEncoder::load(config.preprocessing.num_mels, &config.model, vb)?;

        let vocoder_checkpoint = vocoder_checkpoint.as_ref();
        tracing::info!("Loading vocoder checkpoint from {}", vocoder_checkpoint.display());
        let vb = checkpoint_var_builder(vocoder_checkpoint, device)?;
        let vocoder = Vocoder::load(
            config.model.z_dim,
            &config.model.vocoder,
            config.preprocessing.bits,
            config.preprocessing.hop_length,
            vb,
        )?;

        Ok(Self {
            encoder,
            vocoder,
            speakers,
            device: device.clone(),
            sampler: LogitsProcessor::new(seed, Some(1.0), None),
        })
    }

    /// Convert one synthesis entry to waveform samples.
    pub fn convert(&mut self, entry: &SynthesisEntry) -> Result<Vec<f32>> {
        let mel = Tensor::read_npy(entry.mel_npy_path())?
            .to_dtype(DType::F32)?
            .to_device(&self.device)?
            .unsqueeze(0)?; // [1, num_mels, T]

        let speaker = self.speakers.index_of(&entry.speaker)?;

        let encoded = self.encoder.forward(&mel)?;
        self.vocoder.generate(&encoded.c, speaker, &mut self.sampler)
    }
}
