//! WaveRNN-style autoregressive vocoder: conditioning + speaker → waveform.
//!
//! ## Architecture
//!
//! ```text
//! Conditioning: [B, T, in_channels] ⊕ speaker embedding
//!   → 2-layer BiGRU(conditioning_channels)        [B, T, 2·cond]
//!   → nearest-neighbour upsample ×hop_length      [B, T·hop, 2·cond]
//!
//! Sample loop (one step per output sample):
//!   code embedding ⊕ conditioning frame
//!   → GRU cell(rnn_channels)
//!   → fc1 + ReLU → fc2 → logits over 2^bits codes
//!   → categorical sample → next code
//!
//! Codes map to [-1, 1] and are mu-law expanded to the waveform.
//! ```
//!
//! Generation is sequential by construction: each sample's logits depend on
//! the previously sampled code.

use candle_core::{DType, IndexOp, Module, Tensor};
use candle_nn::{Embedding, Linear, VarBuilder};
use candle_transformers::generation::LogitsProcessor;

use super::rnn::{BiGru, Gru};
use crate::config::VocoderConfig;
use crate::{Error, Result, audio::mulaw};

/// WaveRNN-style vocoder.
#[derive(Debug, Clone)]
pub struct Vocoder {
    speaker_embedding: Embedding,
    rnn1: BiGru,
    embedding: Embedding,
    rnn2: Gru,
    fc1: Linear,
    fc2: Linear,
    speaker_embedding_dim: usize,
    rnn_channels: usize,
    quantization_channels: usize,
    hop_length: usize,
}

impl Vocoder {
    /// Construct the vocoder and restore its parameters.
    ///
    /// `in_channels` is the width of the conditioning input (the encoder's
    /// latent dimensionality in the conversion pipeline).
    pub fn load(
        in_channels: usize,
        cfg: &VocoderConfig,
        bits: usize,
        hop_length: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let quantization_channels = 1 << bits;

        let speaker_embedding = candle_nn::embedding(
            cfg.num_speakers,
            cfg.speaker_embedding_dim,
            vb.pp("speaker_embedding"),
        )?;
        let rnn1 = BiGru::load(
            &vb.pp("rnn1"),
            in_channels + cfg.speaker_embedding_dim,
            cfg.conditioning_channels,
            2,
        )?;
        let embedding = candle_nn::embedding(
            quantization_channels,
            cfg.embedding_dim,
            vb.pp("embedding"),
        )?;
        let rnn2 = Gru::load(
            &vb.pp("rnn2"),
            cfg.embedding_dim + 2 * cfg.conditioning_channels,
            cfg.rnn_channels,
            "l0",
        )?;
        let fc1 = candle_nn::linear(cfg.rnn_channels, cfg.fc_channels, vb.pp("fc1"))?;
        let fc2 = candle_nn::linear(cfg.fc_channels, quantization_channels, vb.pp("fc2"))?;

        Ok(Self {
            speaker_embedding,
            rnn1,
            embedding,
            rnn2,
            fc1,
            fc2,
            speaker_embedding_dim: cfg.speaker_embedding_dim,
            rnn_channels: cfg.rnn_channels,
            quantization_channels,
            hop_length,
        })
    }

    /// Samples produced per conditioning frame.
    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Autoregressively synthesize a waveform.
    ///
    /// `c` is the conditioning sequence `[1, T, in_channels]`; `speaker` the
    /// registry index conditioning the speaker embedding. Returns
    /// `T × hop_length` samples in [-1, 1].
    pub fn generate(
        &self,
        c: &Tensor,
        speaker: usize,
        sampler: &mut LogitsProcessor,
    ) -> Result<Vec<f32>> {
        let (batch, frames, _) = c.dims3()?;
        if batch != 1 {
            return Err(Error::Config(format!(
                "vocoder generation expects batch size 1, got {batch}"
            )));
        }
        let device = c.device();

        // Conditioning network: append the speaker embedding to every frame,
        // run the BiGRU, then upsample frames to sample rate.
        let speaker = Tensor::new(&[speaker as u32], device)?;
        let speaker = self.speaker_embedding.forward(&speaker)?; // [1, S]
        let speaker = speaker
            .unsqueeze(1)?
            .expand((1, frames, self.speaker_embedding_dim))?;
        let x = Tensor::cat(&[c, &speaker], 2)?;
        let cond = self.rnn1.seq(&x)?; // [1, T, 2·cond]
        let cond = repeat_frames(&cond, self.hop_length)?; // [1, T·hop, 2·cond]

        let total_samples = frames * self.hop_length;
        let mut h = Tensor::zeros((1, self.rnn_channels), DType::F32, device)?;
        let mut code = (self.quantization_channels / 2) as u32;
        let mut output = Vec::with_capacity(total_samples);

        for step in 0..total_samples {
            let x_t = self
                .embedding
                .forward(&Tensor::new(&[code], device)?)?; // [1, E]
            let m_t = cond.i((.., step, ..))?.contiguous()?; // [1, 2·cond]
            let input = Tensor::cat(&[&x_t, &m_t], 1)?;

            h = self.rnn2.step(&input, &h)?;
            let hidden = self.fc1.forward(&h)?.relu()?;
            let logits = self.fc2.forward(&hidden)?; // [1, Q]

            code = sampler.sample(&logits.squeeze(0)?)?;
            output.push(2.0 * code as f32 / (self.quantization_channels - 1) as f32 - 1.0);
        }

        Ok(mulaw::decode_signal(&output, self.quantization_channels))
    }
}

/// Upsample `[B, T, C]` to `[B, T·repeats, C]` by repeating each frame.
fn repeat_frames(x: &Tensor, repeats: usize) -> Result<Tensor> {
    let (b, t, c) = x.dims3()?;
    let x = x.unsqueeze(2)?; // [B, T, 1, C]
    let x = x.expand((b, t, repeats, c))?; // [B, T, repeats, C]
    Ok(x.reshape((b, t * repeats, c))?)
}
