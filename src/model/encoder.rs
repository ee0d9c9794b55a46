//! CPC content encoder: mel spectrogram → quantized latents + context.
//!
//! ## Architecture
//!
//! ```text
//! Input: [B, num_mels, T]
//! Conv1d(num_mels, encoder_channels, k=4, s=2, p=1, no bias)   [B, C, T/2]
//! 5 × (LayerNorm + ReLU + Linear)  (final Linear → z_dim)      [B, T/2, z_dim]
//! VQ codebook (512 entries, nearest-neighbour)                 [B, T/2, z_dim]
//! GRU(z_dim → c_dim)                                           [B, T/2, c_dim]
//! ```
//!
//! The MLP keeps the original `nn.Sequential` parameter indices
//! (`encoder.0` LayerNorm, `encoder.2` Linear, ...) so checkpoints restore
//! directly. Only the final Linear carries a bias.

use candle_core::{Module, Tensor};
use candle_nn::{Conv1d, Conv1dConfig, LayerNorm, Linear, VarBuilder};

use super::rnn::Gru;
use crate::Result;
use crate::config::ModelConfig;

/// Number of codebook entries.
pub const CODEBOOK_SIZE: usize = 512;

/// Encoder forward output.
pub struct EncoderOutput {
    /// Quantized latents `[B, T/2, z_dim]`.
    pub z: Tensor,
    /// Context (conditioning) `[B, T/2, c_dim]`.
    pub c: Tensor,
    /// Codebook indices `[B, T/2]`.
    pub indices: Tensor,
}

/// One LayerNorm → ReLU → Linear group of the encoder MLP.
#[derive(Debug, Clone)]
struct MlpBlock {
    norm: LayerNorm,
    linear: Linear,
}

impl MlpBlock {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = self.norm.forward(x)?.relu()?;
        Ok(self.linear.forward(&x)?)
    }
}

/// Vector-quantization codebook.
///
/// Inference-only: quantizes each frame to its nearest codebook row. The
/// EMA statistics stored alongside the table in checkpoints are training
/// state and are not loaded.
#[derive(Debug, Clone)]
pub struct VqCodebook {
    embedding: Tensor, // [K, D]
}

impl VqCodebook {
    fn load(vb: &VarBuilder, z_dim: usize) -> Result<Self> {
        let embedding = vb.get((CODEBOOK_SIZE, z_dim), "embedding")?;
        Ok(Self { embedding })
    }

    /// Quantize `z [B, T, D]` to nearest codebook rows (L2).
    ///
    /// Returns the quantized tensor and the code indices `[B, T]`.
    pub fn quantize(&self, z: &Tensor) -> Result<(Tensor, Tensor)> {
        let (b, t, d) = z.dims3()?;
        let flat = z.reshape((b * t, d))?;

        // ||z - e||² = ||z||² - 2·z·eᵀ + ||e||²
        let z_sq = flat.sqr()?.sum_keepdim(1)?; // [N, 1]
        let e_sq = self.embedding.sqr()?.sum_keepdim(1)?.t()?; // [1, K]
        let dots = flat.matmul(&self.embedding.t()?)?; // [N, K]
        let distances = z_sq.broadcast_add(&e_sq)?.broadcast_sub(&(dots * 2.0)?)?;

        let indices = distances.argmin(1)?; // [N]
        let quantized = self.embedding.index_select(&indices, 0)?; // [N, D]

        Ok((quantized.reshape((b, t, d))?, indices.reshape((b, t))?))
    }
}

/// CPC content encoder.
#[derive(Debug, Clone)]
pub struct CpcEncoder {
    conv: Conv1d,
    mlp: Vec<MlpBlock>,
    codebook: VqCodebook,
    rnn: Gru,
}

impl CpcEncoder {
    pub fn load(num_mels: usize, cfg: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        let conv_cfg = Conv1dConfig {
            padding: 1,
            stride: 2,
            ..Default::default()
        };
        let conv = candle_nn::conv1d_no_bias(
            num_mels,
            cfg.encoder_channels,
            4,
            conv_cfg,
            vb.pp("conv"),
        )?;

        // Sequential indices: LayerNorm at 0,3,6,9,12; Linear at 2,5,8,11,14.
        let seq = vb.pp("encoder");
        let mut mlp = Vec::with_capacity(5);
        for group in 0..5 {
            let norm = candle_nn::layer_norm(
                cfg.encoder_channels,
                1e-5,
                seq.pp(format!("{}", 3 * group)),
            )?;
            let linear = if group < 4 {
                candle_nn::linear_no_bias(
                    cfg.encoder_channels,
                    cfg.encoder_channels,
                    seq.pp(format!("{}", 3 * group + 2)),
                )?
            } else {
                candle_nn::linear(cfg.encoder_channels, cfg.z_dim, seq.pp("14"))?
            };
            mlp.push(MlpBlock { norm, linear });
        }

        let codebook = VqCodebook::load(&vb.pp("codebook"), cfg.z_dim)?;
        let rnn = Gru::load(&vb.pp("rnn"), cfg.z_dim, cfg.c_dim, "l0")?;

        Ok(Self {
            conv,
            mlp,
            codebook,
            rnn,
        })
    }

    /// Encode a batch of mel spectrograms `[B, num_mels, T]`.
    pub fn forward(&self, mel: &Tensor) -> Result<EncoderOutput> {
        let z = self.conv.forward(mel)?; // [B, C, T/2]
        let mut z = z.transpose(1, 2)?.contiguous()?; // [B, T/2, C]
        for block in &self.mlp {
            z = block.forward(&z)?;
        }
        let (z, indices) = self.codebook.quantize(&z)?;
        let c = self.rnn.seq(&z)?;
        Ok(EncoderOutput { z, c, indices })
    }
}
