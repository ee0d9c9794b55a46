//! Configuration for the VQ-CPC conversion pipeline.
//!
//! Mirrors the `config.json` layout the checkpoints were trained with:
//! a `preprocessing` section (mel/audio parameters) and a `model` section
//! (encoder dimensions plus a nested `vocoder` block).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Audio/mel preprocessing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Number of mel bands in the input spectrograms.
    pub num_mels: usize,
    /// Mu-law quantization bit depth.
    pub bits: usize,
    /// Audio samples per mel frame.
    pub hop_length: usize,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
}

impl PreprocessingConfig {
    /// Number of discrete amplitude levels (`2^bits`).
    pub fn quantization_channels(&self) -> usize {
        1 << self.bits
    }
}

/// Vocoder architecture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocoderConfig {
    /// Number of speakers in the embedding table.
    pub num_speakers: usize,
    /// Speaker embedding width.
    pub speaker_embedding_dim: usize,
    /// Conditioning BiGRU hidden width (per direction).
    pub conditioning_channels: usize,
    /// Sample embedding width.
    pub embedding_dim: usize,
    /// Autoregressive GRU hidden width.
    pub rnn_channels: usize,
    /// Output head hidden width.
    pub fc_channels: usize,
}

/// Model architecture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Encoder conv/MLP channel width.
    pub encoder_channels: usize,
    /// Latent (codebook) dimensionality.
    pub z_dim: usize,
    /// Context (conditioning) dimensionality.
    pub c_dim: usize,
    pub vocoder: VocoderConfig,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub preprocessing: PreprocessingConfig,
    pub model: ModelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preprocessing: PreprocessingConfig {
                num_mels: 80,
                bits: 8,
                hop_length: 160,
                sample_rate: 16000,
            },
            model: ModelConfig {
                encoder_channels: 512,
                z_dim: 64,
                c_dim: 256,
                vocoder: VocoderConfig {
                    num_speakers: 102,
                    speaker_embedding_dim: 64,
                    conditioning_channels: 128,
                    embedding_dim: 256,
                    rnn_channels: 896,
                    fc_channels: 256,
                },
            },
        }
    }
}

impl Config {
    /// Read a `config.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "preprocessing": {
            "num_mels": 80,
            "bits": 9,
            "hop_length": 200,
            "sample_rate": 16000
        },
        "model": {
            "encoder_channels": 512,
            "z_dim": 64,
            "c_dim": 256,
            "vocoder": {
                "num_speakers": 102,
                "speaker_embedding_dim": 64,
                "conditioning_channels": 128,
                "embedding_dim": 256,
                "rnn_channels": 896,
                "fc_channels": 256
            }
        }
    }"#;

    #[test]
    fn parse_config_json() {
        let cfg: Config = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(cfg.preprocessing.num_mels, 80);
        assert_eq!(cfg.preprocessing.bits, 9);
        assert_eq!(cfg.preprocessing.hop_length, 200);
        assert_eq!(cfg.model.z_dim, 64);
        assert_eq!(cfg.model.vocoder.rnn_channels, 896);
    }

    #[test]
    fn quantization_channels_from_bits() {
        let cfg: Config = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(cfg.preprocessing.quantization_channels(), 512);

        let cfg = Config::default();
        assert_eq!(cfg.preprocessing.quantization_channels(), 256);
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, FIXTURE).unwrap();
        let cfg = Config::from_file(&path).unwrap();
        assert_eq!(cfg.preprocessing.sample_rate, 16000);
        assert_eq!(cfg.model.vocoder.num_speakers, 102);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::from_file("/nonexistent/config.json").is_err());
    }
}
