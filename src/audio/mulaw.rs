//! Mu-law companding.
//!
//! The vocoder predicts discrete amplitude codes over a mu-law compressed
//! scale; [`decode`] expands sampled values back to linear amplitude.
//! `mu` is `quantization_channels - 1` throughout.

/// Compress a linear amplitude in [-1, 1] to the mu-law scale.
pub fn encode(x: f32, quantization_channels: usize) -> f32 {
    let mu = (quantization_channels - 1) as f32;
    x.signum() * (1.0 + mu * x.abs()).ln() / (1.0 + mu).ln()
}

/// Expand a mu-law value in [-1, 1] back to linear amplitude.
pub fn decode(y: f32, quantization_channels: usize) -> f32 {
    let mu = (quantization_channels - 1) as f32;
    y.signum() / mu * ((1.0 + mu).powf(y.abs()) - 1.0)
}

/// Expand a whole mu-law signal to linear amplitude.
pub fn decode_signal(signal: &[f32], quantization_channels: usize) -> Vec<f32> {
    signal
        .iter()
        .map(|&y| decode(y, quantization_channels))
        .collect()
}
