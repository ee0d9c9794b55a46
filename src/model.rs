//! Model components for VQ-CPC voice conversion.
//!
//! ## Components
//!
//! - [`encoder`] — CPC content encoder (strided conv, VQ codebook, context GRU)
//! - [`vocoder`] — WaveRNN-style autoregressive vocoder
//! - [`rnn`] — GRU building blocks shared by both

use std::path::Path;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;

use crate::{Error, Result};

pub mod encoder;
pub mod rnn;
pub mod vocoder;

/// Open a PyTorch checkpoint and expose its `"model"` entry as a
/// [`VarBuilder`].
///
/// The checkpoints are pickle files whose top-level dict keys the state
/// dict under `"model"`; parameter paths below that match the original
/// module names, so models restore without any renaming.
pub fn checkpoint_var_builder(
    path: impl AsRef<Path>,
    device: &Device,
) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    let tensors = candle_core::pickle::PthTensors::new(path, Some("model"))
        .map_err(|e| Error::Checkpoint(format!("{}: {e}", path.display())))?;
    Ok(VarBuilder::from_backend(
        Box::new(tensors),
        DType::F32,
        device.clone(),
    ))
}
