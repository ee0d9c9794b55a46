//! GRU building blocks.
//!
//! candle-nn's `gru()` hardcodes single-layer parameter names, which cannot
//! express the vocoder's stacked bidirectional conditioning network, so the
//! cells are implemented directly on tensors. Parameter names follow the
//! PyTorch convention (`weight_ih_l0`, `weight_ih_l0_reverse`, ...) so
//! checkpoints restore without renaming. Gate order in the stacked weight
//! matrices is `[reset, update, new]`.

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;

use crate::Result;

/// A single unidirectional GRU layer.
#[derive(Debug, Clone)]
pub struct Gru {
    w_ih: Tensor, // [3H, I]
    w_hh: Tensor, // [3H, H]
    b_ih: Tensor, // [3H]
    b_hh: Tensor, // [3H]
    hidden_dim: usize,
}

impl Gru {
    /// Load one layer's parameters. `suffix` selects the layer/direction,
    /// e.g. `"l0"` or `"l1_reverse"`.
    pub fn load(vb: &VarBuilder, in_dim: usize, hidden_dim: usize, suffix: &str) -> Result<Self> {
        let w_ih = vb.get((3 * hidden_dim, in_dim), &format!("weight_ih_{suffix}"))?;
        let w_hh = vb.get((3 * hidden_dim, hidden_dim), &format!("weight_hh_{suffix}"))?;
        let b_ih = vb.get(3 * hidden_dim, &format!("bias_ih_{suffix}"))?;
        let b_hh = vb.get(3 * hidden_dim, &format!("bias_hh_{suffix}"))?;
        Ok(Self {
            w_ih,
            w_hh,
            b_ih,
            b_hh,
            hidden_dim,
        })
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// All-zero initial state for a batch.
    pub fn zero_state(&self, batch: usize, device: &Device) -> Result<Tensor> {
        Ok(Tensor::zeros((batch, self.hidden_dim), DType::F32, device)?)
    }

    /// One timestep: `x [B, I]`, `h [B, H]` → new `h [B, H]`.
    pub fn step(&self, x: &Tensor, h: &Tensor) -> Result<Tensor> {
        let gi = x.matmul(&self.w_ih.t()?)?.broadcast_add(&self.b_ih)?;
        let gh = h.matmul(&self.w_hh.t()?)?.broadcast_add(&self.b_hh)?;

        let hd = self.hidden_dim;
        let i_r = gi.narrow(1, 0, hd)?;
        let i_z = gi.narrow(1, hd, hd)?;
        let i_n = gi.narrow(1, 2 * hd, hd)?;
        let h_r = gh.narrow(1, 0, hd)?;
        let h_z = gh.narrow(1, hd, hd)?;
        let h_n = gh.narrow(1, 2 * hd, hd)?;

        let r = candle_nn::ops::sigmoid(&(i_r + h_r)?)?;
        let z = candle_nn::ops::sigmoid(&(i_z + h_z)?)?;
        let n = (i_n + (r * h_n)?)?.tanh()?;

        // h' = (1 - z) * n + z * h
        let one_minus_z = z.affine(-1.0, 1.0)?;
        Ok(((one_minus_z * n)? + (z * h)?)?)
    }

    /// Scan a sequence `xs [B, T, I]` from a zero state → `[B, T, H]`.
    pub fn seq(&self, xs: &Tensor) -> Result<Tensor> {
        let (b, t, _i) = xs.dims3()?;
        let mut h = self.zero_state(b, xs.device())?;
        let mut states = Vec::with_capacity(t);
        for step in 0..t {
            let x_t = xs.i((.., step, ..))?.contiguous()?;
            h = self.step(&x_t, &h)?;
            states.push(h.clone());
        }
        Ok(Tensor::stack(&states, 1)?)
    }
}

/// A stack of bidirectional GRU layers.
///
/// Each layer runs a forward and a reverse pass and concatenates their
/// features, so layer outputs (and the inputs of every layer past the
/// first) have `2 * hidden_dim` features.
#[derive(Debug, Clone)]
pub struct BiGru {
    layers: Vec<(Gru, Gru)>,
}

impl BiGru {
    pub fn load(
        vb: &VarBuilder,
        in_dim: usize,
        hidden_dim: usize,
        num_layers: usize,
    ) -> Result<Self> {
        let mut layers = Vec::with_capacity(num_layers);
        for layer in 0..num_layers {
            let dim = if layer == 0 { in_dim } else { 2 * hidden_dim };
            let forward = Gru::load(vb, dim, hidden_dim, &format!("l{layer}"))?;
            let reverse = Gru::load(vb, dim, hidden_dim, &format!("l{layer}_reverse"))?;
            layers.push((forward, reverse));
        }
        Ok(Self { layers })
    }

    /// Scan `xs [B, T, I]` → `[B, T, 2H]`.
    pub fn seq(&self, xs: &Tensor) -> Result<Tensor> {
        let mut x = xs.clone();
        for (forward, reverse) in &self.layers {
            let fwd = forward.seq(&x)?;
            let bwd = reverse_time(&reverse.seq(&reverse_time(&x)?)?)?;
            x = Tensor::cat(&[&fwd, &bwd], 2)?;
        }
        Ok(x)
    }
}

/// Reverse a `[B, T, C]` tensor along the time axis.
fn reverse_time(xs: &Tensor) -> Result<Tensor> {
    let t = xs.dim(1)?;
    let indices: Vec<u32> = (0..t as u32).rev().collect();
    let indices = Tensor::new(indices.as_slice(), xs.device())?;
    Ok(xs.contiguous()?.index_select(&indices, 1)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn step_with_zero_weights_maps_zero_state_to_zero() {
        let dev = Device::Cpu;
        let vb = VarBuilder::zeros(DType::F32, &dev);
        let gru = Gru::load(&vb.pp("rnn"), 4, 3, "l0").unwrap();

        let x = Tensor::randn(0f32, 1.0, (2, 4), &dev).unwrap();
        let h = gru.zero_state(2, &dev).unwrap();
        let h = gru.step(&x, &h).unwrap();
        assert_eq!(h.dims(), &[2, 3]);

        // With all-zero parameters: n = tanh(0) = 0 and h = 0, so h' = 0.
        let values: Vec<Vec<f32>> = h.to_vec2().unwrap();
        for row in values {
            for v in row {
                assert_eq!(v, 0.0);
            }
        }
    }

    #[test]
    fn seq_output_shape() {
        let dev = Device::Cpu;
        let vb = VarBuilder::zeros(DType::F32, &dev);
        let gru = Gru::load(&vb.pp("rnn"), 4, 3, "l0").unwrap();

        let xs = Tensor::randn(0f32, 1.0, (2, 5, 4), &dev).unwrap();
        let out = gru.seq(&xs).unwrap();
        assert_eq!(out.dims(), &[2, 5, 3]);
    }

    #[test]
    fn bigru_doubles_features_per_layer_stack() {
        let dev = Device::Cpu;
        let vb = VarBuilder::zeros(DType::F32, &dev);
        let bigru = BiGru::load(&vb.pp("rnn1"), 6, 4, 2).unwrap();

        let xs = Tensor::randn(0f32, 1.0, (1, 7, 6), &dev).unwrap();
        let out = bigru.seq(&xs).unwrap();
        assert_eq!(out.dims(), &[1, 7, 8]);
    }

    #[test]
    fn reverse_time_flips_the_sequence() {
        let dev = Device::Cpu;
        let xs = Tensor::new(&[[[1f32], [2.0], [3.0]]], &dev).unwrap();
        let rev = reverse_time(&xs).unwrap();
        let values: Vec<Vec<Vec<f32>>> = rev.to_vec3().unwrap();
        assert_eq!(values, vec![vec![vec![3.0], vec![2.0], vec![1.0]]]);
    }
}
