//! Audio output utilities.
//!
//! Mono WAV I/O at the configured sample rate, plus the mu-law companding
//! used by the vocoder output stage.

pub mod mulaw;
mod wav;

pub use wav::{read_wav, write_wav};
