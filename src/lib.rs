//! # Voicecore: Polyphonic Voice DSP for Modular Synthesis
//!
//! `voicecore` is a Rust library of real-time audio signal-processing
//! algorithms for synthesizer voice modules: alias-suppressed oscillators,
//! a static lowpass filter bank, a nonlinear resonant/self-oscillating
//! filter, and a multi-stage wavefolding chain. Each is stateful per
//! polyphonic voice (up to 16 channels).
//!
//! ## Architecture
//!
//! The library is organized in two layers:
//!
//! - **Core DSP**: plain structs with inherent per-sample methods
//!   ([`DpwSaw`], [`DpwSquare`], [`FilterBank`], [`ResonantFilter`],
//!   [`WavefolderChain`]). No dynamic dispatch, no allocation, no locking
//!   on any per-sample path.
//! - **Voice modules**: the host-facing polyphonic layer
//!   ([`NoiseBank`], [`PolyFilterBank`], [`PolyVcf`], [`PolyFolder`])
//!   behind the type-erased [`VoiceModule`] trait. Each module owns its
//!   fixed 16-slot voice state, reads the channel count from its inputs
//!   every sample, and propagates it to its outputs.
//!
//! Control values (knobs, CV) arrive as already-scaled engineering values;
//! sample-rate changes re-derive coefficients without clearing state; an
//! explicit reset returns every voice to construction-time defaults.
//!
//! ## Quick Start
//!
//! ```rust
//! use voicecore::prelude::*;
//!
//! // A polyphonic resonant filter at 44.1kHz
//! let mut vcf = PolyVcf::new(44100.0);
//! vcf.params.resonance = 1.2;
//!
//! // Host-supplied port buffers: audio in, cutoff CV in, audio out
//! let inputs = [PolySignal::mono(2.5), PolySignal::mono(1.0)];
//! let mut outputs = [PolySignal::new()];
//!
//! // One sample tick per call
//! vcf.process(&inputs, &mut outputs);
//! let sample = outputs[0].voltage(0);
//! assert!(sample.is_finite());
//! ```

pub mod filter;
pub mod modules;
pub mod osc;
pub mod resonant;
pub mod rng;
pub mod signal;
pub mod voice;
pub mod wavefold;

/// Prelude module for convenient imports
pub mod prelude {
    // Signal conventions and the host seam
    pub use crate::signal::{
        ModulatedParam, ParamRange, PolySignal, PortDef, PortId, PortSpec, SignalKind,
        VoiceModule, MAX_CHANNELS, MIN_SAMPLE_RATE,
    };

    // Core DSP units
    pub use crate::filter::{DcBlocker, FilterBank, OnePole, BANK_CUTOFFS, BANK_TAPS};
    pub use crate::osc::{DpwSaw, DpwSquare, MIN_FREQUENCY};
    pub use crate::resonant::{ResonantFilter, MAX_CUTOFF, MAX_RESONANCE, MIN_CUTOFF};
    pub use crate::wavefold::{
        FoldStage, HardClipper, WavefolderChain, FOLD_LIMIT, FOLD_STAGES, SYMMETRY_LIMIT,
    };

    // Polyphony scaffolding
    pub use crate::voice::{channel_count, VoiceBank};

    // Host-facing voice modules
    pub use crate::modules::{
        FolderParams, NoiseBank, PolyFilterBank, PolyFolder, PolyVcf, VcfParams,
        NOISE_606_FREQUENCIES, NOISE_808_FREQUENCIES,
    };

    // Noise source
    pub use crate::rng::Rng;
}

// Re-export key types at crate root for convenience
pub use prelude::*;
