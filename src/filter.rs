//! Linear One-Pole Filters
//!
//! The static building blocks: an RC-style one-pole lowpass, the six-tap
//! fixed-cutoff filter bank used for spectral decomposition, and the DC
//! blocker that strips bias after nonlinear shaping.
//!
//! Coefficient mapping: the analog-matched relation `a = 1 − e^(−2π·fc/fs)`.
//! The derivation is a pure function of (cutoff, sample rate), so changing
//! the sample rate and changing it back restores the coefficient exactly,
//! and rate changes never touch filter memory.

use crate::signal::MIN_SAMPLE_RATE;
use std::f64::consts::TAU;

/// One-pole lowpass: `y[n] = y[n-1] + a·(x[n] − y[n-1])`.
#[derive(Debug, Clone, Copy)]
pub struct OnePole {
    cutoff: f64,
    sample_rate: f64,
    coefficient: f64,
    output: f64,
}

impl OnePole {
    pub fn new(cutoff: f64, sample_rate: f64) -> Self {
        let mut filter = Self {
            cutoff: cutoff.max(f64::MIN_POSITIVE),
            sample_rate: sample_rate.max(MIN_SAMPLE_RATE),
            coefficient: 0.0,
            output: 0.0,
        };
        filter.update_coefficient();
        filter
    }

    fn update_coefficient(&mut self) {
        self.coefficient = 1.0 - (-TAU * self.cutoff / self.sample_rate).exp();
    }

    /// Change the cutoff frequency; filter memory is untouched.
    pub fn set_cutoff(&mut self, cutoff: f64) {
        self.cutoff = cutoff.max(f64::MIN_POSITIVE);
        self.update_coefficient();
    }

    /// Change the sample rate; filter memory is untouched.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate.max(MIN_SAMPLE_RATE);
        self.update_coefficient();
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let input = if input.is_finite() { input } else { 0.0 };
        self.output += self.coefficient * (input - self.output);
        self.output
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    /// Smoothing coefficient `a`; always in (0, 1].
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    pub fn reset(&mut self) {
        self.output = 0.0;
    }
}

/// Number of taps in the static filter bank.
pub const BANK_TAPS: usize = 6;

/// Fixed tap cutoffs in Hz.
pub const BANK_CUTOFFS: [f64; BANK_TAPS] = [78.0, 198.0, 373.0, 692.0, 1411.0, 3000.0];

/// Six independent one-pole lowpass taps sharing one input, used to
/// spectrally decompose a wideband signal.
#[derive(Debug, Clone, Copy)]
pub struct FilterBank {
    taps: [OnePole; BANK_TAPS],
}

impl FilterBank {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            taps: core::array::from_fn(|i| OnePole::new(BANK_CUTOFFS[i], sample_rate)),
        }
    }

    /// Run one sample through all six taps.
    pub fn process(&mut self, input: f64) -> [f64; BANK_TAPS] {
        core::array::from_fn(|i| self.taps[i].process(input))
    }

    /// Recompute all six coefficients for a new rate without resetting
    /// filter memory, so output stays continuous across the change.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        for tap in &mut self.taps {
            tap.set_sample_rate(sample_rate);
        }
    }

    /// Zero all six tap outputs.
    pub fn reset(&mut self) {
        for tap in &mut self.taps {
            tap.reset();
        }
    }

    pub fn tap(&self, index: usize) -> &OnePole {
        &self.taps[index]
    }
}

/// Default DC blocker corner frequency in Hz.
pub const DC_BLOCK_FREQUENCY: f64 = 10.0;

/// One-pole DC-blocking highpass:
/// `y[n] = x[n] − x[n-1] + R·y[n-1]`, `R = 1 − 2π·fc/fs`.
#[derive(Debug, Clone, Copy)]
pub struct DcBlocker {
    frequency: f64,
    sample_rate: f64,
    pole: f64,
    prev_input: f64,
    prev_output: f64,
}

impl DcBlocker {
    pub fn new(sample_rate: f64) -> Self {
        let mut blocker = Self {
            frequency: DC_BLOCK_FREQUENCY,
            sample_rate: sample_rate.max(MIN_SAMPLE_RATE),
            pole: 0.0,
            prev_input: 0.0,
            prev_output: 0.0,
        };
        blocker.update_pole();
        blocker
    }

    fn update_pole(&mut self) {
        self.pole = (1.0 - TAU * self.frequency / self.sample_rate).max(0.0);
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency.max(f64::MIN_POSITIVE);
        self.update_pole();
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate.max(MIN_SAMPLE_RATE);
        self.update_pole();
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let input = if input.is_finite() { input } else { 0.0 };
        let output = input - self.prev_input + self.pole * self.prev_output;
        self.prev_input = input;
        self.prev_output = output;
        output
    }

    pub fn reset(&mut self) {
        self.prev_input = 0.0;
        self.prev_output = 0.0;
    }
}
