//! Alias-Suppressed Oscillators
//!
//! Band-limited sawtooth and square oscillators using the second-order
//! differentiated parabolic waveform (DPW) method: the trivial sawtooth is
//! squared, and the backward first difference of that parabola, scaled by
//! `fs / (4·f)`, recovers a sawtooth whose aliasing is strongly attenuated
//! near and above Nyquist, without oversampling. The square wave is the
//! difference of two sawtooth cores offset by half a period.

use crate::signal::MIN_SAMPLE_RATE;

/// Lowest frequency an oscillator will track; requests below this (or
/// non-finite) are floored here so the differencing gain stays finite.
pub const MIN_FREQUENCY: f64 = 0.1;

/// Shared phase/differencing core for the DPW oscillators.
///
/// The parabola history holds exactly one previous sample (first-order
/// differencing); it is initialized from the starting phase so the first
/// generated sample carries no startup discontinuity.
#[derive(Debug, Clone, Copy)]
struct DpwCore {
    phase: f64,
    initial_phase: f64,
    prev_parabola: f64,
    sample_rate: f64,
}

impl DpwCore {
    fn new(initial_phase: f64, sample_rate: f64) -> Self {
        let mut core = Self {
            phase: 0.0,
            initial_phase,
            prev_parabola: 0.0,
            sample_rate: sample_rate.max(MIN_SAMPLE_RATE),
        };
        core.reset();
        core
    }

    fn reset(&mut self) {
        self.phase = self.initial_phase;
        let saw = 2.0 * self.phase - 1.0;
        self.prev_parabola = saw * saw;
    }

    /// Advance one sample and return the band-limited sawtooth value.
    fn step(&mut self, frequency: f64) -> f64 {
        let frequency = frequency.max(MIN_FREQUENCY);
        let delta = frequency / self.sample_rate;

        // Exact wrap into [0, 1) for any increment size
        self.phase += delta;
        self.phase -= self.phase.floor();

        let saw = 2.0 * self.phase - 1.0;
        let parabola = saw * saw;
        let scale = self.sample_rate / (4.0 * frequency);
        let output = (parabola - self.prev_parabola) * scale;
        self.prev_parabola = parabola;
        output
    }
}

/// Band-limited sawtooth oscillator (second-order DPW).
#[derive(Debug, Clone, Copy)]
pub struct DpwSaw {
    core: DpwCore,
}

impl DpwSaw {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            core: DpwCore::new(0.0, sample_rate),
        }
    }

    /// Generate the next sample at the given frequency in Hz.
    ///
    /// Output is nominally ±1. Frequencies at or below zero are floored
    /// at [`MIN_FREQUENCY`].
    pub fn generate(&mut self, frequency: f64) -> f64 {
        self.core.step(frequency)
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.core.sample_rate = sample_rate.max(MIN_SAMPLE_RATE);
    }

    /// Zero the phase and the parabola history.
    pub fn reset(&mut self) {
        self.core.reset();
    }
}

/// Band-limited square oscillator built from two phase-offset DPW
/// sawtooth cores.
#[derive(Debug, Clone, Copy)]
pub struct DpwSquare {
    core_a: DpwCore,
    core_b: DpwCore,
}

impl DpwSquare {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            core_a: DpwCore::new(0.0, sample_rate),
            core_b: DpwCore::new(0.5, sample_rate),
        }
    }

    /// Generate the next sample at the given frequency in Hz. Output is
    /// nominally ±1.
    pub fn generate(&mut self, frequency: f64) -> f64 {
        self.core_a.step(frequency) - self.core_b.step(frequency)
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        let rate = sample_rate.max(MIN_SAMPLE_RATE);
        self.core_a.sample_rate = rate;
        self.core_b.sample_rate = rate;
    }

    pub fn reset(&mut self) {
        self.core_a.reset();
        self.core_b.reset();
    }
}
