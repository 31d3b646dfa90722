//! Nonlinear Resonant Lowpass Filter
//!
//! A voltage-controlled two-pole Sallen-Key lowpass in the style of the
//! Korg MS-20: two trapezoidal (topology-preserving transform) one-pole
//! lowpass integrators, with a one-pole highpass in the resonance feedback
//! path. The linear zero-delay feedback loop is solved in closed form every
//! sample; a `tanh` saturator at the second integrator's input bounds the
//! loop gain, so driving the resonance to the top of its range produces a
//! sustained, bounded self-oscillation instead of runaway divergence.
//!
//! A small amount of noise is added at the input to seed self-oscillation
//! when the input is silent. The noise source is the crate's deterministic
//! RNG: reruns after `reset()` are bit-exact.

use crate::rng::Rng;
use crate::signal::MIN_SAMPLE_RATE;
use std::f64::consts::PI;

/// Cutoff control range in Hz; the normalized control maps exponentially
/// across it.
pub const MIN_CUTOFF: f64 = 50.0;
pub const MAX_CUTOFF: f64 = 15_000.0;

/// Resonance range. Self-oscillation sustains near the top of the range.
pub const MAX_RESONANCE: f64 = 2.0;

/// Peak amplitude of the self-oscillation seed noise, in volts.
pub const NOISE_LEVEL: f64 = 1.0e-2;

/// Input safety clamp in volts.
const INPUT_CLAMP: f64 = 6.0;

/// Volts-to-internal scaling; the recursion runs near unit level.
const INPUT_SCALE: f64 = 0.2;
const OUTPUT_SCALE: f64 = 5.0;

/// Last-resort output bound; the recursion itself cannot reach this.
const OUTPUT_CLAMP: f64 = 12.0;

const DEFAULT_NOISE_SEED: u64 = 0x20c8_a35c_f6d9_b1e4;

/// Resonant nonlinear lowpass filter, one voice.
///
/// Coefficients are derived only in [`set_params`](Self::set_params) and
/// [`set_sample_rate`](Self::set_sample_rate), never per sample; callers
/// running control inputs at a decimated rate get the audio recursion at
/// full rate with no per-sample transcendentals beyond the loop `tanh`.
#[derive(Debug, Clone, Copy)]
pub struct ResonantFilter {
    cutoff: f64,
    resonance: f64,
    sample_rate: f64,

    // Derived per set_params/set_sample_rate
    stage_gain: f64,   // G = g / (1 + g)
    state_gain: f64,   // H = 1 / (1 + g)
    loop_gain: f64,    // 1 / (1 − k·G·H)

    // Integrator states: two lowpass stages plus the feedback highpass
    s1: f64,
    s2: f64,
    s3: f64,
    output: f64,

    rng: Rng,
    seed: u64,
}

impl ResonantFilter {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_seed(sample_rate, DEFAULT_NOISE_SEED)
    }

    /// Create a filter whose seed noise stream is derived from `seed`.
    /// Voices in a polyphonic bank use distinct seeds so their noise is
    /// uncorrelated.
    pub fn with_seed(sample_rate: f64, seed: u64) -> Self {
        let mut filter = Self {
            cutoff: 1000.0,
            resonance: 0.0,
            sample_rate: sample_rate.max(MIN_SAMPLE_RATE),
            stage_gain: 0.0,
            state_gain: 0.0,
            loop_gain: 0.0,
            s1: 0.0,
            s2: 0.0,
            s3: 0.0,
            output: 0.0,
            rng: Rng::from_seed(seed),
            seed,
        };
        filter.update_coefficients();
        filter
    }

    /// Update cutoff (Hz) and resonance. Values outside the documented
    /// ranges are clamped, never rejected. This is the only place the
    /// trapezoidal coefficients are re-derived.
    pub fn set_params(&mut self, cutoff: f64, resonance: f64) {
        self.cutoff = if cutoff.is_finite() {
            cutoff.clamp(MIN_CUTOFF, MAX_CUTOFF)
        } else {
            MIN_CUTOFF
        };
        self.resonance = if resonance.is_finite() {
            resonance.clamp(0.0, MAX_RESONANCE)
        } else {
            0.0
        };
        self.update_coefficients();
    }

    /// Re-derive coefficients for a new rate; filter memory is untouched.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate.max(MIN_SAMPLE_RATE);
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        // Keep the prewarped frequency below Nyquist at low host rates
        let cutoff = self.cutoff.min(0.49 * self.sample_rate);
        let g = (PI * cutoff / self.sample_rate).tan();
        self.stage_gain = g / (1.0 + g);
        self.state_gain = 1.0 / (1.0 + g);

        // k·G·H ≤ k/4 ≤ 1/2 over the whole parameter range, so the
        // zero-delay loop denominator never vanishes.
        self.loop_gain = 1.0 / (1.0 - self.resonance * self.stage_gain * self.state_gain);
    }

    /// Advance one sample. Input is in volts; the return value (also
    /// readable via [`output`](Self::output)) is in volts.
    pub fn process(&mut self, input: f64) -> f64 {
        let g = self.stage_gain;
        let h = self.state_gain;
        let k = self.resonance;

        let x = if input.is_finite() { input.clamp(-INPUT_CLAMP, INPUT_CLAMP) } else { 0.0 };
        let x = x + NOISE_LEVEL * self.rng.next_f64_bipolar();
        let x = INPUT_SCALE * x;

        // First lowpass stage
        let v1 = g * (x - self.s1);
        let y1 = v1 + self.s1;
        self.s1 = y1 + v1;

        // Closed-form solve of the linear feedback loop:
        //   y = LP2(u),  u = y1 + k·HP(y)
        let s2_term = h * self.s2;
        let s3_term = h * self.s3;
        let y_linear = (g * y1 + s2_term - k * g * s3_term) * self.loop_gain;

        // Saturate the second stage's input; this is what bounds the loop
        // gain and turns self-oscillation into a stable limit cycle.
        let u = (y1 + k * (h * y_linear - s3_term)).tanh();

        // Second lowpass stage
        let v2 = g * (u - self.s2);
        let y2 = v2 + self.s2;
        self.s2 = y2 + v2;

        // Feedback highpass state advances from the stage-2 output
        let v3 = g * (y2 - self.s3);
        let lp3 = v3 + self.s3;
        self.s3 = lp3 + v3;

        self.output = (OUTPUT_SCALE * y2).clamp(-OUTPUT_CLAMP, OUTPUT_CLAMP);
        self.output
    }

    /// The most recently produced sample, in volts.
    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    /// Zero the integrators and rewind the noise stream to its seed, so a
    /// rerun from silence reproduces the first run bit-exactly.
    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
        self.s3 = 0.0;
        self.output = 0.0;
        self.rng = Rng::from_seed(self.seed);
    }
}
