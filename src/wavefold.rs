//! Wavefolding Chain
//!
//! A cascade of sharp folding stages followed by a hard clipper and a DC
//! blocker. Each stage reflects the signal back into range when it exceeds
//! a threshold (a triangle-core fold with a steep transition, not a smooth
//! sine fold), so harmonic density grows quickly with drive. The symmetry
//! offset biases the signal before folding to skew the fold pattern; the DC
//! blocker then strips that bias from the output.

use crate::filter::DcBlocker;

/// Number of cascaded folding stages in the chain.
pub const FOLD_STAGES: usize = 4;

/// Fold-amount clamp bound (a gain, applied before folding).
pub const FOLD_LIMIT: f64 = 10.0;

/// Symmetry-offset clamp bound, in volts.
pub const SYMMETRY_LIMIT: f64 = 5.0;

const INPUT_SCALE: f64 = 0.2;
const OUTPUT_SCALE: f64 = 5.0;

/// A single sharp folding stage: one reflection about ±threshold.
///
/// The transfer is memoryless and odd-symmetric; cascaded stages fold
/// signal that a single reflection leaves out of range.
#[derive(Debug, Clone, Copy)]
pub struct FoldStage {
    threshold: f64,
}

impl FoldStage {
    pub fn new() -> Self {
        Self { threshold: 1.0 }
    }

    pub fn process(&self, input: f64) -> f64 {
        let t = self.threshold;
        if input > t {
            2.0 * t - input
        } else if input < -t {
            -2.0 * t - input
        } else {
            input
        }
    }

    pub fn reset(&mut self) {}
}

impl Default for FoldStage {
    fn default() -> Self {
        Self::new()
    }
}

/// Hard clipper bounding the signal to ±1 as a safety saturator after the
/// folding stages.
#[derive(Debug, Clone, Copy)]
pub struct HardClipper;

impl HardClipper {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&self, input: f64) -> f64 {
        input.clamp(-1.0, 1.0)
    }

    pub fn reset(&mut self) {}
}

impl Default for HardClipper {
    fn default() -> Self {
        Self::new()
    }
}

/// The complete shaping chain for one voice:
/// scale → gain/bias → fold ×4 → clip → DC-block → rescale.
#[derive(Debug, Clone, Copy)]
pub struct WavefolderChain {
    stages: [FoldStage; FOLD_STAGES],
    clipper: HardClipper,
    dc_blocker: DcBlocker,
}

impl WavefolderChain {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            stages: [FoldStage::new(); FOLD_STAGES],
            clipper: HardClipper::new(),
            dc_blocker: DcBlocker::new(sample_rate),
        }
    }

    /// Run one sample through the chain.
    ///
    /// `input` is in volts (±5 nominal); `fold_amount` is a gain clamped to
    /// ±[`FOLD_LIMIT`]; `symmetry` is a bias clamped to ±[`SYMMETRY_LIMIT`]
    /// volts. Out-of-range control values are clamped, never rejected.
    pub fn process(&mut self, input: f64, fold_amount: f64, symmetry: f64) -> f64 {
        let input = if input.is_finite() { input } else { 0.0 };
        let fold = if fold_amount.is_finite() {
            fold_amount.clamp(-FOLD_LIMIT, FOLD_LIMIT)
        } else {
            0.0
        };
        let symmetry = if symmetry.is_finite() {
            symmetry.clamp(-SYMMETRY_LIMIT, SYMMETRY_LIMIT)
        } else {
            0.0
        };

        let mut shaped = INPUT_SCALE * input * fold + symmetry;
        for stage in &self.stages {
            shaped = stage.process(shaped);
        }
        shaped = self.clipper.process(shaped);

        OUTPUT_SCALE * self.dc_blocker.process(shaped)
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.dc_blocker.set_sample_rate(sample_rate);
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.clipper.reset();
        self.dc_blocker.reset();
    }
}
