//! Host-Facing Voice Modules
//!
//! The polyphonic module layer a host drives directly: each module owns its
//! per-voice state, reads its channel count from its polyphonic inputs every
//! sample, and propagates it to every output it writes. Control values
//! arrive as already-scaled engineering units (volts, normalized 0–1, Hz)
//! through the parameter structs; no module reads UI state.

use crate::filter::{FilterBank, BANK_CUTOFFS, BANK_TAPS};
use crate::osc::DpwSquare;
use crate::resonant::{ResonantFilter, MAX_CUTOFF, MIN_CUTOFF};
use crate::signal::{
    ModulatedParam, ParamRange, PolySignal, PortDef, PortSpec, SignalKind, VoiceModule,
};
use crate::voice::{channel_count, VoiceBank};
use crate::wavefold::{WavefolderChain, FOLD_LIMIT, SYMMETRY_LIMIT};
use serde::{Deserialize, Serialize};

/// Fundamental frequencies (Hz) of the six square oscillators behind the
/// TR-808-style metallic noise output.
pub const NOISE_808_FREQUENCIES: [f64; 6] = [205.3, 369.4, 304.4, 522.3, 800.0, 540.4];

/// Fundamental frequencies (Hz) of the six square oscillators behind the
/// TR-606-style metallic noise output.
pub const NOISE_606_FREQUENCIES: [f64; 6] = [244.4, 304.6, 364.5, 412.1, 432.4, 604.1];

/// Metallic noise generator: two banks of six band-limited square waves at
/// fixed, inharmonically related fundamentals, one bank per classic drum
/// machine voicing. Feed it through a highpass and a snappy VCA for cymbal
/// and hi-hat work.
pub struct NoiseBank {
    bank_808: [DpwSquare; 6],
    bank_606: [DpwSquare; 6],
    spec: PortSpec,
}

impl NoiseBank {
    pub const OUTPUT_808: usize = 0;
    pub const OUTPUT_606: usize = 1;
    pub const OUTPUT_COUNT: usize = 2;

    pub fn new(sample_rate: f64) -> Self {
        Self {
            bank_808: core::array::from_fn(|_| DpwSquare::new(sample_rate)),
            bank_606: core::array::from_fn(|_| DpwSquare::new(sample_rate)),
            spec: PortSpec {
                inputs: vec![],
                outputs: vec![
                    PortDef::new(0, "808", SignalKind::Audio),
                    PortDef::new(1, "606", SignalKind::Audio),
                ],
            },
        }
    }
}

impl VoiceModule for NoiseBank {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn process(&mut self, _inputs: &[PolySignal], outputs: &mut [PolySignal]) {
        if outputs.len() < Self::OUTPUT_COUNT {
            return;
        }

        let mut sum_808 = 0.0;
        for (osc, &freq) in self.bank_808.iter_mut().zip(&NOISE_808_FREQUENCIES) {
            sum_808 += osc.generate(freq);
        }
        outputs[Self::OUTPUT_808].set_channels(1);
        outputs[Self::OUTPUT_808].set_voltage(0, 5.0 * sum_808 / 6.0);

        let mut sum_606 = 0.0;
        for (osc, &freq) in self.bank_606.iter_mut().zip(&NOISE_606_FREQUENCIES) {
            sum_606 += osc.generate(freq);
        }
        outputs[Self::OUTPUT_606].set_channels(1);
        outputs[Self::OUTPUT_606].set_voltage(0, 5.0 * sum_606 / 6.0);
    }

    fn reset(&mut self) {
        for osc in self.bank_808.iter_mut().chain(self.bank_606.iter_mut()) {
            osc.reset();
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        for osc in self.bank_808.iter_mut().chain(self.bank_606.iter_mut()) {
            osc.set_sample_rate(sample_rate);
        }
    }

    fn type_id(&self) -> &'static str {
        "noise_bank"
    }
}

/// Polyphonic six-tap lowpass filter bank: one audio input fanned into six
/// fixed-cutoff one-pole taps per voice.
pub struct PolyFilterBank {
    voices: VoiceBank<FilterBank>,
    spec: PortSpec,
}

impl PolyFilterBank {
    pub const SIGNAL_INPUT: usize = 0;
    pub const INPUT_COUNT: usize = 1;
    pub const OUTPUT_COUNT: usize = BANK_TAPS;

    pub fn new(sample_rate: f64) -> Self {
        Self {
            voices: VoiceBank::from_fn(|_| FilterBank::new(sample_rate)),
            spec: PortSpec {
                inputs: vec![PortDef::new(0, "signal", SignalKind::Audio)],
                outputs: BANK_CUTOFFS
                    .iter()
                    .enumerate()
                    .map(|(i, &fc)| {
                        PortDef::new(i as u32, format!("lp{}", fc as u32), SignalKind::Audio)
                    })
                    .collect(),
            },
        }
    }
}

impl VoiceModule for PolyFilterBank {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn process(&mut self, inputs: &[PolySignal], outputs: &mut [PolySignal]) {
        if outputs.len() < Self::OUTPUT_COUNT {
            return;
        }
        let signal = inputs.get(Self::SIGNAL_INPUT).copied().unwrap_or_default();
        let channels = channel_count(&[signal]);

        for output in outputs.iter_mut().take(Self::OUTPUT_COUNT) {
            output.set_channels(channels);
        }

        for ch in 0..channels {
            let taps = self.voices[ch].process(signal.voltage(ch));
            for (output, &tap) in outputs.iter_mut().zip(taps.iter()) {
                output.set_voltage(ch, tap);
            }
        }
    }

    fn reset(&mut self) {
        for bank in self.voices.iter_mut() {
            bank.reset();
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        for bank in self.voices.iter_mut() {
            bank.set_sample_rate(sample_rate);
        }
    }

    fn type_id(&self) -> &'static str {
        "filter_bank"
    }
}

/// Control parameters for [`PolyVcf`], in engineering units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VcfParams {
    /// Cutoff control: normalized 0–1 knob plus attenuverted CV
    /// (±5V CV spans ±1 via the 0.2 scale).
    pub frequency: ModulatedParam,

    /// Resonance, 0 to 2; self-oscillates near the top.
    pub resonance: f64,
}

impl Default for VcfParams {
    fn default() -> Self {
        Self {
            frequency: ModulatedParam::new(0.5, 0.2, 0.0, 1.0),
            resonance: 0.0,
        }
    }
}

/// Base seed for the per-voice noise streams; each channel offsets it so
/// voices self-oscillate with uncorrelated phases.
const VCF_NOISE_SEED: u64 = 0x56cf_90d1_44aa_2e7b;

/// Polyphonic voltage-controlled resonant lowpass.
///
/// The cutoff control maps exponentially across 50 Hz–15 kHz. Control
/// values are re-derived every [`Self::CONTROL_RATE_DIVIDER`] samples per
/// channel while the audio recursion runs every sample; the zippering this
/// can produce at the control boundary is an accepted cost/quality
/// tradeoff.
pub struct PolyVcf {
    pub params: VcfParams,
    voices: VoiceBank<ResonantFilter>,
    control_tick: u32,
    spec: PortSpec,
}

impl PolyVcf {
    pub const SIGNAL_INPUT: usize = 0;
    pub const FREQ_CV_INPUT: usize = 1;
    pub const INPUT_COUNT: usize = 2;
    pub const SIGNAL_OUTPUT: usize = 0;
    pub const OUTPUT_COUNT: usize = 1;

    /// Samples between control-parameter recomputations.
    pub const CONTROL_RATE_DIVIDER: u32 = 16;

    const CUTOFF_RANGE: ParamRange = ParamRange::Exponential {
        min: MIN_CUTOFF,
        max: MAX_CUTOFF,
    };

    pub fn new(sample_rate: f64) -> Self {
        Self {
            params: VcfParams::default(),
            voices: VoiceBank::from_fn(|ch| {
                ResonantFilter::with_seed(sample_rate, VCF_NOISE_SEED.wrapping_add(ch as u64))
            }),
            control_tick: 0,
            spec: PortSpec {
                inputs: vec![
                    PortDef::new(0, "signal", SignalKind::Audio),
                    PortDef::new(1, "freq_cv", SignalKind::CvBipolar),
                ],
                outputs: vec![PortDef::new(0, "out", SignalKind::Audio)],
            },
        }
    }
}

impl VoiceModule for PolyVcf {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn process(&mut self, inputs: &[PolySignal], outputs: &mut [PolySignal]) {
        if outputs.len() < Self::OUTPUT_COUNT {
            return;
        }
        let signal = inputs.get(Self::SIGNAL_INPUT).copied().unwrap_or_default();
        let freq_cv = inputs.get(Self::FREQ_CV_INPUT).copied().unwrap_or_default();
        let channels = channel_count(&[signal, freq_cv]);

        // Decimated control path: cutoff/resonance are only re-derived at
        // the divider boundary, the audio recursion runs below every sample.
        if self.control_tick == 0 {
            for ch in 0..channels {
                let normalized = self.params.frequency.value(freq_cv.poly_voltage(ch));
                let cutoff = Self::CUTOFF_RANGE.apply(normalized);
                self.voices[ch].set_params(cutoff, self.params.resonance);
            }
        }
        self.control_tick = (self.control_tick + 1) % Self::CONTROL_RATE_DIVIDER;

        outputs[Self::SIGNAL_OUTPUT].set_channels(channels);
        for ch in 0..channels {
            let sample = self.voices[ch].process(signal.voltage(ch));
            outputs[Self::SIGNAL_OUTPUT].set_voltage(ch, sample);
        }
    }

    fn reset(&mut self) {
        for filter in self.voices.iter_mut() {
            filter.reset();
        }
        self.control_tick = 0;
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        for filter in self.voices.iter_mut() {
            filter.set_sample_rate(sample_rate);
        }
    }

    fn type_id(&self) -> &'static str {
        "resonant_vcf"
    }
}

/// Control parameters for [`PolyFolder`], in engineering units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FolderParams {
    /// Fold amount: gain knob (0.9–10×) plus attenuverted CV; the CV's
    /// absolute value is used, so bipolar modulators only ever add folds.
    pub fold: ModulatedParam,

    /// Symmetry offset in volts (±5), CV applied at half strength.
    pub symmetry: ModulatedParam,
}

impl Default for FolderParams {
    fn default() -> Self {
        Self {
            fold: ModulatedParam::new(0.9, 1.0, -FOLD_LIMIT, FOLD_LIMIT),
            symmetry: ModulatedParam::new(0.0, 0.5, -SYMMETRY_LIMIT, SYMMETRY_LIMIT),
        }
    }
}

/// Polyphonic wavefolder: per-voice fold/clip/DC-block chain with CV
/// control over fold amount and symmetry.
pub struct PolyFolder {
    pub params: FolderParams,
    voices: VoiceBank<WavefolderChain>,
    spec: PortSpec,
}

impl PolyFolder {
    pub const SIGNAL_INPUT: usize = 0;
    pub const FOLD_CV_INPUT: usize = 1;
    pub const SYMMETRY_CV_INPUT: usize = 2;
    pub const INPUT_COUNT: usize = 3;
    pub const FOLDED_OUTPUT: usize = 0;
    pub const OUTPUT_COUNT: usize = 1;

    pub fn new(sample_rate: f64) -> Self {
        Self {
            params: FolderParams::default(),
            voices: VoiceBank::from_fn(|_| WavefolderChain::new(sample_rate)),
            spec: PortSpec {
                inputs: vec![
                    PortDef::new(0, "signal", SignalKind::Audio),
                    PortDef::new(1, "fold_cv", SignalKind::CvBipolar),
                    PortDef::new(2, "symmetry_cv", SignalKind::CvBipolar),
                ],
                outputs: vec![PortDef::new(0, "folded", SignalKind::Audio)],
            },
        }
    }
}

impl VoiceModule for PolyFolder {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn process(&mut self, inputs: &[PolySignal], outputs: &mut [PolySignal]) {
        if outputs.len() < Self::OUTPUT_COUNT {
            return;
        }
        let signal = inputs.get(Self::SIGNAL_INPUT).copied().unwrap_or_default();
        let fold_cv = inputs.get(Self::FOLD_CV_INPUT).copied().unwrap_or_default();
        let symmetry_cv = inputs
            .get(Self::SYMMETRY_CV_INPUT)
            .copied()
            .unwrap_or_default();
        let channels = channel_count(&[signal, fold_cv, symmetry_cv]);

        outputs[Self::FOLDED_OUTPUT].set_channels(channels);
        for ch in 0..channels {
            let fold = self.params.fold.value(fold_cv.poly_voltage(ch).abs());
            let symmetry = self.params.symmetry.value(symmetry_cv.poly_voltage(ch));
            let sample = self.voices[ch].process(signal.voltage(ch), fold, symmetry);
            outputs[Self::FOLDED_OUTPUT].set_voltage(ch, sample);
        }
    }

    fn reset(&mut self) {
        for chain in self.voices.iter_mut() {
            chain.reset();
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        for chain in self.voices.iter_mut() {
            chain.set_sample_rate(sample_rate);
        }
    }

    fn type_id(&self) -> &'static str {
        "wavefolder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::TAU;

    fn poly_sine(n: usize, channels: usize) -> PolySignal {
        let mut signal = PolySignal::new();
        signal.set_channels(channels);
        for ch in 0..channels {
            // A different frequency per channel
            let freq = 110.0 * (ch + 1) as f64;
            signal.set_voltage(ch, 5.0 * (TAU * freq * n as f64 / 44100.0).sin());
        }
        signal
    }

    #[test]
    fn test_noise_bank_produces_bounded_signal() {
        let mut noise = NoiseBank::new(44100.0);
        let mut outputs = [PolySignal::new(); NoiseBank::OUTPUT_COUNT];

        let mut sum_sq = [0.0; 2];
        for _ in 0..44100 {
            noise.process(&[], &mut outputs);
            for (i, out) in outputs.iter().enumerate() {
                let v = out.voltage(0);
                assert!(v.is_finite());
                assert!(v.abs() < 8.0, "metallic noise out of range: {}", v);
                sum_sq[i] += v * v;
            }
        }

        // Both outputs carry signal, mono
        for (i, out) in outputs.iter().enumerate() {
            assert_eq!(out.channels(), 1);
            assert!((sum_sq[i] / 44100.0).sqrt() > 0.5);
        }
    }

    #[test]
    fn test_noise_bank_reset_reproduces() {
        let mut noise = NoiseBank::new(44100.0);
        let mut outputs = [PolySignal::new(); NoiseBank::OUTPUT_COUNT];

        let mut first = Vec::new();
        for _ in 0..1000 {
            noise.process(&[], &mut outputs);
            first.push((outputs[0].voltage(0), outputs[1].voltage(0)));
        }

        noise.reset();
        let mut second = Vec::new();
        for _ in 0..1000 {
            noise.process(&[], &mut outputs);
            second.push((outputs[0].voltage(0), outputs[1].voltage(0)));
        }

        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_bank_poly_dc_convergence() {
        let mut module = PolyFilterBank::new(44100.0);
        let mut outputs = [PolySignal::new(); PolyFilterBank::OUTPUT_COUNT];

        let mut input = PolySignal::new();
        input.set_channels(4);
        for ch in 0..4 {
            input.set_voltage(ch, (ch as f64) - 1.5);
        }

        for _ in 0..44100 {
            module.process(&[input], &mut outputs);
        }

        for output in &outputs {
            assert_eq!(output.channels(), 4);
            for ch in 0..4 {
                assert_abs_diff_eq!(output.voltage(ch), (ch as f64) - 1.5, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_vcf_channel_isolation() {
        // Channel 0 processed as part of a full 16-channel block matches
        // channel 0 processed on its own.
        let mut full = PolyVcf::new(44100.0);
        let mut solo = PolyVcf::new(44100.0);
        full.params.resonance = 1.2;
        solo.params.resonance = 1.2;

        let mut full_out = [PolySignal::new(); 1];
        let mut solo_out = [PolySignal::new(); 1];

        for n in 0..2000 {
            let poly_in = poly_sine(n, 16);
            let mono_in = PolySignal::mono(poly_in.voltage(0));

            full.process(&[poly_in, PolySignal::new()], &mut full_out);
            solo.process(&[mono_in, PolySignal::new()], &mut solo_out);

            assert_eq!(full_out[0].voltage(0), solo_out[0].voltage(0));
        }
        assert_eq!(full_out[0].channels(), 16);
        assert_eq!(solo_out[0].channels(), 1);
    }

    #[test]
    fn test_vcf_control_divider_decimates_updates() {
        let mut vcf = PolyVcf::new(44100.0);
        let mut outputs = [PolySignal::new(); 1];
        let inputs = [PolySignal::mono(0.0), PolySignal::new()];

        // First tick applies the initial parameters
        vcf.process(&inputs, &mut outputs);
        let initial_cutoff = vcf.voices[0].cutoff();

        // A knob change mid-interval is not picked up...
        vcf.params.frequency.base = 1.0;
        for _ in 0..(PolyVcf::CONTROL_RATE_DIVIDER - 1) {
            vcf.process(&inputs, &mut outputs);
            assert_eq!(vcf.voices[0].cutoff(), initial_cutoff);
        }

        // ...until the divider boundary
        vcf.process(&inputs, &mut outputs);
        assert_eq!(vcf.voices[0].cutoff(), MAX_CUTOFF);
    }

    #[test]
    fn test_vcf_cutoff_cv_mapping() {
        let mut vcf = PolyVcf::new(44100.0);
        vcf.params.frequency.base = 0.0;
        vcf.params.frequency.attenuverter = 1.0;

        let mut outputs = [PolySignal::new(); 1];

        // +5V of CV through the 0.2 scale spans the full normalized range
        vcf.process(&[PolySignal::mono(0.0), PolySignal::mono(5.0)], &mut outputs);
        assert_abs_diff_eq!(vcf.voices[0].cutoff(), MAX_CUTOFF, epsilon = 1e-6);

        let mut vcf = PolyVcf::new(44100.0);
        vcf.params.frequency.base = 0.0;
        vcf.params.frequency.attenuverter = 1.0;
        vcf.process(&[PolySignal::mono(0.0), PolySignal::mono(0.0)], &mut outputs);
        assert_abs_diff_eq!(vcf.voices[0].cutoff(), MIN_CUTOFF, epsilon = 1e-9);
    }

    #[test]
    fn test_vcf_reset_round_trip() {
        let mut vcf = PolyVcf::new(44100.0);
        vcf.params.resonance = 1.8;
        let mut outputs = [PolySignal::new(); 1];

        let mut first = Vec::new();
        for n in 0..2000 {
            vcf.process(&[poly_sine(n, 4), PolySignal::new()], &mut outputs);
            first.push(outputs[0].voltage(2));
        }

        vcf.reset();
        let mut second = Vec::new();
        for n in 0..2000 {
            vcf.process(&[poly_sine(n, 4), PolySignal::new()], &mut outputs);
            second.push(outputs[0].voltage(2));
        }

        assert_eq!(first, second);
    }

    #[test]
    fn test_folder_matches_bare_chain() {
        let mut module = PolyFolder::new(44100.0);
        module.params.fold.base = 6.0;
        module.params.symmetry.base = 1.0;

        let mut chain = WavefolderChain::new(44100.0);
        let mut outputs = [PolySignal::new(); 1];

        for n in 0..2000 {
            let x = 5.0 * (TAU * 441.0 * n as f64 / 44100.0).sin();
            module.process(
                &[PolySignal::mono(x), PolySignal::new(), PolySignal::new()],
                &mut outputs,
            );
            let expected = chain.process(x, 6.0, 1.0);
            assert_eq!(outputs[0].voltage(0), expected);
        }
    }

    #[test]
    fn test_folder_fold_cv_is_rectified() {
        // Bipolar fold CV adds folds regardless of its sign
        let mut positive = PolyFolder::new(44100.0);
        let mut negative = PolyFolder::new(44100.0);
        positive.params.fold.attenuverter = 1.0;
        negative.params.fold.attenuverter = 1.0;

        let mut out_pos = [PolySignal::new(); 1];
        let mut out_neg = [PolySignal::new(); 1];

        for n in 0..1000 {
            let x = PolySignal::mono(5.0 * (TAU * 441.0 * n as f64 / 44100.0).sin());
            positive.process(&[x, PolySignal::mono(3.0), PolySignal::new()], &mut out_pos);
            negative.process(&[x, PolySignal::mono(-3.0), PolySignal::new()], &mut out_neg);
            assert_eq!(out_pos[0].voltage(0), out_neg[0].voltage(0));
        }
    }

    #[test]
    fn test_folder_channel_count_spans_all_inputs() {
        // Channel count follows the widest input, CV inputs included
        let mut module = PolyFolder::new(44100.0);
        let mut outputs = [PolySignal::new(); 1];

        let mono_signal = PolySignal::mono(1.0);
        let mut wide_cv = PolySignal::new();
        wide_cv.set_channels(7);

        module.process(&[mono_signal, wide_cv, PolySignal::new()], &mut outputs);
        assert_eq!(outputs[0].channels(), 7);
    }

    #[test]
    fn test_sample_rate_change_keeps_filter_memory() {
        let mut module = PolyFilterBank::new(44100.0);
        let mut outputs = [PolySignal::new(); PolyFilterBank::OUTPUT_COUNT];
        let input = PolySignal::mono(2.0);

        for _ in 0..500 {
            module.process(&[input], &mut outputs);
        }
        let before: Vec<f64> = (0..BANK_TAPS).map(|i| outputs[i].voltage(0)).collect();

        module.set_sample_rate(96000.0);
        // One more sample at the new rate moves smoothly from the old state
        module.process(&[input], &mut outputs);
        for (i, &prior) in before.iter().enumerate() {
            let next = outputs[i].voltage(0);
            assert!((next - prior).abs() < 0.5, "tap {} jumped: {} -> {}", i, prior, next);
        }
    }

    #[test]
    fn test_modules_as_trait_objects() {
        // The host seam: modules behind the type-erased interface
        let mut rack: Vec<Box<dyn VoiceModule>> = vec![
            Box::new(NoiseBank::new(48000.0)),
            Box::new(PolyFilterBank::new(48000.0)),
            Box::new(PolyVcf::new(48000.0)),
            Box::new(PolyFolder::new(48000.0)),
        ];

        let inputs = [PolySignal::mono(1.0); 3];
        let mut outputs = [PolySignal::new(); BANK_TAPS];

        for module in rack.iter_mut() {
            let input_count = module.port_spec().inputs.len();
            module.process(&inputs[..input_count], &mut outputs);
            module.set_sample_rate(44100.0);
            module.reset();
            assert!(!module.type_id().is_empty());
        }
    }

    #[test]
    fn test_short_output_slice_is_ignored() {
        // A mis-sized host buffer must not panic the audio thread
        let mut module = PolyFilterBank::new(44100.0);
        let mut outputs: [PolySignal; 2] = [PolySignal::new(); 2];
        module.process(&[PolySignal::mono(1.0)], &mut outputs);
    }
}
