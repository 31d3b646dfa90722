//! Signal Conventions and Port System
//!
//! This module defines the voltage conventions, port metadata, polyphonic
//! signal buffers, and the type-erased module interface through which a host
//! drives the DSP units in this crate.

use libm::Libm;
use serde::{Deserialize, Serialize};

/// Maximum number of polyphonic channels a signal can carry.
pub const MAX_CHANNELS: usize = 16;

/// Lowest sample rate the units will run at; zero, negative, or non-finite
/// host rates are clamped here before coefficients are derived.
pub const MIN_SAMPLE_RATE: f64 = 1000.0;

/// Unique identifier for a port within a module
pub type PortId = u32;

/// Semantic signal classification following hardware modular conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// Audio signal, AC-coupled, typically ±5V peak
    Audio,

    /// Bipolar control voltage, ±5V (LFO, pitch bend, modulation)
    CvBipolar,

    /// Unipolar control voltage, 0–10V (envelope, velocity, expression)
    CvUnipolar,

    /// Pitch CV following 1V/octave standard
    VoltPerOctave,
}

impl SignalKind {
    /// Returns the typical voltage range (min, max) for this signal type
    pub fn voltage_range(&self) -> (f64, f64) {
        match self {
            SignalKind::Audio => (-5.0, 5.0),
            SignalKind::CvBipolar => (-5.0, 5.0),
            SignalKind::CvUnipolar => (0.0, 10.0),
            SignalKind::VoltPerOctave => (-5.0, 5.0),
        }
    }
}

/// Definition of a single port (input or output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDef {
    /// Unique identifier within the module
    pub id: PortId,

    /// Human-readable name (e.g., "cutoff", "signal", "out")
    pub name: String,

    /// Signal type for validation and UI hints
    pub kind: SignalKind,
}

impl PortDef {
    pub fn new(id: PortId, name: impl Into<String>, kind: SignalKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }
}

/// Specification of all ports for a module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortSpec {
    pub inputs: Vec<PortDef>,
    pub outputs: Vec<PortDef>,
}

impl PortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_by_name(&self, name: &str) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output_by_name(&self, name: &str) -> Option<&PortDef> {
        self.outputs.iter().find(|p| p.name == name)
    }
}

/// A polyphonic voltage buffer: up to [`MAX_CHANNELS`] voltages plus the
/// number of currently active channels.
///
/// This is the unit of exchange between the host and a module. A channel
/// count of zero means the port is unpatched; outputs always carry at
/// least one channel.
#[derive(Debug, Clone, Copy)]
pub struct PolySignal {
    voltages: [f64; MAX_CHANNELS],
    channels: usize,
}

impl PolySignal {
    pub fn new() -> Self {
        Self {
            voltages: [0.0; MAX_CHANNELS],
            channels: 0,
        }
    }

    /// A mono signal carrying one voltage on channel 0.
    pub fn mono(voltage: f64) -> Self {
        let mut signal = Self::new();
        signal.channels = 1;
        signal.voltages[0] = voltage;
        signal
    }

    /// Number of active channels (0 when unpatched).
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn set_channels(&mut self, channels: usize) {
        self.channels = channels.min(MAX_CHANNELS);
    }

    /// Voltage of the given channel, 0.0 if out of range.
    pub fn voltage(&self, channel: usize) -> f64 {
        if channel < MAX_CHANNELS {
            self.voltages[channel]
        } else {
            0.0
        }
    }

    /// Voltage of the given channel with mono normalling: a mono signal
    /// supplies its single voltage to every requested channel.
    pub fn poly_voltage(&self, channel: usize) -> f64 {
        if self.channels <= 1 {
            self.voltages[0]
        } else {
            self.voltage(channel)
        }
    }

    pub fn set_voltage(&mut self, channel: usize, voltage: f64) {
        if channel < MAX_CHANNELS {
            self.voltages[channel] = voltage;
        }
    }
}

impl Default for PolySignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Control-range mapping from a normalized value to engineering units
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ParamRange {
    /// Linear mapping from normalized (0–1) to (min, max)
    Linear { min: f64, max: f64 },

    /// Exponential mapping, useful for frequency/time controls
    Exponential { min: f64, max: f64 },
}

impl ParamRange {
    pub fn apply(&self, normalized: f64) -> f64 {
        match self {
            ParamRange::Linear { min, max } => min + normalized.clamp(0.0, 1.0) * (max - min),
            ParamRange::Exponential { min, max } => {
                let clamped = normalized.clamp(0.0, 1.0);
                if *min <= 0.0 {
                    clamped * max
                } else {
                    min * Libm::<f64>::pow(max / min, clamped)
                }
            }
        }
    }
}

/// A parameter combining a panel knob with attenuverted CV modulation.
///
/// The effective value is `base + attenuverter · cv_scale · cv`, clamped to
/// the documented knob range. CV arrives in volts; `cv_scale` converts it
/// into knob units (e.g. 0.2 maps ±5V onto a ±1 normalized span).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModulatedParam {
    /// Base value from the panel knob, in knob units
    pub base: f64,

    /// Attenuverter setting (-1.0 to 1.0)
    pub attenuverter: f64,

    /// Volts-to-knob-units conversion applied to incoming CV
    pub cv_scale: f64,

    /// Lower clamp bound, in knob units
    pub min: f64,

    /// Upper clamp bound, in knob units
    pub max: f64,
}

impl ModulatedParam {
    pub fn new(base: f64, cv_scale: f64, min: f64, max: f64) -> Self {
        Self {
            base,
            attenuverter: 0.0,
            cv_scale,
            min,
            max,
        }
    }

    /// Compute the effective parameter value for the given CV voltage.
    pub fn value(&self, cv: f64) -> f64 {
        let cv = if cv.is_finite() { cv } else { 0.0 };
        (self.base + self.attenuverter * self.cv_scale * cv).clamp(self.min, self.max)
    }
}

/// Type-erased module interface for host integration.
///
/// Dynamic dispatch stops here: implementations forward to plain structs
/// with inherent per-sample methods, so the audio recursions themselves
/// never go through a vtable.
pub trait VoiceModule: Send + Sync {
    /// Returns the module's port specification
    fn port_spec(&self) -> &PortSpec;

    /// Process one sample tick for all active channels.
    ///
    /// `inputs` and `outputs` are indexed by the module's port constants;
    /// the module reads the channel count from its inputs and propagates it
    /// to every output it writes.
    fn process(&mut self, inputs: &[PolySignal], outputs: &mut [PolySignal]);

    /// Reset all per-voice state to construction-time defaults
    fn reset(&mut self);

    /// Set sample rate, re-deriving coefficients without clearing state
    fn set_sample_rate(&mut self, sample_rate: f64);

    /// Get module type identifier for host registration
    fn type_id(&self) -> &'static str {
        "unknown"
    }
}
