//! Deterministic biosignal waveforms used by the simulator

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Waveform shapes, amplitudes given as a fraction of ADC full scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalPattern {
    /// No signal; only noise and interference remain
    Flat,
    /// Pure tone
    Sine { frequency: f32, amplitude: f32 },
    /// P-QRS-T complex repeating at the given heart rate
    Ecg { heart_rate_bpm: f32, amplitude: f32 },
    /// Alpha rhythm with a weaker beta component
    Eeg { alpha_hz: f32, amplitude: f32 },
    /// Envelope of muscle bursts; the simulator fills it with noise
    Emg {
        burst_hz: f32,
        duty: f32,
        amplitude: f32,
    },
}

fn bump(phase: f32, centre: f32, width: f32) -> f32 {
    let d = (phase - centre) / width;
    (-0.5 * d * d).exp()
}

impl SignalPattern {
    /// Deterministic part of the signal at `time` seconds.
    ///
    /// Channels are phase-shifted so stacked traces are distinguishable.
    pub fn value_at(&self, time: f32, channel: usize) -> f32 {
        let shift = channel as f32 * 0.037;
        match *self {
            SignalPattern::Flat => 0.0,
            SignalPattern::Sine {
                frequency,
                amplitude,
            } => amplitude * (2.0 * PI * frequency * (time + shift)).sin(),
            SignalPattern::Ecg {
                heart_rate_bpm,
                amplitude,
            } => {
                let period = 60.0 / heart_rate_bpm.max(1.0);
                let phase = ((time + shift) % period) / period;
                let wave = 0.12 * bump(phase, 0.18, 0.025)
                    - 0.10 * bump(phase, 0.285, 0.008)
                    + 1.00 * bump(phase, 0.30, 0.010)
                    - 0.20 * bump(phase, 0.315, 0.008)
                    + 0.30 * bump(phase, 0.55, 0.045);
                amplitude * wave
            }
            SignalPattern::Eeg {
                alpha_hz,
                amplitude,
            } => {
                let t = time + shift;
                let alpha = (2.0 * PI * alpha_hz * t).sin();
                let beta = 0.3 * (2.0 * PI * alpha_hz * 2.3 * t).sin();
                // slow waxing and waning of the alpha rhythm
                let spindle = 0.6 + 0.4 * (2.0 * PI * 0.2 * t).sin();
                amplitude * (spindle * alpha + beta) / 1.3
            }
            SignalPattern::Emg { amplitude, .. } => amplitude * self.activation_at(time, channel),
        }
    }

    /// Muscle activation envelope in [0, 1]; 1.0 for non-EMG patterns.
    pub fn activation_at(&self, time: f32, channel: usize) -> f32 {
        match *self {
            SignalPattern::Emg { burst_hz, duty, .. } => {
                let period = 1.0 / burst_hz.max(0.01);
                let phase = ((time + channel as f32 * 0.11) % period) / period;
                if phase < duty.clamp(0.0, 1.0) {
                    1.0
                } else {
                    0.05
                }
            }
            _ => 1.0,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SignalPattern::Flat => "Flat line",
            SignalPattern::Sine { .. } => "Sine tone",
            SignalPattern::Ecg { .. } => "ECG rhythm",
            SignalPattern::Eeg { .. } => "EEG alpha rhythm",
            SignalPattern::Emg { .. } => "EMG bursts",
        }
    }

    /// Named presets for the CLI.
    pub fn presets() -> Vec<(&'static str, SignalPattern)> {
        vec![
            ("flat", SignalPattern::Flat),
            (
                "sine",
                SignalPattern::Sine {
                    frequency: 10.0,
                    amplitude: 0.5,
                },
            ),
            (
                "ecg",
                SignalPattern::Ecg {
                    heart_rate_bpm: 72.0,
                    amplitude: 0.6,
                },
            ),
            (
                "eeg",
                SignalPattern::Eeg {
                    alpha_hz: 10.0,
                    amplitude: 0.3,
                },
            ),
            (
                "emg",
                SignalPattern::Emg {
                    burst_hz: 0.5,
                    duty: 0.4,
                    amplitude: 0.4,
                },
            ),
        ]
    }

    pub fn preset(name: &str) -> Option<SignalPattern> {
        Self::presets()
            .into_iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
            .map(|(_, pattern)| pattern)
    }
}

impl Default for SignalPattern {
    fn default() -> Self {
        SignalPattern::Ecg {
            heart_rate_bpm: 72.0,
            amplitude: 0.6,
        }
    }
}
