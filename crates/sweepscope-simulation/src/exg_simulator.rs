//! Multi-channel ADC simulator producing raw integer-valued frames

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use sweepscope_core::{types::validate_rate, BitDepth, ScopeError, ScopeResult, MAX_CHANNELS};

use crate::signal_patterns::SignalPattern;

/// Noise and interference added on top of the pattern, as fractions of full scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian noise standard deviation
    pub gaussian_std: f32,
    /// Amplitude of the slow electrode drift
    pub baseline_wander: f32,
    /// Amplitude of mains interference
    pub powerline_amplitude: f32,
    /// Mains frequency, `None` for none
    pub powerline_hz: Option<f32>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            gaussian_std: 0.01,
            baseline_wander: 0.1,
            powerline_amplitude: 0.05,
            powerline_hz: Some(50.0),
        }
    }
}

/// Simulated device description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExgSimConfig {
    pub sampling_rate_hz: f32,
    pub channel_count: usize,
    pub resolution: BitDepth,
    pub pattern: SignalPattern,
    pub noise: NoiseConfig,
    /// Fixed seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for ExgSimConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 500.0,
            channel_count: 6,
            resolution: BitDepth::Bits10,
            pattern: SignalPattern::default(),
            noise: NoiseConfig::default(),
            seed: None,
        }
    }
}

impl ExgSimConfig {
    pub fn validate(&self) -> ScopeResult<()> {
        validate_rate(self.sampling_rate_hz)?;
        if self.channel_count == 0 || self.channel_count > MAX_CHANNELS {
            return Err(ScopeError::ChannelOutOfRange {
                index: self.channel_count,
                max: MAX_CHANNELS,
            });
        }
        Ok(())
    }
}

/// Raw counts corresponding to +1.0 full scale for a resolution.
///
/// Inverse of [`BitDepth::normalize`].
pub fn full_scale_counts(resolution: BitDepth) -> f32 {
    match resolution {
        BitDepth::Bits24 => 8_388_608.0,
        other => (1u32 << (other.bits() - 1)) as f32,
    }
}

/// Produces one frame of raw samples per call, advancing simulated time
pub struct ExgSimulator {
    config: ExgSimConfig,
    rng: StdRng,
    noise: Normal<f32>,
    sample_index: u64,
}

impl ExgSimulator {
    pub fn new(config: ExgSimConfig) -> ScopeResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let noise = Self::noise_distribution(&config)?;
        Ok(Self {
            config,
            rng,
            noise,
            sample_index: 0,
        })
    }

    fn noise_distribution(config: &ExgSimConfig) -> ScopeResult<Normal<f32>> {
        Normal::new(0.0, config.noise.gaussian_std.max(0.0))
            .map_err(|e| ScopeError::Serialization(format!("noise distribution: {}", e)))
    }

    pub fn config(&self) -> &ExgSimConfig {
        &self.config
    }

    /// Seconds of signal produced so far.
    pub fn elapsed(&self) -> f32 {
        self.sample_index as f32 / self.config.sampling_rate_hz
    }

    /// Next frame, one raw value per channel, quantized to the resolution.
    pub fn next_frame(&mut self) -> Vec<f32> {
        let time = self.elapsed();
        let full_scale = full_scale_counts(self.config.resolution);
        let interference = self.config.noise;

        let frame = (0..self.config.channel_count)
            .map(|channel| {
                let mut value = self.config.pattern.value_at(time, channel);
                if let SignalPattern::Emg { amplitude, .. } = self.config.pattern {
                    // band-limited firing is approximated by scaled white noise
                    let activation = self.config.pattern.activation_at(time, channel);
                    value = amplitude * activation * self.rng.gen_range(-1.0..1.0);
                }
                value += self.noise.sample(&mut self.rng);
                value += interference.baseline_wander
                    * (2.0 * PI * 0.15 * time + channel as f32).sin();
                if let Some(hz) = interference.powerline_hz {
                    value += interference.powerline_amplitude * (2.0 * PI * hz * time).sin();
                }
                (value.clamp(-1.0, 1.0) * full_scale)
                    .round()
                    .clamp(-full_scale, full_scale - 1.0)
            })
            .collect();

        self.sample_index += 1;
        frame
    }

    /// `count` consecutive frames.
    pub fn generate(&mut self, count: usize) -> Vec<Vec<f32>> {
        (0..count).map(|_| self.next_frame()).collect()
    }

    pub fn reset_time(&mut self) {
        self.sample_index = 0;
    }

    pub fn update_config(&mut self, config: ExgSimConfig) -> ScopeResult<()> {
        config.validate()?;
        self.noise = Self::noise_distribution(&config)?;
        if let Some(seed) = config.seed.filter(|&seed| Some(seed) != self.config.seed) {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.config = config;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> ExgSimConfig {
        ExgSimConfig {
            noise: NoiseConfig {
                gaussian_std: 0.0,
                baseline_wander: 0.0,
                powerline_amplitude: 0.0,
                powerline_hz: None,
            },
            seed: Some(1),
            ..ExgSimConfig::default()
        }
    }

    #[test]
    fn test_frame_shape_and_time() {
        let mut sim = ExgSimulator::new(ExgSimConfig {
            seed: Some(3),
            ..ExgSimConfig::default()
        })
        .unwrap();
        let frames = sim.generate(500);
        assert_eq!(frames.len(), 500);
        assert!(frames.iter().all(|f| f.len() == 6));
        assert!((sim.elapsed() - 1.0).abs() < 1e-6);

        sim.reset_time();
        assert_eq!(sim.elapsed(), 0.0);
    }

    #[test]
    fn test_values_are_quantized_counts() {
        for resolution in [BitDepth::Bits10, BitDepth::Bits16, BitDepth::Bits24] {
            let mut sim = ExgSimulator::new(ExgSimConfig {
                resolution,
                seed: Some(9),
                ..ExgSimConfig::default()
            })
            .unwrap();
            let full_scale = full_scale_counts(resolution);
            for frame in sim.generate(200) {
                for raw in frame {
                    assert_eq!(raw.fract(), 0.0);
                    assert!(raw >= -full_scale && raw < full_scale);
                    assert!(resolution.normalize(raw).abs() <= 1.0);
                }
            }
        }
    }

    #[test]
    fn test_sine_round_trips_through_normalization() {
        let mut config = quiet_config();
        config.resolution = BitDepth::Bits16;
        config.pattern = SignalPattern::Sine {
            frequency: 5.0,
            amplitude: 0.5,
        };
        config.channel_count = 1;
        let mut sim = ExgSimulator::new(config).unwrap();
        let peak = sim
            .generate(100)
            .into_iter()
            .map(|f| BitDepth::Bits16.normalize(f[0]))
            .fold(0.0f32, f32::max);
        assert!((peak - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_same_seed_same_output() {
        let config = ExgSimConfig {
            seed: Some(42),
            ..ExgSimConfig::default()
        };
        let a = ExgSimulator::new(config.clone()).unwrap().generate(50);
        let b = ExgSimulator::new(config).unwrap().generate(50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_config() {
        let zero_channels = ExgSimConfig {
            channel_count: 0,
            ..ExgSimConfig::default()
        };
        assert!(ExgSimulator::new(zero_channels).is_err());

        let bad_rate = ExgSimConfig {
            sampling_rate_hz: -1.0,
            ..ExgSimConfig::default()
        };
        assert!(matches!(
            ExgSimulator::new(bad_rate),
            Err(ScopeError::InvalidSampleRate { .. })
        ));
    }
}
