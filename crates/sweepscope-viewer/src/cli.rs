use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use sweepscope_core::{
    BitDepth, ChannelAssignment, DisplayConfig, ExgType, NotchType, ScopeConfig,
};
use sweepscope_processing::FilterSettings;
use sweepscope_simulation::{ExgSimConfig, SignalPattern, StreamConfig};

#[derive(Debug, Parser)]
#[command(
    name = "sweepscope",
    version,
    about = "Headless biosignal sweep scope",
    long_about = "Streams a simulated multi-channel ExG device through the per-channel \
                  filter pipelines into sweep buffers and redraws them at a fixed rate.\n\
                  Set RUST_LOG to override the log level."
)]
pub struct Cli {
    /// Device sampling rate in Hz (250, 500, 1000 or 2000 have filter tables)
    #[arg(long, default_value_t = 500.0)]
    pub sample_rate: f32,

    /// 0-based channels to display, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = vec![0])]
    pub channels: Vec<usize>,

    /// Seconds shown across one sweep
    #[arg(long, default_value_t = 4.0)]
    pub time_base: f32,

    /// ADC resolution in bits (10, 12, 14, 16 or 24)
    #[arg(long, default_value_t = 10)]
    pub bit_depth: u8,

    /// Vertical scale factor
    #[arg(long, default_value_t = 1.0)]
    pub zoom: f32,

    /// EXG filter applied to every channel
    #[arg(long, value_enum)]
    pub exg: Option<ExgArg>,

    /// Mains notch applied to every channel
    #[arg(long, value_enum)]
    pub notch: Option<NotchArg>,

    /// Redraws per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seconds to run; 0 runs until Ctrl-C
    #[arg(long, default_value_t = 5.0)]
    pub duration: f32,

    /// Channels produced by the simulated device
    #[arg(long, default_value_t = 6)]
    pub stream_channels: usize,

    /// JSON filter settings file; overrides --exg and --notch
    #[arg(long)]
    pub filters: Option<PathBuf>,

    /// Simulated waveform (flat, sine, ecg, eeg, emg)
    #[arg(long, default_value = "ecg")]
    pub pattern: String,

    /// Fixed simulator seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExgArg {
    Ecg,
    Eog,
    Eeg,
    Emg,
}

impl From<ExgArg> for ExgType {
    fn from(arg: ExgArg) -> Self {
        match arg {
            ExgArg::Ecg => ExgType::Ecg,
            ExgArg::Eog => ExgType::Eog,
            ExgArg::Eeg => ExgType::Eeg,
            ExgArg::Emg => ExgType::Emg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotchArg {
    #[value(name = "50")]
    Hz50,
    #[value(name = "60")]
    Hz60,
}

impl From<NotchArg> for NotchType {
    fn from(arg: NotchArg) -> Self {
        match arg {
            NotchArg::Hz50 => NotchType::Hz50,
            NotchArg::Hz60 => NotchType::Hz60,
        }
    }
}

impl Cli {
    /// Default log directive for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    pub fn resolution(&self) -> anyhow::Result<BitDepth> {
        Ok(BitDepth::try_from(self.bit_depth)?)
    }

    pub fn scope_config(&self) -> anyhow::Result<ScopeConfig> {
        let config = ScopeConfig {
            sampling_rate_hz: self.sample_rate,
            display: DisplayConfig {
                vertical_scale: self.zoom,
                time_base_seconds: self.time_base,
                bit_depth: self.resolution()?,
            },
            channels: ChannelAssignment::new(self.channels.iter().copied())?,
            paused: false,
        };
        config.validate().context("invalid display settings")?;
        Ok(config)
    }

    pub fn stream_config(&self) -> anyhow::Result<StreamConfig> {
        let pattern = SignalPattern::preset(&self.pattern)
            .ok_or_else(|| anyhow!("unknown pattern '{}'", self.pattern))?;
        let simulator = ExgSimConfig {
            sampling_rate_hz: self.sample_rate,
            channel_count: self.stream_channels,
            resolution: self.resolution()?,
            pattern,
            seed: self.seed,
            ..ExgSimConfig::default()
        };
        simulator.validate().context("invalid device settings")?;
        Ok(StreamConfig {
            simulator,
            ..StreamConfig::default()
        })
    }

    /// Per-channel selections from `--filters`, or uniform ones from `--exg`/`--notch`.
    pub fn filter_settings(&self) -> anyhow::Result<FilterSettings> {
        match &self.filters {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                FilterSettings::from_json(&json)
                    .with_context(|| format!("parsing {}", path.display()))
            }
            None => Ok(FilterSettings::uniform(
                self.stream_channels,
                self.exg.map(ExgType::from),
                self.notch.map(NotchType::from),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["sweepscope"]);
        let config = cli.scope_config().unwrap();
        assert_eq!(config, ScopeConfig::default());
        assert_eq!(config.sweep_capacity(), 2000);
        assert_eq!(cli.log_level(), "warn");
        assert!(cli
            .filter_settings()
            .unwrap()
            .channels
            .iter()
            .all(|c| c.exg.is_none() && c.notch.is_none()));
    }

    #[test]
    fn test_full_command_line() {
        let cli = Cli::parse_from([
            "sweepscope",
            "--sample-rate",
            "1000",
            "--channels",
            "2,0,5",
            "--time-base",
            "2",
            "--bit-depth",
            "16",
            "--zoom",
            "1.5",
            "--exg",
            "eeg",
            "--notch",
            "60",
            "--stream-channels",
            "8",
            "-vv",
        ]);
        let config = cli.scope_config().unwrap();
        assert_eq!(config.channels.indices(), &[0, 2, 5]);
        assert_eq!(config.display.bit_depth, BitDepth::Bits16);
        assert_eq!(config.sweep_capacity(), 2000);
        assert_eq!(cli.log_level(), "debug");

        let settings = cli.filter_settings().unwrap();
        assert_eq!(settings.channels.len(), 8);
        assert!(settings
            .channels
            .iter()
            .all(|c| c.exg == Some(ExgType::Eeg) && c.notch == Some(NotchType::Hz60)));

        let stream = cli.stream_config().unwrap();
        assert_eq!(stream.simulator.channel_count, 8);
        assert_eq!(stream.simulator.resolution, BitDepth::Bits16);
    }

    #[test]
    fn test_rejects_bad_values() {
        let cli = Cli::parse_from(["sweepscope", "--bit-depth", "11"]);
        assert!(cli.scope_config().is_err());

        let cli = Cli::parse_from(["sweepscope", "--pattern", "square"]);
        assert!(cli.stream_config().is_err());

        assert!(Cli::try_parse_from(["sweepscope", "--notch", "55"]).is_err());
    }
}
