//! Persistable per-channel filter selections

use serde::{Deserialize, Serialize};
use sweepscope_core::{channel_error, ExgType, NotchType, ScopeError, ScopeResult, MAX_CHANNELS};

use crate::pipeline::FilterOrder;

/// Filter selection of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFilterSettings {
    pub channel: usize,
    #[serde(default)]
    pub exg: Option<ExgType>,
    #[serde(default)]
    pub notch: Option<NotchType>,
}

/// Filter selections for every channel that is not bypassed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub order: FilterOrder,
    #[serde(default)]
    pub channels: Vec<ChannelFilterSettings>,
}

impl FilterSettings {
    /// Same selection on channels `0..count`.
    pub fn uniform(count: usize, exg: Option<ExgType>, notch: Option<NotchType>) -> Self {
        Self {
            order: FilterOrder::default(),
            channels: (0..count.min(MAX_CHANNELS))
                .map(|channel| ChannelFilterSettings { channel, exg, notch })
                .collect(),
        }
    }

    pub fn validate(&self) -> ScopeResult<()> {
        for (i, entry) in self.channels.iter().enumerate() {
            if entry.channel >= MAX_CHANNELS {
                return Err(channel_error!(entry.channel, MAX_CHANNELS));
            }
            if self.channels[..i].iter().any(|e| e.channel == entry.channel) {
                return Err(ScopeError::Serialization(format!(
                    "channel {} listed twice",
                    entry.channel
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> ScopeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> ScopeResult<Self> {
        let settings: FilterSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }
}
