//! Ordered set of physical channels mapped onto display lines

use serde::{Deserialize, Serialize};

use crate::channel_error;
use crate::error::ScopeResult;
use crate::types::MAX_CHANNELS;

/// Selected physical channels, ascending and deduplicated.
///
/// Line `i` on screen shows the channel at position `i`. An empty
/// selection is never stored; it falls back to channel 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct ChannelAssignment {
    channels: Vec<usize>,
}

impl Default for ChannelAssignment {
    fn default() -> Self {
        Self { channels: vec![0] }
    }
}

impl ChannelAssignment {
    /// Build from any list of indices; duplicates are removed and order is ascending.
    pub fn new(channels: impl IntoIterator<Item = usize>) -> ScopeResult<Self> {
        let mut channels: Vec<usize> = channels.into_iter().collect();
        if let Some(&bad) = channels.iter().find(|&&c| c >= MAX_CHANNELS) {
            return Err(channel_error!(bad, MAX_CHANNELS));
        }
        channels.sort_unstable();
        channels.dedup();
        if channels.is_empty() {
            channels.push(0);
        }
        Ok(Self { channels })
    }

    /// Replace the selection with the first `count` channels.
    pub fn select_all(&mut self, count: usize) {
        let count = count.clamp(1, MAX_CHANNELS);
        self.channels = (0..count).collect();
    }

    /// Back to channel 0 only.
    pub fn reset(&mut self) {
        self.channels.clear();
        self.channels.push(0);
    }

    pub fn indices(&self) -> &[usize] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn contains(&self, channel: usize) -> bool {
        self.channels.binary_search(&channel).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.channels.iter().copied()
    }

    /// Line index of a physical channel, if displayed.
    pub fn line_of(&self, channel: usize) -> Option<usize> {
        self.channels.binary_search(&channel).ok()
    }

    /// Add or remove one channel. Removing the last one leaves channel 0.
    pub fn toggle(&mut self, channel: usize) -> ScopeResult<()> {
        if channel >= MAX_CHANNELS {
            return Err(channel_error!(channel, MAX_CHANNELS));
        }
        match self.channels.binary_search(&channel) {
            Ok(pos) => {
                self.channels.remove(pos);
                if self.channels.is_empty() {
                    self.channels.push(0);
                }
            }
            Err(pos) => self.channels.insert(pos, channel),
        }
        Ok(())
    }

    /// Restrict to channels the connected device actually has.
    pub fn retain_below(&mut self, count: usize) {
        self.channels.retain(|&c| c < count);
        if self.channels.is_empty() {
            self.channels.push(0);
        }
    }
}

impl TryFrom<Vec<usize>> for ChannelAssignment {
    type Error = crate::error::ScopeError;

    fn try_from(value: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelAssignment> for Vec<usize> {
    fn from(value: ChannelAssignment) -> Self {
        value.channels
    }
}
