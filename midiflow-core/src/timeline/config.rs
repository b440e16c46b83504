//! Playback configuration for rendering timelines

use crate::error::{Result, ValidationError};
use crate::types::note::MIDI_MAX;
use crate::types::time::{is_negative, Time, ZERO};
use std::collections::BTreeMap;

/// Number of MIDI channels
pub const CHANNELS: u8 = 16;

/// Settings that shape a render: tempo, tick resolution, the time window and
/// the program each channel starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlaybackConfig {
    /// Microseconds per quarter note
    pub tempo: u32,
    /// Ticks per quarter note
    pub ppq: u16,
    /// Events before this time are skipped; ticks are counted from here
    pub start_time: Time,
    /// Notes starting at or after this time are skipped
    pub end_time: Option<Time>,
    /// Program selected on each used channel at `start_time`
    pub default_programs: BTreeMap<u8, u8>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tempo: 500_000,
            ppq: 480,
            start_time: ZERO,
            end_time: None,
            default_programs: (0..CHANNELS).map(|channel| (channel, 0)).collect(),
        }
    }
}

impl PlaybackConfig {
    pub fn with_tempo(mut self, tempo: u32) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn with_ppq(mut self, ppq: u16) -> Self {
        self.ppq = ppq;
        self
    }

    pub fn with_start_time(mut self, start_time: Time) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_end_time(mut self, end_time: Option<Time>) -> Self {
        self.end_time = end_time;
        self
    }

    pub fn with_default_program(mut self, channel: u8, program: u8) -> Self {
        self.default_programs.insert(channel, program);
        self
    }

    /// Beats per minute, for display
    pub fn bpm(&self) -> f64 {
        60_000_000.0 / self.tempo as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.tempo == 0 {
            return Err(ValidationError::InvalidConfig(
                "tempo must be positive".to_string(),
            ));
        }
        if self.ppq == 0 {
            return Err(ValidationError::InvalidConfig(
                "ppq must be positive".to_string(),
            ));
        }
        if is_negative(self.start_time) {
            return Err(ValidationError::NegativeTime {
                time: self.start_time,
            });
        }
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(ValidationError::InvalidConfig(format!(
                    "end time {} is before start time {}",
                    end, self.start_time
                )));
            }
        }
        for (&channel, &program) in &self.default_programs {
            if channel >= CHANNELS {
                return Err(ValidationError::InvalidChannel(channel));
            }
            if program > MIDI_MAX {
                return Err(ValidationError::InvalidProgram(program));
            }
        }
        Ok(())
    }

    /// True when an onset at `t` falls inside `[start_time, end_time)`
    pub fn in_window(&self, t: Time) -> bool {
        t >= self.start_time && self.end_time.map_or(true, |end| t < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::time::{time, whole};

    #[test]
    fn test_defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.tempo, 500_000);
        assert_eq!(config.ppq, 480);
        assert_eq!(config.start_time, ZERO);
        assert_eq!(config.end_time, None);
        assert_eq!(config.default_programs.len(), 16);
        assert!(config.default_programs.values().all(|p| *p == 0));
        assert_eq!(config.bpm(), 120.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(PlaybackConfig::default().with_tempo(0).validate().is_err());
        assert!(PlaybackConfig::default().with_ppq(0).validate().is_err());
        assert!(PlaybackConfig::default()
            .with_start_time(time(-1, 4))
            .validate()
            .is_err());
        assert!(PlaybackConfig::default()
            .with_start_time(whole(2))
            .with_end_time(Some(whole(1)))
            .validate()
            .is_err());
        assert_eq!(
            PlaybackConfig::default()
                .with_default_program(16, 3)
                .validate(),
            Err(ValidationError::InvalidChannel(16))
        );
        assert_eq!(
            PlaybackConfig::default()
                .with_default_program(2, 128)
                .validate(),
            Err(ValidationError::InvalidProgram(128))
        );
    }

    #[test]
    fn test_window() {
        let config = PlaybackConfig::default()
            .with_start_time(time(1, 4))
            .with_end_time(Some(whole(1)));
        assert!(!config.in_window(ZERO));
        assert!(config.in_window(time(1, 4)));
        assert!(!config.in_window(whole(1)));
        assert!(PlaybackConfig::default().in_window(whole(1000)));
    }
}
