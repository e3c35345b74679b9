use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, FromRepr};

use crate::drive::MAX_TRACK;

/// What the fixture does after boot. Persisted as its `u8` discriminant.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter, FromRepr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Operation {
    #[default]
    None = 0,
    Exercise = 1,
    WriteTest = 2,
    Rewind = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub operation: Operation,
    /// Index of the last track recorded by a write test.
    pub stop_at_track: u8,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            operation: Operation::None,
            stop_at_track: 1,
        }
    }
}

impl RunConfig {
    pub fn new(operation: Operation, stop_at_track: u8) -> Self {
        Self {
            operation,
            stop_at_track,
        }
    }

    /// `stop_at_track`, clamped to the last track of the head.
    pub fn stop_track(&self) -> u8 {
        self.stop_at_track.min(MAX_TRACK)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::from_str("writetest").unwrap(), Operation::WriteTest);
        assert_eq!(Operation::from_str("ReWind").unwrap(), Operation::Rewind);
        assert_eq!(Operation::from_str("NONE").unwrap(), Operation::None);
        assert!(Operation::from_str("erase").is_err());
        assert_eq!(Operation::Exercise.to_string(), "exercise");
    }

    #[test]
    fn test_operation_repr() {
        assert_eq!(Operation::from_repr(2), Some(Operation::WriteTest));
        assert_eq!(Operation::from_repr(4), None);
        assert_eq!(Operation::Rewind as u8, 3);
    }

    #[test]
    fn test_stop_track_clamped() {
        assert_eq!(RunConfig::default().stop_track(), 1);
        assert_eq!(RunConfig::new(Operation::WriteTest, 3).stop_track(), 3);
        assert_eq!(RunConfig::new(Operation::WriteTest, 200).stop_track(), 8);
    }
}
