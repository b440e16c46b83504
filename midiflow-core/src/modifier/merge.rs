//! Overlap handling for merging patterns that share start times.

use std::fmt;

/// What to do when two merged patterns both have a note at one start time.
///
/// "First" and "last" refer to input order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OverlapPolicy {
    /// Reject the merge with an overlap error
    #[default]
    Fail,
    /// Keep the note from the earlier input
    KeepFirst,
    /// Keep the note from the later input
    KeepLast,
}

impl OverlapPolicy {
    /// Parse policy from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<OverlapPolicy> {
        match s.to_lowercase().as_str() {
            "fail" | "error" => Some(OverlapPolicy::Fail),
            "keep_first" | "first" => Some(OverlapPolicy::KeepFirst),
            "keep_last" | "last" => Some(OverlapPolicy::KeepLast),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OverlapPolicy::Fail => "fail",
            OverlapPolicy::KeepFirst => "keep_first",
            OverlapPolicy::KeepLast => "keep_last",
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::types::time::{time, whole, ZERO};
    use crate::types::{Note, Pattern};

    fn single(start: crate::types::Time, pitch: u8, duration: crate::types::Time) -> Pattern {
        Pattern::from_notes(vec![(start, Note::new(time(1, 4), pitch, 100).unwrap())], duration)
            .unwrap()
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(OverlapPolicy::from_str("Keep_Last"), Some(OverlapPolicy::KeepLast));
        assert_eq!(OverlapPolicy::from_str("first"), Some(OverlapPolicy::KeepFirst));
        assert_eq!(OverlapPolicy::from_str("error"), Some(OverlapPolicy::Fail));
        assert_eq!(OverlapPolicy::from_str("both"), None);
        assert_eq!(OverlapPolicy::default(), OverlapPolicy::Fail);
    }

    #[test]
    fn test_merge_disjoint() {
        let a = single(ZERO, 60, time(1, 2));
        let b = single(time(1, 4), 64, whole(1));
        let m = a.merge(&b, OverlapPolicy::Fail).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.duration(), whole(1));
    }

    #[test]
    fn test_merge_policies_on_collision() {
        let a = single(ZERO, 60, time(1, 2));
        let b = single(ZERO, 64, time(1, 2));

        assert_eq!(
            a.merge(&b, OverlapPolicy::Fail).unwrap_err(),
            ValidationError::Overlap { start: ZERO }
        );
        let first = a.merge(&b, OverlapPolicy::KeepFirst).unwrap();
        assert_eq!(first.get(ZERO).unwrap().pitch(), 60);
        let last = a.merge(&b, OverlapPolicy::KeepLast).unwrap();
        assert_eq!(last.get(ZERO).unwrap().pitch(), 64);
    }
}
