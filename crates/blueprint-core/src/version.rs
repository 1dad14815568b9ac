//! Semantic versions for blueprint records
//!
//! A version is `major.minor.patch` with an optional `-pre` label. The label
//! starts at the first `-`, so the numeric core can never contain one while the
//! label itself may.

use crate::error::{Error, Result};
use semver::Prerelease;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed semantic version. Immutable: [`Version::bump`] returns a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Pre-release label, empty when absent
    pub pre: String,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: String::new(),
        }
    }

    pub fn with_pre(mut self, pre: impl Into<String>) -> Self {
        self.pre = pre.into();
        self
    }

    /// Parse `M.N.P` or `M.N.P-pre`
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(invalid(s, "empty version"));
        }

        let (core, pre) = match s.split_once('-') {
            Some((core, pre)) => (core, pre),
            None => (s, ""),
        };
        if s.contains('-') && pre.is_empty() {
            return Err(invalid(s, "pre-release label after '-' is empty"));
        }

        let nums: Vec<&str> = core.split('.').collect();
        if nums.len() != 3 {
            return Err(invalid(s, "semver must have major.minor.patch"));
        }

        Ok(Self {
            major: parse_component(s, nums[0])?,
            minor: parse_component(s, nums[1])?,
            patch: parse_component(s, nums[2])?,
            pre: pre.to_string(),
        })
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Return the next version for a bump kind
    ///
    /// `"major"` and `"minor"` reset the lower components; any other kind,
    /// recognized or not, is a patch bump. The pre-release label is always
    /// cleared.
    pub fn bump(&self, kind: &str) -> Version {
        match kind {
            "major" => Version::new(self.major + 1, 0, 0),
            "minor" => Version::new(self.major, self.minor + 1, 0),
            _ => Version::new(self.major, self.minor, self.patch + 1),
        }
    }
}

fn invalid(input: &str, message: &str) -> Error {
    Error::format(format!("version '{}'", input), message)
}

fn parse_component(input: &str, part: &str) -> Result<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(
            input,
            &format!("'{}' is not a non-negative integer", part),
        ));
    }
    // Leading zeros would not survive a round trip through Display
    if part.len() > 1 && part.starts_with('0') {
        return Err(invalid(input, &format!("'{}' has a leading zero", part)));
    }
    part.parse::<u64>()
        .map_err(|e| invalid(input, &format!("'{}': {}", part, e)))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| compare_pre(&self.pre, &other.pre))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A release sorts above any of its pre-releases
///
/// Labels that are valid SemVer pre-releases use SemVer precedence. Labels
/// SemVer rejects (such as `rc_1` or `rc.01`) sort after every valid label and
/// compare as plain strings among themselves.
fn compare_pre(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match (Prerelease::new(a), Prerelease::new(b)) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        },
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_round_trip() {
        for s in ["0.0.0", "1.2.3", "10.20.30", "1.2.3-rc1", "1.0.0-alpha.1", "2.0.0-beta-2"] {
            let v = Version::parse(s).unwrap();
            assert_eq!(v.to_string(), s);
        }
    }

    #[test]
    fn test_parse_fields() {
        let v = Version::parse("1.2.3-rc1").unwrap();
        assert_eq!(v, Version::new(1, 2, 3).with_pre("rc1"));
        assert!(v.is_prerelease());
    }

    #[test]
    fn test_pre_release_splits_on_first_dash() {
        let v = Version::parse("1.2.3-beta-2").unwrap();
        assert_eq!(v.pre, "beta-2");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for s in ["", "1.2", "1.2.3.4", "a.b.c", "1.2.x", "1..3", "-1.2.3", "+1.2.3", "1.2.3-", "01.2.3"] {
            let err = Version::parse(s).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "expected format error for {:?}", s);
        }
    }

    #[test]
    fn test_bump_major() {
        let v = Version::new(1, 2, 3).bump("major");
        assert_eq!(v, Version::new(2, 0, 0));
    }

    #[test]
    fn test_bump_minor_clears_pre() {
        let v = Version::new(1, 2, 3).with_pre("rc1").bump("minor");
        assert_eq!(v, Version::new(1, 3, 0));
        assert_eq!(v.pre, "");
    }

    #[test]
    fn test_bump_defaults_to_patch() {
        let base = Version::new(1, 2, 3);
        assert_eq!(base.bump("patch"), Version::new(1, 2, 4));
        assert_eq!(base.bump("anything-unrecognized"), Version::new(1, 2, 4));
        assert_eq!(base.bump(""), Version::new(1, 2, 4));
    }

    #[test]
    fn test_bump_does_not_mutate() {
        let base = Version::new(1, 2, 3).with_pre("rc1");
        let _ = base.bump("major");
        assert_eq!(base.to_string(), "1.2.3-rc1");
    }

    #[test]
    fn test_ordering_numeric() {
        let a = Version::parse("1.9.0").unwrap();
        let b = Version::parse("1.10.0").unwrap();
        assert!(a < b);
        assert!(Version::parse("2.0.0").unwrap() > b);
    }

    #[test]
    fn test_release_sorts_above_prerelease() {
        let release = Version::parse("1.0.0").unwrap();
        let rc = Version::parse("1.0.0-rc1").unwrap();
        assert!(rc < release);
        assert!(Version::parse("0.9.9").unwrap() < rc);
    }

    #[test]
    fn test_prerelease_identifier_ordering() {
        let parse = |s: &str| Version::parse(s).unwrap();
        assert!(parse("1.0.0-alpha") < parse("1.0.0-alpha.1"));
        assert!(parse("1.0.0-alpha.1") < parse("1.0.0-alpha.beta"));
        assert!(parse("1.0.0-beta.2") < parse("1.0.0-beta.11"));
        assert!(parse("1.0.0-beta.11") < parse("1.0.0-rc.1"));
    }

    #[test]
    fn test_non_semver_labels_sort_after_valid_ones() {
        let parse = |s: &str| Version::parse(s).unwrap();
        assert!(parse("1.0.0-rc.2") < parse("1.0.0-rc_1"));
        assert!(parse("1.0.0-rc.1x") < parse("1.0.0-rc.01"));
        assert!(parse("1.0.0-rc.01") < parse("1.0.0-rc_1"));
        assert!(parse("1.0.0-rc_1") < parse("1.0.0"));
        assert_ne!(parse("1.0.0-rc.01"), parse("1.0.0-rc.1"));
    }

    #[test]
    fn test_serde_as_string() {
        let v: Version = serde_json::from_str("\"3.1.4-pi\"").unwrap();
        assert_eq!(v, Version::new(3, 1, 4).with_pre("pi"));
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"3.1.4-pi\"");
        assert!(serde_json::from_str::<Version>("\"3.1\"").is_err());
    }
}
