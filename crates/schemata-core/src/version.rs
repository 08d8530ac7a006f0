//! Schema version numbers and bump arithmetic.
//!
//! A version is an ordered pair `major.minor` compared component-wise, so
//! `1.10 > 1.9` holds even though the rendered form outwardly resembles a
//! decimal fraction. No binary floating point is involved in ordering or
//! arithmetic.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::Error;

// ─── Version ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
  pub major: u32,
  pub minor: u32,
}

impl Version {
  pub const fn new(major: u32, minor: u32) -> Self { Self { major, minor } }

  /// The initial version assigned to the first revision of a title.
  pub const fn initial() -> Self { Self::new(1, 0) }

  /// Lossy numeric rendering for the served form, where `self.version` is a
  /// JSON number. Minor components of ten or more lose their trailing-zero
  /// distinction here; the canonical string form does not.
  pub fn to_f64(self) -> f64 {
    let mut scale = 10u64;
    while u64::from(self.minor) >= scale {
      scale *= 10;
    }
    f64::from(self.major) + f64::from(self.minor) / scale as f64
  }

  pub fn as_number(self) -> serde_json::Number {
    serde_json::Number::from_f64(self.to_f64())
      .unwrap_or_else(|| serde_json::Number::from(self.major))
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.major, self.minor)
  }
}

impl FromStr for Version {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (major, minor) = s
      .split_once('.')
      .ok_or_else(|| Error::VersionParse(s.to_owned()))?;
    let major = major
      .parse()
      .map_err(|_| Error::VersionParse(s.to_owned()))?;
    let minor = minor
      .parse()
      .map_err(|_| Error::VersionParse(s.to_owned()))?;
    Ok(Self { major, minor })
  }
}

// Versions travel as strings in API JSON ("1.0", "1.10") so no precision is
// lost; only the embedded `self.version` is a number.
impl Serialize for Version {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Version {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(de::Error::custom)
  }
}

// ─── Bump ────────────────────────────────────────────────────────────────────

/// The rule used to compute the next version number from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bump {
  Major,
  Minor,
}

/// Compute the next version for a title, given its latest revision (if any).
///
/// Pure and total: no prior revision yields `1.0` regardless of bump kind;
/// a minor bump increments the minor component (1.5 → 1.6, 1.9 → 1.10);
/// a major bump moves to the next whole version (1.6 → 2.0).
pub fn next_version(current: Option<Version>, bump: Bump) -> Version {
  match current {
    None => Version::initial(),
    Some(v) => match bump {
      Bump::Minor => Version::new(v.major, v.minor + 1),
      Bump::Major => Version::new(v.major + 1, 0),
    },
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
