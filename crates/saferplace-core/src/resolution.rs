//! The review outcome of an incident.
//!
//! Resolutions are persisted as their canonical labels (`RESOLUTION_ACCEPTED`
//! and so on). All conversions go through [`Resolution::as_str`] and
//! [`Resolution::from_str`]; the numeric discriminant is never stored.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum Resolution {
  #[default]
  #[serde(rename = "RESOLUTION_UNSPECIFIED")]
  Unspecified,
  #[serde(rename = "RESOLUTION_ACCEPTED")]
  Accepted,
  #[serde(rename = "RESOLUTION_ALERTED")]
  Alerted,
  #[serde(rename = "RESOLUTION_REJECTED")]
  Rejected,
}

impl Resolution {
  pub const ALL: [Resolution; 4] = [
    Resolution::Unspecified,
    Resolution::Accepted,
    Resolution::Alerted,
    Resolution::Rejected,
  ];

  /// The canonical label written to storage.
  pub fn as_str(self) -> &'static str {
    match self {
      Resolution::Unspecified => "RESOLUTION_UNSPECIFIED",
      Resolution::Accepted => "RESOLUTION_ACCEPTED",
      Resolution::Alerted => "RESOLUTION_ALERTED",
      Resolution::Rejected => "RESOLUTION_REJECTED",
    }
  }
}

impl fmt::Display for Resolution {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Resolution {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Resolution::ALL
      .into_iter()
      .find(|r| r.as_str() == s)
      .ok_or_else(|| Error::UnknownResolution(s.to_owned()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_round_trip() {
    for r in Resolution::ALL {
      assert_eq!(r.as_str().parse::<Resolution>().unwrap(), r);
    }
  }

  #[test]
  fn serde_uses_canonical_labels() {
    for r in Resolution::ALL {
      let json = serde_json::to_string(&r).unwrap();
      assert_eq!(json, format!("\"{}\"", r.as_str()));
    }
  }

  #[test]
  fn default_is_unspecified() {
    assert_eq!(Resolution::default(), Resolution::Unspecified);
  }

  #[test]
  fn unknown_label_is_rejected() {
    let err = "ACCEPTED".parse::<Resolution>().unwrap_err();
    assert!(matches!(err, Error::UnknownResolution(ref s) if s == "ACCEPTED"));
  }
}
