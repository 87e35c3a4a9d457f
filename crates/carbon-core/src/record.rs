//! The emission record (one logged activity) and its labelled enums.
//!
//! A record is a fixed struct with one open-ended `extra` map for passthrough
//! columns picked up during CSV import. Enumerated fields tolerate values
//! outside their known set so that a hand-edited or imported file never
//! fails to load because of one odd label.

use std::{collections::BTreeMap, fmt};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Labelled enums ──────────────────────────────────────────────────────────

/// Declares an enum whose wire form is its human label, with an `Other`
/// variant that keeps unknown labels verbatim.
macro_rules! labelled_enum {
  (
    $(#[$meta:meta])*
    $name:ident { $($variant:ident => $label:literal),+ $(,)? }
  ) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    )]
    #[serde(from = "String", into = "String")]
    pub enum $name {
      $($variant,)+
      /// A label outside the known set, kept as written.
      Other(String),
    }

    impl $name {
      /// Every known value, in canonical order.
      pub const KNOWN: &'static [Self] = &[$(Self::$variant),+];

      pub fn as_str(&self) -> &str {
        match self {
          $(Self::$variant => $label,)+
          Self::Other(s) => s,
        }
      }

      pub fn is_known(&self) -> bool { !matches!(self, Self::Other(_)) }
    }

    impl From<String> for $name {
      fn from(s: String) -> Self {
        match s.trim() {
          $($label => return Self::$variant,)+
          _ => {}
        }
        Self::Other(s)
      }
    }

    impl From<&str> for $name {
      fn from(s: &str) -> Self { Self::from(s.to_owned()) }
    }

    impl From<$name> for String {
      fn from(value: $name) -> Self {
        match value {
          $name::Other(s) => s,
          known => known.as_str().to_owned(),
        }
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }
  };
}

labelled_enum! {
  /// GHG Protocol emission scope.
  Scope {
    Scope1 => "Scope 1",
    Scope2 => "Scope 2",
    Scope3 => "Scope 3",
  }
}

labelled_enum! {
  /// Self-assessed quality of the underlying activity data.
  DataQuality {
    Low => "Low",
    Medium => "Medium",
    High => "High",
  }
}

labelled_enum! {
  VerificationStatus {
    Unverified => "Unverified",
    InternallyVerified => "Internally Verified",
    ThirdPartyVerified => "Third-Party Verified",
  }
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// Formats tried, in order, when coercing a free-text date.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] =
  &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse a calendar date, dropping any time-of-day component.
///
/// Returns `None` for anything unrecognised; callers treat that as the
/// "unparsed" sentinel rather than an error.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  for fmt in DATE_FORMATS {
    if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
      return Some(d);
    }
  }
  // Timestamps, with or without a trailing offset.
  if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
    return Some(dt.date_naive());
  }
  DATETIME_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|dt| dt.date())
}

/// Text form of a stored value: strings as-is, `null` as empty, anything
/// else in its JSON spelling.
pub fn cell_text(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

// ─── Lenient decoding ────────────────────────────────────────────────────────

/// Serde adapters that read whatever scalar a stored record holds.
///
/// A `null`, a number where text was expected, or text where a number was
/// expected decodes to a usable value instead of failing the whole file.
mod lenient {
  use serde::{Deserialize, Deserializer};
  use serde_json::Value;

  use super::cell_text;
  use crate::calc::parse_number;

  pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(cell_text(&Value::deserialize(d)?))
  }

  pub fn opt_text<'de, D: Deserializer<'de>>(
    d: D,
  ) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
      Value::Null => None,
      v => Some(cell_text(&v)),
    })
  }

  pub fn label<'de, D, T>(d: D) -> Result<T, D::Error>
  where
    D: Deserializer<'de>,
    T: From<String>,
  {
    text(d).map(T::from)
  }

  pub fn opt_label<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
  where
    D: Deserializer<'de>,
    T: From<String>,
  {
    Ok(opt_text(d)?.map(T::from))
  }

  /// Finite numbers pass; numeric strings are parsed; anything else is 0.
  pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let n = match Value::deserialize(d)? {
      Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
      Value::String(s) => parse_number(&s),
      _ => None,
    };
    Ok(n.unwrap_or(0.0))
  }

  /// ISO date out; lenient date in, `null` for unparsed.
  pub mod date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(
      date: &Option<NaiveDate>,
      serializer: S,
    ) -> Result<S::Ok, S::Error> {
      match date {
        Some(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
        None => serializer.serialize_none(),
      }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
      deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
      Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => crate::record::parse_date(&s),
        _ => None,
      })
    }
  }
}

// ─── EmissionRecord ──────────────────────────────────────────────────────────

/// One logged emission activity.
///
/// Position in the collection is the record's only identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
  /// `None` marks a date that could not be parsed on import.
  #[serde(with = "lenient::date", default)]
  pub date:                Option<NaiveDate>,
  #[serde(deserialize_with = "lenient::label")]
  pub scope:               Scope,
  #[serde(default, deserialize_with = "lenient::text")]
  pub category:            String,
  #[serde(default, deserialize_with = "lenient::text")]
  pub activity:            String,
  #[serde(default, deserialize_with = "lenient::number")]
  pub quantity:            f64,
  #[serde(default, deserialize_with = "lenient::text")]
  pub unit:                String,
  #[serde(default, deserialize_with = "lenient::number")]
  pub emission_factor:     f64,
  #[serde(
    rename = "emissions_kgCO2e",
    default,
    deserialize_with = "lenient::number"
  )]
  pub emissions_kgco2e:    f64,
  #[serde(
    default,
    deserialize_with = "lenient::opt_text",
    skip_serializing_if = "Option::is_none"
  )]
  pub country:             Option<String>,
  #[serde(
    default,
    deserialize_with = "lenient::opt_text",
    skip_serializing_if = "Option::is_none"
  )]
  pub facility:            Option<String>,
  #[serde(
    default,
    deserialize_with = "lenient::opt_text",
    skip_serializing_if = "Option::is_none"
  )]
  pub responsible_person:  Option<String>,
  #[serde(
    default,
    deserialize_with = "lenient::opt_label",
    skip_serializing_if = "Option::is_none"
  )]
  pub data_quality:        Option<DataQuality>,
  #[serde(
    default,
    deserialize_with = "lenient::opt_label",
    skip_serializing_if = "Option::is_none"
  )]
  pub verification_status: Option<VerificationStatus>,
  #[serde(
    default,
    deserialize_with = "lenient::opt_text",
    skip_serializing_if = "Option::is_none"
  )]
  pub notes:               Option<String>,
  /// Passthrough columns, kept with whatever JSON value they were stored as.
  #[serde(flatten)]
  pub extra:               BTreeMap<String, Value>,
}

impl EmissionRecord {
  /// The `YYYY-MM` bucket this record falls in, if its date parsed.
  pub fn month(&self) -> Option<String> {
    self.date.map(|d| d.format("%Y-%m").to_string())
  }
}
