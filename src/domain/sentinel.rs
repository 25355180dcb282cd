//! Serde adapter for floats that may be infinite.
//!
//! JSON has no infinity, and `serde_json` would silently write `null`. Finite
//! values stay plain numbers; the others become the strings `"Infinity"`,
//! `"-Infinity"` or `"NaN"` and are read back as the same float.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub const INFINITY: &str = "Infinity";
pub const NEG_INFINITY: &str = "-Infinity";
pub const NAN: &str = "NaN";

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
  if value.is_finite() {
    serializer.serialize_f64(*value)
  } else if value.is_nan() {
    serializer.serialize_str(NAN)
  } else if value.is_sign_positive() {
    serializer.serialize_str(INFINITY)
  } else {
    serializer.serialize_str(NEG_INFINITY)
  }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Repr {
    Number(f64),
    Text(String),
  }

  match Repr::deserialize(deserializer)? {
    Repr::Number(value) => Ok(value),
    Repr::Text(text) => match text.as_str() {
      INFINITY => Ok(f64::INFINITY),
      NEG_INFINITY => Ok(f64::NEG_INFINITY),
      NAN => Ok(f64::NAN),
      other => Err(D::Error::custom(format!("unexpected float sentinel {other:?}"))),
    },
  }
}
