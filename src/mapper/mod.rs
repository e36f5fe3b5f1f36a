//! Projections from raw API payloads to normalized records.
//!
//! Each raw record is deserialized into a typed view (field names checked by
//! serde) and then projected. One bad record fails the whole batch.

pub mod floorplan;
pub mod rent;
pub mod unit;

pub use floorplan::{map_floorplans, FloorplanRecord};
pub use rent::{map_rents, RentRecord};
pub use unit::{map_units, UnitRecord};

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Number;

use crate::api::RawRecord;
use crate::error::{Result, ScrapeError};

/// Deserialize every raw record into `V`, then project it. Stops at the
/// first failure.
fn map_all<V, R>(
    entity: &str,
    raw: &[RawRecord],
    project: impl Fn(V) -> std::result::Result<R, String>,
) -> Result<Vec<R>>
where
    V: DeserializeOwned,
{
    raw.iter()
        .enumerate()
        .map(|(i, value)| {
            V::deserialize(value)
                .map_err(|e| e.to_string())
                .and_then(&project)
                .map_err(|e| ScrapeError::Transform(format!("{} record {}: {}", entity, i, e)))
        })
        .collect()
}

/// Number syntax accepted inside strings: JSON number grammar, no sign other
/// than a leading `-`, no surrounding whitespace, no leading zeros.
static NUMBER_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([Ee][-+]?[0-9]+)?$").unwrap());

// Bounds of the i64 range as f64; 2^63 itself is out of range.
const I64_MIN_F: f64 = -9_223_372_036_854_775_808.0;
const I64_END_F: f64 = 9_223_372_036_854_775_808.0;

/// A value that is either a JSON number or a string holding one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Numeric {
    Number(Number),
    Text(String),
}

impl Numeric {
    /// Integral value, as used for identities. `"101"`, `101` and `101.0`
    /// all give 101.
    pub(crate) fn to_i64(&self, field: &str) -> std::result::Result<i64, String> {
        let f = match self {
            Numeric::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(i);
                }
                n.as_f64()
            }
            Numeric::Text(s) if NUMBER_TEXT_RE.is_match(s) => {
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(i);
                }
                s.parse::<f64>().ok()
            }
            Numeric::Text(_) => None,
        };
        match f {
            Some(f) if f.fract() == 0.0 && (I64_MIN_F..I64_END_F).contains(&f) => Ok(f as i64),
            _ => Err(format!("{} is not an integer: {}", field, self)),
        }
    }
}

/// A string or number spliced into text, rendered as it appears in the
/// payload (`12345`, `m1`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Number(Number),
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl std::fmt::Display for Numeric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Numeric::Number(n) => write!(f, "{}", n),
            Numeric::Text(s) => write!(f, "{:?}", s),
        }
    }
}
