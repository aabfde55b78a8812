use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A diploma average, either integral (`15`) or a finite decimal (`15.5`).
///
/// The distinction survives serialization, so the canonical form of a grade
/// is the same at signing and verification time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade(GradeRepr);

#[derive(Debug, Clone, Copy, PartialEq)]
enum GradeRepr {
    Integer(i64),
    Decimal(f64),
}

impl Grade {
    pub fn integer(value: i64) -> Self {
        Grade(GradeRepr::Integer(value))
    }

    /// A decimal grade. Fails with [`Error::InvalidGrade`] for NaN or infinity.
    pub fn decimal(value: f64) -> Result<Self, Error> {
        if value.is_finite() {
            Ok(Grade(GradeRepr::Decimal(value)))
        } else {
            Err(Error::InvalidGrade)
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.0, GradeRepr::Integer(_))
    }

    pub fn as_f64(&self) -> f64 {
        match self.0 {
            GradeRepr::Integer(v) => v as f64,
            GradeRepr::Decimal(v) => v,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            GradeRepr::Integer(v) => write!(f, "{}", v),
            GradeRepr::Decimal(v) if v.fract() == 0.0 => write!(f, "{:.1}", v),
            GradeRepr::Decimal(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Grade {
    fn from(value: i64) -> Self {
        Grade::integer(value)
    }
}

impl From<i32> for Grade {
    fn from(value: i32) -> Self {
        Grade::integer(value.into())
    }
}

impl TryFrom<f64> for Grade {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Grade::decimal(value)
    }
}

/// `"15"` parses as an integer grade, `"15.0"` and `"15.5"` as decimals.
impl FromStr for Grade {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Grade::integer(v));
        }
        s.parse::<f64>()
            .map_err(|_| Error::InvalidGrade)
            .and_then(Grade::decimal)
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            GradeRepr::Integer(v) => serializer.serialize_i64(v),
            GradeRepr::Decimal(v) => serializer.serialize_f64(v),
        }
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Integer(i64),
            Decimal(f64),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Integer(v) => Ok(Grade::integer(v)),
            Wire::Decimal(v) => Grade::decimal(v).map_err(serde::de::Error::custom),
        }
    }
}

/// Diploma fields before signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiplomaDraft {
    pub title: String,
    pub recipient_name: String,
    /// Pre-formatted date (day/month/year). Compared byte for byte.
    pub date: String,
    pub average: Grade,
}

impl DiplomaDraft {
    pub fn new(
        title: impl Into<String>,
        recipient_name: impl Into<String>,
        date: impl Into<String>,
        average: impl Into<Grade>,
    ) -> Self {
        Self {
            title: title.into(),
            recipient_name: recipient_name.into(),
            date: date.into(),
            average: average.into(),
        }
    }

    /// Attach the issuer signature, producing the complete record.
    pub fn with_signature(self, signature: Vec<u8>) -> DiplomaRecord {
        DiplomaRecord {
            title: self.title,
            recipient_name: self.recipient_name,
            date: self.date,
            average: self.average,
            signature,
        }
    }
}

/// A signed diploma, as carried inside the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiplomaRecord {
    pub title: String,
    pub recipient_name: String,
    pub date: String,
    pub average: Grade,
    /// DER-encoded signature over the canonical string.
    #[serde(with = "signature_b64")]
    pub signature: Vec<u8>,
}

impl DiplomaRecord {
    /// The record without its signature.
    pub fn draft(&self) -> DiplomaDraft {
        DiplomaDraft {
            title: self.title.clone(),
            recipient_name: self.recipient_name.clone(),
            date: self.date.clone(),
            average: self.average,
        }
    }
}

mod signature_b64 {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}
