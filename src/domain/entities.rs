use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::Date;

use super::rate::RateError;

/// Trailer type hauling the shipment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentType {
    DryVan,
    Reefer,
    Flatbed,
}

impl EquipmentType {
    pub const ALL: [EquipmentType; 3] = [Self::DryVan, Self::Reefer, Self::Flatbed];

    /// Wire name, as used in requests and the persisted ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DryVan => "dry_van",
            Self::Reefer => "reefer",
            Self::Flatbed => "flatbed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DryVan => "Dry Van",
            Self::Reefer => "Reefer",
            Self::Flatbed => "Flatbed",
        }
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentType {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RateError::UnknownEquipment(s.to_string()))
    }
}

/// One computed shipment quote. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub origin: String,
    pub destination: String,
    pub equipment_type: EquipmentType,
    /// Pounds.
    pub weight: f64,
    #[serde(with = "iso_date")]
    pub pickup_date: Date,
    /// Kilometers.
    pub distance: f64,
    pub days: u32,
    pub base_rate: f64,
    pub equipment_charge: f64,
    pub fuel_surcharge: f64,
    pub weight_factor: f64,
    pub total: f64,
}

impl Quote {
    pub fn matches_origin(&self, needle: &str) -> bool {
        contains_ignore_case(&self.origin, needle)
    }

    pub fn matches_destination(&self, needle: &str) -> bool {
        contains_ignore_case(&self.destination, needle)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Incoming quote request. Every field is optional on the wire so a missing one can be
/// reported by name instead of as a generic decode failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub equipment_type: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub pickup_date: Option<String>,
    /// Distance the caller already holds from its own cache, in kilometers.
    #[serde(default)]
    pub cache_distance: Option<f64>,
}

/// Places the caller confirmed through its location picker.
///
/// When supplied, the request's origin and destination must equal these exactly, which
/// catches a text field edited after a place was picked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocationSelection {
    pub origin: Option<String>,
    pub destination: Option<String>,
}

impl LocationSelection {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
            destination: Some(destination.into()),
        }
    }
}

pub mod iso_date {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use time::{macros::format_description, Date};

    pub fn parse(raw: &str) -> Result<Date, time::error::Parse> {
        Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
    }

    pub fn format(date: &Date) -> String {
        date.format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_else(|_| date.to_string())
    }

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }
}
