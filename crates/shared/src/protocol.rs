use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::EntryId;

/// Field id to free-text value, in the order the exercise declares them.
pub type EntryFields = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    #[serde(with = "flexible_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub fields: EntryFields,
}

impl Entry {
    pub fn created_at_secs(&self) -> i64 {
        self.created_at.timestamp()
    }

    /// Non-empty field values in field order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields
            .values()
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    pub fields: EntryFields,
}

/// `createdAt` arrives as unix seconds, unix milliseconds or RFC 3339 depending
/// on the backend route; it is always written back as unix seconds.
pub mod flexible_timestamp {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    /// Integers at or above this are read as milliseconds (year 33658 in seconds).
    const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Integer(i64),
        Float(f64),
        Text(String),
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.timestamp())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Integer(raw) => from_unix(raw).ok_or_else(|| {
                D::Error::custom(format!("timestamp {raw} is out of range"))
            }),
            RawTimestamp::Float(raw) => from_unix(raw.trunc() as i64)
                .ok_or_else(|| D::Error::custom(format!("timestamp {raw} is out of range"))),
            RawTimestamp::Text(raw) => {
                if let Ok(number) = raw.trim().parse::<i64>() {
                    return from_unix(number).ok_or_else(|| {
                        D::Error::custom(format!("timestamp {raw} is out of range"))
                    });
                }
                DateTime::parse_from_rfc3339(raw.trim())
                    .map(|parsed| parsed.with_timezone(&Utc))
                    .map_err(|err| D::Error::custom(format!("invalid timestamp {raw:?}: {err}")))
            }
        }
    }

    pub fn from_unix(raw: i64) -> Option<DateTime<Utc>> {
        if raw.unsigned_abs() >= MILLIS_THRESHOLD.unsigned_abs() {
            Utc.timestamp_millis_opt(raw).single()
        } else {
            Utc.timestamp_opt(raw, 0).single()
        }
    }
}
