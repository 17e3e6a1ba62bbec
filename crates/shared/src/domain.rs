use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

macro_rules! string_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id_newtype!(EntryId);
string_id_newtype!(ExerciseKind);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for EntryId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Backends hand out either numeric or string primary keys.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntryId {
    Text(String),
    Number(i64),
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawEntryId::deserialize(deserializer)? {
            RawEntryId::Text(value) => Self(value),
            RawEntryId::Number(value) => Self(value.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid exercise kind {0:?}: expected a non-empty slug of [a-z0-9-_]")]
pub struct InvalidExerciseKind(pub String);

impl ExerciseKind {
    pub fn new(slug: impl Into<String>) -> Result<Self, InvalidExerciseKind> {
        let slug = slug.into();
        let valid = !slug.is_empty()
            && slug
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(slug))
        } else {
            Err(InvalidExerciseKind(slug))
        }
    }
}

impl std::str::FromStr for ExerciseKind {
    type Err = InvalidExerciseKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for ExerciseKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Locally-unique id of one repeated sub-entry inside a wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_accepts_numbers_and_strings() {
        let ids: Vec<EntryId> = serde_json::from_str(r#"[42, "abc-1"]"#).expect("ids");
        assert_eq!(ids, vec![EntryId::from(42), EntryId::from("abc-1")]);
    }

    #[test]
    fn exercise_kind_rejects_path_characters() {
        assert!(ExerciseKind::new("wise-mind").is_ok());
        assert!(ExerciseKind::new("coping_statements2").is_ok());
        assert!(ExerciseKind::new("").is_err());
        assert!(ExerciseKind::new("../admin").is_err());
        assert!(ExerciseKind::new("Wise Mind").is_err());
    }
}
