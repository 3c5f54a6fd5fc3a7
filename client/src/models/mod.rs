pub mod events;
pub mod user;
pub mod guild;
pub mod channel;
pub mod message;
pub mod presence;
pub mod flags;

use std::fmt::Display;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use error::{Error, ModelError, Result};
use crate::constants::EPOCH;

/// Represent a snowflake identifier: a creation timestamp plus uniqueness bits
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Snowflake(pub String);

impl Snowflake {
    /// Extract the creation timestamp embedded in the snowflake
    pub fn get_timestamp(&self) -> Result<DateTime<Utc>> {
        let timestamp = match self.0.parse::<u64>() {
            Ok(timestamp) => timestamp,
            Err(_) => return Err(Error::Model(ModelError::InvalidSnowflake("Failed to parse snowflake".into())))
        };

        let timestamp = (timestamp >> 22) + EPOCH;

        match Utc.timestamp_millis_opt(timestamp as i64).single() {
            Some(datetime) => Ok(datetime),
            None => Err(Error::Model(ModelError::InvalidSnowflake("Failed to convert timestamp to DateTime<Utc>".into())))
        }
    }
}

impl From<&str> for Snowflake {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}
impl From<String> for Snowflake {
    fn from(s: String) -> Self {
        Self(s)
    }
}
impl From<&String> for Snowflake {
    fn from(s: &String) -> Self {
        Self(s.into())
    }
}
impl From<&Snowflake> for Snowflake {
    fn from(s: &Snowflake) -> Self {
        s.clone()
    }
}
impl From<Snowflake> for String {
    fn from(value: Snowflake) -> Self {
        value.0
    }
}

impl Display for Snowflake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(pub Snowflake);

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s.into())
            }
        }
        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.into())
            }
        }
        impl From<Snowflake> for $name {
            fn from(s: Snowflake) -> Self {
                Self(s)
            }
        }
        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0.into()
            }
        }
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(/// Represents a guild ID.
    GuildId);
id_newtype!(/// Represents a channel ID.
    ChannelId);
id_newtype!(/// Represents a user ID.
    UserId);
id_newtype!(/// Represents a role ID.
    RoleId);

/// Lifecycle state of a cached entity.
///
/// An entity removed from its cache is flagged `Deleted` so that callers
/// still holding a reference can tell it no longer mirrors remote state.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Lifecycle {
    #[default]
    Alive,
    Deleted
}

/// In-place merge of a raw event payload into a cached entity.
///
/// Only the fields present in the payload are applied; everything else is
/// left untouched, so a sparse update never erases known state.
pub trait Patch {
    fn patch(&mut self, data: &Value);
}

/// Defensive readers for raw gateway payloads.
///
/// Optional keys are the norm, so every read is checked before use.
pub(crate) mod raw {
    use chrono::{DateTime, Utc};
    use serde_json::Value;

    pub fn string(data: &Value, key: &str) -> Option<String> {
        data.get(key).and_then(Value::as_str).map(String::from)
    }

    pub fn u64(data: &Value, key: &str) -> Option<u64> {
        data.get(key).and_then(Value::as_u64)
    }

    pub fn boolean(data: &Value, key: &str) -> Option<bool> {
        data.get(key).and_then(Value::as_bool)
    }

    pub fn datetime(data: &Value, key: &str) -> Option<DateTime<Utc>> {
        data.get(key)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    /// `true` when the key is present, even if its value is `null`.
    pub fn has(data: &Value, key: &str) -> bool {
        data.get(key).is_some()
    }

    /// `true` when the key is present with an explicit `null` value.
    pub fn is_null(data: &Value, key: &str) -> bool {
        matches!(data.get(key), Some(Value::Null))
    }
}

#[cfg(test)]
mod test {
    use super::Snowflake;

    #[test]
    fn snowflake_timestamp() {
        let flake = Snowflake::from("175928847299117063");
        let timestamp = flake.get_timestamp().unwrap();
        assert_eq!(timestamp.timestamp(), 1462015105);
    }

    #[test]
    fn snowflake_timestamp_rejects_garbage() {
        let flake = Snowflake::from("not-a-snowflake");
        assert!(flake.get_timestamp().is_err());
    }
}
