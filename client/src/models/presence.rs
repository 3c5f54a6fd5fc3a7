use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::manager::cache::Identifiable;
use crate::models::{raw, GuildId, Patch, UserId};

/// Cached presence of one user inside one guild.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Presence {
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
    pub status: Status,
    pub activities: Vec<Activity>,
    pub client_status: Option<ClientStatus>,
}

impl Identifiable for Presence {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.user_id.clone()
    }
}

impl Patch for Presence {
    fn patch(&mut self, data: &Value) {
        if let Some(status) = raw::string(data, "status") {
            self.status = Status::from(status.as_str());
        }
        if let Some(activities) = data.get("activities").and_then(Value::as_array) {
            self.activities = activities.iter()
                .filter_map(|activity| serde_json::from_value(activity.clone()).ok())
                .collect();
        }
        if raw::has(data, "client_status") {
            self.client_status = data.get("client_status")
                .and_then(|status| serde_json::from_value(status.clone()).ok());
        }
    }
}

impl Presence {
    pub fn new(user_id: UserId, guild_id: Option<GuildId>) -> Self {
        Self {
            user_id,
            guild_id,
            status: Status::Offline,
            activities: Vec::new(),
            client_status: None,
        }
    }

    /// Structural equality over observable fields.
    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }
}

/// The online status carried by a presence.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Dnd,
    Idle,
    Invisible,
    Offline
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        match value {
            "online" => Self::Online,
            "dnd" => Self::Dnd,
            "idle" => Self::Idle,
            "invisible" => Self::Invisible,
            _ => Self::Offline
        }
    }
}

/// Per-platform status breakdown.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClientStatus {
    pub desktop: Option<Status>,
    pub mobile: Option<Status>,
    pub web: Option<Status>,
}

/// One activity entry of a presence.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub url: Option<String>,
    pub state: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ActivityKind {
    Game = 0,
    Streaming = 1,
    Listening = 2,
    Watching = 3,
    Custom = 4,
    Competing = 5
}

impl Serialize for ActivityKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> where S: serde::Serializer {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for ActivityKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error> where D: serde::Deserializer<'de> {
        let value = u8::deserialize(deserializer)?;

        match value {
            0 => Ok(ActivityKind::Game),
            1 => Ok(ActivityKind::Streaming),
            2 => Ok(ActivityKind::Listening),
            3 => Ok(ActivityKind::Watching),
            4 => Ok(ActivityKind::Custom),
            5 => Ok(ActivityKind::Competing),
            _ => Err(serde::de::Error::custom("Invalid activity kind"))
        }
    }
}
