use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::manager::cache::{Cache, Identifiable};
use crate::models::flags::MessageFlags;
use crate::models::{raw, ChannelId, GuildId, Patch, Snowflake, UserId};

/// Represent a message inside a text-capable channel.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub author_id: Option<UserId>,
    pub content: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub edited_timestamp: Option<DateTime<Utc>>,
    pub tts: Option<bool>,
    pub pinned: Option<bool>,
    pub flags: Option<MessageFlags>,
    /// Whether this message was materialized from incomplete data.
    pub partial: bool,

    /// Reactions on this message, keyed by emoji.
    #[serde(default)]
    pub reactions: Cache<ReactionKey, MessageReaction>,
}

impl Identifiable for Message {
    type Id = Snowflake;

    fn id(&self) -> Snowflake {
        self.id.clone()
    }
}

impl Patch for Message {
    fn patch(&mut self, data: &Value) {
        if raw::has(data, "guild_id") {
            self.guild_id = raw::string(data, "guild_id").map(GuildId::from);
        }
        if let Some(author) = data.get("author") {
            self.author_id = raw::string(author, "id").map(UserId::from);
            self.partial = false;
        }
        if raw::has(data, "content") {
            self.content = raw::string(data, "content");
            self.partial = false;
        }
        if raw::has(data, "timestamp") { self.timestamp = raw::datetime(data, "timestamp"); }
        if raw::has(data, "edited_timestamp") { self.edited_timestamp = raw::datetime(data, "edited_timestamp"); }
        if let Some(tts) = raw::boolean(data, "tts") { self.tts = Some(tts); }
        if let Some(pinned) = raw::boolean(data, "pinned") { self.pinned = Some(pinned); }
        if let Some(flags) = raw::u64(data, "flags") { self.flags = Some(flags.into()); }
    }
}

impl Message {
    pub fn new(id: Snowflake, channel_id: ChannelId) -> Self {
        Self {
            id,
            channel_id,
            guild_id: None,
            author_id: None,
            content: None,
            timestamp: None,
            edited_timestamp: None,
            tts: None,
            pinned: None,
            flags: None,
            partial: true,
            reactions: Cache::new(),
        }
    }

    pub fn from_raw(data: &Value) -> Option<Self> {
        let id: Snowflake = raw::string(data, "id")?.into();
        let channel_id: ChannelId = raw::string(data, "channel_id")?.into();

        let mut message = Self::new(id, channel_id);
        message.patch(data);

        Some(message)
    }

    /// Structural equality over observable fields; the reaction cache is
    /// not part of a message's observable state.
    pub fn equals(&self, other: &Self) -> bool {
        self.id == other.id
            && self.channel_id == other.channel_id
            && self.guild_id == other.guild_id
            && self.author_id == other.author_id
            && self.content == other.content
            && self.timestamp == other.timestamp
            && self.edited_timestamp == other.edited_timestamp
            && self.tts == other.tts
            && self.pinned == other.pinned
            && self.flags == other.flags
    }
}

/// The cache key of a reaction: custom emoji id, else the decoded
/// unicode name.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ReactionKey {
    Custom(Snowflake),
    Unicode(String),
}

/// Represent the emoji part of a reaction payload.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReactionEmoji {
    pub id: Option<Snowflake>,
    pub name: Option<String>,
    pub animated: Option<bool>,
}

impl ReactionEmoji {
    pub fn from_raw(data: &Value) -> Option<Self> {
        let emoji = data.get("emoji")?;

        let id = raw::string(emoji, "id").map(Snowflake::from);
        let name = raw::string(emoji, "name");
        if id.is_none() && name.is_none() {
            return None;
        }

        Some(Self { id, name, animated: raw::boolean(emoji, "animated") })
    }

    pub fn key(&self) -> Option<ReactionKey> {
        if let Some(id) = &self.id {
            return Some(ReactionKey::Custom(id.clone()));
        }

        self.name.as_deref().map(|name| ReactionKey::Unicode(percent_decode(name)))
    }
}

/// Represent one emoji's reaction state on a message.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MessageReaction {
    pub emoji: ReactionEmoji,
    /// `None` while the owning message is partial: the total is unknown
    /// until an explicit fetch fills it.
    pub count: Option<u64>,
    /// Whether the client user participates in this reaction.
    pub me: bool,
    pub users: Vec<UserId>,
}

impl MessageReaction {
    pub fn new(emoji: ReactionEmoji, count: Option<u64>, me: bool) -> Self {
        Self { emoji, count, me, users: Vec::new() }
    }

    /// Records one user's participation; duplicate delivery is a no-op.
    pub fn register(&mut self, user_id: &UserId, is_client: bool) {
        if self.users.contains(user_id) {
            return;
        }

        self.users.push(user_id.clone());
        if let Some(count) = &mut self.count {
            *count += 1;
        }
        if is_client {
            self.me = true;
        }
    }

    /// Drops one user's participation; returns `true` when the reaction
    /// has no remaining known participants.
    pub fn unregister(&mut self, user_id: &UserId, is_client: bool) -> bool {
        if let Some(position) = self.users.iter().position(|id| id == user_id) {
            self.users.remove(position);
            if let Some(count) = &mut self.count {
                *count = count.saturating_sub(1);
            }
        }
        if is_client {
            self.me = false;
        }

        self.count == Some(0)
    }
}

/// Decode percent-encoded emoji names; a name that does not decode to
/// valid UTF-8 is kept verbatim.
fn percent_decode(input: &str) -> String {
    match percent_encoding::percent_decode_str(input).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => input.to_string(),
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use super::*;

    #[test]
    fn partial_message_fills_in_on_patch() {
        let mut message = Message::from_raw(&json!({ "id": "5", "channel_id": "9" })).unwrap();
        assert!(message.partial);

        message.patch(&json!({ "content": "hello", "author": { "id": "1" } }));
        assert!(!message.partial);
        assert_eq!(message.content.as_deref(), Some("hello"));
    }

    #[test]
    fn reaction_key_prefers_custom_id() {
        let custom = ReactionEmoji::from_raw(&json!({ "emoji": { "id": "77", "name": "blob" } })).unwrap();
        assert_eq!(custom.key(), Some(ReactionKey::Custom("77".into())));

        let unicode = ReactionEmoji::from_raw(&json!({ "emoji": { "id": null, "name": "%F0%9F%91%8D" } })).unwrap();
        assert_eq!(unicode.key(), Some(ReactionKey::Unicode("👍".to_string())));
    }

    #[test]
    fn reaction_register_is_idempotent_per_user() {
        let emoji = ReactionEmoji { id: None, name: Some("👍".into()), animated: None };
        let mut reaction = MessageReaction::new(emoji, Some(0), false);

        reaction.register(&"1".into(), false);
        reaction.register(&"1".into(), false);
        assert_eq!(reaction.count, Some(1));

        reaction.register(&"2".into(), true);
        assert_eq!(reaction.count, Some(2));
        assert!(reaction.me);
    }

    #[test]
    fn unregister_reports_empty_reaction() {
        let emoji = ReactionEmoji { id: None, name: Some("👍".into()), animated: None };
        let mut reaction = MessageReaction::new(emoji, Some(0), false);
        reaction.register(&"1".into(), false);

        assert!(reaction.unregister(&"1".into(), false));
    }

    #[test]
    fn unknown_count_stays_unknown() {
        let emoji = ReactionEmoji { id: None, name: Some("👍".into()), animated: None };
        let mut reaction = MessageReaction::new(emoji, None, false);
        reaction.register(&"1".into(), false);

        assert_eq!(reaction.count, None);
        assert_eq!(reaction.users.len(), 1);
    }
}
