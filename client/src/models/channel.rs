use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::manager::cache::{Cache, Identifiable};
use crate::models::flags::ChannelFlags;
use crate::models::message::Message;
use crate::models::{raw, ChannelId, GuildId, Patch, Snowflake, UserId};

/// Represent every kind of channel, by wire type code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub enum ChannelKind {
    Text = 0,
    Dm = 1,
    Voice = 2,
    Category = 4,
    Announcement = 5,
    AnnouncementThread = 10,
    PublicThread = 11,
    PrivateThread = 12,
    Stage = 13,
    Forum = 15
}

impl ChannelKind {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Text),
            1 => Some(Self::Dm),
            2 => Some(Self::Voice),
            4 => Some(Self::Category),
            5 => Some(Self::Announcement),
            10 => Some(Self::AnnouncementThread),
            11 => Some(Self::PublicThread),
            12 => Some(Self::PrivateThread),
            13 => Some(Self::Stage),
            15 => Some(Self::Forum),
            _ => None
        }
    }

    pub fn code(&self) -> u64 {
        *self as u64
    }

    pub fn is_thread(&self) -> bool {
        matches!(self, Self::AnnouncementThread | Self::PublicThread | Self::PrivateThread)
    }

    /// Whether a channel of this kind carries a message cache.
    pub fn is_text_capable(&self) -> bool {
        matches!(
            self,
            Self::Text | Self::Dm | Self::Announcement | Self::Forum
                | Self::AnnouncementThread | Self::PublicThread | Self::PrivateThread
        )
    }
}

/// Capability of a channel kind to hold messages.
///
/// Implemented once per concrete kind that needs it, instead of sharing
/// late-bound methods across unrelated kinds.
pub trait TextCapable {
    fn messages(&self) -> &Cache<Snowflake, Message>;

    fn messages_mut(&mut self) -> &mut Cache<Snowflake, Message>;

    fn last_message_id(&self) -> Option<&Snowflake>;
}

/// Represents a channel of any concrete kind.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub enum Channel {
    Text(TextChannel),
    Dm(DmChannel),
    Voice(VoiceChannel),
    Category(CategoryChannel),
    Thread(ThreadChannel),
}

impl Identifiable for Channel {
    type Id = ChannelId;

    fn id(&self) -> ChannelId {
        match self {
            Self::Text(c) => c.id.clone(),
            Self::Dm(c) => c.id.clone(),
            Self::Voice(c) => c.id.clone(),
            Self::Category(c) => c.id.clone(),
            Self::Thread(c) => c.id.clone(),
        }
    }
}

impl Patch for Channel {
    fn patch(&mut self, data: &Value) {
        match self {
            Self::Text(c) => c.patch(data),
            Self::Dm(c) => c.patch(data),
            Self::Voice(c) => c.patch(data),
            Self::Category(c) => c.patch(data),
            Self::Thread(c) => c.patch(data),
        }
    }
}

impl Channel {
    /// Builds a channel of the concrete kind declared by the payload's
    /// type code. Unknown codes yield nothing.
    pub fn from_raw(data: &Value) -> Option<Self> {
        let kind = ChannelKind::from_code(raw::u64(data, "type")?)?;
        Self::from_kind(kind, data)
    }

    pub fn from_kind(kind: ChannelKind, data: &Value) -> Option<Self> {
        let id: ChannelId = raw::string(data, "id")?.into();

        let mut channel = match kind {
            ChannelKind::Text | ChannelKind::Announcement | ChannelKind::Forum =>
                Self::Text(TextChannel::new(id, kind)),
            ChannelKind::Dm =>
                Self::Dm(DmChannel::new(id)),
            ChannelKind::Voice | ChannelKind::Stage =>
                Self::Voice(VoiceChannel::new(id, kind)),
            ChannelKind::Category =>
                Self::Category(CategoryChannel::new(id)),
            ChannelKind::AnnouncementThread | ChannelKind::PublicThread | ChannelKind::PrivateThread =>
                Self::Thread(ThreadChannel::new(id, kind)),
        };
        channel.patch(data);

        Some(channel)
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Text(c) => c.kind,
            Self::Dm(_) => ChannelKind::Dm,
            Self::Voice(c) => c.kind,
            Self::Category(_) => ChannelKind::Category,
            Self::Thread(c) => c.kind,
        }
    }

    pub fn guild_id(&self) -> Option<&GuildId> {
        match self {
            Self::Text(c) => c.guild_id.as_ref(),
            Self::Dm(_) => None,
            Self::Voice(c) => c.guild_id.as_ref(),
            Self::Category(c) => c.guild_id.as_ref(),
            Self::Thread(c) => c.guild_id.as_ref(),
        }
    }

    pub fn parent_id(&self) -> Option<&ChannelId> {
        match self {
            Self::Text(c) => c.parent_id.as_ref(),
            Self::Dm(_) => None,
            Self::Voice(c) => c.parent_id.as_ref(),
            Self::Category(_) => None,
            Self::Thread(c) => c.parent_id.as_ref(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Text(c) => c.name.as_deref(),
            Self::Dm(_) => None,
            Self::Voice(c) => c.name.as_deref(),
            Self::Category(c) => c.name.as_deref(),
            Self::Thread(c) => c.name.as_deref(),
        }
    }

    pub fn partial(&self) -> bool {
        match self {
            Self::Text(c) => c.partial,
            Self::Dm(c) => c.partial,
            Self::Voice(c) => c.partial,
            Self::Category(c) => c.partial,
            Self::Thread(c) => c.partial,
        }
    }

    pub fn as_thread(&self) -> Option<&ThreadChannel> {
        match self {
            Self::Thread(thread) => Some(thread),
            _ => None
        }
    }

    pub fn as_thread_mut(&mut self) -> Option<&mut ThreadChannel> {
        match self {
            Self::Thread(thread) => Some(thread),
            _ => None
        }
    }

    /// Message-cache access for text-capable kinds.
    pub fn text(&self) -> Option<&dyn TextCapable> {
        match self {
            Self::Text(c) => Some(c),
            Self::Dm(c) => Some(c),
            Self::Thread(c) => Some(c),
            _ => None
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut dyn TextCapable> {
        match self {
            Self::Text(c) => Some(c),
            Self::Dm(c) => Some(c),
            Self::Thread(c) => Some(c),
            _ => None
        }
    }

    /// Moves the message cache out, for migration into a replacement
    /// instance of another text-capable kind.
    pub fn take_messages(&mut self) -> Option<Cache<Snowflake, Message>> {
        self.text_mut().map(|text| std::mem::take(text.messages_mut()))
    }

    pub fn install_messages(&mut self, messages: Cache<Snowflake, Message>) {
        if let Some(text) = self.text_mut() {
            *text.messages_mut() = messages;
        }
    }

    fn overwrites_mut(&mut self) -> Option<&mut Vec<PermissionOverwrite>> {
        match self {
            Self::Text(c) => Some(&mut c.permission_overwrites),
            Self::Voice(c) => Some(&mut c.permission_overwrites),
            Self::Category(c) => Some(&mut c.permission_overwrites),
            _ => None
        }
    }

    /// Records a single permission overwrite; an overwrite for the same
    /// role or member is replaced in place. Kinds without overwrites
    /// yield nothing.
    pub fn add_overwrite(&mut self, data: &Value) -> Option<Snowflake> {
        let overwrite: PermissionOverwrite = serde_json::from_value(data.clone()).ok()?;
        let id = overwrite.id.clone();

        let overwrites = self.overwrites_mut()?;
        match overwrites.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = overwrite,
            None => overwrites.push(overwrite),
        }

        Some(id)
    }

    /// Drops the overwrite targeting the given role or member, returning
    /// the removed record.
    pub fn remove_overwrite(&mut self, id: &Snowflake) -> Option<PermissionOverwrite> {
        let overwrites = self.overwrites_mut()?;
        let position = overwrites.iter().position(|existing| existing.id == *id)?;

        Some(overwrites.remove(position))
    }

    /// Structural equality over observable fields; message and member
    /// caches are not part of a channel's observable state.
    pub fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.equals(b),
            (Self::Dm(a), Self::Dm(b)) => a.equals(b),
            (Self::Voice(a), Self::Voice(b)) => a == b,
            (Self::Category(a), Self::Category(b)) => a == b,
            (Self::Thread(a), Self::Thread(b)) => a.equals(b),
            _ => false
        }
    }
}

/// Represents a guild text-like channel (text, announcement, forum).
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct TextChannel {
    pub id: ChannelId,
    pub kind: ChannelKind,
    pub guild_id: Option<GuildId>,
    pub name: Option<String>,
    pub position: Option<u64>,
    pub parent_id: Option<ChannelId>,
    pub topic: Option<String>,
    pub nsfw: Option<bool>,
    /// May not point to an existing or valid message
    pub last_message_id: Option<Snowflake>,
    pub rate_limit_per_user: Option<u64>,
    pub last_pin_timestamp: Option<DateTime<Utc>>,
    pub permission_overwrites: Vec<PermissionOverwrite>,
    pub flags: Option<ChannelFlags>,
    pub partial: bool,

    #[serde(default)]
    pub messages: Cache<Snowflake, Message>,
}

impl TextChannel {
    fn new(id: ChannelId, kind: ChannelKind) -> Self {
        Self {
            id,
            kind,
            guild_id: None,
            name: None,
            position: None,
            parent_id: None,
            topic: None,
            nsfw: None,
            last_message_id: None,
            rate_limit_per_user: None,
            last_pin_timestamp: None,
            permission_overwrites: Vec::new(),
            flags: None,
            partial: true,
            messages: Cache::new(),
        }
    }

    pub fn equals(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.guild_id == other.guild_id
            && self.name == other.name
            && self.position == other.position
            && self.parent_id == other.parent_id
            && self.topic == other.topic
            && self.nsfw == other.nsfw
            && self.last_message_id == other.last_message_id
            && self.rate_limit_per_user == other.rate_limit_per_user
            && self.last_pin_timestamp == other.last_pin_timestamp
            && self.permission_overwrites == other.permission_overwrites
            && self.flags == other.flags
    }
}

impl Patch for TextChannel {
    fn patch(&mut self, data: &Value) {
        if let Some(code) = raw::u64(data, "type") {
            if let Some(kind) = ChannelKind::from_code(code) {
                self.kind = kind;
            }
        }
        if raw::has(data, "guild_id") { self.guild_id = raw::string(data, "guild_id").map(GuildId::from); }
        if let Some(name) = raw::string(data, "name") {
            self.name = Some(name);
            self.partial = false;
        }
        if raw::has(data, "position") { self.position = raw::u64(data, "position"); }
        if raw::has(data, "parent_id") { self.parent_id = raw::string(data, "parent_id").map(ChannelId::from); }
        if raw::has(data, "topic") { self.topic = raw::string(data, "topic"); }
        if raw::has(data, "nsfw") { self.nsfw = raw::boolean(data, "nsfw"); }
        if raw::has(data, "last_message_id") { self.last_message_id = raw::string(data, "last_message_id").map(Snowflake::from); }
        if raw::has(data, "rate_limit_per_user") { self.rate_limit_per_user = raw::u64(data, "rate_limit_per_user"); }
        if raw::has(data, "last_pin_timestamp") { self.last_pin_timestamp = raw::datetime(data, "last_pin_timestamp"); }
        if let Some(overwrites) = PermissionOverwrite::list_from_raw(data) { self.permission_overwrites = overwrites; }
        if let Some(flags) = raw::u64(data, "flags") { self.flags = Some(flags.into()); }
    }
}

impl TextCapable for TextChannel {
    fn messages(&self) -> &Cache<Snowflake, Message> {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Cache<Snowflake, Message> {
        &mut self.messages
    }

    fn last_message_id(&self) -> Option<&Snowflake> {
        self.last_message_id.as_ref()
    }
}

/// Represents a direct-message channel.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct DmChannel {
    pub id: ChannelId,
    pub last_message_id: Option<Snowflake>,
    pub last_pin_timestamp: Option<DateTime<Utc>>,
    pub recipient_ids: Vec<UserId>,
    pub partial: bool,

    #[serde(default)]
    pub messages: Cache<Snowflake, Message>,
}

impl DmChannel {
    fn new(id: ChannelId) -> Self {
        Self {
            id,
            last_message_id: None,
            last_pin_timestamp: None,
            recipient_ids: Vec::new(),
            partial: true,
            messages: Cache::new(),
        }
    }

    pub fn equals(&self, other: &Self) -> bool {
        self.id == other.id
            && self.last_message_id == other.last_message_id
            && self.last_pin_timestamp == other.last_pin_timestamp
            && self.recipient_ids == other.recipient_ids
    }
}

impl Patch for DmChannel {
    fn patch(&mut self, data: &Value) {
        if raw::has(data, "last_message_id") { self.last_message_id = raw::string(data, "last_message_id").map(Snowflake::from); }
        if raw::has(data, "last_pin_timestamp") { self.last_pin_timestamp = raw::datetime(data, "last_pin_timestamp"); }
        if let Some(recipients) = data.get("recipients").and_then(Value::as_array) {
            self.recipient_ids = recipients.iter()
                .filter_map(|user| raw::string(user, "id").map(UserId::from))
                .collect();
            self.partial = false;
        }
    }
}

impl TextCapable for DmChannel {
    fn messages(&self) -> &Cache<Snowflake, Message> {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Cache<Snowflake, Message> {
        &mut self.messages
    }

    fn last_message_id(&self) -> Option<&Snowflake> {
        self.last_message_id.as_ref()
    }
}

/// Represents a guild voice or stage channel. Voice-family kinds carry no
/// message cache.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct VoiceChannel {
    pub id: ChannelId,
    pub kind: ChannelKind,
    pub guild_id: Option<GuildId>,
    pub name: Option<String>,
    pub position: Option<u64>,
    pub parent_id: Option<ChannelId>,
    pub bitrate: Option<u64>,
    pub user_limit: Option<u64>,
    pub rtc_region: Option<String>,
    pub permission_overwrites: Vec<PermissionOverwrite>,
    pub partial: bool,
}

impl VoiceChannel {
    fn new(id: ChannelId, kind: ChannelKind) -> Self {
        Self {
            id,
            kind,
            guild_id: None,
            name: None,
            position: None,
            parent_id: None,
            bitrate: None,
            user_limit: None,
            rtc_region: None,
            permission_overwrites: Vec::new(),
            partial: true,
        }
    }
}

impl Patch for VoiceChannel {
    fn patch(&mut self, data: &Value) {
        if let Some(code) = raw::u64(data, "type") {
            if let Some(kind) = ChannelKind::from_code(code) {
                self.kind = kind;
            }
        }
        if raw::has(data, "guild_id") { self.guild_id = raw::string(data, "guild_id").map(GuildId::from); }
        if let Some(name) = raw::string(data, "name") {
            self.name = Some(name);
            self.partial = false;
        }
        if raw::has(data, "position") { self.position = raw::u64(data, "position"); }
        if raw::has(data, "parent_id") { self.parent_id = raw::string(data, "parent_id").map(ChannelId::from); }
        if raw::has(data, "bitrate") { self.bitrate = raw::u64(data, "bitrate"); }
        if raw::has(data, "user_limit") { self.user_limit = raw::u64(data, "user_limit"); }
        if raw::has(data, "rtc_region") { self.rtc_region = raw::string(data, "rtc_region"); }
        if let Some(overwrites) = PermissionOverwrite::list_from_raw(data) { self.permission_overwrites = overwrites; }
    }
}

/// Represents a guild category channel.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CategoryChannel {
    pub id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub name: Option<String>,
    pub position: Option<u64>,
    pub permission_overwrites: Vec<PermissionOverwrite>,
    pub partial: bool,
}

impl CategoryChannel {
    fn new(id: ChannelId) -> Self {
        Self {
            id,
            guild_id: None,
            name: None,
            position: None,
            permission_overwrites: Vec::new(),
            partial: true,
        }
    }
}

impl Patch for CategoryChannel {
    fn patch(&mut self, data: &Value) {
        if raw::has(data, "guild_id") { self.guild_id = raw::string(data, "guild_id").map(GuildId::from); }
        if let Some(name) = raw::string(data, "name") {
            self.name = Some(name);
            self.partial = false;
        }
        if raw::has(data, "position") { self.position = raw::u64(data, "position"); }
        if let Some(overwrites) = PermissionOverwrite::list_from_raw(data) { self.permission_overwrites = overwrites; }
    }
}

/// Represents a thread channel, owned by a parent channel and a guild.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ThreadChannel {
    pub id: ChannelId,
    pub kind: ChannelKind,
    pub guild_id: Option<GuildId>,
    pub parent_id: Option<ChannelId>,
    pub name: Option<String>,
    pub owner_id: Option<UserId>,
    pub last_message_id: Option<Snowflake>,
    pub message_count: Option<u64>,
    pub member_count: Option<u64>,
    pub rate_limit_per_user: Option<u64>,
    pub metadata: Option<ThreadMetadata>,
    pub partial: bool,

    /// Users participating in this thread.
    #[serde(default)]
    pub members: Cache<UserId, ThreadMember>,
    #[serde(default)]
    pub messages: Cache<Snowflake, Message>,
}

impl ThreadChannel {
    fn new(id: ChannelId, kind: ChannelKind) -> Self {
        Self {
            id,
            kind,
            guild_id: None,
            parent_id: None,
            name: None,
            owner_id: None,
            last_message_id: None,
            message_count: None,
            member_count: None,
            rate_limit_per_user: None,
            metadata: None,
            partial: true,
            members: Cache::new(),
            messages: Cache::new(),
        }
    }

    pub fn equals(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.guild_id == other.guild_id
            && self.parent_id == other.parent_id
            && self.name == other.name
            && self.owner_id == other.owner_id
            && self.last_message_id == other.last_message_id
            && self.message_count == other.message_count
            && self.member_count == other.member_count
            && self.rate_limit_per_user == other.rate_limit_per_user
            && self.metadata == other.metadata
    }
}

impl Patch for ThreadChannel {
    fn patch(&mut self, data: &Value) {
        if let Some(code) = raw::u64(data, "type") {
            if let Some(kind) = ChannelKind::from_code(code) {
                self.kind = kind;
            }
        }
        if raw::has(data, "guild_id") { self.guild_id = raw::string(data, "guild_id").map(GuildId::from); }
        if raw::has(data, "parent_id") { self.parent_id = raw::string(data, "parent_id").map(ChannelId::from); }
        if let Some(name) = raw::string(data, "name") {
            self.name = Some(name);
            self.partial = false;
        }
        if raw::has(data, "owner_id") { self.owner_id = raw::string(data, "owner_id").map(UserId::from); }
        if raw::has(data, "last_message_id") { self.last_message_id = raw::string(data, "last_message_id").map(Snowflake::from); }
        if raw::has(data, "message_count") { self.message_count = raw::u64(data, "message_count"); }
        if raw::has(data, "member_count") { self.member_count = raw::u64(data, "member_count"); }
        if raw::has(data, "rate_limit_per_user") { self.rate_limit_per_user = raw::u64(data, "rate_limit_per_user"); }
        if let Some(metadata) = data.get("thread_metadata") {
            self.metadata = serde_json::from_value(metadata.clone()).ok();
        }
    }
}

impl TextCapable for ThreadChannel {
    fn messages(&self) -> &Cache<Snowflake, Message> {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Cache<Snowflake, Message> {
        &mut self.messages
    }

    fn last_message_id(&self) -> Option<&Snowflake> {
        self.last_message_id.as_ref()
    }
}

/// Represents a permission overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PermissionOverwrite {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: PermissionOverwriteKind,
    pub allow: String,
    pub deny: String,
}

impl PermissionOverwrite {
    fn list_from_raw(data: &Value) -> Option<Vec<Self>> {
        let overwrites = data.get("permission_overwrites")?.as_array()?;
        Some(
            overwrites.iter()
                .filter_map(|overwrite| serde_json::from_value(overwrite.clone()).ok())
                .collect()
        )
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PermissionOverwriteKind {
    Role = 0,
    Member = 1,
}

impl Serialize for PermissionOverwriteKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> where S: serde::Serializer {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for PermissionOverwriteKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error> where D: serde::Deserializer<'de> {
        let value = u8::deserialize(deserializer)?;

        match value {
            0 => Ok(Self::Role),
            1 => Ok(Self::Member),
            _ => Err(serde::de::Error::custom(format!("unknown overwrite kind: {}", value)))
        }
    }
}

/// Represents a thread's archival metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ThreadMetadata {
    pub archived: bool,
    pub auto_archive_duration: u64,
    pub archive_timestamp: Option<DateTime<Utc>>,
    pub locked: bool,
    pub invitable: Option<bool>,
    pub create_timestamp: Option<DateTime<Utc>>,
}

/// Represents one user's membership of a thread.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ThreadMember {
    pub thread_id: Option<ChannelId>,
    pub user_id: UserId,
    pub join_timestamp: Option<DateTime<Utc>>,
    pub flags: Option<u64>,
}

impl Identifiable for ThreadMember {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.user_id.clone()
    }
}

impl ThreadMember {
    pub fn from_raw(data: &Value) -> Option<Self> {
        let user_id: UserId = raw::string(data, "user_id")?.into();

        Some(Self {
            thread_id: raw::string(data, "id").map(ChannelId::from),
            user_id,
            join_timestamp: raw::datetime(data, "join_timestamp"),
            flags: raw::u64(data, "flags"),
        })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use super::*;

    #[test]
    fn from_raw_picks_the_declared_kind() {
        let text = Channel::from_raw(&json!({ "id": "1", "type": 0, "name": "general" })).unwrap();
        assert!(matches!(text, Channel::Text(_)));
        assert!(text.text().is_some());

        let voice = Channel::from_raw(&json!({ "id": "2", "type": 2, "name": "lounge" })).unwrap();
        assert!(matches!(voice, Channel::Voice(_)));
        assert!(voice.text().is_none());

        assert!(Channel::from_raw(&json!({ "id": "3", "type": 99 })).is_none());
    }

    #[test]
    fn message_migration_moves_the_cache() {
        let mut old = Channel::from_raw(&json!({ "id": "1", "type": 0, "name": "general" })).unwrap();
        let message = Message::from_raw(&json!({ "id": "10", "channel_id": "1" })).unwrap();
        old.text_mut().unwrap().messages_mut().insert(message.id.clone(), message);

        let mut replacement = Channel::from_kind(
            ChannelKind::Announcement,
            &json!({ "id": "1", "type": 5, "name": "general" })
        ).unwrap();
        replacement.install_messages(old.take_messages().unwrap());

        assert_eq!(replacement.text().unwrap().messages().len(), 1);
        assert!(old.text().unwrap().messages().is_empty());
    }

    #[test]
    fn overwrite_add_replaces_an_existing_target() {
        let mut channel = Channel::from_raw(&json!({ "id": "1", "type": 0, "name": "general" })).unwrap();

        channel.add_overwrite(&json!({ "id": "30", "type": 0, "allow": "0", "deny": "0" })).unwrap();
        channel.add_overwrite(&json!({ "id": "30", "type": 0, "allow": "8", "deny": "0" })).unwrap();

        match &channel {
            Channel::Text(text) => {
                assert_eq!(text.permission_overwrites.len(), 1);
                assert_eq!(text.permission_overwrites[0].allow, "8");
            }
            other => panic!("unexpected channel {other:?}"),
        }

        let removed = channel.remove_overwrite(&"30".into()).unwrap();
        assert_eq!(removed.allow, "8");
        assert!(channel.remove_overwrite(&"30".into()).is_none());
    }

    #[test]
    fn overwrites_are_not_carried_by_dm_channels() {
        let mut dm = Channel::from_raw(&json!({ "id": "4", "type": 1 })).unwrap();

        assert!(dm.add_overwrite(&json!({ "id": "30", "type": 1, "allow": "0", "deny": "0" })).is_none());
    }

    #[test]
    fn equals_ignores_the_message_cache() {
        let a = Channel::from_raw(&json!({ "id": "1", "type": 0, "name": "general" })).unwrap();
        let mut b = a.clone();
        let message = Message::from_raw(&json!({ "id": "10", "channel_id": "1" })).unwrap();
        b.text_mut().unwrap().messages_mut().insert(message.id.clone(), message);

        assert!(a.equals(&b));
    }
}
