use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::manager::cache::{Cache, Identifiable};
use crate::models::presence::Presence;
use crate::models::{raw, ChannelId, GuildId, Lifecycle, Patch, RoleId, Snowflake, UserId};

/// Represents a guild the client is in.
///
/// A guild owns the caches for its members, roles, emojis, stickers, bans,
/// scheduled events and presences. Channels live in the global channel
/// cache; the guild only indexes their ids, so the guild/channel
/// relationship never forms a reference cycle.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Guild {
    pub id: GuildId,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub owner_id: Option<UserId>,
    /// Approximate member count, kept in step with member add/remove events.
    pub member_count: u64,
    /// `false` while the remote side reports the guild as unavailable.
    pub available: bool,
    pub verification_level: Option<u64>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub lifecycle: Lifecycle,

    /// Ids of this guild's channels in the global channel cache.
    pub channels: IndexSet<ChannelId>,
    pub members: Cache<UserId, GuildMember>,
    pub roles: Cache<RoleId, Role>,
    pub emojis: Cache<Snowflake, Emoji>,
    pub stickers: Cache<Snowflake, Sticker>,
    pub bans: Cache<UserId, GuildBan>,
    pub scheduled_events: Cache<Snowflake, ScheduledEvent>,
    pub presences: Cache<UserId, Presence>,
}

impl Identifiable for Guild {
    type Id = GuildId;

    fn id(&self) -> GuildId {
        self.id.clone()
    }
}

impl Patch for Guild {
    fn patch(&mut self, data: &Value) {
        if let Some(name) = raw::string(data, "name") { self.name = Some(name); }
        if raw::has(data, "icon") { self.icon = raw::string(data, "icon"); }
        if raw::has(data, "owner_id") { self.owner_id = raw::string(data, "owner_id").map(UserId::from); }
        if let Some(member_count) = raw::u64(data, "member_count") { self.member_count = member_count; }
        if let Some(unavailable) = raw::boolean(data, "unavailable") { self.available = !unavailable; }
        if raw::has(data, "verification_level") { self.verification_level = raw::u64(data, "verification_level"); }
        if raw::has(data, "description") { self.description = raw::string(data, "description"); }
        if let Some(features) = data.get("features").and_then(Value::as_array) {
            self.features = features.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();
        }
    }
}

impl Guild {
    pub fn new(id: GuildId) -> Self {
        Self {
            id,
            name: None,
            icon: None,
            owner_id: None,
            member_count: 0,
            available: true,
            verification_level: None,
            description: None,
            features: Vec::new(),
            lifecycle: Lifecycle::Alive,
            channels: IndexSet::new(),
            members: Cache::new(),
            roles: Cache::new(),
            emojis: Cache::new(),
            stickers: Cache::new(),
            bans: Cache::new(),
            scheduled_events: Cache::new(),
            presences: Cache::new(),
        }
    }

    pub fn from_raw(data: &Value) -> Option<Self> {
        let id: GuildId = raw::string(data, "id")?.into();

        let mut guild = Self::new(id);
        guild.patch(data);

        Some(guild)
    }

    /// Structural equality over observable fields; the sub-caches and the
    /// channel index are not part of a guild's observable state.
    pub fn equals(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.icon == other.icon
            && self.owner_id == other.owner_id
            && self.member_count == other.member_count
            && self.available == other.available
            && self.verification_level == other.verification_level
            && self.description == other.description
            && self.features == other.features
    }

    /// Update-if-present else construct-and-insert a member from a payload
    /// carrying an embedded `user`.
    pub fn add_member(&mut self, data: &Value) -> Option<UserId> {
        let user_id: UserId = data.get("user")
            .and_then(|user| raw::string(user, "id"))?
            .into();

        match self.members.get_mut(&user_id) {
            Some(member) => member.patch(data),
            None => {
                let mut member = GuildMember::new(user_id.clone(), Some(self.id.clone()));
                member.patch(data);
                self.members.insert(user_id.clone(), member);
            }
        }

        Some(user_id)
    }

    pub fn add_role(&mut self, data: &Value) -> Option<RoleId> {
        let role = Role::from_raw(data)?;
        let id = role.id.clone();

        match self.roles.get_mut(&id) {
            Some(cached) => cached.patch(data),
            None => self.roles.insert(id.clone(), role),
        }

        Some(id)
    }

    pub fn add_emoji(&mut self, data: &Value) -> Option<Snowflake> {
        let emoji = Emoji::from_raw(data)?;
        let id = emoji.id.clone();

        match self.emojis.get_mut(&id) {
            Some(cached) => cached.patch(data),
            None => self.emojis.insert(id.clone(), emoji),
        }

        Some(id)
    }

    pub fn add_sticker(&mut self, data: &Value) -> Option<Snowflake> {
        let sticker = Sticker::from_raw(data)?;
        let id = sticker.id.clone();

        match self.stickers.get_mut(&id) {
            Some(cached) => cached.patch(data),
            None => self.stickers.insert(id.clone(), sticker),
        }

        Some(id)
    }

    pub fn add_ban(&mut self, data: &Value) -> Option<UserId> {
        let ban = GuildBan::from_raw(data, &self.id)?;
        let user_id = ban.user_id.clone();
        self.bans.insert(user_id.clone(), ban);

        Some(user_id)
    }

    pub fn add_scheduled_event(&mut self, data: &Value) -> Option<Snowflake> {
        let id: Snowflake = raw::string(data, "id")?.into();

        match self.scheduled_events.get_mut(&id) {
            Some(event) => event.patch(data),
            None => {
                let mut event = ScheduledEvent::new(id.clone(), self.id.clone());
                event.patch(data);
                self.scheduled_events.insert(id.clone(), event);
            }
        }

        Some(id)
    }
}

/// Represents one user's membership of a guild.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct GuildMember {
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub roles: Vec<RoleId>,
    pub joined_at: Option<DateTime<Utc>>,
    pub premium_since: Option<DateTime<Utc>>,
    pub pending: Option<bool>,
    pub flags: Option<u64>,
    pub communication_disabled_until: Option<DateTime<Utc>>,
    pub lifecycle: Lifecycle,
    /// Whether this member was materialized from incomplete data.
    pub partial: bool,
}

impl Identifiable for GuildMember {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.user_id.clone()
    }
}

impl Patch for GuildMember {
    fn patch(&mut self, data: &Value) {
        if raw::has(data, "nick") { self.nickname = raw::string(data, "nick"); }
        if raw::has(data, "avatar") { self.avatar = raw::string(data, "avatar"); }
        if let Some(roles) = data.get("roles").and_then(Value::as_array) {
            self.roles = roles.iter()
                .filter_map(Value::as_str)
                .map(RoleId::from)
                .collect();
        }
        if let Some(joined_at) = raw::datetime(data, "joined_at") {
            self.joined_at = Some(joined_at);
            self.partial = false;
        }
        if raw::has(data, "premium_since") { self.premium_since = raw::datetime(data, "premium_since"); }
        if let Some(pending) = raw::boolean(data, "pending") { self.pending = Some(pending); }
        if let Some(flags) = raw::u64(data, "flags") { self.flags = Some(flags); }
        if raw::has(data, "communication_disabled_until") {
            self.communication_disabled_until = raw::datetime(data, "communication_disabled_until");
        }
    }
}

impl GuildMember {
    pub fn new(user_id: UserId, guild_id: Option<GuildId>) -> Self {
        Self {
            user_id,
            guild_id,
            nickname: None,
            avatar: None,
            roles: Vec::new(),
            joined_at: None,
            premium_since: None,
            pending: None,
            flags: None,
            communication_disabled_until: None,
            lifecycle: Lifecycle::Alive,
            partial: true,
        }
    }

    /// Structural equality over observable fields; lifecycle bookkeeping is
    /// excluded.
    pub fn equals(&self, other: &Self) -> bool {
        self.user_id == other.user_id
            && self.guild_id == other.guild_id
            && self.nickname == other.nickname
            && self.avatar == other.avatar
            && self.roles == other.roles
            && self.joined_at == other.joined_at
            && self.premium_since == other.premium_since
            && self.pending == other.pending
            && self.flags == other.flags
            && self.communication_disabled_until == other.communication_disabled_until
    }
}

/// Represents a role in a guild.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Role {
    pub id: RoleId,
    pub name: Option<String>,
    pub color: Option<u64>,
    /// If this role is pinned in the user listing
    pub hoist: Option<bool>,
    pub position: Option<u64>,
    pub permissions: Option<String>,
    /// Whether this role is managed by an integration
    pub managed: Option<bool>,
    pub mentionable: Option<bool>,
    pub tags: Option<RoleTags>,
}

impl Identifiable for Role {
    type Id = RoleId;

    fn id(&self) -> RoleId {
        self.id.clone()
    }
}

impl Patch for Role {
    fn patch(&mut self, data: &Value) {
        if let Some(name) = raw::string(data, "name") { self.name = Some(name); }
        if raw::has(data, "color") { self.color = raw::u64(data, "color"); }
        if raw::has(data, "hoist") { self.hoist = raw::boolean(data, "hoist"); }
        if raw::has(data, "position") { self.position = raw::u64(data, "position"); }
        if raw::has(data, "permissions") { self.permissions = raw::string(data, "permissions"); }
        if raw::has(data, "managed") { self.managed = raw::boolean(data, "managed"); }
        if raw::has(data, "mentionable") { self.mentionable = raw::boolean(data, "mentionable"); }
        if let Some(tags) = data.get("tags") {
            self.tags = serde_json::from_value(tags.clone()).ok();
        }
    }
}

impl Role {
    pub fn from_raw(data: &Value) -> Option<Self> {
        let id: RoleId = raw::string(data, "id")?.into();

        let mut role = Self {
            id,
            name: None,
            color: None,
            hoist: None,
            position: None,
            permissions: None,
            managed: None,
            mentionable: None,
            tags: None,
        };
        role.patch(data);

        Some(role)
    }

    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }
}

/// Represents the tags a role has.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct RoleTags {
    pub bot_id: Option<Snowflake>,
    pub integration_id: Option<Snowflake>,
    pub subscription_listing_id: Option<Snowflake>,
}

/// Represents a custom emoji attached to a guild.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Emoji {
    pub id: Snowflake,
    pub name: Option<String>,
    pub roles: Vec<RoleId>,
    pub animated: Option<bool>,
    pub managed: Option<bool>,
    pub available: Option<bool>,
    pub require_colons: Option<bool>,
}

impl Identifiable for Emoji {
    type Id = Snowflake;

    fn id(&self) -> Snowflake {
        self.id.clone()
    }
}

impl Patch for Emoji {
    fn patch(&mut self, data: &Value) {
        if raw::has(data, "name") { self.name = raw::string(data, "name"); }
        if let Some(roles) = data.get("roles").and_then(Value::as_array) {
            self.roles = roles.iter()
                .filter_map(Value::as_str)
                .map(RoleId::from)
                .collect();
        }
        if raw::has(data, "animated") { self.animated = raw::boolean(data, "animated"); }
        if raw::has(data, "managed") { self.managed = raw::boolean(data, "managed"); }
        if raw::has(data, "available") { self.available = raw::boolean(data, "available"); }
        if raw::has(data, "require_colons") { self.require_colons = raw::boolean(data, "require_colons"); }
    }
}

impl Emoji {
    pub fn from_raw(data: &Value) -> Option<Self> {
        let id: Snowflake = raw::string(data, "id")?.into();

        let mut emoji = Self {
            id,
            name: None,
            roles: Vec::new(),
            animated: None,
            managed: None,
            available: None,
            require_colons: None,
        };
        emoji.patch(data);

        Some(emoji)
    }

    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }
}

/// Represents a sticker attached to a guild.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Sticker {
    pub id: Snowflake,
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub format_type: Option<u64>,
    pub available: Option<bool>,
}

impl Identifiable for Sticker {
    type Id = Snowflake;

    fn id(&self) -> Snowflake {
        self.id.clone()
    }
}

impl Patch for Sticker {
    fn patch(&mut self, data: &Value) {
        if raw::has(data, "name") { self.name = raw::string(data, "name"); }
        if raw::has(data, "description") { self.description = raw::string(data, "description"); }
        if raw::has(data, "tags") { self.tags = raw::string(data, "tags"); }
        if raw::has(data, "format_type") { self.format_type = raw::u64(data, "format_type"); }
        if raw::has(data, "available") { self.available = raw::boolean(data, "available"); }
    }
}

impl Sticker {
    pub fn from_raw(data: &Value) -> Option<Self> {
        let id: Snowflake = raw::string(data, "id")?.into();

        let mut sticker = Self {
            id,
            name: None,
            description: None,
            tags: None,
            format_type: None,
            available: None,
        };
        sticker.patch(data);

        Some(sticker)
    }

    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }
}

/// Represents a ban pronounced in a guild.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct GuildBan {
    pub user_id: UserId,
    pub guild_id: GuildId,
    pub reason: Option<String>,
}

impl Identifiable for GuildBan {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.user_id.clone()
    }
}

impl GuildBan {
    pub fn from_raw(data: &Value, guild_id: &GuildId) -> Option<Self> {
        let user_id: UserId = data.get("user")
            .and_then(|user| raw::string(user, "id"))?
            .into();

        Some(Self {
            user_id,
            guild_id: guild_id.clone(),
            reason: raw::string(data, "reason"),
        })
    }
}

/// Represents a scheduled event attached to a guild.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ScheduledEvent {
    pub id: Snowflake,
    pub guild_id: GuildId,
    pub channel_id: Option<ChannelId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub scheduled_start_time: Option<DateTime<Utc>>,
    pub scheduled_end_time: Option<DateTime<Utc>>,
    pub status: Option<u64>,
    pub creator_id: Option<UserId>,
    pub user_count: Option<u64>,
    /// Whether this event was materialized from incomplete data.
    pub partial: bool,
}

impl Identifiable for ScheduledEvent {
    type Id = Snowflake;

    fn id(&self) -> Snowflake {
        self.id.clone()
    }
}

impl Patch for ScheduledEvent {
    fn patch(&mut self, data: &Value) {
        if raw::has(data, "channel_id") { self.channel_id = raw::string(data, "channel_id").map(ChannelId::from); }
        if let Some(name) = raw::string(data, "name") {
            self.name = Some(name);
            self.partial = false;
        }
        if raw::has(data, "description") { self.description = raw::string(data, "description"); }
        if raw::has(data, "scheduled_start_time") { self.scheduled_start_time = raw::datetime(data, "scheduled_start_time"); }
        if raw::has(data, "scheduled_end_time") { self.scheduled_end_time = raw::datetime(data, "scheduled_end_time"); }
        if raw::has(data, "status") { self.status = raw::u64(data, "status"); }
        if raw::has(data, "creator_id") { self.creator_id = raw::string(data, "creator_id").map(UserId::from); }
        if raw::has(data, "user_count") { self.user_count = raw::u64(data, "user_count"); }
    }
}

impl ScheduledEvent {
    pub fn new(id: Snowflake, guild_id: GuildId) -> Self {
        Self {
            id,
            guild_id,
            channel_id: None,
            name: None,
            description: None,
            scheduled_start_time: None,
            scheduled_end_time: None,
            status: None,
            creator_id: None,
            user_count: None,
            partial: true,
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use super::*;

    #[test]
    fn add_member_is_update_if_present() {
        let mut guild = Guild::from_raw(&json!({ "id": "1", "name": "den" })).unwrap();

        guild.add_member(&json!({ "user": { "id": "7" }, "nick": "kay" })).unwrap();
        guild.add_member(&json!({ "user": { "id": "7" }, "nick": "kaya" })).unwrap();

        assert_eq!(guild.members.len(), 1);
        assert_eq!(guild.members.get(&"7".into()).unwrap().nickname.as_deref(), Some("kaya"));
    }

    #[test]
    fn member_equals_ignores_lifecycle() {
        let mut a = GuildMember::new("7".into(), None);
        a.patch(&json!({ "nick": "kay" }));
        let mut b = a.clone();
        b.lifecycle = Lifecycle::Deleted;

        assert!(a.equals(&b));
        b.patch(&json!({ "nick": "other" }));
        assert!(!a.equals(&b));
    }

    #[test]
    fn guild_patch_tracks_availability() {
        let mut guild = Guild::from_raw(&json!({ "id": "1", "name": "den" })).unwrap();
        assert!(guild.available);

        guild.patch(&json!({ "unavailable": true }));
        assert!(!guild.available);
    }
}
