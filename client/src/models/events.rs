use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::models::channel::{Channel, ThreadChannel, ThreadMember};
use crate::models::guild::{Emoji, Guild, GuildBan, GuildMember, Role, ScheduledEvent, Sticker};
use crate::models::message::{Message, MessageReaction};
use crate::models::presence::Presence;
use crate::models::user::User;
use crate::models::{ChannelId, GuildId, RoleId, Snowflake, UserId};

/// A notification synthesized by the reconciliation engine: at most one per
/// handler invocation per logical change.
///
/// Update variants carry a pre-patch snapshot (`old`) next to the state the
/// live entity ended up in (`updated`); the snapshot is a deep copy, so
/// later mutation of the live entity cannot alter what was reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientEvent {
    ChannelCreate(Channel),
    ChannelUpdate { old: Option<Channel>, updated: Channel },
    ChannelDelete(Channel),
    ChannelPinsUpdate { channel_id: ChannelId, last_pin_at: Option<DateTime<Utc>> },

    ThreadCreate(ThreadChannel),
    ThreadUpdate { old: Option<ThreadChannel>, updated: ThreadChannel },
    ThreadDelete(ThreadChannel),
    ThreadMembersUpdate { thread_id: ChannelId, added: Vec<ThreadMember>, removed: Vec<UserId> },

    GuildCreate(Guild),
    GuildUpdate { old: Option<Guild>, updated: Guild },
    GuildDelete(Guild),
    GuildUnavailable(GuildId),

    GuildBanAdd(GuildBan),
    GuildBanRemove(GuildBan),

    GuildRoleCreate { guild_id: GuildId, role: Role },
    GuildRoleUpdate { guild_id: GuildId, old: Option<Role>, updated: Role },
    GuildRoleDelete { guild_id: GuildId, role_id: RoleId },

    GuildEmojiCreate { guild_id: GuildId, emoji: Emoji },
    GuildEmojiUpdate { guild_id: GuildId, old: Option<Emoji>, updated: Emoji },
    GuildEmojiDelete { guild_id: GuildId, emoji: Emoji },

    GuildStickerCreate { guild_id: GuildId, sticker: Sticker },
    GuildStickerUpdate { guild_id: GuildId, old: Option<Sticker>, updated: Sticker },
    GuildStickerDelete { guild_id: GuildId, sticker: Sticker },

    GuildMemberAdd(GuildMember),
    GuildMemberRemove(GuildMember),
    GuildMemberUpdate { old: Option<GuildMember>, updated: GuildMember },
    /// A member became visible for the first time without a literal join.
    GuildMemberAvailable(GuildMember),

    GuildScheduledEventCreate(ScheduledEvent),
    GuildScheduledEventUpdate { old: Option<ScheduledEvent>, updated: ScheduledEvent },
    GuildScheduledEventDelete(ScheduledEvent),

    MessageCreate(Message),
    MessageUpdate { old: Option<Message>, updated: Message },
    MessageDelete { channel_id: ChannelId, message: Option<Message>, message_id: Snowflake },
    MessageDeleteBulk { channel_id: ChannelId, ids: Vec<Snowflake> },

    MessageReactionAdd { channel_id: ChannelId, message_id: Snowflake, reaction: MessageReaction, user_id: UserId },
    MessageReactionRemove { channel_id: ChannelId, message_id: Snowflake, reaction: MessageReaction, user_id: UserId },
    MessageReactionRemoveAll { channel_id: ChannelId, message_id: Snowflake, removed: Vec<MessageReaction> },
    MessageReactionRemoveEmoji { channel_id: ChannelId, message_id: Snowflake, reaction: MessageReaction },

    PresenceUpdate { old: Option<Presence>, updated: Presence },
    UserUpdate { old: Option<User>, updated: User },
}

impl ClientEvent {
    /// Stable name used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChannelCreate(_) => "channel_create",
            Self::ChannelUpdate { .. } => "channel_update",
            Self::ChannelDelete(_) => "channel_delete",
            Self::ChannelPinsUpdate { .. } => "channel_pins_update",
            Self::ThreadCreate(_) => "thread_create",
            Self::ThreadUpdate { .. } => "thread_update",
            Self::ThreadDelete(_) => "thread_delete",
            Self::ThreadMembersUpdate { .. } => "thread_members_update",
            Self::GuildCreate(_) => "guild_create",
            Self::GuildUpdate { .. } => "guild_update",
            Self::GuildDelete(_) => "guild_delete",
            Self::GuildUnavailable(_) => "guild_unavailable",
            Self::GuildBanAdd(_) => "guild_ban_add",
            Self::GuildBanRemove(_) => "guild_ban_remove",
            Self::GuildRoleCreate { .. } => "guild_role_create",
            Self::GuildRoleUpdate { .. } => "guild_role_update",
            Self::GuildRoleDelete { .. } => "guild_role_delete",
            Self::GuildEmojiCreate { .. } => "guild_emoji_create",
            Self::GuildEmojiUpdate { .. } => "guild_emoji_update",
            Self::GuildEmojiDelete { .. } => "guild_emoji_delete",
            Self::GuildStickerCreate { .. } => "guild_sticker_create",
            Self::GuildStickerUpdate { .. } => "guild_sticker_update",
            Self::GuildStickerDelete { .. } => "guild_sticker_delete",
            Self::GuildMemberAdd(_) => "guild_member_add",
            Self::GuildMemberRemove(_) => "guild_member_remove",
            Self::GuildMemberUpdate { .. } => "guild_member_update",
            Self::GuildMemberAvailable(_) => "guild_member_available",
            Self::GuildScheduledEventCreate(_) => "guild_scheduled_event_create",
            Self::GuildScheduledEventUpdate { .. } => "guild_scheduled_event_update",
            Self::GuildScheduledEventDelete(_) => "guild_scheduled_event_delete",
            Self::MessageCreate(_) => "message_create",
            Self::MessageUpdate { .. } => "message_update",
            Self::MessageDelete { .. } => "message_delete",
            Self::MessageDeleteBulk { .. } => "message_delete_bulk",
            Self::MessageReactionAdd { .. } => "message_reaction_add",
            Self::MessageReactionRemove { .. } => "message_reaction_remove",
            Self::MessageReactionRemoveAll { .. } => "message_reaction_remove_all",
            Self::MessageReactionRemoveEmoji { .. } => "message_reaction_remove_emoji",
            Self::PresenceUpdate { .. } => "presence_update",
            Self::UserUpdate { .. } => "user_update",
        }
    }
}
