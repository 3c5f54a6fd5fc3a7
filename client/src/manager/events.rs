use crate::models::channel::Channel;
use crate::models::events::ClientEvent;
use crate::models::guild::{Guild, GuildMember};
use crate::models::message::{Message, MessageReaction};
use crate::models::presence::Presence;
use crate::models::user::User;
use crate::models::{ChannelId, GuildId, Snowflake, UserId};

/// Application observer of reconciliation notifications.
///
/// Emission order equals processing order; a hook is called at most once
/// per logical change.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// Called for every notification, before the per-event hooks.
    async fn raw(&self, _event: &ClientEvent) {}

    /// Called when a channel first enters the cache.
    async fn channel_create(&self, _channel: &Channel) {}

    /// Called when a cached channel changed; `old` is the pre-update
    /// snapshot when the channel was cached beforehand.
    async fn channel_update(&self, _old: Option<&Channel>, _updated: &Channel) {}

    /// Called when a channel is deleted.
    async fn channel_delete(&self, _channel: &Channel) {}

    /// Called when the client joins a guild or a guild becomes available.
    async fn guild_create(&self, _guild: &Guild) {}

    /// Called when the client is removed from a guild.
    async fn guild_delete(&self, _guild: &Guild) {}

    /// Called when a guild becomes temporarily unavailable.
    async fn guild_unavailable(&self, _guild_id: &GuildId) {}

    /// Called when a member joins a guild.
    async fn guild_member_add(&self, _member: &GuildMember) {}

    /// Called when a member leaves a guild.
    async fn guild_member_remove(&self, _member: &GuildMember) {}

    /// Called when a member is updated inside a guild.
    async fn guild_member_update(&self, _old: Option<&GuildMember>, _updated: &GuildMember) {}

    /// Called when a message is created.
    async fn message_create(&self, _message: &Message) {}

    /// Called when a message is deleted.
    async fn message_delete(&self, _channel_id: &ChannelId, _message_id: &Snowflake) {}

    /// Called when a reaction is added to a message.
    async fn message_reaction_add(&self, _message_id: &Snowflake, _reaction: &MessageReaction, _user_id: &UserId) {}

    /// Called when a user's presence changed.
    async fn presence_update(&self, _old: Option<&Presence>, _updated: &Presence) {}

    /// Called when a cached user's profile changed.
    async fn user_update(&self, _old: Option<&User>, _updated: &User) {}
}

/// Routes one notification to the matching observer hook.
pub(crate) async fn deliver(handler: &dyn EventHandler, event: &ClientEvent) {
    handler.raw(event).await;

    match event {
        ClientEvent::ChannelCreate(channel) => handler.channel_create(channel).await,
        ClientEvent::ChannelUpdate { old, updated } => handler.channel_update(old.as_ref(), updated).await,
        ClientEvent::ChannelDelete(channel) => handler.channel_delete(channel).await,
        ClientEvent::GuildCreate(guild) => handler.guild_create(guild).await,
        ClientEvent::GuildDelete(guild) => handler.guild_delete(guild).await,
        ClientEvent::GuildUnavailable(guild_id) => handler.guild_unavailable(guild_id).await,
        ClientEvent::GuildMemberAdd(member) => handler.guild_member_add(member).await,
        ClientEvent::GuildMemberRemove(member) => handler.guild_member_remove(member).await,
        ClientEvent::GuildMemberUpdate { old, updated } => handler.guild_member_update(old.as_ref(), updated).await,
        ClientEvent::MessageCreate(message) => handler.message_create(message).await,
        ClientEvent::MessageDelete { channel_id, message_id, .. } => handler.message_delete(channel_id, message_id).await,
        ClientEvent::MessageReactionAdd { message_id, reaction, user_id, .. } =>
            handler.message_reaction_add(message_id, reaction, user_id).await,
        ClientEvent::PresenceUpdate { old, updated } => handler.presence_update(old.as_ref(), updated).await,
        ClientEvent::UserUpdate { old, updated } => handler.user_update(old.as_ref(), updated).await,
        // Remaining notifications are observable through `raw`.
        _ => {}
    }
}

#[async_trait::async_trait]
impl EventHandler for () {}
