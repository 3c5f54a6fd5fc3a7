//! Resolution helpers shared by the handlers.
//!
//! Each helper normalizes one entity reference out of a raw payload,
//! creating a placeholder when the matching partial kind is enabled.
//! Resolution never errors: an unresolvable reference yields nothing and
//! the caller treats the event as a no-op.

use serde_json::{json, Value};
use crate::actions::ActionContext;
use crate::models::flags::Partials;
use crate::models::guild::Guild;
use crate::models::message::{Message, MessageReaction, ReactionEmoji, ReactionKey};
use crate::models::user::User;
use crate::models::{raw, ChannelId, GuildId, Patch, Snowflake, UserId};

/// Resolves the channel an event points at, from `channel_id` or `id`.
///
/// When the channel is uncached and channel partials are enabled, a
/// placeholder is materialized: guild payloads produce a text placeholder,
/// guild-less payloads a direct-message one with the recipient inferred
/// from the surrounding payload.
pub(crate) fn resolve_channel(cx: &mut ActionContext, data: &Value) -> Option<ChannelId> {
    let id: ChannelId = raw::string(data, "channel_id")
        .or_else(|| raw::string(data, "id"))?
        .into();

    if cx.state.channels.contains(&id) {
        return Some(id);
    }
    if !cx.partials.has(Partials::CHANNEL) {
        return None;
    }

    let placeholder = match raw::string(data, "guild_id") {
        Some(guild_id) => json!({ "id": id.0, "type": 0, "guild_id": guild_id }),
        None => match infer_dm_recipient(cx, data) {
            Some(recipient) => json!({
                "id": id.0, "type": 1, "recipients": [{ "id": recipient.0 }]
            }),
            None => json!({ "id": id.0, "type": 1 }),
        }
    };

    cx.state.add_channel(&placeholder)
}

/// The other party of a direct-message payload: the embedded author or
/// user, never the client itself.
fn infer_dm_recipient(cx: &ActionContext, data: &Value) -> Option<UserId> {
    let candidate: UserId = data.get("author")
        .and_then(|author| raw::string(author, "id"))
        .or_else(|| raw::string(data, "user_id"))
        .or_else(|| data.get("user").and_then(|user| raw::string(user, "id")))?
        .into();

    if cx.state.client_user_id().as_ref() == Some(&candidate) {
        return None;
    }

    Some(candidate)
}

/// Resolves the message an event points at inside an already-resolved
/// channel, from `message_id` or `id`.
pub(crate) fn resolve_message(cx: &mut ActionContext, channel_id: &ChannelId, data: &Value) -> Option<Snowflake> {
    let id: Snowflake = raw::string(data, "message_id")
        .or_else(|| raw::string(data, "id"))?
        .into();

    let channel = cx.state.channels.get_mut(channel_id)?;
    let messages = channel.text_mut()?.messages_mut();

    if messages.contains(&id) {
        return Some(id);
    }
    if !cx.partials.has(Partials::MESSAGE) {
        return None;
    }

    let mut message = Message::new(id.clone(), channel_id.clone());
    message.guild_id = raw::string(data, "guild_id").map(GuildId::from);
    messages.insert(id.clone(), message);

    Some(id)
}

/// Resolves the per-emoji reaction record on a message, creating it when
/// missing. A record created on a partial message starts with an unknown
/// count; on a complete message the count starts at zero and is advanced
/// by registration.
pub(crate) fn resolve_reaction(message: &mut Message, emoji: ReactionEmoji) -> Option<ReactionKey> {
    let key = emoji.key()?;

    if !message.reactions.contains(&key) {
        let count = if message.partial { None } else { Some(0) };
        message.reactions.insert(key.clone(), MessageReaction::new(emoji, count, false));
    }

    Some(key)
}

/// Resolves the user referenced by `user_id`, materializing a placeholder
/// when user partials are enabled.
pub(crate) fn resolve_user(cx: &mut ActionContext, data: &Value) -> Option<UserId> {
    let id: UserId = raw::string(data, "user_id")?.into();

    if cx.state.users.contains(&id) {
        return Some(id);
    }
    if !cx.partials.has(Partials::USER) {
        return None;
    }

    cx.state.users.insert(id.clone(), User::new(id.clone()));

    Some(id)
}

/// Resolves the acting user of a payload, preferring the embedded
/// `member.user` object: that shape materializes both the member and the
/// user from complete data, so no partial gating applies. Falls back to
/// [`resolve_user`].
pub(crate) fn resolve_user_from_member(cx: &mut ActionContext, data: &Value) -> Option<UserId> {
    let member = data.get("member");
    let user = member.and_then(|member| member.get("user"));

    if let (Some(member), Some(user)) = (member, user) {
        let user_id = cx.state.add_user(user)?;

        if let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) {
            if let Some(guild) = cx.state.guilds.get_mut(&guild_id) {
                guild.add_member(member);
            }
        }

        return Some(user_id);
    }

    resolve_user(cx, data)
}

/// Resolves a member inside a guild from the payload's embedded `user.id`,
/// materializing a placeholder when member partials are enabled.
pub(crate) fn resolve_member(guild: &mut Guild, data: &Value, partials: Partials) -> Option<UserId> {
    let user_id: UserId = data.get("user")
        .and_then(|user| raw::string(user, "id"))?
        .into();

    if guild.members.contains(&user_id) {
        return Some(user_id);
    }
    if !partials.has(Partials::GUILD_MEMBER) {
        return None;
    }

    guild.add_member(data)
}

/// Resolves a scheduled event inside a guild, from
/// `guild_scheduled_event_id` or `id`.
pub(crate) fn resolve_scheduled_event(guild: &mut Guild, data: &Value, partials: Partials) -> Option<Snowflake> {
    let id: Snowflake = raw::string(data, "guild_scheduled_event_id")
        .or_else(|| raw::string(data, "id"))?
        .into();

    if guild.scheduled_events.contains(&id) {
        return Some(id);
    }
    if !partials.has(Partials::SCHEDULED_EVENT) {
        return None;
    }

    guild.add_scheduled_event(&json!({ "id": id.0 }))
}

/// Applies a user payload carrying an `id` to the cached graph, routing
/// the client's own record through the live client-identity reference.
///
/// Returns a notification only when the observable state changed.
pub(crate) fn apply_user_update(cx: &mut ActionContext, data: &Value) -> Option<crate::models::events::ClientEvent> {
    use crate::models::events::ClientEvent;

    let id: UserId = raw::string(data, "id")?.into();
    let is_client = cx.state.client_user_id().as_ref() == Some(&id);

    let mut client_changed = false;
    if is_client {
        if let Some(client_user) = cx.state.client_user.as_mut() {
            let old = client_user.clone();
            client_user.patch(data);
            client_changed = old != *client_user;
        }
    }

    if let Some(user) = cx.state.users.get_mut(&id) {
        let old = user.clone();
        user.patch(data);

        if !old.equals(user) {
            return Some(ClientEvent::UserUpdate { old: Some(old), updated: user.clone() });
        }
        return None;
    }

    // The client's own record is not required to live in the general user
    // cache; a change to it is still reported.
    if client_changed {
        let updated = User::from_raw(data)?;
        return Some(ClientEvent::UserUpdate { old: None, updated });
    }

    None
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use crate::actions::{ActionContext, GuildTombstones};
    use crate::manager::state::CacheState;
    use crate::models::channel::Channel;
    use crate::models::flags::Partials;
    use crate::models::user::ClientUser;
    use super::*;

    fn with_context<R>(partials: Partials, run: impl FnOnce(&mut ActionContext) -> R) -> R {
        let mut state = CacheState::new(100);
        let mut tombstones = GuildTombstones::new(std::time::Duration::from_secs(30));
        let mut cx = ActionContext {
            state: &mut state,
            tombstones: &mut tombstones,
            partials,
            shard_synced: true,
            listening: true,
        };
        run(&mut cx)
    }

    #[test]
    fn channel_resolution_creates_a_dm_placeholder() {
        with_context(Partials::all(), |cx| {
            cx.state.client_user = ClientUser::from_raw(&json!({ "id": "1", "username": "me" }));

            let data = json!({ "channel_id": "9", "author": { "id": "7" } });
            let id = resolve_channel(cx, &data).unwrap();

            let channel = cx.state.channels.get(&id).unwrap();
            assert!(channel.partial());
            match channel {
                Channel::Dm(dm) => assert_eq!(dm.recipient_ids, vec![UserId::from("7")]),
                other => panic!("expected a direct-message placeholder, got {other:?}"),
            }
        });
    }

    #[test]
    fn channel_resolution_without_partials_yields_nothing() {
        with_context(Partials::empty(), |cx| {
            let data = json!({ "channel_id": "9" });
            assert!(resolve_channel(cx, &data).is_none());
            assert!(cx.state.channels.is_empty());
        });
    }

    #[test]
    fn message_resolution_gates_on_the_message_partial() {
        let gated = with_context(Partials(Partials::CHANNEL), |cx| {
            let channel_id = resolve_channel(cx, &json!({ "channel_id": "9", "guild_id": "1" })).unwrap();
            resolve_message(cx, &channel_id, &json!({ "message_id": "5" }))
        });
        assert!(gated.is_none());

        let allowed = with_context(Partials::all(), |cx| {
            let channel_id = resolve_channel(cx, &json!({ "channel_id": "9", "guild_id": "1" })).unwrap();
            resolve_message(cx, &channel_id, &json!({ "message_id": "5" }))
        });
        assert_eq!(allowed, Some(Snowflake::from("5")));
    }

    #[test]
    fn reaction_on_partial_message_has_unknown_count() {
        let mut message = Message::new("5".into(), "9".into());
        let emoji = ReactionEmoji { id: None, name: Some("👍".into()), animated: None };

        let key = resolve_reaction(&mut message, emoji).unwrap();
        assert_eq!(message.reactions.get(&key).unwrap().count, None);
    }

    #[test]
    fn user_update_reports_only_observable_changes() {
        with_context(Partials::all(), |cx| {
            cx.state.add_user(&json!({ "id": "7", "username": "kaya" }));

            assert!(apply_user_update(cx, &json!({ "id": "7", "username": "kaya" })).is_none());

            let event = apply_user_update(cx, &json!({ "id": "7", "username": "nova" })).unwrap();
            match event {
                crate::models::events::ClientEvent::UserUpdate { old, updated } => {
                    assert_eq!(old.unwrap().username.as_deref(), Some("kaya"));
                    assert_eq!(updated.username.as_deref(), Some("nova"));
                }
                other => panic!("unexpected notification {other:?}"),
            }
        });
    }
}
