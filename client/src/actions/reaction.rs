use serde_json::Value;
use crate::actions::{
    resolve_channel, resolve_message, resolve_reaction, resolve_user_from_member,
    Action, ActionContext,
};
use crate::models::events::ClientEvent;
use crate::models::message::{Message, ReactionEmoji, ReactionKey};
use crate::models::{ChannelId, Snowflake, UserId};

/// A reaction application fully resolved against the cache.
pub(crate) struct AppliedReaction {
    pub channel_id: ChannelId,
    pub message_id: Snowflake,
    pub key: ReactionKey,
    pub user_id: UserId,
}

/// Resolves and registers one reaction.
///
/// Shared between the wire handler and the local-apply entry point: both
/// mutate the cache identically, only the caller decides whether a public
/// notification is produced.
pub(crate) fn apply_reaction(cx: &mut ActionContext, data: &Value) -> Option<AppliedReaction> {
    let user_id = resolve_user_from_member(cx, data)?;
    let channel_id = resolve_channel(cx, data)?;
    let message_id = resolve_message(cx, &channel_id, data)?;
    let emoji = ReactionEmoji::from_raw(data)?;

    let is_client = cx.state.client_user_id().as_ref() == Some(&user_id);
    let message = cached_message(cx, &channel_id, &message_id)?;

    let key = resolve_reaction(message, emoji)?;
    if let Some(reaction) = message.reactions.get_mut(&key) {
        reaction.register(&user_id, is_client);
    }

    Some(AppliedReaction { channel_id, message_id, key, user_id })
}

fn cached_message<'a>(
    cx: &'a mut ActionContext,
    channel_id: &ChannelId,
    message_id: &Snowflake,
) -> Option<&'a mut Message> {
    cx.state.channels.get_mut(channel_id)?
        .text_mut()?
        .messages_mut()
        .get_mut(message_id)
}

pub(super) struct MessageReactionAdd;

impl Action for MessageReactionAdd {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(applied) = apply_reaction(cx, data) else { return Vec::new() };

        let reaction = cached_message(cx, &applied.channel_id, &applied.message_id)
            .and_then(|message| message.reactions.get(&applied.key))
            .cloned();

        match reaction {
            Some(reaction) => vec![ClientEvent::MessageReactionAdd {
                channel_id: applied.channel_id,
                message_id: applied.message_id,
                reaction,
                user_id: applied.user_id,
            }],
            None => Vec::new(),
        }
    }
}

pub(super) struct MessageReactionRemove;

impl Action for MessageReactionRemove {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(user_id) = resolve_user_from_member(cx, data) else { return Vec::new() };
        let Some(channel_id) = resolve_channel(cx, data) else { return Vec::new() };
        let Some(message_id) = resolve_message(cx, &channel_id, data) else { return Vec::new() };
        let Some(key) = ReactionEmoji::from_raw(data).and_then(|emoji| emoji.key()) else { return Vec::new() };

        let is_client = cx.state.client_user_id().as_ref() == Some(&user_id);
        let Some(message) = cached_message(cx, &channel_id, &message_id) else { return Vec::new() };
        let Some(reaction) = message.reactions.get_mut(&key) else { return Vec::new() };

        let emptied = reaction.unregister(&user_id, is_client);
        let snapshot = reaction.clone();
        if emptied {
            message.reactions.remove(&key);
        }

        vec![ClientEvent::MessageReactionRemove {
            channel_id,
            message_id,
            reaction: snapshot,
            user_id,
        }]
    }
}

pub(super) struct MessageReactionRemoveAll;

impl Action for MessageReactionRemoveAll {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(channel_id) = resolve_channel(cx, data) else { return Vec::new() };
        let Some(message_id) = resolve_message(cx, &channel_id, data) else { return Vec::new() };
        let Some(message) = cached_message(cx, &channel_id, &message_id) else { return Vec::new() };

        // Snapshot before clearing, so the notification reports what was
        // dropped.
        let removed: Vec<_> = message.reactions.values().cloned().collect();
        message.reactions.clear();

        vec![ClientEvent::MessageReactionRemoveAll { channel_id, message_id, removed }]
    }
}

pub(super) struct MessageReactionRemoveEmoji;

impl Action for MessageReactionRemoveEmoji {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(channel_id) = resolve_channel(cx, data) else { return Vec::new() };
        let Some(message_id) = resolve_message(cx, &channel_id, data) else { return Vec::new() };
        let Some(key) = ReactionEmoji::from_raw(data).and_then(|emoji| emoji.key()) else { return Vec::new() };

        let Some(message) = cached_message(cx, &channel_id, &message_id) else { return Vec::new() };
        match message.reactions.remove(&key) {
            Some(reaction) => vec![ClientEvent::MessageReactionRemoveEmoji { channel_id, message_id, reaction }],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use crate::actions::Reconciler;
    use crate::models::flags::Partials;
    use crate::ClientOptions;
    use super::*;

    fn engine(partials: Partials) -> Reconciler {
        let mut engine = Reconciler::new(&ClientOptions { partials, ..ClientOptions::default() });
        engine.dispatch("GUILD_CREATE", &json!({ "id": "1", "name": "den" }), 0);
        engine.dispatch(
            "CHANNEL_CREATE",
            &json!({ "id": "10", "type": 0, "guild_id": "1", "name": "general" }),
            0,
        );
        engine.dispatch("MESSAGE_CREATE", &json!({
            "id": "55",
            "channel_id": "10",
            "guild_id": "1",
            "content": "hello",
            "author": { "id": "7", "username": "kaya" }
        }), 0);
        engine
    }

    fn add_payload(user_id: &str) -> Value {
        json!({
            "channel_id": "10",
            "message_id": "55",
            "guild_id": "1",
            "user_id": user_id,
            "emoji": { "id": null, "name": "👍" }
        })
    }

    #[test]
    fn reaction_add_registers_and_reports() {
        let mut engine = engine(Partials::all());

        let events = engine.dispatch("MESSAGE_REACTION_ADD", &add_payload("7"), 0);

        match events.as_slice() {
            [ClientEvent::MessageReactionAdd { reaction, user_id, .. }] => {
                assert_eq!(reaction.count, Some(1));
                assert_eq!(user_id, &UserId::from("7"));
            }
            other => panic!("unexpected notifications {other:?}"),
        }
    }

    #[test]
    fn local_apply_mutates_without_notifying() {
        let mut engine = engine(Partials::all());

        let applied = engine.apply_reaction_locally(&add_payload("7")).unwrap();
        assert_eq!(applied.0, Snowflake::from("55"));

        let message = engine.state.channels.get(&"10".into()).unwrap()
            .text().unwrap()
            .messages().get(&"55".into()).unwrap();
        assert_eq!(message.reactions.len(), 1);
    }

    #[test]
    fn reaction_on_partial_message_keeps_unknown_count() {
        let mut engine = engine(Partials::all());

        // Unseen message: resolution materializes a partial one.
        let events = engine.dispatch("MESSAGE_REACTION_ADD", &json!({
            "channel_id": "10",
            "message_id": "99",
            "guild_id": "1",
            "user_id": "7",
            "emoji": { "id": null, "name": "👍" }
        }), 0);

        match events.as_slice() {
            [ClientEvent::MessageReactionAdd { reaction, .. }] => assert_eq!(reaction.count, None),
            other => panic!("unexpected notifications {other:?}"),
        }
    }

    #[test]
    fn reaction_add_without_partials_for_unknown_message_is_dropped() {
        let mut engine = engine(Partials::empty());

        let events = engine.dispatch("MESSAGE_REACTION_ADD", &json!({
            "channel_id": "10",
            "message_id": "99",
            "guild_id": "1",
            "user_id": "7",
            "emoji": { "id": null, "name": "👍" }
        }), 0);

        assert!(events.is_empty());
    }

    #[test]
    fn remove_drops_the_reaction_once_empty() {
        let mut engine = engine(Partials::all());
        engine.dispatch("MESSAGE_REACTION_ADD", &add_payload("7"), 0);

        let events = engine.dispatch("MESSAGE_REACTION_REMOVE", &add_payload("7"), 0);

        assert!(matches!(events.as_slice(), [ClientEvent::MessageReactionRemove { .. }]));
        let message = engine.state.channels.get(&"10".into()).unwrap()
            .text().unwrap()
            .messages().get(&"55".into()).unwrap();
        assert!(message.reactions.is_empty());
    }

    #[test]
    fn remove_all_snapshots_then_clears() {
        let mut engine = engine(Partials::all());
        engine.dispatch("MESSAGE_REACTION_ADD", &add_payload("7"), 0);
        engine.dispatch("MESSAGE_REACTION_ADD", &json!({
            "channel_id": "10",
            "message_id": "55",
            "guild_id": "1",
            "user_id": "7",
            "emoji": { "id": "40", "name": "blob" }
        }), 0);

        let events = engine.dispatch("MESSAGE_REACTION_REMOVE_ALL", &json!({
            "channel_id": "10", "message_id": "55", "guild_id": "1"
        }), 0);

        match events.as_slice() {
            [ClientEvent::MessageReactionRemoveAll { removed, .. }] => assert_eq!(removed.len(), 2),
            other => panic!("unexpected notifications {other:?}"),
        }
    }

    #[test]
    fn remove_emoji_targets_a_single_key() {
        let mut engine = engine(Partials::all());
        engine.dispatch("MESSAGE_REACTION_ADD", &add_payload("7"), 0);

        let events = engine.dispatch("MESSAGE_REACTION_REMOVE_EMOJI", &json!({
            "channel_id": "10",
            "message_id": "55",
            "guild_id": "1",
            "emoji": { "id": null, "name": "👍" }
        }), 0);

        assert!(matches!(events.as_slice(), [ClientEvent::MessageReactionRemoveEmoji { .. }]));
    }
}
