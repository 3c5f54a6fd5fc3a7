use serde_json::{json, Value};
use crate::actions::{resolve_channel, Action, ActionContext};
use crate::models::events::ClientEvent;
use crate::models::flags::Partials;
use crate::models::message::Message;
use crate::models::{raw, GuildId, Patch, Snowflake};

pub(super) struct MessageCreate;

impl Action for MessageCreate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(channel_id) = resolve_channel(cx, data) else { return Vec::new() };
        let Some(id) = raw::string(data, "id").map(Snowflake::from) else { return Vec::new() };

        if let Some(author) = data.get("author") {
            cx.state.add_user(author);

            // Guild messages ride with the author's membership.
            if let Some(member) = data.get("member") {
                if let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) {
                    if let Some(guild) = cx.state.guilds.get_mut(&guild_id) {
                        let mut payload = member.clone();
                        if let Value::Object(map) = &mut payload {
                            map.insert("user".to_string(), author.clone());
                        }
                        guild.add_member(&payload);
                    }
                }
            }
        }

        let Some(channel) = cx.state.channels.get_mut(&channel_id) else { return Vec::new() };
        channel.patch(&json!({ "last_message_id": id.0 }));

        let Some(messages) = channel.text_mut().map(|text| text.messages_mut()) else { return Vec::new() };

        if let Some(cached) = messages.get_mut(&id) {
            // Duplicate delivery refreshes the entry without a second
            // notification.
            cached.patch(data);
            return Vec::new();
        }

        let Some(message) = Message::from_raw(data) else { return Vec::new() };
        messages.insert(id, message.clone());

        vec![ClientEvent::MessageCreate(message)]
    }
}

pub(super) struct MessageUpdate;

impl Action for MessageUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(channel_id) = resolve_channel(cx, data) else { return Vec::new() };
        let Some(id) = raw::string(data, "id").map(Snowflake::from) else { return Vec::new() };

        let message_partials = cx.partials.has(Partials::MESSAGE);
        let Some(channel) = cx.state.channels.get_mut(&channel_id) else { return Vec::new() };
        let Some(messages) = channel.text_mut().map(|text| text.messages_mut()) else { return Vec::new() };

        if let Some(cached) = messages.get_mut(&id) {
            let old = cached.clone();
            cached.patch(data);

            if old.equals(cached) {
                return Vec::new();
            }
            return vec![ClientEvent::MessageUpdate { old: Some(old), updated: cached.clone() }];
        }

        if !message_partials {
            return Vec::new();
        }

        let Some(message) = Message::from_raw(data) else { return Vec::new() };
        messages.insert(id, message.clone());

        vec![ClientEvent::MessageUpdate { old: None, updated: message }]
    }
}

pub(super) struct MessageDelete;

impl Action for MessageDelete {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(channel_id) = resolve_channel(cx, data) else { return Vec::new() };
        let Some(id) = raw::string(data, "id").map(Snowflake::from) else { return Vec::new() };

        let Some(channel) = cx.state.channels.get_mut(&channel_id) else { return Vec::new() };
        let removed = channel.text_mut()
            .and_then(|text| text.messages_mut().remove(&id));

        vec![ClientEvent::MessageDelete { channel_id, message: removed, message_id: id }]
    }
}

pub(super) struct MessageDeleteBulk;

impl Action for MessageDeleteBulk {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(channel_id) = resolve_channel(cx, data) else { return Vec::new() };
        let Some(ids) = data.get("ids").and_then(Value::as_array) else { return Vec::new() };

        let ids: Vec<Snowflake> = ids.iter()
            .filter_map(Value::as_str)
            .map(Snowflake::from)
            .collect();
        if ids.is_empty() {
            return Vec::new();
        }

        if let Some(messages) = cx.state.channels.get_mut(&channel_id)
            .and_then(|channel| channel.text_mut())
            .map(|text| text.messages_mut())
        {
            for id in &ids {
                messages.remove(id);
            }
        }

        vec![ClientEvent::MessageDeleteBulk { channel_id, ids }]
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use crate::actions::Reconciler;
    use crate::models::channel::Channel;
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
        engine
    }

    fn create_payload() -> Value {
        json!({
            "id": "55",
            "channel_id": "10",
            "guild_id": "1",
            "content": "hello",
            "author": { "id": "7", "username": "kaya" },
            "member": { "nick": "kay", "joined_at": "2024-01-01T00:00:00Z" }
        })
    }

    #[test]
    fn create_caches_message_author_and_membership() {
        let mut engine = engine(Partials::all());

        let events = engine.dispatch("MESSAGE_CREATE", &create_payload(), 0);

        assert!(matches!(events.as_slice(), [ClientEvent::MessageCreate(_)]));
        assert!(engine.state.users.contains(&"7".into()));
        assert!(engine.state.guilds.get(&"1".into()).unwrap().members.contains(&"7".into()));

        match engine.state.channels.get(&"10".into()).unwrap() {
            Channel::Text(text) => {
                assert_eq!(text.last_message_id, Some(Snowflake::from("55")));
                assert!(text.messages.contains(&"55".into()));
            }
            other => panic!("unexpected channel {other:?}"),
        }
    }

    #[test]
    fn duplicate_create_is_silent() {
        let mut engine = engine(Partials::all());
        engine.dispatch("MESSAGE_CREATE", &create_payload(), 0);

        assert!(engine.dispatch("MESSAGE_CREATE", &create_payload(), 0).is_empty());
    }

    #[test]
    fn update_snapshots_old_state_and_skips_no_ops() {
        let mut engine = engine(Partials::all());
        engine.dispatch("MESSAGE_CREATE", &create_payload(), 0);

        let events = engine.dispatch("MESSAGE_UPDATE", &json!({
            "id": "55", "channel_id": "10", "content": "edited"
        }), 0);
        match events.as_slice() {
            [ClientEvent::MessageUpdate { old: Some(old), updated }] => {
                assert_eq!(old.content.as_deref(), Some("hello"));
                assert_eq!(updated.content.as_deref(), Some("edited"));
            }
            other => panic!("unexpected notifications {other:?}"),
        }

        let events = engine.dispatch("MESSAGE_UPDATE", &json!({
            "id": "55", "channel_id": "10", "content": "edited"
        }), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn update_without_message_partials_is_dropped() {
        let mut engine = engine(Partials::empty());

        let events = engine.dispatch("MESSAGE_UPDATE", &json!({
            "id": "55", "channel_id": "10", "content": "edited"
        }), 0);

        assert!(events.is_empty());
        match engine.state.channels.get(&"10".into()).unwrap() {
            Channel::Text(text) => assert!(text.messages.is_empty()),
            other => panic!("unexpected channel {other:?}"),
        }
    }

    #[test]
    fn delete_reports_the_removed_message_when_cached() {
        let mut engine = engine(Partials::all());
        engine.dispatch("MESSAGE_CREATE", &create_payload(), 0);

        let events = engine.dispatch("MESSAGE_DELETE", &json!({ "id": "55", "channel_id": "10" }), 0);

        match events.as_slice() {
            [ClientEvent::MessageDelete { message: Some(message), .. }] => {
                assert_eq!(message.content.as_deref(), Some("hello"));
            }
            other => panic!("unexpected notifications {other:?}"),
        }
    }

    #[test]
    fn bulk_delete_clears_every_listed_message() {
        let mut engine = engine(Partials::all());
        engine.dispatch("MESSAGE_CREATE", &create_payload(), 0);

        let events = engine.dispatch("MESSAGE_DELETE_BULK", &json!({
            "channel_id": "10", "ids": ["55", "56"]
        }), 0);

        match events.as_slice() {
            [ClientEvent::MessageDeleteBulk { ids, .. }] => assert_eq!(ids.len(), 2),
            other => panic!("unexpected notifications {other:?}"),
        }
        match engine.state.channels.get(&"10".into()).unwrap() {
            Channel::Text(text) => assert!(text.messages.is_empty()),
            other => panic!("unexpected channel {other:?}"),
        }
    }
}
