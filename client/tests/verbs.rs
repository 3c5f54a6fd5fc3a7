//! Verb round-trip coverage over a mocked transport: a change performed
//! through a verb must be observed exactly like the matching wire event.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use serde_json::{json, Value};
use client::manager::events::EventHandler;
use client::manager::http::{Method, RequestOptions, Transport};
use client::models::channel::Channel;
use client::models::events::ClientEvent;
use client::models::flags::Partials;
use client::models::Snowflake;
use client::{Client, ClientOptions};
use error::{Error, Result};

#[derive(Default)]
struct MockTransport {
    responses: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<(Method, String)>>,
}

impl MockTransport {
    fn respond_with(responses: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn routes(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(_, route)| route.clone()).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, method: Method, route: &str, _options: RequestOptions) -> Result<Value> {
        self.requests.lock().unwrap().push((method, route.to_string()));
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or(Value::Null))
    }
}

#[derive(Default)]
struct RecordingHandler {
    names: Mutex<Vec<&'static str>>,
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn raw(&self, event: &ClientEvent) {
        self.names.lock().unwrap().push(event.name());
    }
}

fn client_with(transport: Arc<MockTransport>) -> (Client, Arc<RecordingHandler>) {
    let mut client = Client::with_transport(transport, ClientOptions {
        partials: Partials::all(),
        ..ClientOptions::default()
    });

    let handler = Arc::new(RecordingHandler::default());
    client.event_handler(handler.clone());

    (client, handler)
}

async fn seed_guild(client: &mut Client) {
    client.process("GUILD_CREATE", &json!({ "id": "1", "name": "den" }), 0).await;
}

#[tokio::test]
async fn create_channel_matches_the_wire_event() {
    let response = json!({ "id": "10", "type": 0, "guild_id": "1", "name": "general" });

    // Through the verb.
    let transport = MockTransport::respond_with(vec![response.clone()]);
    let (mut by_verb, verb_handler) = client_with(transport.clone());
    seed_guild(&mut by_verb).await;
    let created = by_verb.create_channel(&"1".into(), json!({ "name": "general" }), None).await.unwrap();
    assert_eq!(created.name(), Some("general"));
    assert_eq!(transport.routes(), vec!["/guilds/1/channels".to_string()]);

    // Through the wire.
    let (mut by_wire, wire_handler) = client_with(MockTransport::respond_with(Vec::new()));
    seed_guild(&mut by_wire).await;
    by_wire.process("CHANNEL_CREATE", &response, 0).await;

    assert_eq!(
        verb_handler.names.lock().unwrap().as_slice(),
        wire_handler.names.lock().unwrap().as_slice()
    );
    assert!(by_verb.state().channels.contains(&"10".into()));
    assert!(by_wire.state().channels.contains(&"10".into()));
}

#[tokio::test]
async fn edit_channel_reports_old_and_new() {
    let transport = MockTransport::respond_with(vec![
        json!({ "id": "10", "type": 0, "guild_id": "1", "name": "renamed" }),
    ]);
    let (mut client, _) = client_with(transport);
    seed_guild(&mut client).await;
    client.process(
        "CHANNEL_CREATE",
        &json!({ "id": "10", "type": 0, "guild_id": "1", "name": "general" }),
        0,
    ).await;

    let (old, updated) = client.edit_channel(&"10".into(), json!({ "name": "renamed" }), None).await.unwrap();

    assert_eq!(old.unwrap().name(), Some("general"));
    assert_eq!(updated.name(), Some("renamed"));
}

#[tokio::test]
async fn delete_channel_returns_the_removed_instance() {
    let transport = MockTransport::respond_with(vec![
        json!({ "id": "10", "type": 0, "guild_id": "1" }),
    ]);
    let (mut client, handler) = client_with(transport);
    seed_guild(&mut client).await;
    client.process(
        "CHANNEL_CREATE",
        &json!({ "id": "10", "type": 0, "guild_id": "1", "name": "general" }),
        0,
    ).await;

    let removed = client.delete_channel(&"10".into(), None).await.unwrap();

    assert_eq!(removed.unwrap().name(), Some("general"));
    assert!(client.state().channels.is_empty());
    assert!(handler.names.lock().unwrap().contains(&"channel_delete"));
}

#[tokio::test]
async fn create_ban_flows_through_the_handler() {
    let transport = MockTransport::respond_with(vec![Value::Null]);
    let (mut client, handler) = client_with(transport);
    seed_guild(&mut client).await;

    let ban = client.create_ban(&"1".into(), &"7".into(), Some(3600), Some("spam".into())).await.unwrap();

    assert_eq!(String::from(ban.user_id), "7".to_string());
    assert!(client.state().guilds.get(&"1".into()).unwrap().bans.contains(&"7".into()));
    assert!(handler.names.lock().unwrap().contains(&"guild_ban_add"));
}

#[tokio::test]
async fn validation_rejects_before_any_request() {
    let transport = MockTransport::respond_with(Vec::new());
    let (mut client, _) = client_with(transport.clone());
    seed_guild(&mut client).await;

    let err = client.create_channel(&"1".into(), json!({ "name": "  " }), None).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = client.fetch_bans(&"1".into(), Some(0)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = client.fetch_bans(&"1".into(), Some(1001)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = client.create_ban(&"1".into(), &"7".into(), Some(604_801), None).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let one_message = vec![Snowflake::from("55")];
    let err = client.bulk_delete_messages(&"10".into(), &one_message, None).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn bulk_delete_clears_the_cache_and_notifies() {
    let transport = MockTransport::respond_with(vec![Value::Null]);
    let (mut client, handler) = client_with(transport);
    seed_guild(&mut client).await;
    client.process(
        "CHANNEL_CREATE",
        &json!({ "id": "10", "type": 0, "guild_id": "1", "name": "general" }),
        0,
    ).await;
    for id in ["55", "56"] {
        client.process("MESSAGE_CREATE", &json!({
            "id": id,
            "channel_id": "10",
            "guild_id": "1",
            "content": "hello",
            "author": { "id": "7", "username": "kaya" }
        }), 0).await;
    }

    let ids = vec![Snowflake::from("55"), Snowflake::from("56")];
    let deleted = client.bulk_delete_messages(&"10".into(), &ids, None).await.unwrap();

    assert_eq!(deleted.len(), 2);
    assert!(handler.names.lock().unwrap().contains(&"message_delete_bulk"));

    let channel = client.state().channels.get(&"10".into()).unwrap();
    assert!(channel.text().unwrap().messages().is_empty());
}

#[tokio::test]
async fn edit_member_round_trips_through_dispatch() {
    let transport = MockTransport::respond_with(vec![
        json!({ "user": { "id": "7", "username": "kaya" }, "nick": "kay" }),
    ]);
    let (mut client, _) = client_with(transport);
    seed_guild(&mut client).await;
    client.process("GUILD_MEMBER_ADD", &json!({
        "guild_id": "1",
        "user": { "id": "7", "username": "kaya" },
        "joined_at": "2024-01-01T00:00:00Z"
    }), 0).await;

    let member = client.edit_member(&"1".into(), &"7".into(), json!({ "nick": "kay" }), None).await.unwrap();

    assert_eq!(member.nickname.as_deref(), Some("kay"));
    let cached = client.state().guilds.get(&"1".into()).unwrap()
        .members.get(&"7".into()).unwrap()
        .clone();
    assert!(member.equals(&cached));
}

#[tokio::test]
async fn set_channel_position_feeds_back_as_an_update() {
    let transport = MockTransport::respond_with(vec![Value::Null]);
    let (mut client, handler) = client_with(transport.clone());
    seed_guild(&mut client).await;
    client.process(
        "CHANNEL_CREATE",
        &json!({ "id": "10", "type": 0, "guild_id": "1", "name": "general", "position": 0 }),
        0,
    ).await;

    let (old, updated) = client.set_channel_position(&"1".into(), &"10".into(), 3, None).await.unwrap();

    assert_eq!(transport.routes(), vec!["/guilds/1/channels".to_string()]);
    match (old.unwrap(), updated) {
        (Channel::Text(before), Channel::Text(after)) => {
            assert_eq!(before.position, Some(0));
            assert_eq!(after.position, Some(3));
        }
        other => panic!("unexpected channels {other:?}"),
    }

    let cached = client.state().channels.get(&"10".into()).unwrap();
    match cached {
        Channel::Text(text) => assert_eq!(text.position, Some(3)),
        other => panic!("unexpected channel {other:?}"),
    }
    assert!(handler.names.lock().unwrap().contains(&"channel_update"));
}

#[tokio::test]
async fn set_role_position_picks_the_moved_role_from_the_listing() {
    let transport = MockTransport::respond_with(vec![
        json!({ "id": "30", "name": "mod", "position": 1 }),
        json!([
            { "id": "31", "name": "other", "position": 1 },
            { "id": "30", "name": "mod", "position": 2 }
        ]),
    ]);
    let (mut client, handler) = client_with(transport.clone());
    seed_guild(&mut client).await;
    client.create_role(&"1".into(), json!({ "name": "mod" }), None).await.unwrap();

    let (old, updated) = client.set_role_position(&"1".into(), &"30".into(), 2, None).await.unwrap();

    assert_eq!(transport.routes()[1], "/guilds/1/roles".to_string());
    assert_eq!(old.unwrap().position, Some(1));
    assert_eq!(updated.position, Some(2));
    assert!(handler.names.lock().unwrap().contains(&"guild_role_update"));
}

#[tokio::test]
async fn role_lifecycle_through_verbs() {
    let transport = MockTransport::respond_with(vec![
        json!({ "id": "30", "name": "mod" }),
        json!({ "id": "30", "name": "admin" }),
        Value::Null,
    ]);
    let (mut client, handler) = client_with(transport);
    seed_guild(&mut client).await;

    let role = client.create_role(&"1".into(), json!({ "name": "mod" }), None).await.unwrap();
    assert_eq!(role.name.as_deref(), Some("mod"));

    let (old, updated) = client.edit_role(&"1".into(), &"30".into(), json!({ "name": "admin" }), None).await.unwrap();
    assert_eq!(old.unwrap().name.as_deref(), Some("mod"));
    assert_eq!(updated.name.as_deref(), Some("admin"));

    client.delete_role(&"1".into(), &"30".into(), None).await.unwrap();
    assert!(client.state().guilds.get(&"1".into()).unwrap().roles.is_empty());

    let names = handler.names.lock().unwrap();
    assert!(names.contains(&"guild_role_create"));
    assert!(names.contains(&"guild_role_update"));
    assert!(names.contains(&"guild_role_delete"));
}
