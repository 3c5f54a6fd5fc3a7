use serde_json::Value;
use crate::actions::{apply_user_update, resolve_member, Action, ActionContext};
use crate::models::events::ClientEvent;
use crate::models::{raw, GuildId, Lifecycle, Patch, UserId};

pub(super) struct GuildMemberAdd;

impl Action for GuildMemberAdd {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };

        if let Some(user) = data.get("user") {
            cx.state.add_user(user);
        }

        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };
        let Some(user_id) = guild.add_member(data) else { return Vec::new() };
        guild.member_count += 1;

        match guild.members.get(&user_id) {
            Some(member) => vec![ClientEvent::GuildMemberAdd(member.clone())],
            None => Vec::new(),
        }
    }
}

pub(super) struct GuildMemberRemove;

impl Action for GuildMemberRemove {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };
        let Some(user_id) = data.get("user")
            .and_then(|user| raw::string(user, "id"))
            .map(UserId::from)
        else { return Vec::new() };

        if let Some(user) = data.get("user") {
            cx.state.add_user(user);
        }

        if let Some(guild) = cx.state.guilds.get_mut(&guild_id) {
            // The count tracks the event even when the member itself was
            // never cached.
            guild.member_count = guild.member_count.saturating_sub(1);
            guild.presences.remove(&user_id);

            resolve_member(guild, data, cx.partials);
            let Some(mut member) = guild.members.remove(&user_id) else { return Vec::new() };
            member.lifecycle = Lifecycle::Deleted;

            if !cx.shard_synced {
                return Vec::new();
            }
            return vec![ClientEvent::GuildMemberRemove(member)];
        }

        // The guild was just deleted: a still-valid tombstone lets the
        // trailing removal resolve its member.
        if let Some(tombstoned) = cx.tombstones.resolve(&guild_id) {
            if let Some(member) = tombstoned.members.get(&user_id) {
                let mut member = member.clone();
                member.lifecycle = Lifecycle::Deleted;

                if cx.shard_synced {
                    return vec![ClientEvent::GuildMemberRemove(member)];
                }
            }
        }

        Vec::new()
    }
}

pub(super) struct GuildMemberUpdate;

impl Action for GuildMemberUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };
        let Some(user) = data.get("user") else { return Vec::new() };
        let Some(user_id) = raw::string(user, "id").map(UserId::from) else { return Vec::new() };

        let mut events = Vec::new();

        // A richer user object riding on a member update is routed through
        // the user path first.
        if let Some(username) = raw::string(user, "username") {
            let changed = match cx.state.users.get(&user_id) {
                Some(cached) => cached.username.as_deref() != Some(username.as_str()),
                None => {
                    cx.state.add_user(user);
                    false
                }
            };

            if changed {
                if let Some(event) = apply_user_update(cx, user) {
                    events.push(event);
                }
            }
        }

        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return events };

        if let Some(cached) = guild.members.get_mut(&user_id) {
            let old = cached.clone();
            cached.patch(data);

            if cx.shard_synced && !old.equals(cached) {
                events.push(ClientEvent::GuildMemberUpdate { old: Some(old), updated: cached.clone() });
            }
            return events;
        }

        // First sight of this member without a literal join.
        if let Some(user_id) = guild.add_member(data) {
            if cx.shard_synced {
                if let Some(member) = guild.members.get(&user_id) {
                    events.push(ClientEvent::GuildMemberAvailable(member.clone()));
                }
            }
        }

        events
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;
    use serde_json::json;
    use crate::actions::{Reconciler, SyncStatus};
    use crate::models::flags::Partials;
    use crate::ClientOptions;
    use super::*;

    fn engine() -> Reconciler {
        let mut engine = Reconciler::new(&ClientOptions { partials: Partials::all(), ..ClientOptions::default() });
        engine.set_shard_status(0, SyncStatus::Ready);
        engine.dispatch("GUILD_CREATE", &json!({ "id": "1", "name": "den", "member_count": 1 }), 0);
        engine
    }

    fn join(engine: &mut Reconciler, user_id: &str, username: &str) {
        engine.dispatch("GUILD_MEMBER_ADD", &json!({
            "guild_id": "1",
            "user": { "id": user_id, "username": username },
            "joined_at": "2024-01-01T00:00:00Z"
        }), 0);
    }

    #[test]
    fn member_add_caches_user_member_and_count() {
        let mut engine = engine();
        join(&mut engine, "7", "kaya");

        let guild = engine.state.guilds.get(&"1".into()).unwrap();
        assert_eq!(guild.member_count, 2);
        assert!(guild.members.contains(&"7".into()));
        assert!(engine.state.users.contains(&"7".into()));
    }

    #[test]
    fn member_remove_decrements_even_when_uncached() {
        let mut engine = Reconciler::new(&ClientOptions { partials: Partials::empty(), ..ClientOptions::default() });
        engine.set_shard_status(0, SyncStatus::Ready);
        engine.dispatch("GUILD_CREATE", &json!({ "id": "1", "name": "den", "member_count": 5 }), 0);

        let events = engine.dispatch("GUILD_MEMBER_REMOVE", &json!({
            "guild_id": "1",
            "user": { "id": "7" }
        }), 0);

        assert!(events.is_empty());
        assert_eq!(engine.state.guilds.get(&"1".into()).unwrap().member_count, 4);
    }

    #[test]
    fn member_events_are_gated_until_the_shard_is_synced() {
        let mut engine = Reconciler::new(&ClientOptions { partials: Partials::all(), ..ClientOptions::default() });
        engine.dispatch("GUILD_CREATE", &json!({ "id": "1", "name": "den", "member_count": 1 }), 0);
        engine.dispatch("GUILD_MEMBER_ADD", &json!({
            "guild_id": "1",
            "user": { "id": "7", "username": "kaya" },
            "joined_at": "2024-01-01T00:00:00Z"
        }), 0);

        // Cache still mutates, notifications stay silent.
        let events = engine.dispatch("GUILD_MEMBER_UPDATE", &json!({
            "guild_id": "1",
            "user": { "id": "7" },
            "nick": "kay"
        }), 0);
        assert!(events.is_empty());
        let guild = engine.state.guilds.get(&"1".into()).unwrap();
        assert_eq!(guild.members.get(&"7".into()).unwrap().nickname.as_deref(), Some("kay"));

        let events = engine.dispatch("GUILD_MEMBER_REMOVE", &json!({
            "guild_id": "1",
            "user": { "id": "7" }
        }), 0);
        assert!(events.is_empty());

        engine.set_shard_status(0, SyncStatus::Ready);
        join(&mut engine, "8", "nova");
        let events = engine.dispatch("GUILD_MEMBER_REMOVE", &json!({
            "guild_id": "1",
            "user": { "id": "8" }
        }), 0);
        assert!(matches!(events.as_slice(), [ClientEvent::GuildMemberRemove(_)]));
    }

    #[test]
    fn member_remove_resolves_through_the_tombstone() {
        let mut engine = engine();
        join(&mut engine, "7", "kaya");

        engine.dispatch("GUILD_DELETE", &json!({ "id": "1" }), 0);

        let events = engine.dispatch("GUILD_MEMBER_REMOVE", &json!({
            "guild_id": "1",
            "user": { "id": "7" }
        }), 0);

        match events.as_slice() {
            [ClientEvent::GuildMemberRemove(member)] => {
                assert_eq!(member.user_id, UserId::from("7"));
                assert_eq!(member.lifecycle, Lifecycle::Deleted);
            }
            other => panic!("unexpected notifications {other:?}"),
        }
    }

    #[test]
    fn expired_tombstone_no_longer_resolves() {
        let mut engine = Reconciler::new(&ClientOptions {
            partials: Partials::all(),
            tombstone_ttl: Duration::from_millis(0),
            ..ClientOptions::default()
        });
        engine.set_shard_status(0, SyncStatus::Ready);
        engine.dispatch("GUILD_CREATE", &json!({ "id": "1", "name": "den" }), 0);
        join(&mut engine, "7", "kaya");

        engine.dispatch("GUILD_DELETE", &json!({ "id": "1" }), 0);

        let events = engine.dispatch("GUILD_MEMBER_REMOVE", &json!({
            "guild_id": "1",
            "user": { "id": "7" }
        }), 0);
        assert!(events.is_empty());
        assert!(engine.tombstoned_guild(&"1".into()).is_none());
    }

    #[test]
    fn member_update_routes_username_changes_to_the_user_path() {
        let mut engine = engine();
        join(&mut engine, "7", "kaya");

        let events = engine.dispatch("GUILD_MEMBER_UPDATE", &json!({
            "guild_id": "1",
            "user": { "id": "7", "username": "nova" },
            "nick": "kay"
        }), 0);

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ClientEvent::UserUpdate { .. }));
        assert!(matches!(events[1], ClientEvent::GuildMemberUpdate { .. }));
        assert_eq!(
            engine.state.users.get(&"7".into()).unwrap().username.as_deref(),
            Some("nova")
        );
    }

    #[test]
    fn unchanged_member_update_is_silent() {
        let mut engine = engine();
        join(&mut engine, "7", "kaya");

        engine.dispatch("GUILD_MEMBER_UPDATE", &json!({
            "guild_id": "1", "user": { "id": "7" }, "nick": "kay"
        }), 0);
        let events = engine.dispatch("GUILD_MEMBER_UPDATE", &json!({
            "guild_id": "1", "user": { "id": "7" }, "nick": "kay"
        }), 0);

        assert!(events.is_empty());
    }

    #[test]
    fn update_for_unseen_member_reports_availability() {
        let mut engine = engine();

        let events = engine.dispatch("GUILD_MEMBER_UPDATE", &json!({
            "guild_id": "1",
            "user": { "id": "9", "username": "ghost" },
            "nick": "spooky"
        }), 0);

        assert!(events.iter().any(|e| matches!(e, ClientEvent::GuildMemberAvailable(_))));
        let guild = engine.state.guilds.get(&"1".into()).unwrap();
        assert!(guild.members.contains(&"9".into()));
    }
}
