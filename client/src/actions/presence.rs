use serde_json::{json, Value};
use crate::actions::{apply_user_update, Action, ActionContext};
use crate::models::events::ClientEvent;
use crate::models::flags::Partials;
use crate::models::presence::Presence;
use crate::models::user::User;
use crate::models::{raw, GuildId, Patch, UserId};

pub(super) struct PresenceUpdate;

impl Action for PresenceUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(user) = data.get("user") else { return Vec::new() };
        let Some(user_id) = raw::string(user, "id").map(UserId::from) else { return Vec::new() };

        let mut events = Vec::new();

        if raw::has(user, "username") {
            // An embedded username always materializes the user, and a
            // change to it is routed through the user path.
            if cx.state.users.contains(&user_id) {
                if let Some(event) = apply_user_update(cx, user) {
                    events.push(event);
                }
            } else {
                cx.state.add_user(user);
            }
        } else if !cx.state.users.contains(&user_id) {
            if !cx.partials.has(Partials::USER) {
                return events;
            }
            cx.state.users.insert(user_id.clone(), User::new(user_id.clone()));
        }

        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return events };
        let status = raw::string(data, "status");
        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return events };

        // A presence for a member never seen, going online: the member
        // becomes visible.
        if !guild.members.contains(&user_id) && status.as_deref() != Some("offline") {
            guild.add_member(&json!({ "user": { "id": user_id.to_string() } }));

            if cx.shard_synced {
                if let Some(member) = guild.members.get(&user_id) {
                    events.push(ClientEvent::GuildMemberAvailable(member.clone()));
                }
            }
        }

        let old = guild.presences.get(&user_id).cloned();
        match guild.presences.get_mut(&user_id) {
            Some(presence) => presence.patch(data),
            None => {
                let mut presence = Presence::new(user_id.clone(), Some(guild_id));
                presence.patch(data);
                guild.presences.insert(user_id.clone(), presence);
            }
        }

        let Some(updated) = guild.presences.get(&user_id).cloned() else { return events };
        let changed = old.as_ref().map(|old| !old.equals(&updated)).unwrap_or(true);

        // High-churn notification: skipped outright when nobody listens.
        if cx.listening && changed {
            events.push(ClientEvent::PresenceUpdate { old, updated });
        }

        events
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use crate::actions::{Reconciler, SyncStatus};
    use crate::models::flags::Partials;
    use crate::models::presence::Status;
    use crate::ClientOptions;
    use super::*;

    fn engine(partials: Partials) -> Reconciler {
        let mut engine = Reconciler::new(&ClientOptions { partials, ..ClientOptions::default() });
        engine.set_shard_status(0, SyncStatus::Ready);
        engine.dispatch("GUILD_CREATE", &json!({ "id": "1", "name": "den" }), 0);
        engine
    }

    #[test]
    fn embedded_username_materializes_the_user() {
        let mut engine = engine(Partials::empty());

        engine.dispatch("PRESENCE_UPDATE", &json!({
            "guild_id": "1",
            "user": { "id": "7", "username": "kaya" },
            "status": "online"
        }), 0);

        assert_eq!(
            engine.state.users.get(&"7".into()).unwrap().username.as_deref(),
            Some("kaya")
        );
    }

    #[test]
    fn bare_presence_without_user_partials_is_dropped() {
        let mut engine = engine(Partials::empty());

        let events = engine.dispatch("PRESENCE_UPDATE", &json!({
            "guild_id": "1",
            "user": { "id": "7" },
            "status": "online"
        }), 0);

        assert!(events.is_empty());
        assert!(engine.state.users.is_empty());
    }

    #[test]
    fn going_online_synthesizes_a_minimal_member() {
        let mut engine = engine(Partials::all());

        let events = engine.dispatch("PRESENCE_UPDATE", &json!({
            "guild_id": "1",
            "user": { "id": "7" },
            "status": "online"
        }), 0);

        assert!(events.iter().any(|e| matches!(e, ClientEvent::GuildMemberAvailable(_))));
        assert!(events.iter().any(|e| matches!(e, ClientEvent::PresenceUpdate { .. })));

        let guild = engine.state.guilds.get(&"1".into()).unwrap();
        let member = guild.members.get(&"7".into()).unwrap();
        assert!(member.partial);
        assert_eq!(guild.presences.get(&"7".into()).unwrap().status, Status::Online);
    }

    #[test]
    fn offline_presence_for_unseen_member_adds_no_member() {
        let mut engine = engine(Partials::all());

        engine.dispatch("PRESENCE_UPDATE", &json!({
            "guild_id": "1",
            "user": { "id": "7" },
            "status": "offline"
        }), 0);

        assert!(engine.state.guilds.get(&"1".into()).unwrap().members.is_empty());
    }

    #[test]
    fn unchanged_presence_is_silent() {
        let mut engine = engine(Partials::all());

        let payload = json!({
            "guild_id": "1",
            "user": { "id": "7" },
            "status": "dnd"
        });
        engine.dispatch("PRESENCE_UPDATE", &payload, 0);
        let events = engine.dispatch("PRESENCE_UPDATE", &payload, 0);

        assert!(events.is_empty());
    }

    #[test]
    fn username_change_routes_through_the_user_path() {
        let mut engine = engine(Partials::all());
        engine.state.add_user(&json!({ "id": "7", "username": "kaya" }));

        let events = engine.dispatch("PRESENCE_UPDATE", &json!({
            "guild_id": "1",
            "user": { "id": "7", "username": "nova" },
            "status": "online"
        }), 0);

        assert!(events.iter().any(|e| matches!(e, ClientEvent::UserUpdate { .. })));
    }
}
