use serde_json::Value;
use crate::actions::{Action, ActionContext};
use crate::models::events::ClientEvent;
use crate::models::guild::GuildBan;
use crate::models::presence::Presence;
use crate::models::{raw, GuildId, Patch, RoleId, Snowflake, UserId};

/// Clones a nested payload and stamps the owning guild's id onto it, since
/// nested objects of a guild payload omit `guild_id`.
fn with_guild_id(data: &Value, guild_id: &GuildId) -> Value {
    let mut payload = data.clone();
    if let Value::Object(map) = &mut payload {
        map.insert("guild_id".to_string(), Value::String(guild_id.to_string()));
    }
    payload
}

pub(super) struct GuildCreate;

impl GuildCreate {
    /// A guild payload arrives with its whole object graph embedded; every
    /// nested collection is folded into the matching cache.
    fn ingest_nested(cx: &mut ActionContext, id: &GuildId, data: &Value) {
        if let Some(members) = data.get("members").and_then(Value::as_array) {
            for member in members {
                if let Some(user) = member.get("user") {
                    cx.state.add_user(user);
                }
            }
        }

        if let Some(guild) = cx.state.guilds.get_mut(id) {
            if let Some(roles) = data.get("roles").and_then(Value::as_array) {
                for role in roles {
                    guild.add_role(role);
                }
            }
            if let Some(emojis) = data.get("emojis").and_then(Value::as_array) {
                for emoji in emojis {
                    guild.add_emoji(emoji);
                }
            }
            if let Some(stickers) = data.get("stickers").and_then(Value::as_array) {
                for sticker in stickers {
                    guild.add_sticker(sticker);
                }
            }
            if let Some(members) = data.get("members").and_then(Value::as_array) {
                for member in members {
                    guild.add_member(member);
                }
            }
            if let Some(events) = data.get("guild_scheduled_events").and_then(Value::as_array) {
                for event in events {
                    guild.add_scheduled_event(event);
                }
            }
            if let Some(presences) = data.get("presences").and_then(Value::as_array) {
                for entry in presences {
                    let Some(user_id) = entry.get("user")
                        .and_then(|user| raw::string(user, "id"))
                        .map(UserId::from)
                    else { continue };

                    let mut presence = Presence::new(user_id.clone(), Some(id.clone()));
                    presence.patch(entry);
                    guild.presences.insert(user_id, presence);
                }
            }
        }

        for key in ["channels", "threads"] {
            if let Some(channels) = data.get(key).and_then(Value::as_array) {
                for channel in channels {
                    cx.state.add_channel(&with_guild_id(channel, id));
                }
            }
        }
    }
}

impl Action for GuildCreate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(id) = raw::string(data, "id").map(GuildId::from) else { return Vec::new() };
        let previously_available = cx.state.guilds.get(&id).map(|guild| guild.available);

        let Some(id) = cx.state.add_guild(data) else { return Vec::new() };
        Self::ingest_nested(cx, &id, data);

        let Some(guild) = cx.state.guilds.get(&id) else { return Vec::new() };
        match previously_available {
            // First sight of the guild.
            None => vec![ClientEvent::GuildCreate(guild.clone())],
            // An unavailable guild coming back counts as a creation.
            Some(false) if guild.available => vec![ClientEvent::GuildCreate(guild.clone())],
            _ => Vec::new(),
        }
    }
}

pub(super) struct GuildUpdate;

impl Action for GuildUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(id) = raw::string(data, "id").map(GuildId::from) else { return Vec::new() };

        let Some(old) = cx.state.guilds.get(&id).cloned() else {
            let Some(id) = cx.state.add_guild(data) else { return Vec::new() };
            return match cx.state.guilds.get(&id) {
                Some(guild) => vec![ClientEvent::GuildCreate(guild.clone())],
                None => Vec::new(),
            };
        };

        if let Some(live) = cx.state.guilds.get_mut(&id) {
            live.patch(data);
        }

        match cx.state.guilds.get(&id) {
            Some(updated) => vec![ClientEvent::GuildUpdate { old: Some(old), updated: updated.clone() }],
            None => Vec::new(),
        }
    }
}

pub(super) struct GuildDelete;

impl Action for GuildDelete {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(id) = raw::string(data, "id").map(GuildId::from) else { return Vec::new() };

        // An outage, not a removal: the guild is kept and only flagged.
        if raw::boolean(data, "unavailable") == Some(true) {
            cx.state.add_guild(data);
            return vec![ClientEvent::GuildUnavailable(id)];
        }

        match cx.state.remove_guild(&id) {
            Some(guild) => {
                cx.tombstones.insert(guild.clone());
                vec![ClientEvent::GuildDelete(guild)]
            }
            // Duplicate delivery: the tombstone already covers it, and the
            // removal was already reported once.
            None => Vec::new(),
        }
    }
}

pub(super) struct GuildBanAdd;

impl Action for GuildBanAdd {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };

        if let Some(user) = data.get("user") {
            cx.state.add_user(user);
        }

        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };
        let Some(user_id) = guild.add_ban(data) else { return Vec::new() };

        match guild.bans.get(&user_id) {
            Some(ban) => vec![ClientEvent::GuildBanAdd(ban.clone())],
            None => Vec::new(),
        }
    }
}

pub(super) struct GuildBanRemove;

impl Action for GuildBanRemove {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };

        if let Some(user) = data.get("user") {
            cx.state.add_user(user);
        }

        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };
        let Some(user_id) = data.get("user")
            .and_then(|user| raw::string(user, "id"))
            .map(UserId::from)
        else { return Vec::new() };

        let ban = guild.bans.remove(&user_id)
            .or_else(|| GuildBan::from_raw(data, &guild_id));

        match ban {
            Some(ban) => vec![ClientEvent::GuildBanRemove(ban)],
            None => Vec::new(),
        }
    }
}

pub(super) struct GuildRoleCreate;

impl Action for GuildRoleCreate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };
        let Some(role_data) = data.get("role") else { return Vec::new() };

        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };
        let existed = raw::string(role_data, "id")
            .map(RoleId::from)
            .is_some_and(|id| guild.roles.contains(&id));

        let Some(id) = guild.add_role(role_data) else { return Vec::new() };
        if existed {
            return Vec::new();
        }

        match guild.roles.get(&id) {
            Some(role) => vec![ClientEvent::GuildRoleCreate { guild_id, role: role.clone() }],
            None => Vec::new(),
        }
    }
}

pub(super) struct GuildRoleUpdate;

impl Action for GuildRoleUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };
        let Some(role_data) = data.get("role") else { return Vec::new() };
        let Some(id) = raw::string(role_data, "id").map(RoleId::from) else { return Vec::new() };

        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };

        if let Some(cached) = guild.roles.get_mut(&id) {
            let old = cached.clone();
            cached.patch(role_data);
            return vec![ClientEvent::GuildRoleUpdate { guild_id, old: Some(old), updated: cached.clone() }];
        }

        // Repair path: cache it and report a creation.
        let Some(id) = guild.add_role(role_data) else { return Vec::new() };
        match guild.roles.get(&id) {
            Some(role) => vec![ClientEvent::GuildRoleCreate { guild_id, role: role.clone() }],
            None => Vec::new(),
        }
    }
}

pub(super) struct GuildRoleDelete;

impl Action for GuildRoleDelete {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };
        let Some(role_id) = raw::string(data, "role_id").map(RoleId::from) else { return Vec::new() };

        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };
        if guild.roles.remove(&role_id).is_none() {
            return Vec::new();
        }

        // Members lose the role with it.
        for member in guild.members.values_mut() {
            member.roles.retain(|id| id != &role_id);
        }

        vec![ClientEvent::GuildRoleDelete { guild_id, role_id }]
    }
}

pub(super) struct GuildScheduledEventCreate;

impl Action for GuildScheduledEventCreate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };
        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };

        let existed = raw::string(data, "id")
            .map(Snowflake::from)
            .is_some_and(|id| guild.scheduled_events.contains(&id));

        let Some(id) = guild.add_scheduled_event(data) else { return Vec::new() };
        if existed {
            return Vec::new();
        }

        match guild.scheduled_events.get(&id) {
            Some(event) => vec![ClientEvent::GuildScheduledEventCreate(event.clone())],
            None => Vec::new(),
        }
    }
}

pub(super) struct GuildScheduledEventUpdate;

impl Action for GuildScheduledEventUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };
        let Some(id) = raw::string(data, "id").map(Snowflake::from) else { return Vec::new() };

        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };

        if let Some(cached) = guild.scheduled_events.get_mut(&id) {
            let old = cached.clone();
            cached.patch(data);
            return vec![ClientEvent::GuildScheduledEventUpdate { old: Some(old), updated: cached.clone() }];
        }

        let Some(id) = guild.add_scheduled_event(data) else { return Vec::new() };
        match guild.scheduled_events.get(&id) {
            Some(event) => vec![ClientEvent::GuildScheduledEventCreate(event.clone())],
            None => Vec::new(),
        }
    }
}

pub(super) struct GuildScheduledEventDelete;

impl Action for GuildScheduledEventDelete {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };
        let Some(id) = raw::string(data, "id").map(Snowflake::from) else { return Vec::new() };

        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };
        match guild.scheduled_events.remove(&id) {
            Some(event) => vec![ClientEvent::GuildScheduledEventDelete(event)],
            None => Vec::new(),
        }
    }
}
