//! Bulk expression updates: the payload carries the guild's full remote
//! collection, and the handler diffs it against the cache so each item
//! still produces its own create/update/delete notification.

use std::collections::HashSet;
use serde_json::Value;
use crate::actions::{Action, ActionContext};
use crate::models::events::ClientEvent;
use crate::models::{raw, GuildId, Patch, Snowflake};

pub(super) struct GuildEmojisUpdate;

impl Action for GuildEmojisUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };
        let Some(remote) = data.get("emojis").and_then(Value::as_array) else { return Vec::new() };
        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };

        let remote_ids: HashSet<Snowflake> = remote.iter()
            .filter_map(|entry| raw::string(entry, "id").map(Snowflake::from))
            .collect();
        let removed: Vec<Snowflake> = guild.emojis.keys()
            .filter(|id| !remote_ids.contains(id))
            .cloned()
            .collect();

        let mut events = Vec::new();

        for entry in remote {
            let Some(id) = raw::string(entry, "id").map(Snowflake::from) else { continue };

            if let Some(cached) = guild.emojis.get_mut(&id) {
                let old = cached.clone();
                cached.patch(entry);
                if !old.equals(cached) {
                    events.push(ClientEvent::GuildEmojiUpdate {
                        guild_id: guild_id.clone(),
                        old: Some(old),
                        updated: cached.clone(),
                    });
                }
            } else if let Some(id) = guild.add_emoji(entry) {
                if let Some(emoji) = guild.emojis.get(&id) {
                    events.push(ClientEvent::GuildEmojiCreate { guild_id: guild_id.clone(), emoji: emoji.clone() });
                }
            }
        }

        for id in removed {
            if let Some(emoji) = guild.emojis.remove(&id) {
                events.push(ClientEvent::GuildEmojiDelete { guild_id: guild_id.clone(), emoji });
            }
        }

        events
    }
}

pub(super) struct GuildStickersUpdate;

impl Action for GuildStickersUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(guild_id) = raw::string(data, "guild_id").map(GuildId::from) else { return Vec::new() };
        let Some(remote) = data.get("stickers").and_then(Value::as_array) else { return Vec::new() };
        let Some(guild) = cx.state.guilds.get_mut(&guild_id) else { return Vec::new() };

        let remote_ids: HashSet<Snowflake> = remote.iter()
            .filter_map(|entry| raw::string(entry, "id").map(Snowflake::from))
            .collect();
        let removed: Vec<Snowflake> = guild.stickers.keys()
            .filter(|id| !remote_ids.contains(id))
            .cloned()
            .collect();

        let mut events = Vec::new();

        for entry in remote {
            let Some(id) = raw::string(entry, "id").map(Snowflake::from) else { continue };

            if let Some(cached) = guild.stickers.get_mut(&id) {
                let old = cached.clone();
                cached.patch(entry);
                if !old.equals(cached) {
                    events.push(ClientEvent::GuildStickerUpdate {
                        guild_id: guild_id.clone(),
                        old: Some(old),
                        updated: cached.clone(),
                    });
                }
            } else if let Some(id) = guild.add_sticker(entry) {
                if let Some(sticker) = guild.stickers.get(&id) {
                    events.push(ClientEvent::GuildStickerCreate { guild_id: guild_id.clone(), sticker: sticker.clone() });
                }
            }
        }

        for id in removed {
            if let Some(sticker) = guild.stickers.remove(&id) {
                events.push(ClientEvent::GuildStickerDelete { guild_id: guild_id.clone(), sticker });
            }
        }

        events
    }
}
