use serde_json::Value;
use crate::actions::{resolve_channel, Action, ActionContext};
use crate::models::channel::{Channel, ChannelKind};
use crate::models::events::ClientEvent;
use crate::models::{raw, ChannelId, Patch};

/// The concrete enum variant a kind maps to. A declared kind inside the
/// same family is absorbed by a patch; a different family forces a
/// replacement instance.
fn variant_family(kind: ChannelKind) -> u8 {
    match kind {
        ChannelKind::Text | ChannelKind::Announcement | ChannelKind::Forum => 0,
        ChannelKind::Dm => 1,
        ChannelKind::Voice | ChannelKind::Stage => 2,
        ChannelKind::Category => 3,
        ChannelKind::AnnouncementThread | ChannelKind::PublicThread | ChannelKind::PrivateThread => 4,
    }
}

pub(super) struct ChannelCreate;

impl Action for ChannelCreate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(id) = raw::string(data, "id").map(ChannelId::from) else { return Vec::new() };
        let existed = cx.state.channels.contains(&id);

        let Some(id) = cx.state.add_channel(data) else { return Vec::new() };
        if existed {
            // Duplicate delivery: the cache was refreshed, no second
            // notification.
            return Vec::new();
        }

        match cx.state.channels.get(&id) {
            Some(channel) => vec![ClientEvent::ChannelCreate(channel.clone())],
            None => Vec::new(),
        }
    }
}

pub(super) struct ChannelUpdate;

impl Action for ChannelUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(id) = raw::string(data, "id").map(ChannelId::from) else { return Vec::new() };

        let Some(old) = cx.state.channels.get(&id).cloned() else {
            // An update for a channel never seen repairs the cache and is
            // reported as a creation.
            let Some(id) = cx.state.add_channel(data) else { return Vec::new() };
            return match cx.state.channels.get(&id) {
                Some(channel) => vec![ClientEvent::ChannelCreate(channel.clone())],
                None => Vec::new(),
            };
        };

        match raw::u64(data, "type").map(ChannelKind::from_code) {
            // A kind this client does not understand: the stale entity
            // cannot be kept, so it is dropped without a notification.
            Some(None) => {
                cx.state.remove_channel(&id);
                return Vec::new();
            }
            Some(Some(kind)) if variant_family(kind) != variant_family(old.kind()) => {
                let Some(mut replacement) = Channel::from_kind(kind, data) else { return Vec::new() };

                // Both kinds text-capable: the message cache survives the
                // migration.
                if kind.is_text_capable() && old.kind().is_text_capable() {
                    if let Some(messages) = cx.state.channels.get_mut(&id).and_then(Channel::take_messages) {
                        replacement.install_messages(messages);
                    }
                }
                cx.state.replace_channel(&id, replacement);
            }
            _ => {
                if let Some(live) = cx.state.channels.get_mut(&id) {
                    live.patch(data);
                }
            }
        }

        match cx.state.channels.get(&id) {
            Some(updated) => vec![ClientEvent::ChannelUpdate { old: Some(old), updated: updated.clone() }],
            None => Vec::new(),
        }
    }
}

pub(super) struct ChannelDelete;

impl Action for ChannelDelete {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(id) = raw::string(data, "id").map(ChannelId::from) else { return Vec::new() };

        match cx.state.remove_channel(&id) {
            Some(channel) => vec![ClientEvent::ChannelDelete(channel)],
            None => Vec::new(),
        }
    }
}

pub(super) struct ChannelPinsUpdate;

impl Action for ChannelPinsUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(channel_id) = resolve_channel(cx, data) else { return Vec::new() };

        if let Some(channel) = cx.state.channels.get_mut(&channel_id) {
            channel.patch(data);
        }

        vec![ClientEvent::ChannelPinsUpdate {
            channel_id,
            last_pin_at: raw::datetime(data, "last_pin_timestamp"),
        }]
    }
}
