use serde_json::Value;
use crate::actions::{Action, ActionContext};
use crate::models::channel::{Channel, ThreadMember};
use crate::models::events::ClientEvent;
use crate::models::{raw, ChannelId, Patch, UserId};

pub(super) struct ThreadCreate;

impl Action for ThreadCreate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(id) = raw::string(data, "id").map(ChannelId::from) else { return Vec::new() };
        let existed = cx.state.channels.contains(&id);

        let Some(id) = cx.state.add_channel(data) else { return Vec::new() };
        if existed {
            return Vec::new();
        }

        match cx.state.channels.get(&id).and_then(Channel::as_thread) {
            Some(thread) => vec![ClientEvent::ThreadCreate(thread.clone())],
            None => Vec::new(),
        }
    }
}

pub(super) struct ThreadUpdate;

impl Action for ThreadUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(id) = raw::string(data, "id").map(ChannelId::from) else { return Vec::new() };

        let Some(old) = cx.state.channels.get(&id).and_then(Channel::as_thread).cloned() else {
            // Repair path: an update for a thread never seen is reported
            // as a creation.
            let Some(id) = cx.state.add_channel(data) else { return Vec::new() };
            return match cx.state.channels.get(&id).and_then(Channel::as_thread) {
                Some(thread) => vec![ClientEvent::ThreadCreate(thread.clone())],
                None => Vec::new(),
            };
        };

        if let Some(live) = cx.state.channels.get_mut(&id) {
            live.patch(data);
        }

        match cx.state.channels.get(&id).and_then(Channel::as_thread) {
            Some(updated) => vec![ClientEvent::ThreadUpdate { old: Some(old), updated: updated.clone() }],
            None => Vec::new(),
        }
    }
}

pub(super) struct ThreadDelete;

impl Action for ThreadDelete {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(id) = raw::string(data, "id").map(ChannelId::from) else { return Vec::new() };

        match cx.state.remove_channel(&id) {
            Some(Channel::Thread(thread)) => vec![ClientEvent::ThreadDelete(thread)],
            _ => Vec::new(),
        }
    }
}

pub(super) struct ThreadMembersUpdate;

impl Action for ThreadMembersUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        let Some(id) = raw::string(data, "id").map(ChannelId::from) else { return Vec::new() };
        let Some(thread) = cx.state.channels.get_mut(&id).and_then(Channel::as_thread_mut) else {
            return Vec::new();
        };

        if let Some(count) = raw::u64(data, "member_count") {
            thread.member_count = Some(count);
        }

        let mut added = Vec::new();
        if let Some(entries) = data.get("added_members").and_then(Value::as_array) {
            for entry in entries {
                if let Some(member) = ThreadMember::from_raw(entry) {
                    thread.members.insert(member.user_id.clone(), member.clone());
                    added.push(member);
                }
            }
        }

        let mut removed = Vec::new();
        if let Some(ids) = data.get("removed_member_ids").and_then(Value::as_array) {
            for user_id in ids.iter().filter_map(Value::as_str).map(UserId::from) {
                if thread.members.remove(&user_id).is_some() {
                    removed.push(user_id);
                }
            }
        }

        if added.is_empty() && removed.is_empty() {
            return Vec::new();
        }

        vec![ClientEvent::ThreadMembersUpdate { thread_id: id, added, removed }]
    }
}
