mod resolve;
mod channel;
mod thread;
mod guild;
mod expressions;
mod member;
mod message;
mod reaction;
mod presence;
mod user;

pub(crate) use resolve::*;

use std::collections::HashMap;
use std::time::{Duration, Instant};
use log::debug;
use serde_json::Value;
use crate::models::events::ClientEvent;
use crate::models::flags::Partials;
use crate::models::guild::Guild;
use crate::models::message::ReactionKey;
use crate::models::{GuildId, Snowflake, UserId};
use crate::manager::state::CacheState;
use crate::ClientOptions;

/// Per-shard synchronization status.
///
/// Until a shard finishes initial population, member-centric notifications
/// are suppressed even though cache mutation still occurs.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum SyncStatus {
    #[default]
    Populating,
    Ready,
}

/// Short-lived records of deleted guilds, kept so that causally-later
/// events for the same guild can still resolve the instance.
#[derive(Debug, Default)]
pub struct GuildTombstones {
    entries: HashMap<GuildId, (Guild, Instant)>,
    ttl: Duration,
}

impl GuildTombstones {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: HashMap::new(), ttl }
    }

    pub fn insert(&mut self, guild: Guild) {
        let expires_at = Instant::now() + self.ttl;
        self.entries.insert(guild.id.clone(), (guild, expires_at));
    }

    /// Looks up a tombstoned guild, evicting it first when expired.
    pub fn resolve(&mut self, id: &GuildId) -> Option<&Guild> {
        if let Some((_, expires_at)) = self.entries.get(id) {
            if *expires_at <= Instant::now() {
                self.entries.remove(id);
                return None;
            }
        }
        self.entries.get(id).map(|(guild, _)| guild)
    }

    /// Evicts every expired tombstone unconditionally.
    pub fn sweep(&mut self) {
        let now = Instant::now();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything one handler invocation may touch.
pub struct ActionContext<'a> {
    pub state: &'a mut CacheState,
    pub tombstones: &'a mut GuildTombstones,
    pub partials: Partials,
    /// Whether the shard this event arrived on has finished initial
    /// population.
    pub shard_synced: bool,
    /// Whether any observer is registered; purely advisory, used to skip
    /// high-churn notifications nobody consumes.
    pub listening: bool,
}

/// The unit of reconciliation logic for one inbound event type.
///
/// A handler applies the correct create/update/delete/no-op transition and
/// synthesizes at most one notification per logical change.
pub trait Action: Send + Sync {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent>;
}

/// Every inbound event type the engine reconciles.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EventKind {
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    ChannelPinsUpdate,
    ThreadCreate,
    ThreadUpdate,
    ThreadDelete,
    ThreadMembersUpdate,
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    GuildBanAdd,
    GuildBanRemove,
    GuildEmojisUpdate,
    GuildStickersUpdate,
    GuildRoleCreate,
    GuildRoleUpdate,
    GuildRoleDelete,
    GuildMemberAdd,
    GuildMemberRemove,
    GuildMemberUpdate,
    GuildScheduledEventCreate,
    GuildScheduledEventUpdate,
    GuildScheduledEventDelete,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    MessageDeleteBulk,
    MessageReactionAdd,
    MessageReactionRemove,
    MessageReactionRemoveAll,
    MessageReactionRemoveEmoji,
    PresenceUpdate,
    UserUpdate,
}

impl EventKind {
    /// Maps a wire event name to its kind. Unknown names yield nothing and
    /// the event is dropped, by design.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CHANNEL_CREATE" => Some(Self::ChannelCreate),
            "CHANNEL_UPDATE" => Some(Self::ChannelUpdate),
            "CHANNEL_DELETE" => Some(Self::ChannelDelete),
            "CHANNEL_PINS_UPDATE" => Some(Self::ChannelPinsUpdate),
            "THREAD_CREATE" => Some(Self::ThreadCreate),
            "THREAD_UPDATE" => Some(Self::ThreadUpdate),
            "THREAD_DELETE" => Some(Self::ThreadDelete),
            "THREAD_MEMBERS_UPDATE" => Some(Self::ThreadMembersUpdate),
            "GUILD_CREATE" => Some(Self::GuildCreate),
            "GUILD_UPDATE" => Some(Self::GuildUpdate),
            "GUILD_DELETE" => Some(Self::GuildDelete),
            "GUILD_BAN_ADD" => Some(Self::GuildBanAdd),
            "GUILD_BAN_REMOVE" => Some(Self::GuildBanRemove),
            "GUILD_EMOJIS_UPDATE" => Some(Self::GuildEmojisUpdate),
            "GUILD_STICKERS_UPDATE" => Some(Self::GuildStickersUpdate),
            "GUILD_ROLE_CREATE" => Some(Self::GuildRoleCreate),
            "GUILD_ROLE_UPDATE" => Some(Self::GuildRoleUpdate),
            "GUILD_ROLE_DELETE" => Some(Self::GuildRoleDelete),
            "GUILD_MEMBER_ADD" => Some(Self::GuildMemberAdd),
            "GUILD_MEMBER_REMOVE" => Some(Self::GuildMemberRemove),
            "GUILD_MEMBER_UPDATE" => Some(Self::GuildMemberUpdate),
            "GUILD_SCHEDULED_EVENT_CREATE" => Some(Self::GuildScheduledEventCreate),
            "GUILD_SCHEDULED_EVENT_UPDATE" => Some(Self::GuildScheduledEventUpdate),
            "GUILD_SCHEDULED_EVENT_DELETE" => Some(Self::GuildScheduledEventDelete),
            "MESSAGE_CREATE" => Some(Self::MessageCreate),
            "MESSAGE_UPDATE" => Some(Self::MessageUpdate),
            "MESSAGE_DELETE" => Some(Self::MessageDelete),
            "MESSAGE_DELETE_BULK" => Some(Self::MessageDeleteBulk),
            "MESSAGE_REACTION_ADD" => Some(Self::MessageReactionAdd),
            "MESSAGE_REACTION_REMOVE" => Some(Self::MessageReactionRemove),
            "MESSAGE_REACTION_REMOVE_ALL" => Some(Self::MessageReactionRemoveAll),
            "MESSAGE_REACTION_REMOVE_EMOJI" => Some(Self::MessageReactionRemoveEmoji),
            "PRESENCE_UPDATE" => Some(Self::PresenceUpdate),
            "USER_UPDATE" => Some(Self::UserUpdate),
            _ => None,
        }
    }
}

/// The reconciliation engine: an explicit event-kind to handler mapping
/// built once, plus the cross-event bookkeeping the handlers share.
pub struct Reconciler {
    pub state: CacheState,
    partials: Partials,
    tombstones: GuildTombstones,
    shard_status: HashMap<u64, SyncStatus>,
    listening: bool,
    table: HashMap<EventKind, Box<dyn Action>>,
}

impl Reconciler {
    pub fn new(options: &ClientOptions) -> Self {
        let mut table: HashMap<EventKind, Box<dyn Action>> = HashMap::new();

        table.insert(EventKind::ChannelCreate, Box::new(channel::ChannelCreate));
        table.insert(EventKind::ChannelUpdate, Box::new(channel::ChannelUpdate));
        table.insert(EventKind::ChannelDelete, Box::new(channel::ChannelDelete));
        table.insert(EventKind::ChannelPinsUpdate, Box::new(channel::ChannelPinsUpdate));
        table.insert(EventKind::ThreadCreate, Box::new(thread::ThreadCreate));
        table.insert(EventKind::ThreadUpdate, Box::new(thread::ThreadUpdate));
        table.insert(EventKind::ThreadDelete, Box::new(thread::ThreadDelete));
        table.insert(EventKind::ThreadMembersUpdate, Box::new(thread::ThreadMembersUpdate));
        table.insert(EventKind::GuildCreate, Box::new(guild::GuildCreate));
        table.insert(EventKind::GuildUpdate, Box::new(guild::GuildUpdate));
        table.insert(EventKind::GuildDelete, Box::new(guild::GuildDelete));
        table.insert(EventKind::GuildBanAdd, Box::new(guild::GuildBanAdd));
        table.insert(EventKind::GuildBanRemove, Box::new(guild::GuildBanRemove));
        table.insert(EventKind::GuildEmojisUpdate, Box::new(expressions::GuildEmojisUpdate));
        table.insert(EventKind::GuildStickersUpdate, Box::new(expressions::GuildStickersUpdate));
        table.insert(EventKind::GuildRoleCreate, Box::new(guild::GuildRoleCreate));
        table.insert(EventKind::GuildRoleUpdate, Box::new(guild::GuildRoleUpdate));
        table.insert(EventKind::GuildRoleDelete, Box::new(guild::GuildRoleDelete));
        table.insert(EventKind::GuildMemberAdd, Box::new(member::GuildMemberAdd));
        table.insert(EventKind::GuildMemberRemove, Box::new(member::GuildMemberRemove));
        table.insert(EventKind::GuildMemberUpdate, Box::new(member::GuildMemberUpdate));
        table.insert(EventKind::GuildScheduledEventCreate, Box::new(guild::GuildScheduledEventCreate));
        table.insert(EventKind::GuildScheduledEventUpdate, Box::new(guild::GuildScheduledEventUpdate));
        table.insert(EventKind::GuildScheduledEventDelete, Box::new(guild::GuildScheduledEventDelete));
        table.insert(EventKind::MessageCreate, Box::new(message::MessageCreate));
        table.insert(EventKind::MessageUpdate, Box::new(message::MessageUpdate));
        table.insert(EventKind::MessageDelete, Box::new(message::MessageDelete));
        table.insert(EventKind::MessageDeleteBulk, Box::new(message::MessageDeleteBulk));
        table.insert(EventKind::MessageReactionAdd, Box::new(reaction::MessageReactionAdd));
        table.insert(EventKind::MessageReactionRemove, Box::new(reaction::MessageReactionRemove));
        table.insert(EventKind::MessageReactionRemoveAll, Box::new(reaction::MessageReactionRemoveAll));
        table.insert(EventKind::MessageReactionRemoveEmoji, Box::new(reaction::MessageReactionRemoveEmoji));
        table.insert(EventKind::PresenceUpdate, Box::new(presence::PresenceUpdate));
        table.insert(EventKind::UserUpdate, Box::new(user::UserUpdate));

        Self {
            state: CacheState::new(options.message_cache_size),
            partials: options.partials,
            tombstones: GuildTombstones::new(options.tombstone_ttl),
            shard_status: HashMap::new(),
            listening: true,
            table,
        }
    }

    /// Applies one inbound event to the cached graph and returns the
    /// notifications it produced. Unknown event names are dropped.
    pub fn dispatch(&mut self, name: &str, data: &Value, shard: u64) -> Vec<ClientEvent> {
        let Some(kind) = EventKind::from_name(name) else {
            #[cfg(feature = "debug")]
            debug!(target: "Reconciler", "Dropping unknown event {name}");
            return Vec::new();
        };

        let shard_synced = matches!(self.shard_status.get(&shard), Some(SyncStatus::Ready));
        let mut cx = ActionContext {
            state: &mut self.state,
            tombstones: &mut self.tombstones,
            partials: self.partials,
            shard_synced,
            listening: self.listening,
        };

        match self.table.get_mut(&kind) {
            Some(action) => action.handle(&mut cx, data),
            None => Vec::new(),
        }
    }

    /// Reuses the reaction-add path for reactions applied by local code
    /// rather than the wire; resolution is identical, only the public
    /// notification is suppressed.
    pub fn apply_reaction_locally(&mut self, data: &Value) -> Option<(Snowflake, ReactionKey, UserId)> {
        let mut cx = ActionContext {
            state: &mut self.state,
            tombstones: &mut self.tombstones,
            partials: self.partials,
            shard_synced: true,
            listening: self.listening,
        };

        reaction::apply_reaction(&mut cx, data).map(|applied| {
            debug!(target: "Reconciler", "Applied local reaction on message {}", applied.message_id);
            (applied.message_id, applied.key, applied.user_id)
        })
    }

    pub fn set_shard_status(&mut self, shard: u64, status: SyncStatus) {
        self.shard_status.insert(shard, status);
    }

    pub fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    /// Looks up a recently deleted guild, if its tombstone has not expired.
    pub fn tombstoned_guild(&mut self, id: &GuildId) -> Option<Guild> {
        self.tombstones.resolve(id).cloned()
    }

    /// Evicts expired guild tombstones.
    pub fn sweep_tombstones(&mut self) {
        self.tombstones.sweep();
    }
}
