use serde_json::Value;
use crate::manager::cache::Cache;
use crate::models::channel::Channel;
use crate::models::guild::Guild;
use crate::models::user::{ClientUser, User};
use crate::models::{Lifecycle, Patch, ChannelId, GuildId, UserId};

/// The shared registry owning every global cache.
///
/// Each cache is mutated only through the operations here, so cross-cache
/// invariants (a guild's channel index always agreeing with the global
/// channel cache) have a single writer to uphold them.
#[derive(Debug, Default)]
pub struct CacheState {
    pub client_user: Option<ClientUser>,
    pub users: Cache<UserId, User>,
    pub guilds: Cache<GuildId, Guild>,
    pub channels: Cache<ChannelId, Channel>,
    message_cache_size: usize,
}

impl CacheState {
    pub fn new(message_cache_size: usize) -> Self {
        Self {
            client_user: None,
            users: Cache::new(),
            guilds: Cache::new(),
            channels: Cache::new(),
            message_cache_size,
        }
    }

    pub fn client_user_id(&self) -> Option<UserId> {
        self.client_user.as_ref().map(|user| user.id.clone())
    }

    /// Update-if-present else construct-and-insert a user.
    pub fn add_user(&mut self, data: &Value) -> Option<UserId> {
        let user = User::from_raw(data)?;
        let id = user.id.clone();

        match self.users.get_mut(&id) {
            Some(cached) => cached.patch(data),
            None => self.users.insert(id.clone(), user),
        }

        Some(id)
    }

    /// Update-if-present else construct-and-insert a guild.
    pub fn add_guild(&mut self, data: &Value) -> Option<GuildId> {
        let guild = Guild::from_raw(data)?;
        let id = guild.id.clone();

        match self.guilds.get_mut(&id) {
            Some(cached) => cached.patch(data),
            None => self.guilds.insert(id.clone(), guild),
        }

        Some(id)
    }

    /// Deletes a guild and every channel it owned from the global cache.
    ///
    /// The returned instance is flagged `Deleted` for callers still holding
    /// a reference.
    pub fn remove_guild(&mut self, id: &GuildId) -> Option<Guild> {
        let mut guild = self.guilds.remove(id)?;

        for channel_id in guild.channels.iter() {
            self.channels.remove(channel_id);
        }
        guild.lifecycle = Lifecycle::Deleted;

        Some(guild)
    }

    /// Update-if-present else construct-and-insert a channel, keeping the
    /// owning guild's channel index in step.
    ///
    /// Unrecognized concrete kinds yield nothing and the caller drops the
    /// payload.
    pub fn add_channel(&mut self, data: &Value) -> Option<ChannelId> {
        let id: ChannelId = data.get("id").and_then(Value::as_str)?.into();

        if let Some(cached) = self.channels.get_mut(&id) {
            cached.patch(data);
            return Some(id);
        }

        let mut channel = Channel::from_raw(data)?;
        if let Some(text) = channel.text_mut() {
            text.messages_mut().set_max_size(Some(self.message_cache_size));
        }

        if let Some(guild_id) = channel.guild_id().cloned() {
            if let Some(guild) = self.guilds.get_mut(&guild_id) {
                guild.channels.insert(id.clone());
            }
        }
        self.channels.insert(id.clone(), channel);

        Some(id)
    }

    /// Swaps the cached instance under an id, used when a kind change
    /// forces a replacement entity. The guild index is untouched since the
    /// id stays the same.
    pub fn replace_channel(&mut self, id: &ChannelId, mut channel: Channel) {
        if let Some(text) = channel.text_mut() {
            text.messages_mut().set_max_size(Some(self.message_cache_size));
        }
        self.channels.insert(id.clone(), channel);
    }

    /// Deletes a channel and cascades to every derived view that referenced
    /// it: the owning guild's index, and threads parented to it.
    pub fn remove_channel(&mut self, id: &ChannelId) -> Option<Channel> {
        let channel = self.channels.remove(id)?;

        if let Some(guild_id) = channel.guild_id() {
            if let Some(guild) = self.guilds.get_mut(guild_id) {
                guild.channels.shift_remove(id);
            }
        }

        if !channel.kind().is_thread() {
            for thread_id in self.threads_of(id) {
                self.remove_channel(&thread_id);
            }
        }

        Some(channel)
    }

    /// Ids of the threads whose parent is the given channel.
    pub fn threads_of(&self, parent_id: &ChannelId) -> Vec<ChannelId> {
        self.channels.iter()
            .filter(|(_, channel)| channel.kind().is_thread() && channel.parent_id() == Some(parent_id))
            .map(|(id, _)| id.clone())
            .collect()
    }
}
