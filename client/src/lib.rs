//! Client-side state reconciliation for a real-time chat platform.
//!
//! Inbound gateway-style events are applied to a cached entity graph by a
//! per-event-type handler table, which synthesizes at most one public
//! notification per logical change. Remote-backed verbs funnel their REST
//! responses back through the same handlers, so a change performed locally
//! is observed exactly like one pushed by the server.

pub mod constants;
pub mod models;
pub mod manager;
pub mod actions;

use std::sync::{Arc, Once};
use std::time::Duration;
use log::{trace, warn};
use serde_json::{json, Value};
use error::{ApiError, Error, Result, ValidationError};
use crate::actions::{Reconciler, SyncStatus};
use crate::manager::events::{deliver, EventHandler};
use crate::manager::http::{Method, RequestOptions, Rest, RestConfiguration, Transport};
use crate::manager::state::CacheState;
use crate::models::channel::Channel;
use crate::models::events::ClientEvent;
use crate::models::flags::Partials;
use crate::models::guild::{GuildBan, GuildMember, Role};
use crate::models::{ChannelId, GuildId, RoleId, Snowflake, UserId};

/// Longest message-deletion window accepted by a ban, in seconds.
const MAX_BAN_DELETE_SECONDS: u64 = 604_800;

static SWEEP_INTERVAL_ADVISORY: Once = Once::new();

/// Tunables of one client instance.
#[derive(Clone)]
pub struct ClientOptions {
    /// Entity kinds the engine may materialize from incomplete payloads.
    pub partials: Partials,
    /// Upper bound of every per-channel message cache.
    pub message_cache_size: usize,
    /// How long a deleted guild stays resolvable for trailing events.
    pub tombstone_ttl: Duration,
    pub rest: RestConfiguration,
    /// Deprecated: periodic sweeping was replaced by the bounded message
    /// cache. The value is accepted and ignored.
    pub message_sweep_interval: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            partials: Partials::empty(),
            message_cache_size: 200,
            tombstone_ttl: Duration::from_secs(60),
            rest: RestConfiguration::default(),
            message_sweep_interval: None,
        }
    }
}

impl ClientOptions {
    /// Reports deprecated knobs, once per process.
    fn advise_deprecations(&self) {
        if self.message_sweep_interval.is_some() {
            SWEEP_INTERVAL_ADVISORY.call_once(|| {
                warn!(
                    target: "Client",
                    "message_sweep_interval is deprecated and ignored; bound the cache with message_cache_size"
                );
            });
        }
    }
}

/// The client: a reconciliation engine, an outbound transport, and an
/// optional observer of the notifications the engine produces.
pub struct Client {
    options: ClientOptions,
    pub(crate) reconciler: Reconciler,
    transport: Arc<dyn Transport>,
    handler: Option<Arc<dyn EventHandler>>,
}

impl Client {
    /// Builds a client over the default REST transport.
    pub fn new(token: &str, options: ClientOptions) -> Result<Self> {
        let rest = Rest::new(token, options.rest.clone())?;
        Ok(Self::with_transport(Arc::new(rest), options))
    }

    /// Builds a client over a caller-supplied transport.
    pub fn with_transport(transport: Arc<dyn Transport>, options: ClientOptions) -> Self {
        options.advise_deprecations();

        let mut reconciler = Reconciler::new(&options);
        reconciler.set_listening(false);

        Self { options, reconciler, transport, handler: None }
    }

    /// Registers the observer of reconciliation notifications.
    pub fn event_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.reconciler.set_listening(true);
        self.handler = Some(handler);
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Read access to the cached entity graph.
    pub fn state(&self) -> &CacheState {
        &self.reconciler.state
    }

    /// Marks a shard's initial population as finished or pending; member
    /// notifications for a shard stay suppressed until it is `Ready`.
    pub fn set_shard_status(&mut self, shard: u64, status: SyncStatus) {
        self.reconciler.set_shard_status(shard, status);
    }

    /// Evicts expired guild tombstones.
    pub fn sweep_tombstones(&mut self) {
        self.reconciler.sweep_tombstones();
    }

    /// Applies one inbound event to the cache and delivers the resulting
    /// notifications to the registered observer, in processing order.
    pub async fn process(&mut self, name: &str, data: &Value, shard: u64) -> Vec<ClientEvent> {
        let events = self.reconciler.dispatch(name, data, shard);

        if let Some(handler) = &self.handler {
            for event in &events {
                trace!(target: "Client", "Delivering {}", event.name());
                deliver(handler.as_ref(), event).await;
            }
        }

        events
    }

    /// Runs a REST response through the handler of the given event, so the
    /// verb produces exactly the notifications the wire event would.
    async fn feed_back(&mut self, name: &str, data: &Value) -> Vec<ClientEvent> {
        self.process(name, data, 0).await
    }

    pub async fn fetch_channel(&mut self, id: &ChannelId) -> Result<Channel> {
        let res = self.transport
            .request(Method::GET, &format!("/channels/{id}"), RequestOptions::default())
            .await?;

        self.feed_back("CHANNEL_CREATE", &res).await;

        self.reconciler.state.channels.get(id)
            .cloned()
            .ok_or_else(|| Error::Api(ApiError::InvalidResource(format!("channel {id} not found in response"))))
    }

    /// Creates a channel in a guild. The payload must carry a non-empty
    /// `name`.
    pub async fn create_channel(&mut self, guild_id: &GuildId, payload: Value, reason: Option<String>) -> Result<Channel> {
        let name = payload.get("name").and_then(Value::as_str).unwrap_or_default();
        if name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidArgument("channel name must not be empty".into())));
        }

        let res = self.transport
            .request(
                Method::POST,
                &format!("/guilds/{guild_id}/channels"),
                RequestOptions::with_body(payload).with_reason(reason),
            )
            .await?;

        let events = self.feed_back("CHANNEL_CREATE", &res).await;
        for event in events {
            if let ClientEvent::ChannelCreate(channel) = event {
                return Ok(channel);
            }
        }

        Channel::from_raw(&res)
            .ok_or_else(|| Error::Api(ApiError::Deserialize("malformed channel in response".into())))
    }

    /// Edits a channel; returns the pre-edit snapshot next to the state the
    /// channel ended up in.
    pub async fn edit_channel(&mut self, id: &ChannelId, payload: Value, reason: Option<String>) -> Result<(Option<Channel>, Channel)> {
        let res = self.transport
            .request(
                Method::PATCH,
                &format!("/channels/{id}"),
                RequestOptions::with_body(payload).with_reason(reason),
            )
            .await?;

        let events = self.feed_back("CHANNEL_UPDATE", &res).await;
        for event in events {
            match event {
                ClientEvent::ChannelUpdate { old, updated } => return Ok((old, updated)),
                ClientEvent::ChannelCreate(channel) => return Ok((None, channel)),
                _ => {}
            }
        }

        Channel::from_raw(&res)
            .map(|channel| (None, channel))
            .ok_or_else(|| Error::Api(ApiError::Deserialize("malformed channel in response".into())))
    }

    /// Deletes a channel; returns the removed instance when it was cached.
    pub async fn delete_channel(&mut self, id: &ChannelId, reason: Option<String>) -> Result<Option<Channel>> {
        let res = self.transport
            .request(
                Method::DELETE,
                &format!("/channels/{id}"),
                RequestOptions::default().with_reason(reason),
            )
            .await?;

        let data = if res.is_null() { json!({ "id": id.to_string() }) } else { res };
        let events = self.feed_back("CHANNEL_DELETE", &data).await;

        for event in events {
            if let ClientEvent::ChannelDelete(channel) = event {
                return Ok(Some(channel));
            }
        }
        Ok(None)
    }

    /// Fetches up to `limit` bans of a guild (1 to 1000, default 1000).
    pub async fn fetch_bans(&mut self, guild_id: &GuildId, limit: Option<u64>) -> Result<Vec<GuildBan>> {
        if let Some(limit) = limit {
            if !(1..=1000).contains(&limit) {
                return Err(Error::Validation(ValidationError::OutOfRange(format!("ban limit {limit} not in 1..=1000"))));
            }
        }

        let mut options = RequestOptions::default();
        if let Some(limit) = limit {
            options.query.push(("limit".to_string(), limit.to_string()));
        }

        let res = self.transport
            .request(Method::GET, &format!("/guilds/{guild_id}/bans"), options)
            .await?;
        let Some(entries) = res.as_array() else {
            return Err(Error::Api(ApiError::Deserialize("expected a ban list".into())));
        };

        let Some(guild) = self.reconciler.state.guilds.get_mut(guild_id) else {
            return Err(Error::Api(ApiError::InvalidResource(format!("guild {guild_id} is not cached"))));
        };

        let mut bans = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(user_id) = guild.add_ban(entry) {
                if let Some(ban) = guild.bans.get(&user_id) {
                    bans.push(ban.clone());
                }
            }
        }

        Ok(bans)
    }

    /// Bans a user, optionally deleting up to seven days of their messages.
    pub async fn create_ban(
        &mut self,
        guild_id: &GuildId,
        user_id: &UserId,
        delete_message_seconds: Option<u64>,
        reason: Option<String>,
    ) -> Result<GuildBan> {
        if let Some(seconds) = delete_message_seconds {
            if seconds > MAX_BAN_DELETE_SECONDS {
                return Err(Error::Validation(ValidationError::OutOfRange(
                    format!("delete_message_seconds {seconds} exceeds {MAX_BAN_DELETE_SECONDS}")
                )));
            }
        }

        let body = match delete_message_seconds {
            Some(seconds) => json!({ "delete_message_seconds": seconds }),
            None => json!({}),
        };
        self.transport
            .request(
                Method::PUT,
                &format!("/guilds/{guild_id}/bans/{user_id}"),
                RequestOptions::with_body(body).with_reason(reason.clone()),
            )
            .await?;

        // The endpoint answers with no content; the ban event is
        // synthesized from what was sent.
        let mut payload = json!({
            "guild_id": guild_id.to_string(),
            "user": { "id": user_id.to_string() }
        });
        if let (Some(reason), Value::Object(map)) = (reason, &mut payload) {
            map.insert("reason".to_string(), Value::String(reason));
        }

        let events = self.feed_back("GUILD_BAN_ADD", &payload).await;
        for event in events {
            if let ClientEvent::GuildBanAdd(ban) = event {
                return Ok(ban);
            }
        }

        Err(Error::Api(ApiError::InvalidResource(format!("guild {guild_id} is not cached"))))
    }

    pub async fn remove_ban(&mut self, guild_id: &GuildId, user_id: &UserId, reason: Option<String>) -> Result<()> {
        self.transport
            .request(
                Method::DELETE,
                &format!("/guilds/{guild_id}/bans/{user_id}"),
                RequestOptions::default().with_reason(reason),
            )
            .await?;

        let payload = json!({
            "guild_id": guild_id.to_string(),
            "user": { "id": user_id.to_string() }
        });
        self.feed_back("GUILD_BAN_REMOVE", &payload).await;

        Ok(())
    }

    /// Fetches one member and folds it into the guild's cache without
    /// producing a join notification.
    pub async fn fetch_member(&mut self, guild_id: &GuildId, user_id: &UserId) -> Result<GuildMember> {
        let res = self.transport
            .request(
                Method::GET,
                &format!("/guilds/{guild_id}/members/{user_id}"),
                RequestOptions::default(),
            )
            .await?;

        if let Some(user) = res.get("user") {
            self.reconciler.state.add_user(user);
        }

        let Some(guild) = self.reconciler.state.guilds.get_mut(guild_id) else {
            return Err(Error::Api(ApiError::InvalidResource(format!("guild {guild_id} is not cached"))));
        };
        guild.add_member(&res)
            .and_then(|user_id| guild.members.get(&user_id).cloned())
            .ok_or_else(|| Error::Api(ApiError::Deserialize("malformed member in response".into())))
    }

    pub async fn edit_member(&mut self, guild_id: &GuildId, user_id: &UserId, payload: Value, reason: Option<String>) -> Result<GuildMember> {
        let res = self.transport
            .request(
                Method::PATCH,
                &format!("/guilds/{guild_id}/members/{user_id}"),
                RequestOptions::with_body(payload).with_reason(reason),
            )
            .await?;

        let mut data = res;
        if let Value::Object(map) = &mut data {
            map.insert("guild_id".to_string(), Value::String(guild_id.to_string()));
        }
        self.feed_back("GUILD_MEMBER_UPDATE", &data).await;

        self.reconciler.state.guilds.get(guild_id)
            .and_then(|guild| guild.members.get(user_id))
            .cloned()
            .ok_or_else(|| Error::Api(ApiError::InvalidResource(format!("member {user_id} not cached after edit"))))
    }

    /// Creates a role. The payload must carry a non-empty `name`.
    pub async fn create_role(&mut self, guild_id: &GuildId, payload: Value, reason: Option<String>) -> Result<Role> {
        let name = payload.get("name").and_then(Value::as_str).unwrap_or_default();
        if name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidArgument("role name must not be empty".into())));
        }

        let res = self.transport
            .request(
                Method::POST,
                &format!("/guilds/{guild_id}/roles"),
                RequestOptions::with_body(payload).with_reason(reason),
            )
            .await?;

        let wrapped = json!({ "guild_id": guild_id.to_string(), "role": res });
        let events = self.feed_back("GUILD_ROLE_CREATE", &wrapped).await;
        for event in events {
            if let ClientEvent::GuildRoleCreate { role, .. } = event {
                return Ok(role);
            }
        }

        Err(Error::Api(ApiError::InvalidResource(format!("guild {guild_id} is not cached"))))
    }

    pub async fn edit_role(&mut self, guild_id: &GuildId, role_id: &RoleId, payload: Value, reason: Option<String>) -> Result<(Option<Role>, Role)> {
        let res = self.transport
            .request(
                Method::PATCH,
                &format!("/guilds/{guild_id}/roles/{role_id}"),
                RequestOptions::with_body(payload).with_reason(reason),
            )
            .await?;

        let wrapped = json!({ "guild_id": guild_id.to_string(), "role": res });
        let events = self.feed_back("GUILD_ROLE_UPDATE", &wrapped).await;
        for event in events {
            match event {
                ClientEvent::GuildRoleUpdate { old, updated, .. } => return Ok((old, updated)),
                ClientEvent::GuildRoleCreate { role, .. } => return Ok((None, role)),
                _ => {}
            }
        }

        Err(Error::Api(ApiError::InvalidResource(format!("guild {guild_id} is not cached"))))
    }

    pub async fn delete_role(&mut self, guild_id: &GuildId, role_id: &RoleId, reason: Option<String>) -> Result<()> {
        self.transport
            .request(
                Method::DELETE,
                &format!("/guilds/{guild_id}/roles/{role_id}"),
                RequestOptions::default().with_reason(reason),
            )
            .await?;

        let payload = json!({
            "guild_id": guild_id.to_string(),
            "role_id": role_id.to_string()
        });
        self.feed_back("GUILD_ROLE_DELETE", &payload).await;

        Ok(())
    }

    /// Moves a channel in the guild's ordering.
    pub async fn set_channel_position(&mut self, guild_id: &GuildId, channel_id: &ChannelId, position: u64, reason: Option<String>) -> Result<(Option<Channel>, Channel)> {
        let body = json!([{ "id": channel_id.to_string(), "position": position }]);
        let res = self.transport
            .request(
                Method::PATCH,
                &format!("/guilds/{guild_id}/channels"),
                RequestOptions::with_body(body).with_reason(reason),
            )
            .await?;

        // The endpoint answers with no content; the update is synthesized
        // from what was sent.
        let data = if res.is_null() {
            json!({
                "id": channel_id.to_string(),
                "guild_id": guild_id.to_string(),
                "position": position
            })
        } else {
            res
        };

        let events = self.feed_back("CHANNEL_UPDATE", &data).await;
        for event in events {
            match event {
                ClientEvent::ChannelUpdate { old, updated } => return Ok((old, updated)),
                ClientEvent::ChannelCreate(channel) => return Ok((None, channel)),
                _ => {}
            }
        }

        Err(Error::Api(ApiError::InvalidResource(format!("channel {channel_id} not cached after move"))))
    }

    /// Moves a role in the guild's ordering.
    pub async fn set_role_position(&mut self, guild_id: &GuildId, role_id: &RoleId, position: u64, reason: Option<String>) -> Result<(Option<Role>, Role)> {
        let body = json!([{ "id": role_id.to_string(), "position": position }]);
        let res = self.transport
            .request(
                Method::PATCH,
                &format!("/guilds/{guild_id}/roles"),
                RequestOptions::with_body(body).with_reason(reason),
            )
            .await?;

        // The endpoint answers with the guild's full role listing; only
        // the moved role is fed back.
        let id_string = role_id.to_string();
        let role_data = res.as_array()
            .and_then(|entries| {
                entries.iter()
                    .find(|entry| entry.get("id").and_then(Value::as_str) == Some(id_string.as_str()))
                    .cloned()
            })
            .unwrap_or_else(|| json!({ "id": id_string, "position": position }));

        let wrapped = json!({ "guild_id": guild_id.to_string(), "role": role_data });
        let events = self.feed_back("GUILD_ROLE_UPDATE", &wrapped).await;
        for event in events {
            match event {
                ClientEvent::GuildRoleUpdate { old, updated, .. } => return Ok((old, updated)),
                ClientEvent::GuildRoleCreate { role, .. } => return Ok((None, role)),
                _ => {}
            }
        }

        Err(Error::Api(ApiError::InvalidResource(format!("guild {guild_id} is not cached"))))
    }

    /// Deletes a batch of messages in one call; 2 to 100 ids.
    pub async fn bulk_delete_messages(&mut self, channel_id: &ChannelId, ids: &[Snowflake], reason: Option<String>) -> Result<Vec<Snowflake>> {
        if ids.is_empty() {
            return Err(Error::Validation(ValidationError::EmptyCollection("no message ids given".into())));
        }
        if ids.len() < 2 {
            return Err(Error::Validation(ValidationError::OutOfRange("bulk deletion needs at least 2 messages".into())));
        }
        if ids.len() > 100 {
            return Err(Error::Validation(ValidationError::BatchTooLarge(format!("{} messages exceed the batch limit of 100", ids.len()))));
        }

        let id_strings: Vec<String> = ids.iter().map(ToString::to_string).collect();
        self.transport
            .request(
                Method::POST,
                &format!("/channels/{channel_id}/messages/bulk-delete"),
                RequestOptions::with_body(json!({ "messages": id_strings })).with_reason(reason),
            )
            .await?;

        let payload = json!({
            "channel_id": channel_id.to_string(),
            "ids": id_strings
        });
        let events = self.feed_back("MESSAGE_DELETE_BULK", &payload).await;

        for event in events {
            if let ClientEvent::MessageDeleteBulk { ids, .. } = event {
                return Ok(ids);
            }
        }
        Ok(ids.to_vec())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_options_disable_partials() {
        let options = ClientOptions::default();
        assert!(!options.partials.has(Partials::MESSAGE));
        assert_eq!(options.message_cache_size, 200);
    }
}
