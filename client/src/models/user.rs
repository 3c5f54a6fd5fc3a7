use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::manager::cache::Identifiable;
use crate::models::flags::UserFlags;
use crate::models::{raw, Patch, UserId};

/// Represent the account the client is running as.
///
/// This record lives outside the general user cache and is updated through
/// the live client-identity reference.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ClientUser {
    pub id: UserId,
    pub username: String,
    pub discriminator: Option<String>,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub bot: bool,
    pub verified: Option<bool>,
    pub mfa_enabled: Option<bool>,
    pub flags: Option<UserFlags>,
}

impl Patch for ClientUser {
    fn patch(&mut self, data: &Value) {
        if let Some(username) = raw::string(data, "username") { self.username = username; }
        if raw::has(data, "discriminator") { self.discriminator = raw::string(data, "discriminator"); }
        if raw::has(data, "global_name") { self.global_name = raw::string(data, "global_name"); }
        if raw::has(data, "avatar") { self.avatar = raw::string(data, "avatar"); }
        if let Some(bot) = raw::boolean(data, "bot") { self.bot = bot; }
        if raw::has(data, "verified") { self.verified = raw::boolean(data, "verified"); }
        if raw::has(data, "mfa_enabled") { self.mfa_enabled = raw::boolean(data, "mfa_enabled"); }
        if let Some(flags) = raw::u64(data, "flags") { self.flags = Some(flags.into()); }
    }
}

impl ClientUser {
    pub fn from_raw(data: &Value) -> Option<Self> {
        let id: UserId = raw::string(data, "id")?.into();

        let mut user = Self {
            id,
            username: String::new(),
            discriminator: None,
            global_name: None,
            avatar: None,
            bot: false,
            verified: None,
            mfa_enabled: None,
            flags: None,
        };
        user.patch(data);

        Some(user)
    }

    pub fn tag(&self) -> String {
        match &self.discriminator {
            Some(discriminator) => format!("{}#{}", self.username, discriminator),
            None => self.username.clone()
        }
    }
}

/// Represent a user observed on the platform.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct User {
    pub id: UserId,
    /// Absent on a partial user until a later fetch or richer event fills it.
    pub username: Option<String>,
    pub discriminator: Option<String>,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub bot: Option<bool>,
    pub system: Option<bool>,
    pub banner: Option<String>,
    pub accent_color: Option<u64>,
    pub flags: Option<UserFlags>,
    /// Whether this user was materialized from incomplete data.
    pub partial: bool,
}

impl Identifiable for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id.clone()
    }
}

impl Patch for User {
    fn patch(&mut self, data: &Value) {
        if let Some(username) = raw::string(data, "username") {
            self.username = Some(username);
            self.partial = false;
        }
        if raw::has(data, "discriminator") { self.discriminator = raw::string(data, "discriminator"); }
        if raw::has(data, "global_name") { self.global_name = raw::string(data, "global_name"); }
        if raw::has(data, "avatar") { self.avatar = raw::string(data, "avatar"); }
        if let Some(bot) = raw::boolean(data, "bot") { self.bot = Some(bot); }
        if let Some(system) = raw::boolean(data, "system") { self.system = Some(system); }
        if raw::has(data, "banner") { self.banner = raw::string(data, "banner"); }
        if raw::has(data, "accent_color") { self.accent_color = raw::u64(data, "accent_color"); }
        if let Some(flags) = raw::u64(data, "public_flags") { self.flags = Some(flags.into()); }
    }
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            username: None,
            discriminator: None,
            global_name: None,
            avatar: None,
            bot: None,
            system: None,
            banner: None,
            accent_color: None,
            flags: None,
            partial: true,
        }
    }

    pub fn from_raw(data: &Value) -> Option<Self> {
        let id: UserId = raw::string(data, "id")?.into();

        let mut user = Self::new(id);
        user.patch(data);

        Some(user)
    }

    /// Structural equality over observable fields.
    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }

    pub fn tag(&self) -> Option<String> {
        let username = self.username.as_ref()?;
        Some(match &self.discriminator {
            Some(discriminator) => format!("{username}#{discriminator}"),
            None => username.clone()
        })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use super::*;

    #[test]
    fn partial_user_fills_in_on_patch() {
        let mut user = User::from_raw(&json!({ "id": "10" })).unwrap();
        assert!(user.partial);
        assert!(user.username.is_none());

        user.patch(&json!({ "username": "kaya", "bot": false }));
        assert!(!user.partial);
        assert_eq!(user.username.as_deref(), Some("kaya"));
    }

    #[test]
    fn sparse_patch_keeps_known_fields() {
        let mut user = User::from_raw(&json!({
            "id": "10", "username": "kaya", "avatar": "abc"
        })).unwrap();

        user.patch(&json!({ "global_name": "Kaya" }));
        assert_eq!(user.avatar.as_deref(), Some("abc"));
        assert_eq!(user.global_name.as_deref(), Some("Kaya"));
    }
}
