use serde::{Deserialize, Serialize};

macro_rules! bitfield {
    (
        $(#[$doc:meta])*
        $name:ident { $( $(#[$fdoc:meta])* $flag:ident = $bit:expr; )* }
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            $( $(#[$fdoc])* pub const $flag: u64 = $bit; )*

            pub const fn empty() -> Self {
                Self(0)
            }

            pub const fn has(&self, flag: u64) -> bool {
                self.0 & flag == flag
            }

            pub fn insert(&mut self, flag: u64) {
                self.0 |= flag;
            }

            pub fn remove(&mut self, flag: u64) {
                self.0 &= !flag;
            }

            pub fn toggle(&mut self, flag: u64) {
                self.0 ^= flag;
            }
        }

        impl From<u64> for $name {
            fn from(bits: u64) -> Self {
                Self(bits)
            }
        }
    };
}

bitfield!(
    /// Public account flags carried on a user object.
    UserFlags {
        STAFF = 1 << 0;
        PARTNER = 1 << 1;
        BUG_HUNTER = 1 << 3;
        EARLY_SUPPORTER = 1 << 9;
        VERIFIED_BOT = 1 << 16;
        ACTIVE_DEVELOPER = 1 << 22;
    }
);

bitfield!(
    /// Flags carried on a message object.
    MessageFlags {
        CROSSPOSTED = 1 << 0;
        IS_CROSSPOST = 1 << 1;
        SUPPRESS_EMBEDS = 1 << 2;
        URGENT = 1 << 4;
        EPHEMERAL = 1 << 6;
        LOADING = 1 << 7;
    }
);

bitfield!(
    /// Flags carried on a channel object.
    ChannelFlags {
        PINNED = 1 << 1;
        REQUIRE_TAG = 1 << 4;
    }
);

bitfield!(
    /// Entity kinds the client may materialize from incomplete payloads.
    ///
    /// A resolution helper only synthesizes a placeholder entity when its
    /// kind is enabled here; otherwise resolution yields nothing and the
    /// handler treats the event as a no-op.
    Partials {
        USER = 1 << 0;
        CHANNEL = 1 << 1;
        MESSAGE = 1 << 2;
        REACTION = 1 << 3;
        GUILD_MEMBER = 1 << 4;
        SCHEDULED_EVENT = 1 << 5;
    }
);

impl Partials {
    pub const fn all() -> Self {
        Self(Self::USER | Self::CHANNEL | Self::MESSAGE | Self::REACTION | Self::GUILD_MEMBER | Self::SCHEDULED_EVENT)
    }
}
