pub const API_URL: &str = "https://api.chat.example/v10";

pub const USER_AGENT: &str = concat!("ClientSdk (", env!("CARGO_PKG_VERSION"), ")");

/// First millisecond of the platform's snowflake epoch
pub const EPOCH: u64 = 1420070400000;
