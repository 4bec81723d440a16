use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::room::RoomSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MultiplayerConfig {
    pub path: String,
    pub room_param: String,
    pub session_param: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoomConfig {
    /// Seconds an empty room survives before eviction; 0 disables eviction.
    pub idle_timeout_secs: u64,
    pub member_mailbox_capacity: usize,
}

impl RoomConfig {
    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            idle_timeout: (self.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.idle_timeout_secs)),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    pub max_age: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub multiplayer: MultiplayerConfig,
    pub rooms: RoomConfig,
    pub cors: CorsConfig,
}

fn with_defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("environment", environment)?
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("server.workers", num_cpus::get() as i64)?
        .set_default("multiplayer.path", "/api/multiplayer")?
        .set_default("multiplayer.room_param", "item_id")?
        .set_default("multiplayer.session_param", "session_id")?
        .set_default("rooms.idle_timeout_secs", 300)?
        .set_default("rooms.member_mailbox_capacity", 256)?
        .set_default("cors.enabled", false)?
        .set_default("cors.allow_any_origin", false)?
        .set_default("cors.max_age", 3600)
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        with_defaults("development")?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?
            .try_deserialize()
    }

    #[cfg(test)]
    pub fn new_for_test() -> Result<Self, ConfigError> {
        with_defaults("test")?
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?
            .try_deserialize()
    }
}
