pub mod server;

pub use server::{
    Config, ConfigError, CorsConfig, DatabaseConfig, LogFormat, LoggingConfig, Profile,
    RealtimeConfig, ServerConfig,
};
