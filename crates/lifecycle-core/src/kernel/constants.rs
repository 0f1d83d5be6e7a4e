/// Library name
pub const APP_NAME: &str = "lifecycle";

/// Library version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stage names shared by the predefined stage sets
pub const CONFIGURE_STAGE: &str = "configure";
pub const START_STAGE: &str = "start";
pub const ANNOUNCE_STAGE: &str = "announce";
pub const UNANNOUNCE_STAGE: &str = "unannounce";
pub const STOP_STAGE: &str = "stop";

/// Environment variable naming a lifecycle configuration file
pub const CONFIG_ENV_VAR: &str = "LIFECYCLE_CONFIG";

/// Environment variable holding the log filter directive
pub const LOG_ENV_VAR: &str = "LIFECYCLE_LOG";

/// Label used for listeners registered without an owning type
pub const LISTENER_OWNER: &str = "listener";
