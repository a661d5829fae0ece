pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::load_settings;
pub use paths::{
    default_executions_path, default_global_config_path, DEFAULT_EXECUTIONS_DIR,
    GLOBAL_SETTINGS_FILE_NAME, GLOBAL_STATE_DIR,
};
pub use settings::{
    CleanupConfig, GroundingConfig, LayoutConfig, ReportConfig, ServiceConfig, Settings,
    StrategyConfig,
};
