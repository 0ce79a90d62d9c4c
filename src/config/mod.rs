pub mod endpoints;
pub mod loader;
pub mod schema;
pub mod settings;

pub use endpoints::{normalize_api_base_url, EndpointError, SourcePlan, DEFAULT_API_BASE_URL};
pub use loader::{
    discover, load_file, load_from_path, load_from_str, ConfigError, ConfigFile, ConfigOrigin,
    LoadedConfig, CONFIG_FILE_NAME,
};
pub use schema::{PinConfig, PinSection, ValidationError, ValidationIssue};
pub use settings::{split_list, Overrides, Settings};
