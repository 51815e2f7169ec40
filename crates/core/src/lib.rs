pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod seed;
pub mod testing;
pub mod views;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use cache::{CacheError, CacheProbe};
pub use catalog::{
    CatalogError, CatalogResult, CatalogStore, Category, Producer, SqliteCatalogStore, Video,
    VideoFilter, VideoQuery,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use engine::{CatalogEngine, PageLimits, Pagination, RelationshipResolver, SearchPage};
pub use seed::{seed_if_empty, SeedReport};
pub use views::{create_view_accounting, AccountingFailure, ViewCountWriter, ViewCounter};
