//! Configuration management
//!
//! - [`ConfigTypeScheme`]: decoders for configuration documents by type
//! - [`ConfigStore`]: the generation-numbered log of applied configurations
//! - [`Updater`]: replays the log into one consumer
//! - [`ConfigContext`]: ties the above together and feeds its shared
//!   attributes context

mod builder;
pub mod builtin;
mod context;
mod object;
mod scheme;
mod store;
mod updater;

pub use builder::{default_context, BuilderMode, ConfigBuilder};
pub use builtin::{
    AttributesConfig, ConfigBundle, LoggingConfig, ATTRIBUTES_CONFIG_TYPE_V1,
    GENERIC_CONFIG_TYPE_V1, LOGGING_CONFIG_TYPE_V1,
};
pub use context::{ApplyReport, ConfigContext, ConfigCore, CONFIG_CONTEXT_TYPE};
pub use object::{Config, ConfigObject, ConfigTarget, GenericConfig};
pub use scheme::{
    default_scheme, register_config_type, split_type, ConfigType, ConfigTypeRegistration,
    ConfigTypeScheme, TypedConfigType,
};
pub use store::{
    AllConfigs, And, AppliedConfig, ByName, ByType, ConfigSelector, ConfigSet, ConfigStore,
    Generation, SinceGeneration,
};
pub use updater::{UpdateStatus, Updater};
