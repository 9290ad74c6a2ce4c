//! Configuration types registered with the process-wide registry at start-up

mod attributes;
mod generic;
mod logging;

pub use attributes::{AttributesConfig, ATTRIBUTES_CONFIG_TYPE, ATTRIBUTES_CONFIG_TYPE_V1};
pub use generic::{ConfigBundle, ConfigSetSpec, GENERIC_CONFIG_TYPE, GENERIC_CONFIG_TYPE_V1};
pub use logging::{LoggingConfig, LOGGING_CONFIG_TYPE, LOGGING_CONFIG_TYPE_V1};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{register_attribute_type, TypedAttribute};
    use crate::config::{BuilderMode, ConfigBuilder, ConfigObject};
    use crate::context::{AttributesContext, Context, LogLevel, ATTRIBUTES_CONTEXT_TYPE};

    const RETRIES: &str = "test.ocm.software/builtin/retries";

    #[test]
    fn test_builtin_types_are_registered() {
        let scheme = crate::config::default_scheme();
        for name in [
            GENERIC_CONFIG_TYPE_V1,
            GENERIC_CONFIG_TYPE,
            ATTRIBUTES_CONFIG_TYPE_V1,
            ATTRIBUTES_CONFIG_TYPE,
            LOGGING_CONFIG_TYPE_V1,
            LOGGING_CONFIG_TYPE,
        ] {
            assert!(scheme.is_known(name), "{} not registered", name);
        }
        let newer = format!("{}/v2", LOGGING_CONFIG_TYPE);
        assert_eq!(scheme.lookup(&newer).unwrap().name(), LOGGING_CONFIG_TYPE);
    }

    #[test]
    fn test_attributes_config_sets_shared_attributes() {
        register_attribute_type(
            TypedAttribute::<u32>::new(RETRIES, "retries").with_short_name("builtin-retries"),
        );
        let shared = AttributesContext::new(None);
        let ctx = ConfigBuilder::new()
            .with_shared_attributes(shared.clone())
            .build(BuilderMode::Defaulted);

        let mut config = AttributesConfig::new();
        config.add_attribute("builtin-retries", 5).unwrap();
        ctx.apply_config(ConfigObject::new(config), "retries").unwrap();

        assert_eq!(shared.attributes().get::<u32>(RETRIES).as_deref(), Some(&5));
        assert_eq!(ctx.attributes().get::<u32>(RETRIES).as_deref(), Some(&5));
    }

    #[test]
    fn test_logging_config_by_context_type() {
        let shared = AttributesContext::new(None);
        let ctx = ConfigBuilder::new()
            .with_shared_attributes(shared.clone())
            .build(BuilderMode::Defaulted);

        let config = LoggingConfig::new(LogLevel::Trace).for_context_type(ATTRIBUTES_CONTEXT_TYPE);
        ctx.apply_config(ConfigObject::new(config), "logging").unwrap();

        assert_eq!(shared.logging().level(), LogLevel::Trace);
        assert_eq!(ctx.logging().level(), LogLevel::Trace);
        ctx.base().delegates().logging().set_level(Some(LogLevel::Warn));
        assert_eq!(ctx.logging().level(), LogLevel::Warn);
        assert_eq!(shared.logging().level(), LogLevel::Trace);
    }

    #[test]
    fn test_bundle_applies_nested_configs_and_sets() {
        let shared = AttributesContext::new(None);
        let ctx = ConfigBuilder::new()
            .with_shared_attributes(shared.clone())
            .build(BuilderMode::Defaulted);

        let mut bundle = ConfigBundle::new();
        bundle
            .add_config(&ConfigObject::new(LoggingConfig::new(LogLevel::Debug)))
            .unwrap();
        bundle
            .add_set_config(
                "quiet",
                "only errors",
                &ConfigObject::new(LoggingConfig::new(LogLevel::Error)),
            )
            .unwrap();
        ctx.apply_config(ConfigObject::new(bundle), "bundle").unwrap();

        assert_eq!(ctx.generation(), 2);
        assert_eq!(ctx.config_set_names(), vec!["quiet"]);
        assert_eq!(shared.logging().level(), LogLevel::Debug);

        let nested = ctx.entries();
        assert_eq!(nested[1].description(), "bundle--generic config");

        ctx.apply_config_set("quiet").unwrap();
        assert_eq!(shared.logging().level(), LogLevel::Error);
    }

    #[test]
    fn test_bundle_keeps_going_after_broken_set_entry() {
        let shared = AttributesContext::new(None);
        let ctx = ConfigBuilder::new()
            .with_shared_attributes(shared.clone())
            .build(BuilderMode::Defaulted);

        let mut bundle = ConfigBundle::new();
        bundle
            .add_config(&ConfigObject::new(LoggingConfig::new(LogLevel::Debug)))
            .unwrap();
        bundle
            .add_set_config(
                "quiet",
                "only errors",
                &ConfigObject::new(LoggingConfig::new(LogLevel::Error)),
            )
            .unwrap();
        bundle
            .sets
            .get_mut("quiet")
            .unwrap()
            .configurations
            .push(serde_json::json!({ "level": "debug" }));

        let err = ctx.apply_config(ConfigObject::new(bundle), "bundle").unwrap_err();
        assert!(err.to_string().contains("config set quiet"), "{}", err);

        assert_eq!(ctx.generation(), 2);
        assert_eq!(shared.logging().level(), LogLevel::Debug);
        assert_eq!(ctx.config_set("quiet").unwrap().configurations.len(), 1);
    }
}
