//! The CLI context species
//!
//! A [`CliContext`] is composed over a configuration context: its attributes
//! read through to the shared attributes of that context, its delegates are
//! derived from the configuration context's delegates, and it is brought up
//! to date from the configuration log whenever it is read.

use ocm_context::attributes::{AttributeType, AttributeTypeRegistration, TypedAttribute};
use ocm_context::config::{ConfigContext, ConfigTarget, Updater};
use ocm_context::context::{ConfigProvider, ContextBase, Delegates, View};
use ocm_context::{AttributesContext, Context};
use std::sync::{Arc, Weak};

pub const CLI_CONTEXT_TYPE: &str = "cli.context.ocm.software";

/// Output format of listing commands; `text` or `json`
pub const OUTPUT_ATTR: &str = "cli.ocm.software/output";
/// Whether to color terminal output
pub const COLOR_ATTR: &str = "cli.ocm.software/color";

fn output_attribute() -> Arc<dyn AttributeType> {
    Arc::new(
        TypedAttribute::<String>::new(OUTPUT_ATTR, "output format of listing commands (text|json)")
            .with_short_name("output"),
    )
}

fn color_attribute() -> Arc<dyn AttributeType> {
    Arc::new(
        TypedAttribute::<bool>::new(COLOR_ATTR, "color terminal output").with_short_name("color"),
    )
}

inventory::submit! { AttributeTypeRegistration(output_attribute) }
inventory::submit! { AttributeTypeRegistration(color_attribute) }

struct CliState {
    base: ContextBase,
    config: ConfigContext,
    updater: Arc<Updater>,
}

pub struct CliCore {
    state: Arc<CliState>,
}

/// Context of one CLI invocation
pub type CliContext = View<CliCore>;

impl Context for CliCore {
    fn base(&self) -> &ContextBase {
        &self.state.base
    }

    fn attributes_context(&self) -> AttributesContext {
        self.state.config.attributes_context()
    }
}

impl ConfigProvider for CliCore {
    fn config_context(&self) -> ConfigContext {
        self.state.config.clone()
    }
}

impl CliCore {
    /// Create a CLI context fed from `config`
    pub fn create(config: ConfigContext) -> CliContext {
        let shared = config.attributes_context();
        let delegates = Delegates::derive(config.base().delegates());
        let state = Arc::new_cyclic(|this: &Weak<CliState>| {
            let target = this.clone();
            let updater = Updater::new(&config, move || {
                let state = target.upgrade()?;
                let view: CliContext = View::transient(Arc::new(CliCore { state }));
                Some(Arc::new(view) as Arc<dyn ConfigTarget>)
            });
            CliState {
                base: ContextBase::new(CLI_CONTEXT_TYPE, Some(shared.attributes()), delegates),
                config,
                updater: Arc::new(updater),
            }
        });
        state.base.attributes().set_update_hook(state.updater.clone());

        View::adopt(Arc::new(CliCore { state }))
    }

    /// Whether listings should be printed as JSON
    pub fn json_output(&self) -> bool {
        self.attributes()
            .get::<String>(OUTPUT_ATTR)
            .is_some_and(|format| format.eq_ignore_ascii_case("json"))
    }

    /// Color setting, if configured
    pub fn color(&self) -> Option<bool> {
        self.attributes().get::<bool>(COLOR_ATTR).map(|color| *color)
    }
}
