//! The configuration context species

use super::object::{ConfigObject, ConfigTarget};
use super::scheme::ConfigTypeScheme;
use super::store::{
    AppliedConfig, ByName, ByType, ConfigSelector, ConfigSet, ConfigStore, Generation,
    SinceGeneration,
};
use super::updater::{UpdateStatus, Updater};
use crate::context::{
    AttributesContext, ConfigProvider, Context, ContextBase, Delegates, View,
};
use crate::error::{Error, ErrorList, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Species type of configuration contexts
pub const CONFIG_CONTEXT_TYPE: &str = "config.context.ocm.software";

/// State shared by all views of one configuration context
pub(crate) struct ConfigState {
    base: ContextBase,
    shared: AttributesContext,
    types: Arc<ConfigTypeScheme>,
    store: ConfigStore,
    skip_unknown: AtomicBool,
    updater: Arc<Updater>,
}

impl ConfigState {
    pub(crate) fn store(&self) -> &ConfigStore {
        &self.store
    }
}

/// A configuration context: the configuration log plus the registry used
/// to decode its entries.
///
/// Views created with [`with_info`](View::with_info) additionally carry a
/// description of the entry being applied.
pub struct ConfigCore {
    state: Arc<ConfigState>,
    description: Option<String>,
}

pub type ConfigContext = View<ConfigCore>;

impl Context for ConfigCore {
    fn base(&self) -> &ContextBase {
        &self.state.base
    }

    /// The shared attributes context, brought up to date first
    fn attributes_context(&self) -> AttributesContext {
        if let Err(err) = self.state.updater.update() {
            tracing::debug!(error = %err, "config update failed");
        }
        self.state.shared.create_view()
    }
}

impl ConfigProvider for ConfigContext {
    fn config_context(&self) -> ConfigContext {
        self.create_view()
    }
}

/// Result of replaying log entries into a target
#[derive(Debug)]
pub struct ApplyReport {
    /// Generation the target is now up to date with
    pub generation: Generation,
    pub errors: ErrorList,
}

impl ApplyReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<()> {
        self.errors.into_result()
    }
}

impl View<ConfigCore> {
    pub(crate) fn create(
        shared: AttributesContext,
        types: Arc<ConfigTypeScheme>,
        delegates: Delegates,
    ) -> Self {
        let state = Arc::new_cyclic(|this: &Weak<ConfigState>| {
            let target = this.clone();
            let updater = Updater::with_source(this.clone(), move || {
                let state = target.upgrade()?;
                Some(Arc::new(ConfigContext::from_state(state)) as Arc<dyn ConfigTarget>)
            });
            let base = ContextBase::new(CONFIG_CONTEXT_TYPE, Some(shared.attributes()), delegates);
            ConfigState {
                base,
                shared,
                types,
                store: ConfigStore::new(),
                skip_unknown: AtomicBool::new(false),
                updater: Arc::new(updater),
            }
        });

        state.base.attributes().set_update_hook(state.updater.clone());
        let feeder = Updater::with_source(Arc::downgrade(&state), state.shared.weak_target());
        if !state.shared.assure_updater(Arc::new(feeder)) {
            tracing::debug!(
                shared = %state.shared.id(),
                "shared attributes are already fed by another config context"
            );
        }

        View::adopt(Arc::new(ConfigCore {
            state,
            description: None,
        }))
    }

    /// Transient view on existing state
    pub(crate) fn from_state(state: Arc<ConfigState>) -> Self {
        View::transient(Arc::new(ConfigCore {
            state,
            description: None,
        }))
    }

    pub(crate) fn state(&self) -> &Arc<ConfigState> {
        &self.core().state
    }

    pub fn config_types(&self) -> &Arc<ConfigTypeScheme> {
        &self.state().types
    }

    pub fn updater(&self) -> &Arc<Updater> {
        &self.state().updater
    }

    /// Set whether entries of unknown type are silently accepted; returns
    /// the previous setting
    pub fn skip_unknown_config(&self, skip: bool) -> bool {
        self.state().skip_unknown.swap(skip, Ordering::SeqCst)
    }

    pub fn is_skipping_unknown(&self) -> bool {
        self.state().skip_unknown.load(Ordering::SeqCst)
    }

    /// A transient view describing the entry being applied.
    ///
    /// Descriptions nest as `inner--outer`.
    pub fn with_info(&self, description: &str) -> ConfigContext {
        let description = match &self.core().description {
            Some(outer) => format!("{}--{}", description, outer),
            None => description.to_string(),
        };
        View::transient(Arc::new(ConfigCore {
            state: Arc::clone(self.state()),
            description: Some(description),
        }))
    }

    pub fn info(&self) -> Option<&str> {
        self.core().description.as_deref()
    }

    /// Decode a document with this context's type registry
    pub fn decode(&self, data: &[u8]) -> Result<ConfigObject> {
        self.config_types().decode(data)
    }

    /// Append a configuration to the log and bring this context up to date.
    ///
    /// A document whose type is still unknown is stored anyway; the call
    /// then fails with [`Error::UnknownConfigKind`] unless unknown types are
    /// skipped. Failures of the catch-up pass are returned as one list.
    pub fn apply_config(&self, config: impl Into<ConfigObject>, description: &str) -> Result<()> {
        let config = config.into();
        let mut unknown = None;
        let config = match config.evaluate(self.config_types()) {
            Ok(resolved) => resolved,
            Err(err) if err.is_unknown_config_kind() => {
                if !self.is_skipping_unknown() {
                    unknown = Some(err);
                }
                config
            }
            Err(err) => return Err(Error::apply(description, err)),
        };

        let generation = self.state().store.apply(config, description);
        tracing::debug!(generation, description, "applied config");

        let mut failure = None;
        loop {
            let (seen, in_progress) = self.updater().state();
            if in_progress || seen >= self.state().store.generation() {
                break;
            }
            match self.update() {
                Ok(UpdateStatus::Reentrant) | Ok(UpdateStatus::Detached) => break,
                Ok(_) => {}
                Err(err) if err.is_no_context() => {}
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        match failure.or(unknown) {
            Some(err) => Err(Error::apply(description, err)),
            None => Ok(()),
        }
    }

    /// Decode and apply a document, returning the decoded object
    pub fn apply_data(&self, data: &[u8], description: &str) -> Result<ConfigObject> {
        let config = self.decode(data)?;
        self.apply_config(config.clone(), description)?;
        Ok(config)
    }

    /// Replay the entries applied after `generation` into `target`.
    ///
    /// Entries are applied in log order. Entries not meant for the target
    /// are passed over silently; other failures are collected without
    /// stopping the replay.
    pub fn apply_to(&self, generation: Generation, target: &dyn ConfigTarget) -> ApplyReport {
        let mut errors = ErrorList::new("config apply errors");
        if self.state().store.generation() <= generation {
            return ApplyReport { generation, errors };
        }

        let (current, entries) = self.state().store.select(&SinceGeneration(generation));
        let skip_unknown = self.is_skipping_unknown();
        for entry in entries {
            let ctx = self.with_info(entry.description());
            tracing::debug!(
                generation = entry.generation(),
                config_type = entry.config().config_type(),
                description = entry.description(),
                "applying config entry"
            );
            match entry.config().apply_to(&ctx, target) {
                Ok(()) => {}
                Err(err) if err.is_no_context() => {}
                Err(err) if skip_unknown && err.is_unknown_config_kind() => {}
                Err(err) => errors.push(Error::apply(entry.description(), err)),
            }
        }
        ApplyReport {
            generation: current,
            errors,
        }
    }

    /// Re-evaluate every entry ever applied, including those hidden by a
    /// reset, against the current type registry
    pub fn validate(&self) -> Result<()> {
        let (_, entries) = self.state().store.select_all();
        let mut errors = ErrorList::new("config validation errors");
        for entry in entries {
            if let Err(err) = entry.config().evaluate(self.config_types()) {
                errors.push(Error::apply(entry.description(), err));
            }
        }
        errors.into_result()
    }

    pub fn generation(&self) -> Generation {
        self.state().store.generation()
    }

    /// Hide the current log from future replays
    pub fn reset(&self) -> Generation {
        self.state().store.reset()
    }

    /// Bring this context itself up to date
    pub fn update(&self) -> Result<UpdateStatus> {
        self.updater().update()
    }

    /// Visible entries with their descriptions and generations
    pub fn entries(&self) -> Vec<Arc<AppliedConfig>> {
        self.state().store.select(&SinceGeneration(0)).1
    }

    /// Configurations applied after `generation` matching `selector`, and
    /// the current generation.
    ///
    /// Preserved documents whose type got registered meanwhile come back
    /// decoded.
    pub fn get_config(
        &self,
        generation: Generation,
        selector: &dyn ConfigSelector,
    ) -> (Generation, Vec<ConfigObject>) {
        let since = SinceGeneration(generation);
        let (current, entries) = self
            .state()
            .store
            .select(&|entry: &AppliedConfig| since.select(entry) && selector.select(entry));
        let configs = entries
            .iter()
            .map(|entry| {
                entry
                    .config()
                    .evaluate(self.config_types())
                    .unwrap_or_else(|_| entry.config().clone())
            })
            .collect();
        (current, configs)
    }

    pub fn get_config_for_type(
        &self,
        generation: Generation,
        config_type: &str,
    ) -> (Generation, Vec<ConfigObject>) {
        self.get_config(generation, &ByType(config_type.to_string()))
    }

    pub fn get_config_for_name(
        &self,
        generation: Generation,
        name: &str,
    ) -> (Generation, Vec<ConfigObject>) {
        self.get_config(generation, &ByName(name.to_string()))
    }

    pub fn add_config_set(&self, name: &str, set: ConfigSet) {
        self.state().store.add_set(name, set);
    }

    pub fn config_set(&self, name: &str) -> Option<Arc<ConfigSet>> {
        self.state().store.get_set(name)
    }

    pub fn config_set_names(&self) -> Vec<String> {
        self.state().store.set_names()
    }

    /// Apply every configuration of a named set
    pub fn apply_config_set(&self, name: &str) -> Result<()> {
        let set = self
            .config_set(name)
            .ok_or_else(|| Error::unknown_config_set(name))?;
        let description = format!("config set {}", name);
        let mut errors = ErrorList::new(format!("applying {}", description));
        for config in &set.configurations {
            errors.add(self.apply_config(config.clone(), &description));
        }
        errors.into_result()
    }
}
