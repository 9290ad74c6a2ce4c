//! Generation-numbered configuration log

use super::object::ConfigObject;
use super::scheme::split_type;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Position in a configuration log; 0 is "before the first entry"
pub type Generation = u64;

/// One entry of the configuration log
#[derive(Debug, Clone)]
pub struct AppliedConfig {
    config: ConfigObject,
    description: String,
    generation: Generation,
}

impl AppliedConfig {
    pub fn config(&self) -> &ConfigObject {
        &self.config
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Filter over log entries
pub trait ConfigSelector: Send + Sync {
    fn select(&self, entry: &AppliedConfig) -> bool;
}

impl<F> ConfigSelector for F
where
    F: Fn(&AppliedConfig) -> bool + Send + Sync,
{
    fn select(&self, entry: &AppliedConfig) -> bool {
        self(entry)
    }
}

/// Every entry
pub struct AllConfigs;

impl ConfigSelector for AllConfigs {
    fn select(&self, _entry: &AppliedConfig) -> bool {
        true
    }
}

/// Entries applied after the given generation
pub struct SinceGeneration(pub Generation);

impl ConfigSelector for SinceGeneration {
    fn select(&self, entry: &AppliedConfig) -> bool {
        entry.generation > self.0
    }
}

/// Entries of a type; a versionless type matches every version of its kind
pub struct ByType(pub String);

impl ConfigSelector for ByType {
    fn select(&self, entry: &AppliedConfig) -> bool {
        let actual = entry.config.config_type();
        if actual == self.0 {
            return true;
        }
        match split_type(&self.0) {
            (kind, None) => split_type(actual).0 == kind,
            (_, Some(_)) => false,
        }
    }
}

/// Entries carrying the given name
pub struct ByName(pub String);

impl ConfigSelector for ByName {
    fn select(&self, entry: &AppliedConfig) -> bool {
        entry.config.name() == Some(self.0.as_str())
    }
}

/// Entries matched by every inner selector
pub struct And(pub Vec<Box<dyn ConfigSelector>>);

impl ConfigSelector for And {
    fn select(&self, entry: &AppliedConfig) -> bool {
        self.0.iter().all(|selector| selector.select(entry))
    }
}

/// A named, reusable list of configurations
#[derive(Debug, Clone, Default)]
pub struct ConfigSet {
    pub description: String,
    pub configurations: Vec<ConfigObject>,
}

impl ConfigSet {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            configurations: Vec::new(),
        }
    }

    pub fn add(&mut self, config: ConfigObject) {
        self.configurations.push(config);
    }
}

#[derive(Default)]
struct StoreState {
    generation: Generation,
    baseline: Generation,
    entries: Vec<Arc<AppliedConfig>>,
    sets: HashMap<String, Arc<ConfigSet>>,
}

/// Append-only configuration log.
///
/// Entries are never removed; [`reset`](ConfigStore::reset) only hides the
/// history from selections.
#[derive(Default)]
pub struct ConfigStore {
    state: Mutex<StoreState>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning its generation
    pub fn apply(&self, config: ConfigObject, description: impl Into<String>) -> Generation {
        let mut state = self.state.lock();
        state.generation += 1;
        let generation = state.generation;
        state.entries.push(Arc::new(AppliedConfig {
            config,
            description: description.into(),
            generation,
        }));
        generation
    }

    pub fn generation(&self) -> Generation {
        self.state.lock().generation
    }

    /// Hide all current entries from selections, returning the generation
    pub fn reset(&self) -> Generation {
        let mut state = self.state.lock();
        state.baseline = state.generation;
        state.generation
    }

    /// Visible entries matching `selector`, and the current generation.
    ///
    /// The generation is that of the whole log, not of the last match.
    pub fn select(&self, selector: &dyn ConfigSelector) -> (Generation, Vec<Arc<AppliedConfig>>) {
        let (generation, baseline, entries) = {
            let state = self.state.lock();
            (state.generation, state.baseline, state.entries.clone())
        };
        let selected = entries
            .into_iter()
            .filter(|entry| entry.generation > baseline && selector.select(entry))
            .collect();
        (generation, selected)
    }

    /// Every entry ever applied, ignoring resets
    pub fn select_all(&self) -> (Generation, Vec<Arc<AppliedConfig>>) {
        let state = self.state.lock();
        (state.generation, state.entries.clone())
    }

    pub fn add_set(&self, name: impl Into<String>, set: ConfigSet) {
        self.state.lock().sets.insert(name.into(), Arc::new(set));
    }

    pub fn get_set(&self, name: &str) -> Option<Arc<ConfigSet>> {
        self.state.lock().sets.get(name).cloned()
    }

    pub fn set_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().sets.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenericConfig;

    fn generic(config_type: &str, name: Option<&str>) -> ConfigObject {
        let doc = match name {
            Some(name) => format!("type: {}\nname: {}\n", config_type, name),
            None => format!("type: {}\n", config_type),
        };
        ConfigObject::from(GenericConfig::from_bytes(doc.as_bytes()).unwrap())
    }

    #[test]
    fn test_generations_are_contiguous() {
        let store = ConfigStore::new();
        assert_eq!(store.generation(), 0);
        assert_eq!(store.apply(generic("a.config/v1", None), "first"), 1);
        assert_eq!(store.apply(generic("a.config/v1", None), "second"), 2);
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_since_returns_current_generation_without_matches() {
        let store = ConfigStore::new();
        store.apply(generic("a.config/v1", None), "a");
        store.apply(generic("b.config/v1", None), "b");

        let selector = And(vec![
            Box::new(SinceGeneration(1)),
            Box::new(ByType("a.config/v1".into())),
        ]);
        let (generation, entries) = store.select(&selector);
        assert_eq!(generation, 2);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_type_and_name_selection() {
        let store = ConfigStore::new();
        store.apply(generic("a.config/v1", Some("one")), "1");
        store.apply(generic("a.config/v2", None), "2");
        store.apply(generic("b.config/v1", Some("one")), "3");

        let (_, versioned) = store.select(&ByType("a.config/v1".into()));
        assert_eq!(versioned.len(), 1);

        let (_, kind) = store.select(&ByType("a.config".into()));
        let generations: Vec<_> = kind.iter().map(|e| e.generation()).collect();
        assert_eq!(generations, vec![1, 2]);

        let (_, named) = store.select(&ByName("one".into()));
        let descriptions: Vec<_> = named.iter().map(|e| e.description()).collect();
        assert_eq!(descriptions, vec!["1", "3"]);

        let (_, closure) = store.select(&|e: &AppliedConfig| e.generation() == 3);
        assert_eq!(closure.len(), 1);
    }

    #[test]
    fn test_reset_hides_but_keeps_history() {
        let store = ConfigStore::new();
        store.apply(generic("a.config/v1", None), "before");
        assert_eq!(store.reset(), 1);

        let (generation, visible) = store.select(&AllConfigs);
        assert_eq!(generation, 1);
        assert!(visible.is_empty());

        store.apply(generic("a.config/v1", None), "after");
        let (_, visible) = store.select(&AllConfigs);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].description(), "after");

        let (_, all) = store.select_all();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_sets() {
        let store = ConfigStore::new();
        let mut set = ConfigSet::new("development settings");
        set.add(generic("a.config/v1", None));
        store.add_set("dev", set);

        assert_eq!(store.get_set("dev").map(|s| s.configurations.len()), Some(1));
        assert!(store.get_set("prod").is_none());
        assert_eq!(store.set_names(), vec!["dev"]);
    }
}
