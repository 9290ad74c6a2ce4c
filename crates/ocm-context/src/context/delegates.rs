//! Cross-cutting facilities shared along a context hierarchy
//!
//! Every context carries a [`Delegates`] bundle: a logging context and an
//! action handler registry. Child contexts get their own instances layered
//! over the parent's, so settings made on a child never leak upwards.

use crate::error::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default logging realm of the kernel
pub const DEFAULT_REALM: &str = "ocm";

/// Log level threshold of a logging context
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

struct LoggingInner {
    realm: String,
    level: RwLock<Option<LogLevel>>,
    parent: Option<LoggingContext>,
}

/// Logging delegate of a context.
///
/// Messages are emitted through `tracing`, tagged with the realm, and
/// filtered by the effective level: the context's own level if set,
/// otherwise the nearest ancestor's, otherwise `info`.
#[derive(Clone)]
pub struct LoggingContext {
    inner: Arc<LoggingInner>,
}

impl LoggingContext {
    /// Create a root logging context
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LoggingInner {
                realm: realm.into(),
                level: RwLock::new(None),
                parent: None,
            }),
        }
    }

    /// Create a child inheriting the realm and level of `parent`
    pub fn with_base(parent: &LoggingContext) -> Self {
        Self {
            inner: Arc::new(LoggingInner {
                realm: parent.realm().to_string(),
                level: RwLock::new(None),
                parent: Some(parent.clone()),
            }),
        }
    }

    pub fn realm(&self) -> &str {
        &self.inner.realm
    }

    /// Set or unset the local level
    pub fn set_level(&self, level: Option<LogLevel>) {
        *self.inner.level.write() = level;
    }

    /// The effective level
    pub fn level(&self) -> LogLevel {
        if let Some(level) = *self.inner.level.read() {
            return level;
        }
        self.inner
            .parent
            .as_ref()
            .map_or(LogLevel::Info, LoggingContext::level)
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level()
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let realm = self.realm();
        match level {
            LogLevel::Error => tracing::error!(realm, "{}", message),
            LogLevel::Warn => tracing::warn!(realm, "{}", message),
            LogLevel::Info => tracing::info!(realm, "{}", message),
            LogLevel::Debug => tracing::debug!(realm, "{}", message),
            LogLevel::Trace => tracing::trace!(realm, "{}", message),
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn ptr_eq(&self, other: &LoggingContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LoggingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingContext")
            .field("realm", &self.inner.realm)
            .field("level", &self.level())
            .finish()
    }
}

/// Handler for named actions dispatched through a context
pub trait ActionHandler: Send + Sync {
    /// Handle an action.
    ///
    /// Returns `Ok(None)` if the handler does not feel responsible for the
    /// given specification.
    fn handle(&self, action: &str, spec: &serde_json::Value) -> Result<Option<serde_json::Value>>;
}

impl<F> ActionHandler for F
where
    F: Fn(&str, &serde_json::Value) -> Result<Option<serde_json::Value>> + Send + Sync,
{
    fn handle(&self, action: &str, spec: &serde_json::Value) -> Result<Option<serde_json::Value>> {
        self(action, spec)
    }
}

#[derive(Default)]
struct ActionsInner {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn ActionHandler>>>>,
    parent: Option<ActionHandlers>,
}

/// Registry of action handlers with fallback to a parent registry
#[derive(Clone, Default)]
pub struct ActionHandlers {
    inner: Arc<ActionsInner>,
}

impl ActionHandlers {
    pub fn new(parent: Option<&ActionHandlers>) -> Self {
        Self {
            inner: Arc::new(ActionsInner {
                handlers: RwLock::new(HashMap::new()),
                parent: parent.cloned(),
            }),
        }
    }

    pub fn register(&self, action: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.inner
            .handlers
            .write()
            .entry(action.into())
            .or_default()
            .push(handler);
    }

    /// Dispatch an action.
    ///
    /// Local handlers are asked in registration order; the first one
    /// returning a result wins. Without a local result the parent registry
    /// is asked.
    pub fn execute(&self, action: &str, spec: &serde_json::Value) -> Result<Option<serde_json::Value>> {
        let handlers = self
            .inner
            .handlers
            .read()
            .get(action)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            if let Some(result) = handler.handle(action, spec)? {
                return Ok(Some(result));
            }
        }
        match &self.inner.parent {
            Some(parent) => parent.execute(action, spec),
            None => Ok(None),
        }
    }

    /// Names of actions with at least one handler, including inherited ones
    pub fn supported_actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = self.inner.handlers.read().keys().cloned().collect();
        if let Some(parent) = &self.inner.parent {
            actions.extend(parent.supported_actions());
        }
        actions.sort();
        actions.dedup();
        actions
    }
}

impl fmt::Debug for ActionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandlers")
            .field("actions", &self.supported_actions())
            .finish()
    }
}

/// Bundle of delegate facilities of a context
#[derive(Debug, Clone)]
pub struct Delegates {
    logging: LoggingContext,
    actions: ActionHandlers,
}

impl Delegates {
    pub fn new(logging: LoggingContext, actions: ActionHandlers) -> Self {
        Self { logging, actions }
    }

    /// Fresh delegates for a root context
    pub fn root() -> Self {
        Self::new(LoggingContext::new(DEFAULT_REALM), ActionHandlers::new(None))
    }

    /// Compose delegates field by field: the child-supplied facility wins,
    /// a missing one is taken from `parent`
    pub fn compose(
        logging: Option<LoggingContext>,
        actions: Option<ActionHandlers>,
        parent: &Delegates,
    ) -> Self {
        Self {
            logging: logging.unwrap_or_else(|| parent.logging.clone()),
            actions: actions.unwrap_or_else(|| parent.actions.clone()),
        }
    }

    /// Private delegates of a new context, layered over `parent`
    pub fn derive(parent: &Delegates) -> Self {
        Self {
            logging: LoggingContext::with_base(&parent.logging),
            actions: ActionHandlers::new(Some(&parent.actions)),
        }
    }

    pub fn logging(&self) -> &LoggingContext {
        &self.logging
    }

    pub fn actions(&self) -> &ActionHandlers {
        &self.actions
    }
}

impl Default for Delegates {
    fn default() -> Self {
        Self::root()
    }
}
