//! Context kernel
//!
//! Every context species embeds a [`ContextBase`]: identity, an attribute
//! store reading through to the shared attributes, a finalizer list, the
//! delegate facilities, and the reference-counted handle whose cleanup tears
//! all of that down. Callers hold species as [`View`]s.

mod attributes_context;
mod delegates;
mod recorder;
mod view;

pub use attributes_context::{
    default_context, AttributesContext, AttributesCore, ATTRIBUTES_CONTEXT_TYPE,
};
pub use delegates::{
    ActionHandler, ActionHandlers, Delegates, LogLevel, LoggingContext, DEFAULT_REALM,
};
pub use recorder::{FinalizationRecorder, FINALIZATION_RECORDER_ATTR};
pub use view::{persistent_context_ref, InnerContextProvider, View};

use crate::attributes::Attributes;
use crate::config::ConfigContext;
use crate::error::{ErrorList, Result};
use crate::finalizer::Finalizer;
use crate::identity::ContextIdentity;
use crate::refmgmt::Allocatable;
use std::fmt;
use std::sync::Arc;

/// Capabilities shared by every context species
pub trait Context: Send + Sync + 'static {
    /// The embedded kernel
    fn base(&self) -> &ContextBase;

    /// The shared attributes context this context reads through to
    fn attributes_context(&self) -> AttributesContext;

    fn id(&self) -> &ContextIdentity {
        self.base().id()
    }

    fn context_type(&self) -> &str {
        self.base().context_type()
    }

    fn attributes(&self) -> &Attributes {
        self.base().attributes()
    }

    /// Logging delegate; brings the context up to date first
    fn logging(&self) -> &LoggingContext {
        self.base().attributes().update();
        self.base().delegates().logging()
    }

    fn actions(&self) -> &ActionHandlers {
        self.base().delegates().actions()
    }

    fn finalizer(&self) -> &Finalizer {
        self.base().finalizer()
    }

    fn is_identical_to(&self, other: &dyn Context) -> bool {
        self.id() == other.id()
    }
}

/// Species that know the configuration context they are fed from
pub trait ConfigProvider {
    fn config_context(&self) -> ConfigContext;
}

struct BaseState {
    id: ContextIdentity,
    attributes: Attributes,
    finalizer: Finalizer,
    delegates: Delegates,
}

/// Kernel state embedded by every context species
pub struct ContextBase {
    state: Arc<BaseState>,
    allocatable: Arc<Allocatable>,
}

impl ContextBase {
    /// Create the kernel of a new context.
    ///
    /// The handle starts with one reference; the first view of the new
    /// context takes it over with [`View::adopt`].
    pub fn new(context_type: &str, parent: Option<&Attributes>, delegates: Delegates) -> Self {
        let id = ContextIdentity::next(context_type);
        let state = Arc::new(BaseState {
            id: id.clone(),
            attributes: Attributes::new(parent),
            finalizer: Finalizer::new(),
            delegates,
        });
        let cleanup_state = Arc::clone(&state);
        let allocatable = Allocatable::new(id.as_str(), move || cleanup(&cleanup_state), true);

        tracing::debug!(id = %id, "created context");
        Self { state, allocatable }
    }

    pub fn id(&self) -> &ContextIdentity {
        &self.state.id
    }

    pub fn context_type(&self) -> &str {
        self.state.id.context_type()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.state.attributes
    }

    pub fn finalizer(&self) -> &Finalizer {
        &self.state.finalizer
    }

    pub fn delegates(&self) -> &Delegates {
        &self.state.delegates
    }

    pub fn allocatable(&self) -> &Arc<Allocatable> {
        &self.allocatable
    }
}

impl fmt::Debug for ContextBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBase")
            .field("id", &self.state.id)
            .field("refs", &self.allocatable.ref_count())
            .finish()
    }
}

fn cleanup(state: &BaseState) -> Result<()> {
    if let Some(recorder) = FinalizationRecorder::find(&state.attributes) {
        recorder.record(state.id.clone());
    }
    tracing::debug!(id = %state.id, "cleaning up context");

    let mut errors = ErrorList::new(format!("cleanup of {}", state.id));
    errors.add(state.finalizer.finalize());
    state.attributes.clear();
    errors.into_cleanup_result()
}
