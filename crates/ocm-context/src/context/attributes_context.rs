//! The attributes context species

use super::{Context, ContextBase, Delegates, View};
use crate::attributes::UpdateHook;
use crate::config::ConfigTarget;
use std::sync::{Arc, LazyLock, Weak};

/// Species type of attributes contexts
pub const ATTRIBUTES_CONTEXT_TYPE: &str = "attributes.context.ocm.software";

struct AttributesState {
    base: ContextBase,
}

/// A context that only carries attributes.
///
/// Used as the shared parent of the contexts of one process or one
/// isolated setup.
pub struct AttributesCore {
    state: Arc<AttributesState>,
}

pub type AttributesContext = View<AttributesCore>;

impl Context for AttributesCore {
    fn base(&self) -> &ContextBase {
        &self.state.base
    }

    fn attributes_context(&self) -> AttributesContext {
        View::transient(Arc::new(AttributesCore {
            state: Arc::clone(&self.state),
        }))
    }
}

impl View<AttributesCore> {
    /// Create an attributes context, optionally reading through to `parent`
    pub fn new(parent: Option<&AttributesContext>) -> Self {
        let delegates = match parent {
            Some(parent) => Delegates::derive(parent.base().delegates()),
            None => Delegates::root(),
        };
        Self::with_delegates(parent, delegates)
    }

    pub fn with_delegates(parent: Option<&AttributesContext>, delegates: Delegates) -> Self {
        let base = ContextBase::new(
            ATTRIBUTES_CONTEXT_TYPE,
            parent.map(|p| p.attributes()),
            delegates,
        );
        View::adopt(Arc::new(AttributesCore {
            state: Arc::new(AttributesState { base }),
        }))
    }

    /// Install `hook` as the update hook unless a live one is present.
    ///
    /// Only the first configuration context bound to a shared attributes
    /// context feeds it; a hook whose configuration context is gone is
    /// replaced.
    pub fn assure_updater(&self, hook: Arc<dyn UpdateHook>) -> bool {
        self.attributes().assure_update_hook(hook)
    }

    /// Factory for transient views of this context that does not keep the
    /// context alive
    pub(crate) fn weak_target(
        &self,
    ) -> impl Fn() -> Option<Arc<dyn ConfigTarget>> + Send + Sync + 'static {
        let state: Weak<AttributesState> = Arc::downgrade(&self.core().state);
        move || {
            let state = state.upgrade()?;
            let view: AttributesContext = View::transient(Arc::new(AttributesCore { state }));
            Some(Arc::new(view) as Arc<dyn ConfigTarget>)
        }
    }
}

static DEFAULT_CONTEXT: LazyLock<AttributesContext> =
    LazyLock::new(|| AttributesContext::new(None));

/// The process-wide attributes context
pub fn default_context() -> AttributesContext {
    DEFAULT_CONTEXT.clone()
}
