//! Leak-detection support for tests

use crate::attributes::{
    AttributeType, AttributeTypeRegistration, Attributes, OpaqueAttribute,
};
use crate::error::Result;
use crate::identity::ContextIdentity;
use parking_lot::Mutex;
use std::sync::Arc;

/// Attribute holding a [`FinalizationRecorder`]
pub const FINALIZATION_RECORDER_ATTR: &str = "ocm.software/finalization-recorder";

/// Collects the identities of cleaned-up contexts.
///
/// Contexts look the recorder up through their attributes (including the
/// shared parent chain) when they are cleaned up. Nothing in the kernel
/// depends on it being present.
#[derive(Debug, Default)]
pub struct FinalizationRecorder {
    ids: Mutex<Vec<ContextIdentity>>,
}

impl FinalizationRecorder {
    /// Get the recorder of an attribute store, creating it if needed
    pub fn attach(attributes: &Attributes) -> Result<Arc<Self>> {
        attributes.get_or_create(FINALIZATION_RECORDER_ATTR, FinalizationRecorder::default)
    }

    /// Find a reachable recorder without triggering updates
    pub fn find(attributes: &Attributes) -> Option<Arc<Self>> {
        attributes
            .lookup(FINALIZATION_RECORDER_ATTR)
            .and_then(|value| value.downcast::<Self>().ok())
    }

    pub fn record(&self, id: ContextIdentity) {
        self.ids.lock().push(id);
    }

    pub fn contains(&self, id: &ContextIdentity) -> bool {
        self.ids.lock().contains(id)
    }

    pub fn identities(&self) -> Vec<ContextIdentity> {
        self.ids.lock().clone()
    }

    pub fn clear(&self) {
        self.ids.lock().clear();
    }
}

fn recorder_type() -> Arc<dyn AttributeType> {
    Arc::new(OpaqueAttribute::<FinalizationRecorder>::new(
        FINALIZATION_RECORDER_ATTR,
        "records identities of cleaned-up contexts",
    ))
}

inventory::submit! { AttributeTypeRegistration(recorder_type) }
