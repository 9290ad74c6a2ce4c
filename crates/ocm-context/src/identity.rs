//! Context identities

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a context instance: `<context-type>/<n>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextIdentity(String);

impl ContextIdentity {
    /// Allocate the next identity for the given context type
    pub fn next(context_type: &str) -> Self {
        let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}/{}", context_type, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The context type part of the identity
    pub fn context_type(&self) -> &str {
        self.0.rsplit_once('/').map_or(&self.0, |(typ, _)| typ)
    }
}

impl fmt::Display for ContextIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
