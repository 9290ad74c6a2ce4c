//! Reference-counted resource handles
//!
//! An [`Allocatable`] owns a cleanup callback that runs exactly once, when
//! the reference count drops to zero. A [`Pin`] is one owned reference; it
//! releases itself on drop unless it was released explicitly first.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

type Cleanup = Box<dyn FnOnce() -> Result<()> + Send>;

#[derive(Debug, Clone, Copy)]
struct Counter {
    refs: usize,
    closed: bool,
}

/// A resource with an explicit acquire/release protocol
pub struct Allocatable {
    name: String,
    counter: Mutex<Counter>,
    cleanup: Mutex<Option<Cleanup>>,
}

impl Allocatable {
    /// Create a new handle.
    ///
    /// With `referenced` set the handle starts with one reference owned by
    /// the caller, which must eventually be released.
    pub fn new(
        name: impl Into<String>,
        cleanup: impl FnOnce() -> Result<()> + Send + 'static,
        referenced: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            counter: Mutex::new(Counter {
                refs: usize::from(referenced),
                closed: false,
            }),
            cleanup: Mutex::new(Some(Box::new(cleanup))),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a reference
    pub fn acquire(&self) -> Result<()> {
        let mut counter = self.counter.lock();
        if counter.closed {
            return Err(Error::closed(&self.name));
        }
        counter.refs += 1;
        Ok(())
    }

    /// Drop a reference, running the cleanup if it was the last one
    pub fn release(&self) -> Result<()> {
        {
            let mut counter = self.counter.lock();
            if counter.refs == 0 {
                return Err(Error::ReleaseUnderflow {
                    what: self.name.clone(),
                });
            }
            counter.refs -= 1;
            if counter.refs > 0 {
                return Ok(());
            }
            counter.closed = true;
        }
        // the callback may touch other handles, so it runs unlocked
        let cleanup = self.cleanup.lock().take();
        match cleanup {
            Some(cleanup) => cleanup(),
            None => Ok(()),
        }
    }

    pub fn ref_count(&self) -> usize {
        self.counter.lock().refs
    }

    pub fn is_closed(&self) -> bool {
        self.counter.lock().closed
    }
}

impl fmt::Debug for Allocatable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counter = *self.counter.lock();
        f.debug_struct("Allocatable")
            .field("name", &self.name)
            .field("refs", &counter.refs)
            .field("closed", &counter.closed)
            .finish()
    }
}

/// One owned reference to an [`Allocatable`]
#[derive(Debug)]
pub struct Pin {
    allocatable: Arc<Allocatable>,
    released: bool,
}

impl Pin {
    /// Acquire a new reference
    pub fn acquire(allocatable: &Arc<Allocatable>) -> Result<Self> {
        allocatable.acquire()?;
        Ok(Self {
            allocatable: Arc::clone(allocatable),
            released: false,
        })
    }

    /// Take ownership of the initial reference of a freshly created handle
    pub fn adopt(allocatable: Arc<Allocatable>) -> Self {
        Self {
            allocatable,
            released: false,
        }
    }

    pub fn allocatable(&self) -> &Arc<Allocatable> {
        &self.allocatable
    }

    /// Release the reference and report cleanup failures
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.allocatable.release()
    }
}

impl Drop for Pin {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.allocatable.release() {
            tracing::warn!(
                handle = %self.allocatable.name(),
                error = %err,
                "release on drop failed"
            );
        }
    }
}
