//! Replay of the configuration log into one consumer
//!
//! An [`Updater`] remembers the last generation its target has seen and,
//! on every [`update`](Updater::update), applies the entries appended since
//! then. Neither the configuration context nor the target is kept alive by
//! the updater.

use super::context::{ConfigContext, ConfigState};
use super::object::ConfigTarget;
use super::store::Generation;
use crate::attributes::UpdateHook;
use crate::error::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

type TargetFactory = Box<dyn Fn() -> Option<Arc<dyn ConfigTarget>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    InProgress,
}

#[derive(Debug)]
struct UpdaterState {
    last_generation: Generation,
    phase: Phase,
}

/// Outcome of [`Updater::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// New entries were applied
    Updated,
    /// Nothing to do
    UpToDate,
    /// Another pass is already running for this target
    Reentrant,
    /// The configuration context or the target is gone
    Detached,
}

/// Per-consumer replay engine
pub struct Updater {
    state: Mutex<UpdaterState>,
    source: Weak<ConfigState>,
    target: TargetFactory,
}

/// Returns the phase to idle when the pass ends, also on unwind
struct PassGuard<'a> {
    state: &'a Mutex<UpdaterState>,
    reached: Option<Generation>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if let Some(generation) = self.reached {
            state.last_generation = state.last_generation.max(generation);
        }
        state.phase = Phase::Idle;
    }
}

impl Updater {
    pub(crate) fn with_source(
        source: Weak<ConfigState>,
        target: impl Fn() -> Option<Arc<dyn ConfigTarget>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Mutex::new(UpdaterState {
                last_generation: 0,
                phase: Phase::Idle,
            }),
            source,
            target: Box::new(target),
        }
    }

    /// Bind a target produced on demand by `target`
    pub fn new(
        source: &ConfigContext,
        target: impl Fn() -> Option<Arc<dyn ConfigTarget>> + Send + Sync + 'static,
    ) -> Self {
        Self::with_source(Arc::downgrade(source.state()), target)
    }

    /// Bind a shared target object
    pub fn for_target<T: ConfigTarget + 'static>(source: &ConfigContext, target: &Arc<T>) -> Self {
        let target: Weak<T> = Arc::downgrade(target);
        Self::new(source, move || {
            target
                .upgrade()
                .map(|target| target as Arc<dyn ConfigTarget>)
        })
    }

    /// Last generation applied and whether a pass is running
    pub fn state(&self) -> (Generation, bool) {
        let state = self.state.lock();
        (state.last_generation, state.phase == Phase::InProgress)
    }

    /// Apply all entries the target has not seen yet.
    ///
    /// A call made while a pass is running returns
    /// [`UpdateStatus::Reentrant`] at once; the running pass is expected to
    /// pick up entries appended meanwhile on its next round. Failing entries
    /// are reported together, but the watermark moves past them.
    pub fn update(&self) -> Result<UpdateStatus> {
        let Some(source) = self.source.upgrade() else {
            return Ok(UpdateStatus::Detached);
        };

        let watermark = {
            let mut state = self.state.lock();
            if state.phase == Phase::InProgress {
                tracing::trace!("update already in progress");
                return Ok(UpdateStatus::Reentrant);
            }
            if state.last_generation >= source.store().generation() {
                return Ok(UpdateStatus::UpToDate);
            }
            state.phase = Phase::InProgress;
            state.last_generation
        };
        let mut guard = PassGuard {
            state: &self.state,
            reached: None,
        };

        let Some(target) = (self.target)() else {
            return Ok(UpdateStatus::Detached);
        };
        let ctx = ConfigContext::from_state(source);
        let report = ctx.apply_to(watermark, target.as_ref());
        tracing::trace!(
            from = watermark,
            to = report.generation,
            errors = report.errors.len(),
            "updated config target"
        );
        guard.reached = Some(report.generation);
        drop(guard);

        report.into_result().map(|()| UpdateStatus::Updated)
    }
}

impl UpdateHook for Updater {
    fn run(&self) {
        if let Err(err) = self.update() {
            tracing::debug!(error = %err, "config update on attribute access failed");
        }
    }

    fn is_detached(&self) -> bool {
        self.source.strong_count() == 0 || (self.target)().is_none()
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (generation, in_progress) = self.state();
        f.debug_struct("Updater")
            .field("last_generation", &generation)
            .field("in_progress", &in_progress)
            .finish()
    }
}
