//! Common test utilities for ocm-context
//!
//! - `DemoConfig`: a configuration type carrying a single string value
//! - `DemoTarget`: a consumer fed from a configuration context

#![allow(dead_code)]

use ocm_context::config::{
    BuilderMode, Config, ConfigBuilder, ConfigContext, ConfigTarget, TypedConfigType,
    UpdateStatus, Updater,
};
use ocm_context::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

pub const DEMO_CONFIG_TYPE: &str = "demo.config/v1";

/// Value that makes `DemoConfig` fail on every target
pub const FAILING_VALUE: &str = "fail";

/// Value that makes `DemoConfig` call back into the target's updater
pub const REENTER_VALUE: &str = "reenter";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(rename = "type")]
    config_type: String,
    pub value: String,
}

impl DemoConfig {
    pub fn new(value: &str) -> Self {
        Self {
            config_type: DEMO_CONFIG_TYPE.to_string(),
            value: value.to_string(),
        }
    }
}

impl Config for DemoConfig {
    fn config_type(&self) -> &str {
        &self.config_type
    }

    fn apply_to(&self, _ctx: &ConfigContext, target: &dyn ConfigTarget) -> Result<()> {
        let Some(target) = target.as_any().downcast_ref::<DemoTarget>() else {
            return Err(Error::no_context(&self.config_type));
        };
        match self.value.as_str() {
            FAILING_VALUE => Err(Error::other("demo target refused value")),
            REENTER_VALUE => {
                let status = target.updater.update()?;
                target.nested.lock().push(status);
                Ok(())
            }
            value => {
                *target.value.lock() = value.to_string();
                target.applied.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A consumer bound to a configuration context
pub struct DemoTarget {
    value: Mutex<String>,
    applied: AtomicUsize,
    nested: Mutex<Vec<UpdateStatus>>,
    updater: Updater,
}

impl DemoTarget {
    pub fn new(ctx: &ConfigContext) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<DemoTarget>| {
            let this = this.clone();
            DemoTarget {
                value: Mutex::new(String::new()),
                applied: AtomicUsize::new(0),
                nested: Mutex::new(Vec::new()),
                updater: Updater::new(ctx, move || {
                    this.upgrade().map(|target| target as Arc<dyn ConfigTarget>)
                }),
            }
        })
    }

    /// Current value, after catching up with the configuration log
    pub fn value(&self) -> String {
        let _ = self.updater.update();
        self.value.lock().clone()
    }

    /// Current value without catching up
    pub fn peek(&self) -> String {
        self.value.lock().clone()
    }

    pub fn update(&self) -> Result<UpdateStatus> {
        self.updater.update()
    }

    pub fn updater(&self) -> &Updater {
        &self.updater
    }

    /// Number of values applied so far
    pub fn applied(&self) -> usize {
        self.applied.load(Ordering::SeqCst)
    }

    /// Results of updates requested while an update was running
    pub fn nested_updates(&self) -> Vec<UpdateStatus> {
        self.nested.lock().clone()
    }
}

impl ConfigTarget for DemoTarget {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An isolated context that knows the demo configuration type
pub fn demo_context() -> ConfigContext {
    let ctx = ConfigBuilder::new().build(BuilderMode::Extended);
    ctx.config_types()
        .register(TypedConfigType::<DemoConfig>::new(DEMO_CONFIG_TYPE));
    ctx
}

pub fn demo_document(value: &str) -> String {
    format!("type: {}\nvalue: {}\n", DEMO_CONFIG_TYPE, value)
}
