//! # ocm-context
//!
//! Context kernel of the OCM library providing:
//! - Typed, hierarchical attribute storage with a global type registry
//! - Reference-counted context lifetimes with scoped finalization
//! - Context composition over shared attributes and delegate facilities
//! - A generation-numbered configuration log, replayed lazily and in order
//!   into every context fed from it
//!
//! ```no_run
//! use ocm_context::config::{self, ConfigObject, LoggingConfig};
//! use ocm_context::context::LogLevel;
//!
//! let ctx = config::default_context();
//! ctx.apply_config(ConfigObject::new(LoggingConfig::new(LogLevel::Debug)), "example")?;
//! # Ok::<(), ocm_context::Error>(())
//! ```

pub mod attributes;
pub mod config;
pub mod context;
pub mod error;
pub mod finalizer;
pub mod identity;
pub mod refmgmt;

pub use attributes::{AttributeType, Attributes};
pub use config::{ConfigContext, ConfigObject, Generation};
pub use context::{AttributesContext, Context, View};
pub use error::{Error, ErrorList, Result};
pub use identity::ContextIdentity;
