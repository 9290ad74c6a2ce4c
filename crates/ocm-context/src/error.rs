//! Error types for ocm-context

use std::fmt;
use thiserror::Error;

/// Result type alias using ocm-context's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Kernel error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed configuration or attribute payload
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Structurally valid configuration document of an unregistered type
    #[error("unknown config type: {config_type}")]
    UnknownConfigKind { config_type: String },

    /// A configuration object does not apply to the given target
    #[error("config type {config_type} is not applicable to this target")]
    NoContext { config_type: String },

    /// Applying a configuration entry failed
    #[error("{description}: {source}")]
    Apply {
        description: String,
        #[source]
        source: Box<Error>,
    },

    /// Named configuration set not found
    #[error("unknown config set: {name}")]
    UnknownConfigSet { name: String },

    /// Attribute key without a registered type
    #[error("unknown attribute type: {name}")]
    UnknownAttributeType { name: String },

    /// Attribute value rejected by its registered type
    #[error("invalid value for attribute {name}: {message}")]
    InvalidAttribute { name: String, message: String },

    /// A handle was used after its cleanup ran
    #[error("{what} is already closed")]
    Closed { what: String },

    /// A handle was released more often than it was acquired
    #[error("release of {what} without matching acquire")]
    ReleaseUnderflow { what: String },

    /// Teardown failure
    #[error("cleanup failed: {0}")]
    Cleanup(ErrorList),

    /// Several independent failures
    #[error("{0}")]
    List(ErrorList),

    /// Failure reported by an action handler or a configuration object
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

impl From<serde_yaml_ng::Error> for Error {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Self::decode(err.to_string())
    }
}

impl Error {
    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an unknown config kind error
    pub fn unknown_config_kind(config_type: impl Into<String>) -> Self {
        Self::UnknownConfigKind {
            config_type: config_type.into(),
        }
    }

    /// Create a no context error, returned by configuration objects for
    /// targets they do not handle
    pub fn no_context(config_type: impl Into<String>) -> Self {
        Self::NoContext {
            config_type: config_type.into(),
        }
    }

    /// Wrap an error with the description of the entry it originates from
    pub fn apply(description: impl Into<String>, source: Error) -> Self {
        Self::Apply {
            description: description.into(),
            source: Box::new(source),
        }
    }

    /// Create an unknown config set error
    pub fn unknown_config_set(name: impl Into<String>) -> Self {
        Self::UnknownConfigSet { name: name.into() }
    }

    /// Create an unknown attribute type error
    pub fn unknown_attribute_type(name: impl Into<String>) -> Self {
        Self::UnknownAttributeType { name: name.into() }
    }

    /// Create an invalid attribute error
    pub fn invalid_attribute(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a closed error
    pub fn closed(what: impl Into<String>) -> Self {
        Self::Closed { what: what.into() }
    }

    /// Create a generic error from a message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether this error only says that a config does not apply to a target.
    ///
    /// Looks through description wrappers. A list counts as "no context" only
    /// if every cause does.
    pub fn is_no_context(&self) -> bool {
        match self {
            Self::NoContext { .. } => true,
            Self::Apply { source, .. } => source.is_no_context(),
            Self::List(list) => !list.is_empty() && list.iter().all(Error::is_no_context),
            _ => false,
        }
    }

    /// Whether this error is, or contains, an unknown config kind failure
    pub fn is_unknown_config_kind(&self) -> bool {
        match self {
            Self::UnknownConfigKind { .. } => true,
            Self::Apply { source, .. } => source.is_unknown_config_kind(),
            Self::List(list) | Self::Cleanup(list) => {
                list.iter().any(Error::is_unknown_config_kind)
            }
            _ => false,
        }
    }

    /// Strip description wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Apply { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// An ordered collection of errors sharing one heading
#[derive(Debug, Default)]
pub struct ErrorList {
    heading: String,
    errors: Vec<Error>,
}

impl ErrorList {
    /// Create an empty list
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            errors: Vec::new(),
        }
    }

    /// Add an error
    pub fn push(&mut self, err: Error) {
        self.errors.push(err);
    }

    /// Add the error of a result, if any
    pub fn add<T>(&mut self, result: Result<T>) {
        if let Err(err) = result {
            self.errors.push(err);
        }
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    /// `Ok(())` for an empty list, `Error::List` otherwise
    pub fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::List(self))
        }
    }

    /// `Ok(())` for an empty list, `Error::Cleanup` otherwise
    pub fn into_cleanup_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Cleanup(self))
        }
    }
}

impl IntoIterator for ErrorList {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.heading)?;
        for err in &self.errors {
            write!(f, "\n  - {}", err)?;
        }
        Ok(())
    }
}
