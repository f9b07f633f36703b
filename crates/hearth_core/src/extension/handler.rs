//! Activation handler contracts and per-type dispatch.
//!
//! # Responsibility
//! - Define the boundary to the component that actually activates one
//!   extension (classpath wiring, file deployment, process registration).
//! - Route activation to one registered handler per declared type.
//!
//! # Invariants
//! - The initializer treats `activate` as a single opaque side effect.
//! - Dispatch never falls back across types; a missing handler is an error.

use crate::extension::record::{ExtensionId, InstalledExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ActivationResult = Result<(), ActivationError>;

/// Activation failures reported back to the initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    /// No handler is registered for the record's declared type.
    UnsupportedType { extension: ExtensionId, kind: String },
    /// A handler attempted the activation and failed.
    Failed { extension: ExtensionId, reason: String },
}

impl Display for ActivationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedType { extension, kind } => write!(
                f,
                "no activation handler registered for type `{kind}` (extension {extension})"
            ),
            Self::Failed { extension, reason } => {
                write!(f, "activation of extension {extension} failed: {reason}")
            }
        }
    }
}

impl Error for ActivationError {}

/// Side-effecting activation step for one extension in one namespace.
///
/// Implementations may be expensive and may block; the initializer imposes
/// no timeout.
pub trait ActivationHandler {
    fn activate(
        &self,
        extension: &dyn InstalledExtension,
        namespace: Option<&str>,
    ) -> ActivationResult;
}

/// Handler registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerRegistryError {
    InvalidKind(String),
    DuplicateKind(String),
}

impl Display for HandlerRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKind(value) => write!(f, "handler type key is invalid: {value}"),
            Self::DuplicateKind(value) => {
                write!(f, "handler type key already registered: {value}")
            }
        }
    }
}

impl Error for HandlerRegistryError {}

/// Dispatches activation to one registered handler per extension type.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn ActivationHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one handler for a declared extension type.
    pub fn register(
        &mut self,
        kind: &str,
        handler: Arc<dyn ActivationHandler>,
    ) -> Result<(), HandlerRegistryError> {
        let kind = kind.trim();
        if !is_valid_kind(kind) {
            return Err(HandlerRegistryError::InvalidKind(kind.to_string()));
        }
        if self.handlers.contains_key(kind) {
            return Err(HandlerRegistryError::DuplicateKind(kind.to_string()));
        }

        self.handlers.insert(kind.to_string(), handler);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Returns sorted registered type keys.
    pub fn kinds(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Returns one handler by type key.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn ActivationHandler>> {
        self.handlers.get(kind.trim()).cloned()
    }
}

impl ActivationHandler for HandlerRegistry {
    fn activate(
        &self,
        extension: &dyn InstalledExtension,
        namespace: Option<&str>,
    ) -> ActivationResult {
        match self.handlers.get(extension.kind()) {
            Some(handler) => handler.activate(extension, namespace),
            None => Err(ActivationError::UnsupportedType {
                extension: extension.id().clone(),
                kind: extension.kind().to_string(),
            }),
        }
    }
}

fn is_valid_kind(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
