//! Extension initialization core for the Hearth workspace shell.
//!
//! `hearth_core` decides in which order installed extensions are activated:
//! dependencies before dependents, at most once per (namespace, extension)
//! pair per pass, with optional-dependency failures degraded to warnings.
//! The actual activation mechanics live behind [`ActivationHandler`]
//! implementations supplied by the host.

pub mod extension;
pub mod logging;
pub mod repo;

pub use extension::chain::DependencyChain;
pub use extension::handler::{
    ActivationError, ActivationHandler, ActivationResult, HandlerRegistry, HandlerRegistryError,
};
pub use extension::initializer::{ExtensionInitializer, InitializeError, InitializeResult};
pub use extension::record::{
    DependencyRef, ExtensionId, InstalledExtension, InstalledRecord, RecordValidationError,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use repo::core_registry::{CoreRegistry, StaticCoreRegistry};
pub use repo::installed_directory::{DirectoryError, InstalledDirectory, MemoryInstalledDirectory};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
