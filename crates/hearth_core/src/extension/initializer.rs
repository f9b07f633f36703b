//! Installed-extension initialization orchestrator.
//!
//! # Responsibility
//! - Activate installed extensions dependencies-first, per namespace.
//! - Attempt each (namespace, extension) pair at most once per pass.
//! - Degrade optional-dependency failures to warnings; propagate mandatory
//!   ones to the dependent.
//!
//! # Invariants
//! - A dependency is fully resolved (or conclusively failed) before its
//!   dependent's activation runs.
//! - A failed extension never blocks unrelated extensions in the same pass.
//! - Outcomes are never reused across separate top-level calls; repeated
//!   calls re-run activation (idempotence there is the handler's problem).

use crate::extension::chain::DependencyChain;
use crate::extension::handler::{ActivationError, ActivationHandler};
use crate::extension::record::{DependencyRef, ExtensionId, InstalledExtension};
use crate::repo::core_registry::CoreRegistry;
use crate::repo::installed_directory::InstalledDirectory;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type InitializeResult<T> = Result<T, InitializeError>;

/// Failures raised while resolving one extension in one namespace.
#[derive(Debug)]
pub enum InitializeError {
    /// A dependency resolved back to the dependent's own installed record.
    SelfDependency {
        extension: ExtensionId,
        dependency: ExtensionId,
        chain: String,
    },
    /// A mandatory dependency resolved to "not initialized" without failing
    /// itself (invalid in this scope, or already attempted and failed).
    DependencyUnsatisfied {
        extension: ExtensionId,
        dependency: ExtensionId,
    },
    /// A mandatory dependency's own resolution failed.
    DependencyFailed {
        extension: ExtensionId,
        dependency: ExtensionId,
        source: Box<InitializeError>,
    },
    /// The activation handler itself failed.
    Activation(ActivationError),
}

impl InitializeError {
    /// Message of the deepest failure in the chain, for operator-facing
    /// warnings that should stay one line.
    pub fn root_cause_message(&self) -> String {
        let mut cause: &dyn Error = self;
        while let Some(source) = cause.source() {
            cause = source;
        }
        cause.to_string()
    }
}

impl Display for InitializeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfDependency {
                extension,
                dependency,
                chain,
            } => {
                write!(
                    f,
                    "extension {extension} has itself as a dependency ({dependency}); \
                     it usually means the extension was installed along with one of its own features"
                )?;
                if !chain.is_empty() {
                    write!(f, " [chain: {chain}]")?;
                }
                Ok(())
            }
            Self::DependencyUnsatisfied {
                extension,
                dependency,
            } => write!(
                f,
                "extension {extension} cannot be initialized because its dependency {dependency} could not be"
            ),
            Self::DependencyFailed {
                extension,
                dependency,
                ..
            } => write!(
                f,
                "failed to initialize dependency {dependency} of extension {extension}"
            ),
            Self::Activation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for InitializeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DependencyFailed { source, .. } => Some(source.as_ref()),
            Self::Activation(err) => Some(err),
            Self::SelfDependency { .. } | Self::DependencyUnsatisfied { .. } => None,
        }
    }
}

impl From<ActivationError> for InitializeError {
    fn from(value: ActivationError) -> Self {
        Self::Activation(value)
    }
}

/// Per-call memo of attempted (namespace, extension) outcomes.
///
/// Owned by one top-level call and discarded with it. `true` means
/// "initialized here, reuse"; `false` means "attempted and failed here,
/// reuse the failure"; no entry means "never visited here".
#[derive(Debug, Default)]
struct InitializationPass {
    root: BTreeMap<ExtensionId, bool>,
    namespaces: BTreeMap<String, BTreeMap<ExtensionId, bool>>,
}

impl InitializationPass {
    fn outcome(&self, namespace: Option<&str>, id: &ExtensionId) -> Option<bool> {
        let scope = match namespace {
            None => &self.root,
            Some(name) => self.namespaces.get(name)?,
        };
        scope.get(id).copied()
    }

    fn record(&mut self, namespace: Option<&str>, id: ExtensionId, initialized: bool) {
        let scope = match namespace {
            None => &mut self.root,
            Some(name) => self.namespaces.entry(name.to_string()).or_default(),
        };
        scope.insert(id, initialized);
    }
}

/// Initializes installed extensions in dependency order.
///
/// Walks the installed set, resolves each record's namespace scope, then
/// recursively ensures dependencies are activated before their dependents.
/// Per-extension failures are logged and isolated; the walk itself always
/// completes.
pub struct ExtensionInitializer<D, C, H>
where
    D: InstalledDirectory,
    C: CoreRegistry,
    H: ActivationHandler,
{
    directory: D,
    core: C,
    handler: H,
}

impl<D, C, H> ExtensionInitializer<D, C, H>
where
    D: InstalledDirectory,
    C: CoreRegistry,
    H: ActivationHandler,
{
    /// Creates an initializer over the provided collaborators.
    pub fn new(directory: D, core: C, handler: H) -> Self {
        Self {
            directory,
            core,
            handler,
        }
    }

    /// Initializes every installed extension in every namespace.
    pub fn initialize_all(&self) {
        self.initialize(None, None);
    }

    /// Initializes extensions applicable to one namespace.
    ///
    /// Root-only extensions are not activated by a namespace-scoped call;
    /// they are only reached as dependencies of namespaced extensions.
    pub fn initialize_namespace(&self, namespace: &str) {
        self.initialize(Some(namespace), None);
    }

    /// Initializes installed extensions, optionally restricted to one
    /// namespace and one declared type.
    ///
    /// # Contract
    /// - Best-effort over the whole installed set: per-extension failures
    ///   are logged, never returned, and never stop the walk.
    /// - Each (namespace, extension) pair is attempted at most once within
    ///   this call.
    pub fn initialize(&self, namespace: Option<&str>, kind: Option<&str>) {
        info!(
            "event=extension_pass_begin module=extension status=ok namespace={} kind={}",
            scope_label(namespace),
            kind.unwrap_or("*")
        );

        let mut pass = InitializationPass::default();
        for extension in self.directory.list_installed(namespace) {
            if kind.is_some_and(|wanted| wanted != extension.kind()) {
                continue;
            }
            if let Err(err) = self.initialize_extension(&extension, namespace, &mut pass) {
                error!(
                    "event=extension_init module=extension status=error extension={} error={}",
                    extension.id(),
                    err
                );
            }
        }
    }

    /// Resolves the namespace scope of one installed extension.
    fn initialize_extension(
        &self,
        extension: &Arc<dyn InstalledExtension>,
        namespace_filter: Option<&str>,
        pass: &mut InitializationPass,
    ) -> InitializeResult<()> {
        match extension.namespaces() {
            Some(declared) => {
                if let Some(filter) = namespace_filter {
                    if declared.contains(filter) {
                        self.resolve_in_namespace(
                            extension,
                            Some(filter),
                            pass,
                            &DependencyChain::root(),
                        )
                        .map(|_| ())
                    } else {
                        Ok(())
                    }
                } else {
                    // Declared namespaces resolve independently: one failing
                    // namespace must not keep the others from being attempted.
                    let mut first_failure = None;
                    for name in declared {
                        match self.resolve_in_namespace(
                            extension,
                            Some(name.as_str()),
                            pass,
                            &DependencyChain::root(),
                        ) {
                            Ok(_) => {}
                            Err(err) if first_failure.is_none() => first_failure = Some(err),
                            Err(err) => error!(
                                "event=extension_init module=extension status=error extension={} namespace={} error={}",
                                extension.id(),
                                name,
                                err
                            ),
                        }
                    }
                    match first_failure {
                        Some(err) => Err(err),
                        None => Ok(()),
                    }
                }
            }
            None if namespace_filter.is_none() => self
                .resolve_in_namespace(extension, None, pass, &DependencyChain::root())
                .map(|_| ()),
            // Root-only extensions are skipped under an explicit namespace
            // filter; dependencies of namespaced extensions may still reach
            // them through the root fallback in namespace resolution.
            None => Ok(()),
        }
    }

    /// Resolves one extension in one namespace, dependencies first.
    ///
    /// Returns `false` when the record is inapplicable here or a previous
    /// attempt in this pass failed; errors only on first-time failures.
    fn resolve_in_namespace(
        &self,
        extension: &Arc<dyn InstalledExtension>,
        namespace: Option<&str>,
        pass: &mut InitializationPass,
        chain: &DependencyChain<'_>,
    ) -> InitializeResult<bool> {
        if !extension.is_valid(namespace) {
            debug!(
                "event=extension_skip module=extension status=ok extension={} namespace={} reason=not_valid_here",
                extension.id(),
                scope_label(namespace)
            );
            return Ok(false);
        }

        // A record without declared namespaces lives at root only; satisfy
        // it once there and let every namespaced dependent reuse the outcome.
        if namespace.is_some() && extension.namespaces().is_none() {
            return self.resolve_in_namespace(extension, None, pass, chain);
        }

        if let Some(initialized) = pass.outcome(namespace, extension.id()) {
            return Ok(initialized);
        }

        let resolved = self.resolve_first_time(extension, namespace, pass, chain);
        // Recorded on both paths so a later dependent sharing a failing
        // dependency reuses the failure instead of retrying the handler.
        pass.record(namespace, extension.id().clone(), resolved.is_ok());
        resolved.map(|()| true)
    }

    fn resolve_first_time(
        &self,
        extension: &Arc<dyn InstalledExtension>,
        namespace: Option<&str>,
        pass: &mut InitializationPass,
        chain: &DependencyChain<'_>,
    ) -> InitializeResult<()> {
        for dependency in extension.dependencies() {
            self.resolve_dependency(extension, dependency, namespace, pass, chain)?;
        }

        self.handler.activate(extension.as_ref(), namespace)?;
        info!(
            "event=extension_activated module=extension status=ok extension={} version={} namespace={}",
            extension.id(),
            extension.version(),
            scope_label(namespace)
        );
        Ok(())
    }

    /// Resolves one declared dependency of `extension` in `namespace`.
    fn resolve_dependency(
        &self,
        extension: &Arc<dyn InstalledExtension>,
        dependency: &DependencyRef,
        namespace: Option<&str>,
        pass: &mut InitializationPass,
        chain: &DependencyChain<'_>,
    ) -> InitializeResult<()> {
        if self.core.is_provided(&dependency.id) {
            return Ok(());
        }

        let Some(resolved) = self.directory.lookup_installed(&dependency.id, namespace) else {
            // Nothing installed under this identity here; absence is not
            // this walk's error to raise.
            return Ok(());
        };

        // Reference identity, not id equality: the guard is for "resolved
        // back to the exact same installation", which happens when an
        // extension is installed along with one of its own features.
        if Arc::ptr_eq(extension, &resolved) {
            return Err(InitializeError::SelfDependency {
                extension: extension.id().clone(),
                dependency: dependency.id.clone(),
                chain: chain.describe(),
            });
        }

        let hop = chain.extend(extension.id(), &dependency.id);
        let outcome = self
            .resolve_in_namespace(&resolved, namespace, pass, &hop)
            .and_then(|initialized| {
                if initialized {
                    Ok(())
                } else {
                    Err(InitializeError::DependencyUnsatisfied {
                        extension: extension.id().clone(),
                        dependency: dependency.id.clone(),
                    })
                }
            });

        match outcome {
            Ok(()) => Ok(()),
            Err(err) if dependency.optional => {
                warn!(
                    "event=dependency_skip module=extension status=warn extension={} dependency={} chain={} cause={}",
                    extension.id(),
                    dependency.id,
                    hop.describe(),
                    err.root_cause_message()
                );
                Ok(())
            }
            Err(err) => Err(InitializeError::DependencyFailed {
                extension: extension.id().clone(),
                dependency: dependency.id.clone(),
                source: Box::new(err),
            }),
        }
    }
}

fn scope_label(namespace: Option<&str>) -> &str {
    namespace.unwrap_or("<root>")
}
