//! Immutable dependency-chain context for failure diagnostics.

use crate::extension::record::ExtensionId;

/// One hop in the chain of (extension, dependency) resolutions.
///
/// Every recursive resolution step derives a new node borrowing its parent;
/// nodes are never mutated and die with the call frame that created them.
/// The chain exists only to render readable descriptions when a resolution
/// fails deep inside the walk.
#[derive(Debug, Clone, Copy)]
pub struct DependencyChain<'a> {
    parent: Option<&'a DependencyChain<'a>>,
    extension: Option<&'a ExtensionId>,
    dependency: Option<&'a ExtensionId>,
}

impl<'a> DependencyChain<'a> {
    /// Chain head for one top-level resolution.
    pub const fn root() -> Self {
        Self {
            parent: None,
            extension: None,
            dependency: None,
        }
    }

    /// Derives the chain for recursing from `extension` into `dependency`.
    pub fn extend<'b>(
        &'b self,
        extension: &'b ExtensionId,
        dependency: &'b ExtensionId,
    ) -> DependencyChain<'b> {
        DependencyChain {
            parent: Some(self),
            extension: Some(extension),
            dependency: Some(dependency),
        }
    }

    /// Number of hops between this node and the chain head.
    pub fn depth(&self) -> usize {
        match self.parent {
            Some(parent) => parent.depth() + 1,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_none() && self.extension.is_none() && self.dependency.is_none()
    }

    /// Renders the hops head-first, e.g. `app.shell -> lib.render -> lib.gl`.
    pub fn describe(&self) -> String {
        let mut ids = Vec::new();
        self.collect(&mut ids);
        ids.iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    fn collect<'s>(&'s self, ids: &mut Vec<&'s ExtensionId>) {
        if let Some(parent) = self.parent {
            parent.collect(ids);
        }
        if let Some(extension) = self.extension {
            // Consecutive hops repeat the extension as the previous hop's
            // dependency; keep each identity once.
            if ids.last() != Some(&extension) {
                ids.push(extension);
            }
        }
        if let Some(dependency) = self.dependency {
            ids.push(dependency);
        }
    }
}
