//! Installed-extension directory contracts and in-memory implementation.
//!
//! # Responsibility
//! - Answer which extensions are installed, globally or per namespace.
//! - Resolve one dependency identity (or feature alias) to its record.
//!
//! # Invariants
//! - Records are validated before entering the directory.
//! - Lookup never fabricates records; absence is `None`.
//! - Lookup and enumeration hand out the same shared record allocation, so
//!   reference-identity checks in the initializer stay meaningful.

use crate::extension::record::{
    ExtensionId, InstalledExtension, InstalledRecord, RecordValidationError,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Read side of the installed-extension inventory.
pub trait InstalledDirectory {
    /// Lists installed extensions: the full inventory when `namespace` is
    /// `None`, otherwise the records visible from that namespace (root-only
    /// records included).
    fn list_installed(&self, namespace: Option<&str>) -> Vec<Arc<dyn InstalledExtension>>;

    /// Resolves `id` (or one of its feature aliases) to the record visible
    /// from `namespace`, or `None` when nothing is installed there.
    fn lookup_installed(
        &self,
        id: &ExtensionId,
        namespace: Option<&str>,
    ) -> Option<Arc<dyn InstalledExtension>>;
}

/// Directory insertion errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    Validation(RecordValidationError),
    DuplicateId(ExtensionId),
    DuplicateFeature {
        feature: ExtensionId,
        owner: ExtensionId,
    },
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "extension id already installed: {id}"),
            Self::DuplicateFeature { feature, owner } => {
                write!(f, "feature alias {feature} already claimed by {owner}")
            }
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::DuplicateId(_) | Self::DuplicateFeature { .. } => None,
        }
    }
}

impl From<RecordValidationError> for DirectoryError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Memory-backed installed-extension directory.
///
/// The reference implementation for hosts that load their install inventory
/// at startup; persistent storage stays outside this crate.
#[derive(Debug, Default)]
pub struct MemoryInstalledDirectory {
    records: BTreeMap<ExtensionId, Arc<InstalledRecord>>,
    features: BTreeMap<ExtensionId, ExtensionId>,
}

impl MemoryInstalledDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores one installed record.
    pub fn insert(&mut self, record: InstalledRecord) -> Result<(), DirectoryError> {
        record.validate()?;
        if self.records.contains_key(&record.id) {
            return Err(DirectoryError::DuplicateId(record.id));
        }
        if let Some(owner) = self.features.get(&record.id) {
            return Err(DirectoryError::DuplicateFeature {
                feature: record.id,
                owner: owner.clone(),
            });
        }
        for feature in &record.features {
            if let Some(owner) = self.owner_of(feature) {
                return Err(DirectoryError::DuplicateFeature {
                    feature: feature.clone(),
                    owner,
                });
            }
        }

        for feature in &record.features {
            self.features.insert(feature.clone(), record.id.clone());
        }
        self.records.insert(record.id.clone(), Arc::new(record));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns one stored record by exact id.
    pub fn get(&self, id: &ExtensionId) -> Option<Arc<InstalledRecord>> {
        self.records.get(id).cloned()
    }

    fn owner_of(&self, id: &ExtensionId) -> Option<ExtensionId> {
        if self.records.contains_key(id) {
            return Some(id.clone());
        }
        self.features.get(id).cloned()
    }

    fn resolve(&self, id: &ExtensionId) -> Option<&Arc<InstalledRecord>> {
        self.records.get(id).or_else(|| {
            self.features
                .get(id)
                .and_then(|owner| self.records.get(owner))
        })
    }
}

impl InstalledDirectory for MemoryInstalledDirectory {
    fn list_installed(&self, namespace: Option<&str>) -> Vec<Arc<dyn InstalledExtension>> {
        self.records
            .values()
            .filter(|record| namespace.is_none() || record.is_installed_in(namespace))
            .map(|record| Arc::clone(record) as Arc<dyn InstalledExtension>)
            .collect()
    }

    fn lookup_installed(
        &self,
        id: &ExtensionId,
        namespace: Option<&str>,
    ) -> Option<Arc<dyn InstalledExtension>> {
        let record = self.resolve(id)?;
        if record.is_installed_in(namespace) {
            Some(Arc::clone(record) as Arc<dyn InstalledExtension>)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DirectoryError, InstalledDirectory, MemoryInstalledDirectory};
    use crate::extension::record::{ExtensionId, InstalledExtension, InstalledRecord};

    fn namespaced(id: &str, namespaces: &[&str]) -> InstalledRecord {
        let mut record = InstalledRecord::new(id, "1.0.0", "wasm");
        record.namespaces = Some(namespaces.iter().map(|name| name.to_string()).collect());
        record
    }

    #[test]
    fn insert_validates_records() {
        let mut directory = MemoryInstalledDirectory::new();
        let err = directory
            .insert(InstalledRecord::new("app.shell", "one", "wasm"))
            .expect_err("invalid version must be rejected");
        assert!(matches!(err, DirectoryError::Validation(_)));
        assert!(directory.is_empty());
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut directory = MemoryInstalledDirectory::new();
        directory
            .insert(InstalledRecord::new("app.shell", "1.0.0", "wasm"))
            .expect("first record should insert");
        let err = directory
            .insert(InstalledRecord::new("app.shell", "2.0.0", "wasm"))
            .expect_err("duplicate id must be rejected");
        assert_eq!(err, DirectoryError::DuplicateId(ExtensionId::new("app.shell")));
    }

    #[test]
    fn insert_rejects_claimed_feature_alias() {
        let mut directory = MemoryInstalledDirectory::new();
        let mut store = InstalledRecord::new("svc.store", "1.0.0", "wasm");
        store.features.insert(ExtensionId::new("svc.store-api"));
        directory.insert(store).expect("store should insert");

        let mut rival = InstalledRecord::new("svc.vault", "1.0.0", "wasm");
        rival.features.insert(ExtensionId::new("svc.store-api"));
        let err = directory
            .insert(rival)
            .expect_err("claimed feature alias must be rejected");
        assert!(matches!(err, DirectoryError::DuplicateFeature { .. }));
    }

    #[test]
    fn lookup_resolves_feature_aliases() {
        let mut directory = MemoryInstalledDirectory::new();
        let mut store = InstalledRecord::new("svc.store", "1.0.0", "wasm");
        store.features.insert(ExtensionId::new("svc.store-api"));
        directory.insert(store).expect("store should insert");

        let resolved = directory
            .lookup_installed(&ExtensionId::new("svc.store-api"), None)
            .expect("feature alias should resolve");
        assert_eq!(resolved.id(), &ExtensionId::new("svc.store"));
    }

    #[test]
    fn lookup_honors_namespace_visibility() {
        let mut directory = MemoryInstalledDirectory::new();
        directory
            .insert(namespaced("app.panel", &["ws-team"]))
            .expect("panel should insert");
        directory
            .insert(InstalledRecord::new("lib.rt", "1.0.0", "wasm"))
            .expect("runtime should insert");

        let panel = ExtensionId::new("app.panel");
        let runtime = ExtensionId::new("lib.rt");

        assert!(directory.lookup_installed(&panel, Some("ws-team")).is_some());
        assert!(directory.lookup_installed(&panel, Some("ws-personal")).is_none());
        assert!(directory.lookup_installed(&panel, None).is_none());
        assert!(directory.lookup_installed(&runtime, None).is_some());
        assert!(directory.lookup_installed(&runtime, Some("ws-team")).is_some());
    }

    #[test]
    fn list_scopes_to_namespace_but_keeps_root_records() {
        let mut directory = MemoryInstalledDirectory::new();
        directory
            .insert(namespaced("app.panel", &["ws-team"]))
            .expect("panel should insert");
        directory
            .insert(namespaced("app.board", &["ws-personal"]))
            .expect("board should insert");
        directory
            .insert(InstalledRecord::new("lib.rt", "1.0.0", "wasm"))
            .expect("runtime should insert");

        let all: Vec<_> = directory
            .list_installed(None)
            .iter()
            .map(|record| record.id().as_str().to_string())
            .collect();
        assert_eq!(all, ["app.board", "app.panel", "lib.rt"]);

        let team: Vec<_> = directory
            .list_installed(Some("ws-team"))
            .iter()
            .map(|record| record.id().as_str().to_string())
            .collect();
        assert_eq!(team, ["app.panel", "lib.rt"]);
    }
}
