//! Installed extension records and declaration validation.
//!
//! # Responsibility
//! - Define the canonical description of one installed extension.
//! - Validate declarations before records enter a directory.
//!
//! # Invariants
//! - `ExtensionId` is stable and usable as a map key.
//! - A record with `namespaces == None` lives at the root scope only.
//! - `validate()` never mutates a record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier for one installed extension, e.g. `hearth.ext.markdown`.
///
/// Kept opaque so callers treat it as a lookup key rather than a parsed
/// value. Version resolution happens at install time; by the time a record
/// reaches this crate the id already names one concrete installation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionId(String);

impl ExtensionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ExtensionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExtensionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One declared dependency edge of an installed extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    /// Identity (or feature alias) the dependency must resolve to.
    pub id: ExtensionId,
    /// Optional dependencies degrade to a warning when they fail.
    #[serde(default)]
    pub optional: bool,
}

impl DependencyRef {
    /// Declares a mandatory dependency; its failure aborts the dependent.
    pub fn required(id: impl Into<String>) -> Self {
        Self {
            id: ExtensionId::new(id),
            optional: false,
        }
    }

    /// Declares an optional dependency; its failure only warns.
    pub fn optional(id: impl Into<String>) -> Self {
        Self {
            id: ExtensionId::new(id),
            optional: true,
        }
    }
}

/// Capability view of one installed extension consumed by the initializer.
///
/// The initializer never inspects concrete record types; anything answering
/// these questions can be initialized.
pub trait InstalledExtension {
    fn id(&self) -> &ExtensionId;

    fn version(&self) -> &str;

    /// Declared extension type, e.g. `wasm` or `theme`.
    fn kind(&self) -> &str;

    /// Declared dependencies in declaration order.
    fn dependencies(&self) -> &[DependencyRef];

    /// Declared namespace scope; `None` means root-only.
    fn namespaces(&self) -> Option<&BTreeSet<String>>;

    /// Whether this record may be activated in `namespace`.
    ///
    /// A `false` answer is not an error: the record is simply inapplicable
    /// there (superseded, disabled, ...).
    fn is_valid(&self, namespace: Option<&str>) -> bool;
}

/// Canonical installed-extension record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    /// Stable identity used for dependency resolution and memoization.
    pub id: ExtensionId,
    /// Installed version string (`major.minor.patch`).
    pub version: String,
    /// Serialized as `type` to match external inventory naming.
    #[serde(rename = "type")]
    pub kind: String,
    /// Declared dependencies in declaration order.
    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
    /// Namespaces this record is installed into; `None` means root-only.
    #[serde(default)]
    pub namespaces: Option<BTreeSet<String>>,
    /// Alternate identities (feature aliases) this record also satisfies.
    #[serde(default)]
    pub features: BTreeSet<ExtensionId>,
    /// Globally disabled records are never activated anywhere.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Namespaces where this record is installed but deactivated.
    #[serde(default)]
    pub disabled_in: BTreeSet<String>,
}

fn default_enabled() -> bool {
    true
}

impl InstalledRecord {
    /// Creates an enabled root-only record with no dependencies.
    ///
    /// Namespace scope, dependencies and feature aliases are plain fields;
    /// install paths set them after construction.
    pub fn new(id: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: ExtensionId::new(id),
            version: version.into(),
            kind: kind.into(),
            dependencies: Vec::new(),
            namespaces: None,
            features: BTreeSet::new(),
            enabled: true,
            disabled_in: BTreeSet::new(),
        }
    }

    /// Whether this record is installed into `namespace`.
    ///
    /// Root-only records are visible from every scope; namespaced records
    /// are visible only in their declared namespaces.
    pub fn is_installed_in(&self, namespace: Option<&str>) -> bool {
        match (&self.namespaces, namespace) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(declared), Some(name)) => declared.contains(name),
        }
    }

    /// Validates declaration-level record invariants.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.id.as_str().is_empty() {
            return Err(RecordValidationError::EmptyId);
        }
        if !is_valid_id_token(self.id.as_str()) {
            return Err(RecordValidationError::InvalidId(self.id.as_str().to_string()));
        }

        if self.version.is_empty() {
            return Err(RecordValidationError::EmptyVersion);
        }
        if !is_version_triplet(&self.version) {
            return Err(RecordValidationError::InvalidVersion(self.version.clone()));
        }

        if self.kind.trim().is_empty() {
            return Err(RecordValidationError::EmptyKind);
        }

        for feature in &self.features {
            if !is_valid_id_token(feature.as_str()) {
                return Err(RecordValidationError::InvalidFeature(
                    feature.as_str().to_string(),
                ));
            }
        }

        if let Some(namespaces) = &self.namespaces {
            if namespaces.is_empty() {
                return Err(RecordValidationError::EmptyNamespaceSet);
            }
            for namespace in namespaces {
                if namespace.trim().is_empty() {
                    return Err(RecordValidationError::EmptyNamespaceName);
                }
            }
        }

        let mut declared = BTreeSet::new();
        for dependency in &self.dependencies {
            if !is_valid_id_token(dependency.id.as_str()) {
                return Err(RecordValidationError::InvalidDependencyId(
                    dependency.id.as_str().to_string(),
                ));
            }
            if !declared.insert(dependency.id.clone()) {
                return Err(RecordValidationError::DuplicateDependency(
                    dependency.id.clone(),
                ));
            }
        }

        Ok(())
    }
}

impl InstalledExtension for InstalledRecord {
    fn id(&self) -> &ExtensionId {
        &self.id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn dependencies(&self) -> &[DependencyRef] {
        &self.dependencies
    }

    fn namespaces(&self) -> Option<&BTreeSet<String>> {
        self.namespaces.as_ref()
    }

    fn is_valid(&self, namespace: Option<&str>) -> bool {
        if !self.enabled {
            return false;
        }
        match namespace {
            Some(name) => !self.disabled_in.contains(name),
            None => true,
        }
    }
}

fn is_valid_id_token(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
            continue;
        }
        if c == '.' || c == '_' || c == '-' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
            continue;
        }
        return false;
    }
    !prev_separator
}

fn is_version_triplet(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() != 3 {
        return false;
    }
    parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

/// Declaration-level record validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    EmptyId,
    InvalidId(String),
    EmptyVersion,
    InvalidVersion(String),
    EmptyKind,
    InvalidFeature(String),
    EmptyNamespaceSet,
    EmptyNamespaceName,
    InvalidDependencyId(String),
    DuplicateDependency(ExtensionId),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "record id must not be empty"),
            Self::InvalidId(value) => write!(f, "record id is invalid: {value}"),
            Self::EmptyVersion => write!(f, "record version must not be empty"),
            Self::InvalidVersion(value) => write!(
                f,
                "record version is invalid: {value} (expected major.minor.patch)"
            ),
            Self::EmptyKind => write!(f, "record type must not be empty"),
            Self::InvalidFeature(value) => write!(f, "record feature alias is invalid: {value}"),
            Self::EmptyNamespaceSet => {
                write!(f, "record declares a namespace set but names no namespace")
            }
            Self::EmptyNamespaceName => write!(f, "record namespace name must not be empty"),
            Self::InvalidDependencyId(value) => {
                write!(f, "record dependency id is invalid: {value}")
            }
            Self::DuplicateDependency(id) => {
                write!(f, "record dependency is declared twice: {id}")
            }
        }
    }
}

impl Error for RecordValidationError {}

#[cfg(test)]
mod tests {
    use super::{
        DependencyRef, ExtensionId, InstalledExtension, InstalledRecord, RecordValidationError,
    };

    fn valid_record() -> InstalledRecord {
        let mut record = InstalledRecord::new("hearth.ext.markdown", "1.2.0", "wasm");
        record.dependencies = vec![
            DependencyRef::required("lib.render"),
            DependencyRef::optional("lib.spellcheck"),
        ];
        record
    }

    #[test]
    fn validates_baseline_record() {
        assert!(valid_record().validate().is_ok());
    }

    #[test]
    fn rejects_invalid_id_format() {
        let mut record = valid_record();
        record.id = ExtensionId::new("Hearth Markdown");
        let err = record.validate().unwrap_err();
        assert!(matches!(err, RecordValidationError::InvalidId(_)));
    }

    #[test]
    fn rejects_invalid_version_format() {
        let mut record = valid_record();
        record.version = "v2".to_string();
        let err = record.validate().unwrap_err();
        assert!(matches!(err, RecordValidationError::InvalidVersion(_)));
    }

    #[test]
    fn rejects_empty_kind() {
        let mut record = valid_record();
        record.kind = "  ".to_string();
        let err = record.validate().unwrap_err();
        assert_eq!(err, RecordValidationError::EmptyKind);
    }

    #[test]
    fn rejects_duplicate_dependency_declaration() {
        let mut record = valid_record();
        record.dependencies.push(DependencyRef::optional("lib.render"));
        let err = record.validate().unwrap_err();
        assert_eq!(
            err,
            RecordValidationError::DuplicateDependency(ExtensionId::new("lib.render"))
        );
    }

    #[test]
    fn rejects_empty_namespace_set() {
        let mut record = valid_record();
        record.namespaces = Some(Default::default());
        let err = record.validate().unwrap_err();
        assert_eq!(err, RecordValidationError::EmptyNamespaceSet);
    }

    #[test]
    fn rejects_invalid_feature_alias() {
        let mut record = valid_record();
        record.features.insert(ExtensionId::new("Markdown API"));
        let err = record.validate().unwrap_err();
        assert!(matches!(err, RecordValidationError::InvalidFeature(_)));
    }

    #[test]
    fn root_only_records_are_installed_everywhere() {
        let record = valid_record();
        assert!(record.is_installed_in(None));
        assert!(record.is_installed_in(Some("ws-personal")));
    }

    #[test]
    fn namespaced_records_are_installed_only_where_declared() {
        let mut record = valid_record();
        record.namespaces = Some(["ws-personal".to_string()].into_iter().collect());
        assert!(record.is_installed_in(Some("ws-personal")));
        assert!(!record.is_installed_in(Some("ws-team")));
        assert!(!record.is_installed_in(None));
    }

    #[test]
    fn disabled_records_are_invalid_everywhere() {
        let mut record = valid_record();
        record.enabled = false;
        assert!(!record.is_valid(None));
        assert!(!record.is_valid(Some("ws-personal")));
    }

    #[test]
    fn namespace_deactivation_is_scoped() {
        let mut record = valid_record();
        record.disabled_in.insert("ws-team".to_string());
        assert!(record.is_valid(None));
        assert!(record.is_valid(Some("ws-personal")));
        assert!(!record.is_valid(Some("ws-team")));
    }
}
