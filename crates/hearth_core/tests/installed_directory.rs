use hearth_core::{
    DependencyRef, ExtensionId, InstalledDirectory, InstalledExtension, InstalledRecord,
    MemoryInstalledDirectory,
};

const INVENTORY_FIXTURE: &str = r#"[
    {
        "id": "app.notes",
        "version": "1.2.0",
        "type": "wasm",
        "namespaces": ["ws-personal"],
        "dependencies": [
            { "id": "lib.markdown" },
            { "id": "lib.spellcheck", "optional": true }
        ]
    },
    {
        "id": "lib.markdown",
        "version": "0.9.1",
        "type": "wasm",
        "features": ["lib.markdown-api"]
    },
    {
        "id": "vendor.dusk",
        "version": "2.0.0",
        "type": "theme",
        "namespaces": ["ws-personal", "ws-team"],
        "disabled_in": ["ws-team"]
    }
]"#;

fn load_fixture() -> MemoryInstalledDirectory {
    let records: Vec<InstalledRecord> =
        serde_json::from_str(INVENTORY_FIXTURE).expect("fixture should deserialize");
    let mut directory = MemoryInstalledDirectory::new();
    for installed in records {
        directory.insert(installed).expect("fixture record should insert");
    }
    directory
}

#[test]
fn fixture_records_deserialize_with_defaults() {
    let directory = load_fixture();
    assert_eq!(directory.len(), 3);

    let notes = directory
        .get(&ExtensionId::new("app.notes"))
        .expect("notes record should exist");
    assert_eq!(
        notes.dependencies,
        vec![
            DependencyRef::required("lib.markdown"),
            DependencyRef::optional("lib.spellcheck"),
        ]
    );
    assert!(notes.enabled);
    assert!(notes.disabled_in.is_empty());

    let markdown = directory
        .get(&ExtensionId::new("lib.markdown"))
        .expect("markdown record should exist");
    assert!(markdown.namespaces.is_none());
}

#[test]
fn namespace_enumeration_includes_root_only_records() {
    let directory = load_fixture();

    let personal: Vec<_> = directory
        .list_installed(Some("ws-personal"))
        .iter()
        .map(|installed| installed.id().as_str().to_string())
        .collect();
    assert_eq!(personal, ["app.notes", "lib.markdown", "vendor.dusk"]);

    let team: Vec<_> = directory
        .list_installed(Some("ws-team"))
        .iter()
        .map(|installed| installed.id().as_str().to_string())
        .collect();
    // Installed in ws-team even though deactivated there; validity is the
    // initializer's gate, not the directory's.
    assert_eq!(team, ["lib.markdown", "vendor.dusk"]);
}

#[test]
fn lookup_resolves_feature_alias_across_scopes() {
    let directory = load_fixture();
    let alias = ExtensionId::new("lib.markdown-api");

    let at_root = directory
        .lookup_installed(&alias, None)
        .expect("alias should resolve at root");
    assert_eq!(at_root.id(), &ExtensionId::new("lib.markdown"));

    let in_namespace = directory
        .lookup_installed(&alias, Some("ws-personal"))
        .expect("alias should resolve in a namespace");
    assert_eq!(in_namespace.id(), &ExtensionId::new("lib.markdown"));
}

#[test]
fn lookup_does_not_cross_namespace_boundaries() {
    let directory = load_fixture();
    let notes = ExtensionId::new("app.notes");

    assert!(directory.lookup_installed(&notes, Some("ws-personal")).is_some());
    assert!(directory.lookup_installed(&notes, Some("ws-team")).is_none());
    assert!(directory.lookup_installed(&notes, None).is_none());
}
