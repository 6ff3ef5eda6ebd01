// Properties every backend shares: noise never becomes a package, short
// rows are dropped, unsafe ids never reach a command line, and options a
// backend cannot honor are dropped instead of rejected.

use pkgbridge::cache::CacheStore;
use pkgbridge::core::{Backend, InstallationOptions, OperationKind, OutcomeRules, Package};
use pkgbridge::packages::{choco, pip, scoop, winget, BackendContext, BackendRegistry};
use std::sync::Arc;
use tempfile::TempDir;

fn registry(dir: &TempDir) -> BackendRegistry {
    BackendRegistry::with_defaults(Arc::new(BackendContext::new(CacheStore::new(dir.path()))))
}

#[test]
fn blacklisted_tokens_never_become_packages() {
    let choco_noise = "\
Chocolatey v2.2.2
Did you know Pro / Business automatically syncs with Programs and Features?
Validation Warnings:
 - A pending system reboot request has been detected, however, this is
";
    assert!(choco::parse_search(choco_noise).is_empty());
    assert!(choco::parse_installed(choco_noise).is_empty());

    let pip_noise = "\
Package    Version
---------- -------
WARNING: Ignoring invalid distribution -ip
[notice] A new release of pip is available
Package Ignoring
";
    assert!(pip::parse_installed(pip_noise).is_empty());
}

#[test]
fn rows_below_the_column_minimum_are_dropped() {
    let single_columns = "\
Name
----
lonely
another
";
    assert!(scoop::parse_search(single_columns).is_empty());
    assert!(pip::parse_installed(single_columns).is_empty());
    assert!(pip::parse_upgrades("Package Version\n------- -------\nrequests 2.31.0\n").is_empty());
    assert!(choco::parse_upgrades("git|2.43.0\n").is_empty());
    assert!(winget::parse_search("Name Id\n--------\nGit\n").is_empty());
}

#[test]
fn unsafe_ids_are_rejected_by_every_backend() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let options = InstallationOptions::default();

    for manager in registry.managers() {
        let backend = manager.backend_type();
        let mut refused = vec!["", "../../etc/passwd", "Git.Git\nrm"];
        // winget is started directly, the others may go through a shell
        if backend != Backend::Winget {
            refused.extend(["git; rm -rf ~", "$(whoami)", "a b", "{GUID}"]);
        }
        for id in refused {
            let package = Package::new("Evil", id, "1.0", "main", backend);
            assert!(
                manager.operation_command(OperationKind::Install, &package, &options).is_err(),
                "{} accepted {:?}",
                backend,
                id
            );
        }
    }
}

#[test]
fn winget_accepts_local_pc_ids() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let winget = registry.get(Backend::Winget).unwrap();

    for id in ["{26A24AE4-039D-4CA4-87B4-2F32180401F0}", r"ARP\Machine\X64\7-Zip (x64)"] {
        let package = Package::new("Local", id, "1.0", winget::LOCAL_SOURCE, Backend::Winget);
        let spec = winget
            .operation_command(OperationKind::Uninstall, &package, &InstallationOptions::default())
            .unwrap();
        assert!(spec.args.iter().any(|arg| arg == id));
    }
}

#[test]
fn unsupported_options_are_dropped_silently() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let options = InstallationOptions {
        interactive: true,
        skip_hash_check: true,
        architecture: Some("arm64".into()),
        remove_data_on_uninstall: true,
        ..Default::default()
    };

    let pip = registry.get(Backend::Pip).unwrap();
    let package = Package::new("Requests", "requests", "2.31.0", "Pip", Backend::Pip);
    let spec = pip
        .operation_command(OperationKind::Uninstall, &package, &options)
        .expect("pip drops what it cannot do");
    assert!(!spec.args.iter().any(|a| a.contains("arm64") || a == "--interactive"));

    let choco = registry.get(Backend::Choco).unwrap();
    let package = Package::new("Git", "git", "2.44.0", "chocolatey", Backend::Choco);
    let spec = choco
        .operation_command(OperationKind::Install, &package, &options)
        .expect("choco command");
    assert!(!spec.args.iter().any(|a| a.contains("arm64")));
    assert!(spec.args.contains(&"--notsilent".to_string()));
}

#[test]
fn capabilities_match_backend_features() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);

    let caps = |backend| registry.get(backend).unwrap().capabilities();
    assert!(caps(Backend::Winget).supports_custom_architectures);
    assert!(!caps(Backend::Pip).supports_custom_architectures);
    assert!(!caps(Backend::Pip).can_remove_data_on_uninstall);
    assert!(caps(Backend::Scoop).can_remove_data_on_uninstall);
    assert!(!caps(Backend::Scoop).supports_custom_versions);
    assert!(caps(Backend::Choco).supports_custom_versions);
}

fn assert_table(rules: &OutcomeRules, cases: &[(i32, &str, &str)]) {
    for (code, transcript, expected) in cases {
        assert_eq!(
            rules.classify(Some(*code), transcript, false).to_string(),
            *expected,
            "exit {} with {:?}",
            code,
            transcript
        );
    }
}

#[test]
fn result_codes_are_table_driven() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let scoop = registry.get(Backend::Scoop).unwrap();

    assert_table(
        scoop.outcome_rules(OperationKind::Install),
        &[
            (0, "'vlc' (3.0.20) was installed successfully!", "succeeded"),
            (1, "ERROR: This app requires administrator rights", "needs-elevation"),
            (0, "Latest versions for all apps are installed.", "no-applicable-update"),
            (3010, "", "needs-restart"),
            (1, "", "failed"),
        ],
    );

    let choco = registry.get(Backend::Choco).unwrap();
    assert_table(
        choco.outcome_rules(OperationKind::Uninstall),
        &[(1605, "", "succeeded"), (3010, "", "needs-restart"), (1, "", "failed")],
    );
}
