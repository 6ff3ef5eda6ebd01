use super::*;
use crate::cache::CacheStore;

const SEARCH: &str = "\
Results from local buckets...

Name      Version  Source Binaries
----      -------  ------ --------
7zip      23.01    main
vlc       3.0.20   extras
oddball   1.0
lonely
";

const LIST: &str = "\
Installed apps:

Name    Version Source Updated             Info
----    ------- ------ -------             ----
7zip    23.01   main   2024-01-10 10:00:00
git     2.44.0  main   2024-02-23 11:00:00 Global install
";

const STATUS: &str = "\
WARN  Scoop bucket(s) out of date. Run 'scoop update' to get the latest changes.
Name Installed Version Latest Version Missing Dependencies Info
---- ----------------- -------------- -------------------- ----
git  2.43.0            2.44.0
";

const BUCKETS: &str = "\
Name   Source                                       Updated            Manifests
----   ------                                       -------            ---------
main   https://github.com/ScoopInstaller/Main       2024-02-23 10:12:11      1290
extras https://github.com/ScoopInstaller/Extras.git 2024-02-23 10:12:11      2000
local  D:\\buckets\\local
";

const MANIFEST: &str = r#"{
    "version": "3.0.20",
    "description": "A free and open source cross-platform multimedia player.",
    "homepage": "https://www.videolan.org/",
    "license": {
        "identifier": "GPL-2.0-or-later",
        "url": "https://www.videolan.org/legal.html"
    },
    "notes": ["Line one", "Line two"],
    "architecture": {
        "64bit": {
            "url": "https://get.videolan.org/vlc/3.0.20/win64/vlc-3.0.20-win64.7z",
            "hash": "sha256hash64"
        },
        "32bit": {
            "url": "https://get.videolan.org/vlc/3.0.20/win32/vlc-3.0.20-win32.7z",
            "hash": "sha256hash32"
        }
    },
    "checkver": {
        "url": "https://www.videolan.org/vlc/download-windows.html",
        "regex": "vlc-([\\d.]+)-win64"
    }
}"#;

fn manager() -> ScoopManager {
    let context = BackendContext::new(CacheStore::new("/tmp/pkgbridge-scoop-test"));
    ScoopManager::new(Arc::new(context))
}

fn package(id: &str, source: &str) -> Package {
    Package::new(text::format_id_as_name(id), id, "1.0", source, Backend::Scoop)
}

#[test]
fn search_rows_carry_bucket() {
    let rows = parse_search(SEARCH);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], CacheRow::new("7zip", "7zip", "23.01", "Scoop: main"));
    assert_eq!(rows[1].source, "Scoop: extras");
    assert_eq!(rows[2].source, "Scoop");
}

#[test]
fn global_installs_are_marked() {
    let installed = parse_installed(LIST);
    assert_eq!(installed.len(), 2);
    assert_eq!(installed[0].source, "Scoop: main");
    assert_eq!(installed[1].source, "Scoop (Global): main");
    assert_eq!(installed[1].version, "2.44.0");
}

#[test]
fn status_rows_need_three_columns() {
    let upgrades = parse_upgrades(STATUS);
    assert_eq!(upgrades.len(), 1);
    assert_eq!(upgrades[0].package.id, "git");
    assert_eq!(upgrades[0].new_version, "2.44.0");
    assert!(parse_upgrades("Name Version\n----\ngit 2.43.0\n").is_empty());
}

#[test]
fn bucket_list() {
    let buckets = parse_buckets(BUCKETS);
    assert_eq!(buckets.len(), 3);
    assert_eq!(buckets[0].name, "main");
    assert_eq!(buckets[0].updated, "2024-02-23 10:12:11");
    assert_eq!(buckets[1].manifests, "2000");
    assert_eq!(buckets[2].updated, "Unknown");
}

#[test]
fn manifest_urls_follow_known_buckets() {
    let buckets = parse_buckets(BUCKETS);
    assert_eq!(
        manifest_url(&package("vlc", "Scoop: extras"), &buckets),
        "https://github.com/ScoopInstaller/Extras/blob/master/bucket/vlc.json"
    );
    assert_eq!(
        manifest_url(&package("git", "Scoop"), &[]),
        "https://github.com/ScoopInstaller/main/blob/master/bucket/git.json"
    );
    assert_eq!(
        manifest_url(&package("versions/python310", "Scoop: versions"), &[]),
        "https://github.com/ScoopInstaller/versions/blob/master/bucket/python310.json"
    );
}

#[test]
fn bucket_prefixes() {
    assert_eq!(bucket_prefix("Scoop: extras"), "extras/");
    assert_eq!(bucket_prefix("Scoop (Global): Main"), "main/");
    assert_eq!(bucket_prefix("Scoop"), "");
    assert_eq!(bucket_prefix("Scoop: https://example.com/bucket"), "");
    assert_eq!(bucket_of("Scoop (Global): extras"), "extras");
    assert_eq!(bucket_of("Scoop"), "main");
}

#[test]
fn manifest_fills_details() {
    let manifest = parse_manifest(MANIFEST).expect("manifest");
    let mut details = PackageDetails::new(package("vlc", "Scoop: extras"));
    apply_manifest(&mut details, &manifest);

    assert_eq!(details.versions, vec!["3.0.20"]);
    assert_eq!(details.author.as_deref(), Some("Videolan"));
    assert_eq!(details.license.as_deref(), Some("GPL-2.0-or-later"));
    assert_eq!(details.license_url.as_deref(), Some("https://www.videolan.org/legal.html"));
    assert_eq!(details.release_notes.as_deref(), Some("Line one\nLine two"));
    assert_eq!(details.installer_hash.as_deref(), Some("sha256hash64"));
    assert_eq!(details.architectures, vec!["32bit", "64bit"]);
    assert_eq!(
        details.release_notes_url.as_deref(),
        Some("https://www.videolan.org/vlc/download-windows.html")
    );
}

#[test]
fn single_url_manifest_and_github_release_page() {
    let manifest = parse_manifest(
        r#"{"version":"1.2","homepage":"https://github.com/sharkdp/bat","license":"MIT",
            "url":"https://github.com/sharkdp/bat/releases/download/v1.2/bat.zip","hash":"abc",
            "innosetup":true}"#,
    )
    .expect("manifest");
    let mut details = PackageDetails::new(package("bat", "Scoop: main"));
    apply_manifest(&mut details, &manifest);

    assert_eq!(details.author.as_deref(), Some("sharkdp"));
    assert_eq!(details.license.as_deref(), Some("MIT"));
    assert_eq!(details.installer_type.as_deref(), Some("Inno Setup"));
    assert_eq!(
        details.release_notes_url.as_deref(),
        Some("https://github.com/sharkdp/bat/releases/tag/v1.2")
    );
}

#[test]
fn string_checkver_is_ignored() {
    let manifest = parse_manifest(r#"{"version":"1.0","checkver":"github"}"#).expect("manifest");
    let mut details = PackageDetails::new(package("tool", "Scoop: main"));
    apply_manifest(&mut details, &manifest);
    assert!(details.release_notes_url.is_none());
}

#[test]
fn info_lines() {
    let mut details = PackageDetails::new(package("git", "Scoop: main"));
    apply_info(
        &mut details,
        "Name        : git\nUpdated at  : 23/02/2024 10:12:11\nUpdated by  : github-actions[bot]\n",
    );
    assert_eq!(details.publisher.as_deref(), Some("github-actions[bot]"));
    assert_eq!(details.update_date.as_deref(), Some("23/02/2024 10:12:11"));
}

#[test]
fn commands_prefix_bucket_and_scope() {
    let manager = manager();
    let vlc = package("vlc", "Scoop: extras");
    let options = InstallationOptions {
        architecture: Some("64bit".into()),
        scope: Some(InstallationScope::Machine),
        skip_hash_check: true,
        interactive: true,
        version: Some("3.0.0".into()),
        ..Default::default()
    };
    let args = manager
        .operation_command(OperationKind::Install, &vlc, &options)
        .expect("command")
        .args;
    let tail: Vec<&str> = args.iter().map(String::as_str).skip_while(|a| *a != "install").collect();
    assert_eq!(tail, vec!["install", "extras/vlc", "--arch", "64bit", "--global", "--skip-hash-check"]);

    let global_git = package("git", "Scoop (Global): main");
    let options = InstallationOptions {
        remove_data_on_uninstall: true,
        ..Default::default()
    };
    let args = manager
        .operation_command(OperationKind::Uninstall, &global_git, &options)
        .expect("command")
        .args;
    assert!(args.ends_with(&["uninstall".to_string(), "main/git".to_string(), "--global".to_string(), "--purge".to_string()]));
}

#[test]
fn elevated_runs_add_global_once() {
    let manager = manager();
    let git = package("git", "Scoop (Global): main");
    let options = InstallationOptions {
        run_as_administrator: true,
        ..Default::default()
    };
    let spec = manager
        .operation_command(OperationKind::Update, &git, &options)
        .expect("command");
    assert_eq!(spec.program, manager.context().elevator());
    assert_eq!(spec.args.iter().filter(|a| *a == "--global").count(), 1);
}

#[test]
fn outcome_table() {
    let rules = &INSTALL_RULES;
    assert_eq!(
        rules.classify(Some(0), "Installing 'git'\n'git' (2.44.0) was installed successfully!", false),
        OperationOutcome::Succeeded
    );
    assert_eq!(rules.classify(Some(1), "'git' is already installed.", false), OperationOutcome::Succeeded);
    assert_eq!(
        rules.classify(Some(1), "ERROR: you need admin rights to install global apps", false),
        OperationOutcome::NeedsElevation
    );
    assert_eq!(
        rules.classify(Some(1), "Use 'scoop install git -g' to install globally", false),
        OperationOutcome::NeedsScoopElevation
    );
    assert_eq!(
        rules.classify(Some(1), "Use 'scoop install git -g' to install globally", true),
        OperationOutcome::Failed
    );
    assert_eq!(
        rules.classify(Some(0), "Latest versions for all apps are installed.", false),
        OperationOutcome::NoApplicableUpdateFound
    );

    let uninstall = &UNINSTALL_RULES;
    assert_eq!(uninstall.classify(Some(0), "'git' was uninstalled.", false), OperationOutcome::Succeeded);
    assert_eq!(
        uninstall.classify(Some(1), "'git' isn't installed. Try with -g", false),
        OperationOutcome::NeedsScoopElevation
    );
}
