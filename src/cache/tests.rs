use super::*;
use tempfile::TempDir;

fn row(id: &str, source: &str) -> CacheRow {
    CacheRow::new(id.to_uppercase(), id, "1.0", source)
}

#[test]
fn line_escaping_survives_awkward_fields() {
    let original = CacheRow::new("Tool, Deluxe", "vendor.tool", "100%", "bucket\r\nextras");
    let line = original.to_line();
    assert_eq!(line.split(',').count(), 4);
    assert!(!line.contains('\n'));
    assert_eq!(CacheRow::from_line(&line), Some(original));
}

#[test]
fn malformed_lines_are_dropped() {
    assert_eq!(CacheRow::from_line("only,three,fields"), None);
    assert_eq!(CacheRow::from_line("a,b,c,d,e"), None);
    assert_eq!(CacheRow::from_line("Name,,1.0,main"), None);
}

#[test]
fn stray_percent_is_kept_verbatim() {
    let row = CacheRow::from_line("50%off,id,1.0,%ZZ").expect("row");
    assert_eq!(row.name, "50%off");
    assert_eq!(row.source, "%ZZ");
}

#[test]
fn absent_and_empty_are_distinct() {
    let dir = TempDir::new().expect("tempdir");
    let store = CacheStore::new(dir.path());
    assert_eq!(store.read(Backend::Scoop).expect("read"), CacheSnapshot::Absent);

    fs::write(store.path_for(Backend::Scoop), "").expect("truncate");
    assert_eq!(store.read(Backend::Scoop).expect("read"), CacheSnapshot::Empty);
}

#[test]
fn cache_files_are_per_backend() {
    let dir = TempDir::new().expect("tempdir");
    let store = CacheStore::new(dir.path());
    store.write(Backend::Choco, &[row("git", "chocolatey")]).expect("write");

    assert!(store.path_for(Backend::Choco).ends_with("ChocolateyCachedPackages"));
    assert_eq!(store.read(Backend::Winget).expect("read"), CacheSnapshot::Absent);
}

#[test]
fn merge_keeps_missing_old_rows_without_duplicates() {
    let old = vec![row("git", "main"), row("vlc", "extras"), row("git", "versions")];
    let mut updated_git = row("git", "main");
    updated_git.version = "2.0".to_string();
    let fresh = vec![updated_git.clone(), row("7zip", "main"), row("7zip", "main")];

    let merged = merge(old, fresh);
    assert_eq!(merged.len(), 4);
    assert!(merged.contains(&updated_git));
    assert!(merged.contains(&row("vlc", "extras")));
    assert!(merged.contains(&row("git", "versions")));

    let keys: HashSet<_> = merged.iter().map(CacheRow::key).collect();
    assert_eq!(keys.len(), merged.len());
}

#[test]
fn refresh_merges_into_existing_file() {
    let dir = TempDir::new().expect("tempdir");
    let store = CacheStore::new(dir.path());
    store.write(Backend::Scoop, &[row("vlc", "extras")]).expect("write");

    let count = store.refresh(Backend::Scoop, vec![row("git", "main")]).expect("refresh");
    assert_eq!(count, 2);

    let CacheSnapshot::Rows(rows) = store.read(Backend::Scoop).expect("read") else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 2);
}

#[test]
fn clear_removes_requested_caches() {
    let dir = TempDir::new().expect("tempdir");
    let store = CacheStore::new(dir.path());
    store.write(Backend::Choco, &[row("git", "chocolatey")]).expect("write");
    store.write(Backend::Winget, &[row("Git.Git", "winget")]).expect("write");

    assert_eq!(store.clear(Some(Backend::Choco)).expect("clear"), 1);
    assert_eq!(store.read(Backend::Choco).expect("read"), CacheSnapshot::Absent);
    assert_eq!(store.clear(None).expect("clear all"), 1);
    assert_eq!(store.read(Backend::Winget).expect("read"), CacheSnapshot::Absent);
}
