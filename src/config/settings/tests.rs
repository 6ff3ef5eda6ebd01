use super::*;
use tempfile::TempDir;

fn settings_in(dir: &TempDir) -> Settings {
    Settings::load_from(dir.path().join("settings.kdl")).expect("load settings")
}

#[test]
fn test_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let settings = settings_in(&dir);
    assert_eq!(settings.command_timeout_secs(), 300);
    assert_eq!(settings.pypi_url(), DEFAULT_PYPI_URL);
    assert!(settings.disabled_backends().is_empty());
    assert_eq!(settings.get("elevator"), None);
}

#[test]
fn test_parse_settings_block() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("settings.kdl");
    fs::write(
        &path,
        r#"
settings {
    disabled "scoop, pip"
    command-timeout 45
    elevator "C:\\Tools\\gsudo.exe"
}
"#,
    )
    .expect("write");

    let settings = Settings::load_from(path).expect("load");
    assert_eq!(settings.disabled_backends(), vec![Backend::Scoop, Backend::Pip]);
    assert_eq!(settings.command_timeout_secs(), 45);
    assert_eq!(settings.get("elevator"), Some("C:\\Tools\\gsudo.exe"));
}

#[test]
fn test_set_persists_and_reloads() {
    let dir = TempDir::new().expect("tempdir");
    let mut settings = settings_in(&dir);
    settings.set("disabled", "choco").expect("set disabled");
    settings.set("python", "C:\\Python312\\python.exe").expect("set python");

    let reloaded = settings_in(&dir);
    assert_eq!(reloaded.disabled_backends(), vec![Backend::Choco]);
    assert_eq!(reloaded.get("python"), Some("C:\\Python312\\python.exe"));
}

#[test]
fn test_reset_restores_default() {
    let dir = TempDir::new().expect("tempdir");
    let mut settings = settings_in(&dir);
    settings.set("command-timeout", "10").expect("set");
    settings.reset("command-timeout").expect("reset");
    assert_eq!(settings_in(&dir).command_timeout_secs(), 300);
}

#[test]
fn test_validate_key_invalid() {
    assert!(validate_key("disabled").is_ok());
    assert!(validate_key("progress").is_err());
}

#[test]
fn test_validate_values() {
    assert!(validate_value("disabled", "winget,chocolatey").is_ok());
    assert!(validate_value("disabled", "apt").is_err());
    assert!(validate_value("command-timeout", "0").is_err());
    assert!(validate_value("command-timeout", "abc").is_err());
    assert!(validate_value("pypi-url", "ftp://example").is_err());
    assert!(validate_value("color", "never").is_ok());
    assert!(validate_value("color", "sometimes").is_err());
}

#[test]
fn test_unknown_keys_are_dropped() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("settings.kdl");
    fs::write(&path, "settings {\n    theme \"dark\"\n}\n").expect("write");
    let settings = Settings::load_from(path).expect("load");
    assert!(!settings.all().contains_key("theme"));
}
