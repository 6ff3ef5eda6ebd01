//! Input validation for values spliced into package-manager command lines.
//!
//! Scoop runs through `powershell -Command`, so ids that reach a shell must
//! never carry shell metacharacters. Backends whose ids travel as a single
//! argv entry only need [`validate_argument_id`].

use crate::error::{PkgBridgeError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Safe characters for package ids across winget, Chocolatey, Scoop and pip.
/// Allows: alphanumeric, dash, underscore, dot, plus, at sign, slash (bucket prefixes)
static SAFE_PACKAGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9@._+/-]+$").expect("Invalid regex pattern"));

/// Version pins additionally allow `!` (PEP 440 epochs) and `~`.
static SAFE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._+!~-]+$").expect("Invalid regex pattern"));

/// Characters that could be dangerous in shell contexts
static SHELL_DANGEROUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[;`$(){}|&<>\\'"\n\r\t ]"#).expect("Invalid regex pattern"));

const MAX_ID_LEN: usize = 256;

/// Validate a package id is safe to pass to a backend executable
pub fn validate_package_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(PkgBridgeError::InvalidPackageId(
            "Package id cannot be empty".to_string(),
        ));
    }

    if id.len() > MAX_ID_LEN {
        return Err(PkgBridgeError::InvalidPackageId(format!(
            "Package id too long (max {} chars): {}...",
            MAX_ID_LEN,
            id.chars().take(50).collect::<String>()
        )));
    }

    if SHELL_DANGEROUS.is_match(id) {
        return Err(PkgBridgeError::InvalidPackageId(format!(
            "Package id contains unsafe characters: {}",
            id
        )));
    }

    if !SAFE_PACKAGE_ID.is_match(id) {
        return Err(PkgBridgeError::InvalidPackageId(format!(
            "Package id contains invalid characters: {}",
            id
        )));
    }

    if id.contains("..") {
        return Err(PkgBridgeError::InvalidPackageId(format!(
            "Package id cannot contain path traversal: {}",
            id
        )));
    }

    Ok(())
}

/// Looser check for ids passed as one argv entry with no shell in between,
/// such as winget's `{GUID}` and `ARP\Machine\...` ids.
pub fn validate_argument_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(PkgBridgeError::InvalidPackageId(
            "Package id cannot be empty".to_string(),
        ));
    }

    if id.len() > MAX_ID_LEN {
        return Err(PkgBridgeError::InvalidPackageId(format!(
            "Package id too long (max {} chars): {}...",
            MAX_ID_LEN,
            id.chars().take(50).collect::<String>()
        )));
    }

    if id.chars().any(char::is_control) {
        return Err(PkgBridgeError::InvalidPackageId(format!(
            "Package id contains control characters: {:?}",
            id
        )));
    }

    // would be read as a flag
    if id.starts_with('-') {
        return Err(PkgBridgeError::InvalidPackageId(format!(
            "Package id cannot start with '-': {}",
            id
        )));
    }

    if id.contains("..") {
        return Err(PkgBridgeError::InvalidPackageId(format!(
            "Package id cannot contain path traversal: {}",
            id
        )));
    }

    Ok(())
}

/// Validate a version pin
pub fn validate_version(version: &str) -> Result<()> {
    if version.is_empty() || !SAFE_VERSION.is_match(version) {
        return Err(PkgBridgeError::InvalidPackageId(format!(
            "Invalid version pin: '{}'",
            version
        )));
    }
    Ok(())
}

/// Shorten a command line for log output.
/// This does NOT make a command safe to execute
pub fn sanitize_for_display(input: &str) -> String {
    if input.chars().count() > 200 {
        format!("{}...", input.chars().take(200).collect::<String>())
    } else {
        input.to_string()
    }
}
