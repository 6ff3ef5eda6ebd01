//! Lazily populated package metadata.
//!
//! Every scalar field starts out unknown (`None`) and is filled in as each
//! piece of backend output is successfully parsed. A half-filled record is a
//! valid result; readers render missing fields with [`NOT_AVAILABLE`].

use crate::core::types::Package;
use serde::Serialize;

/// Display string for a field that could not be resolved.
pub const NOT_AVAILABLE: &str = "Not available";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDetails {
    pub package: Package,
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub homepage_url: Option<String>,
    pub license: Option<String>,
    pub license_url: Option<String>,
    pub manifest_url: Option<String>,
    pub release_notes: Option<String>,
    pub release_notes_url: Option<String>,
    pub installer_url: Option<String>,
    pub installer_hash: Option<String>,
    /// Installer size in megabytes.
    pub installer_size_mb: Option<f64>,
    pub installer_type: Option<String>,
    pub update_date: Option<String>,
    pub tags: Vec<String>,
    pub versions: Vec<String>,
    pub architectures: Vec<String>,
    pub scopes: Vec<String>,
}

impl PackageDetails {
    pub fn new(package: Package) -> Self {
        Self {
            package,
            name: None,
            description: None,
            author: None,
            publisher: None,
            homepage_url: None,
            license: None,
            license_url: None,
            manifest_url: None,
            release_notes: None,
            release_notes_url: None,
            installer_url: None,
            installer_hash: None,
            installer_size_mb: None,
            installer_type: None,
            update_date: None,
            tags: Vec::new(),
            versions: Vec::new(),
            architectures: Vec::new(),
            scopes: Vec::new(),
        }
    }

    /// Name to show: the parsed title if one was found, else the package name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.package.name)
    }

    /// Add a tag unless it is already present.
    pub fn push_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Ordered (label, value) pairs for rendering, with unknowns spelled out.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let show = |value: &Option<String>| value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let list = |values: &[String]| {
            if values.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                values.join(", ")
            }
        };

        vec![
            ("Name", self.display_name().to_string()),
            ("Id", self.package.id.clone()),
            ("Version", self.package.version.clone()),
            ("Source", self.package.source.clone()),
            ("Description", show(&self.description)),
            ("Author", show(&self.author)),
            ("Publisher", show(&self.publisher)),
            ("Homepage", show(&self.homepage_url)),
            ("License", show(&self.license)),
            ("License URL", show(&self.license_url)),
            ("Manifest", show(&self.manifest_url)),
            ("Release notes", show(&self.release_notes)),
            ("Release notes URL", show(&self.release_notes_url)),
            ("Installer URL", show(&self.installer_url)),
            ("Installer hash", show(&self.installer_hash)),
            (
                "Installer size",
                self.installer_size_mb
                    .map(|mb| format!("{:.2} MB", mb))
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            ),
            ("Installer type", show(&self.installer_type)),
            ("Updated", show(&self.update_date)),
            ("Tags", list(&self.tags)),
            ("Versions", list(&self.versions)),
            ("Architectures", list(&self.architectures)),
            ("Scopes", list(&self.scopes)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Backend;

    fn sample() -> PackageDetails {
        PackageDetails::new(Package::new("Requests", "requests", "2.31.0", "Pip", Backend::Pip))
    }

    #[test]
    fn new_details_are_all_unknown() {
        let details = sample();
        let fields = details.fields();
        let description = fields.iter().find(|(k, _)| *k == "Description").expect("field");
        assert_eq!(description.1, NOT_AVAILABLE);
        assert!(details.versions.is_empty());
    }

    #[test]
    fn push_tag_deduplicates() {
        let mut details = sample();
        details.push_tag("http");
        details.push_tag("http");
        details.push_tag("");
        assert_eq!(details.tags, vec!["http"]);
    }

    #[test]
    fn display_name_prefers_parsed_title() {
        let mut details = sample();
        assert_eq!(details.display_name(), "Requests");
        details.name = Some("Python Requests".into());
        assert_eq!(details.display_name(), "Python Requests");
    }
}
