//! PyPI JSON API (`/pypi/<project>/json`) for pip package details.

use crate::core::PackageDetails;
use crate::error::Result;
use crate::utils::remote;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const PROJECT_PAGE: &str = "https://pypi.org/project";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
pub struct PypiProject {
    pub info: PypiInfo,
    #[serde(default)]
    pub urls: Vec<PypiFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PypiInfo {
    pub author: Option<String>,
    pub home_page: Option<String>,
    pub package_url: Option<String>,
    pub summary: Option<String>,
    pub classifiers: Vec<String>,
    pub license: Option<String>,
    pub maintainer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PypiFile {
    pub upload_time: Option<String>,
    pub url: Option<String>,
    pub size: Option<u64>,
    pub digests: PypiDigests,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PypiDigests {
    pub sha256: Option<String>,
}

pub struct PypiClient {
    client: Client,
    base_url: String,
}

impl PypiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: remote::client(REQUEST_TIMEOUT)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn project(&self, id: &str) -> Result<PypiProject> {
        remote::fetch_json(&self.client, &format!("{}/{}/json", self.base_url, id))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Links that only depend on the project name.
pub fn apply_defaults(details: &mut PackageDetails) {
    let page = format!("{}/{}/", PROJECT_PAGE, details.package.id);
    details.release_notes_url = Some(format!("{}#history", page));
    details.installer_url = Some(format!("{}#files", page));
    details.manifest_url = Some(page);
    details.scopes = vec!["User".to_string()];
    details.installer_type = Some("Pip".to_string());
}

/// `whl` -> `Wheel`, `gz` -> `Gz`.
fn installer_type(url: &str) -> Option<String> {
    let extension = url.rsplit('/').next()?.rsplit_once('.')?.1;
    let mut chars = extension.chars();
    let first = chars.next()?;
    let capitalized: String = first.to_uppercase().chain(chars).collect();
    Some(if capitalized == "Whl" { "Wheel".to_string() } else { capitalized })
}

pub fn apply_project(details: &mut PackageDetails, project: &PypiProject) {
    let info = &project.info;

    if let Some(author) = non_empty(&info.author) {
        details.author = Some(author);
    }
    if let Some(home) = non_empty(&info.home_page) {
        details.homepage_url = Some(home);
    }
    if let Some(url) = non_empty(&info.package_url) {
        details.manifest_url = Some(url);
    }
    if let Some(summary) = non_empty(&info.summary) {
        details.description = Some(summary);
    }

    for classifier in &info.classifiers {
        if classifier.starts_with("License ::") {
            if let Some(last) = classifier.rsplit("::").next() {
                details.license = Some(last.trim().to_string());
            }
        } else if classifier.starts_with("Topic ::")
            && let Some(last) = classifier.rsplit("::").next()
        {
            details.push_tag(last.trim());
        }
    }

    // long license texts are pasted verbatim by some projects
    if let Some(license) = non_empty(&info.license)
        && !license.contains('\n')
    {
        details.license = Some(license);
    }
    if let Some(maintainer) = non_empty(&info.maintainer) {
        details.publisher = Some(maintainer);
    }

    if let Some(file) = project.urls.first() {
        if let Some(uploaded) = non_empty(&file.upload_time) {
            details.update_date = Some(uploaded);
        }
        if let Some(url) = non_empty(&file.url) {
            details.installer_type = installer_type(&url);
            details.installer_url = Some(url);
        }
        if let Some(size) = file.size {
            details.installer_size_mb = Some(size as f64 / 1_000_000.0);
        }
        if let Some(hash) = non_empty(&file.digests.sha256) {
            details.installer_hash = Some(hash);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Backend, Package};

    const REQUESTS: &str = r#"{
        "info": {
            "author": "Kenneth Reitz",
            "home_page": "https://requests.readthedocs.io",
            "package_url": "https://pypi.org/project/requests/",
            "summary": "Python HTTP for Humans.",
            "classifiers": [
                "License :: OSI Approved :: Apache Software License",
                "Topic :: Internet :: WWW/HTTP",
                "Topic :: Software Development :: Libraries"
            ],
            "license": "Apache 2.0",
            "maintainer": ""
        },
        "urls": [
            {
                "upload_time": "2024-05-29T15:37:47",
                "url": "https://files.pythonhosted.org/packages/f9/requests-2.32.3-py3-none-any.whl",
                "size": 64928,
                "digests": {"sha256": "70761cfe03c773ceb22aa2f671b4757976145175cdfca038c02654d061d6dcc6"}
            }
        ]
    }"#;

    fn details() -> PackageDetails {
        PackageDetails::new(Package::new("Requests", "requests", "2.32.3", "Pip", Backend::Pip))
    }

    #[test]
    fn defaults_point_at_project_page() {
        let mut details = details();
        apply_defaults(&mut details);
        assert_eq!(details.manifest_url.as_deref(), Some("https://pypi.org/project/requests/"));
        assert_eq!(
            details.release_notes_url.as_deref(),
            Some("https://pypi.org/project/requests/#history")
        );
        assert_eq!(details.scopes, vec!["User"]);
    }

    #[test]
    fn project_json_fills_details() {
        let project: PypiProject = serde_json::from_str(REQUESTS).unwrap();
        let mut details = details();
        apply_defaults(&mut details);
        apply_project(&mut details, &project);

        assert_eq!(details.author.as_deref(), Some("Kenneth Reitz"));
        assert_eq!(details.description.as_deref(), Some("Python HTTP for Humans."));
        assert_eq!(details.license.as_deref(), Some("Apache 2.0"));
        assert!(details.publisher.is_none());
        assert_eq!(details.tags, vec!["WWW/HTTP", "Libraries"]);
        assert_eq!(details.installer_type.as_deref(), Some("Wheel"));
        assert_eq!(details.installer_size_mb, Some(0.064928));
        assert_eq!(details.update_date.as_deref(), Some("2024-05-29T15:37:47"));
        assert!(details.installer_hash.as_deref().unwrap().starts_with("70761cfe"));
    }

    #[test]
    fn classifier_license_is_used_without_license_field() {
        let project: PypiProject = serde_json::from_str(
            r#"{"info":{"license":"","classifiers":["License :: OSI Approved :: MIT License"]}}"#,
        )
        .unwrap();
        let mut details = details();
        apply_project(&mut details, &project);
        assert_eq!(details.license.as_deref(), Some("MIT License"));
        assert!(details.installer_url.is_none());
    }

    #[test]
    fn sdist_extension() {
        assert_eq!(installer_type("https://host/pkg-1.0.tar.gz").as_deref(), Some("Gz"));
        assert_eq!(installer_type("https://host/pkg-1.0-py3-none-any.whl").as_deref(), Some("Wheel"));
    }

    #[test]
    fn client_fetches_project_json() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/requests/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(REQUESTS)
            .create();

        let client = PypiClient::new(&format!("{}/", server.url())).unwrap();
        let project = client.project("requests").unwrap();
        assert_eq!(project.info.author.as_deref(), Some("Kenneth Reitz"));
        assert_eq!(project.urls.len(), 1);
        mock.assert();
    }
}
