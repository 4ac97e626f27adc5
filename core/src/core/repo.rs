use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use url::Url;

use crate::utils::error::{PdlError, PdlResult};

/// Name of a hosting service, e.g. `gitee` or `github`.
pub type ProviderId = String;

const BUILTIN_CATALOG: &str = include_str!("../../assets/projects.toml");

/// A project and the equivalent clone urls offered by each provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryDescriptor {
    pub name: String,
    pub remotes: BTreeMap<ProviderId, String>,
    #[serde(default)]
    pub auth: BTreeSet<ProviderId>,
}

impl RepositoryDescriptor {
    pub fn remote_url(&self, provider: &str) -> Option<&str> {
        self.remotes.get(provider).map(String::as_str)
    }

    pub fn requires_auth(&self, provider: &str) -> bool {
        self.auth.contains(provider)
    }

    pub fn local_path(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(&self.name)
    }
}

/// Ordered list of known projects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(rename = "project", default)]
    projects: Vec<RepositoryDescriptor>,
}

impl Catalog {
    /// catalog shipped with the binary
    pub fn builtin() -> PdlResult<Self> {
        Self::from_toml(BUILTIN_CATALOG).context(PdlError::CatalogLoadFailed("<builtin>".into()))
    }

    pub fn load(path: impl AsRef<Path>) -> PdlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| PdlError::CatalogLoadFailed(path.display().to_string()))?;
        Self::from_toml(&content)
            .with_context(|| PdlError::CatalogLoadFailed(path.display().to_string()))
    }

    pub fn from_toml(content: &str) -> PdlResult<Self> {
        let catalog: Catalog = toml::from_str(content)?;

        let mut names = BTreeSet::new();
        for project in &catalog.projects {
            if project.name.trim().is_empty() {
                return Err(anyhow!("project with empty name"));
            }
            if project.remotes.is_empty() {
                return Err(anyhow!("project {} has no remotes", project.name));
            }
            if !names.insert(project.name.as_str()) {
                return Err(anyhow!("duplicate project {}", project.name));
            }
        }

        Ok(catalog)
    }

    pub fn projects(&self) -> &[RepositoryDescriptor] {
        &self.projects
    }

    pub fn get(&self, name: &str) -> Option<&RepositoryDescriptor> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// every provider offered by at least one project
    pub fn providers(&self) -> BTreeSet<&str> {
        self.projects
            .iter()
            .flat_map(|p| p.remotes.keys())
            .map(String::as_str)
            .collect()
    }
}

/// Username and password typed by the user.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Embed percent-encoded credentials into an http(s) clone url.
pub fn authenticated_url(url: &str, credentials: &Credentials) -> PdlResult<String> {
    let mut parsed = Url::parse(url).map_err(|_| PdlError::InvalidUrl(redact_url(url)))?;
    parsed
        .set_username(&credentials.username)
        .and_then(|_| parsed.set_password(Some(&credentials.password)))
        .map_err(|_| PdlError::InvalidUrl(redact_url(url)))?;
    Ok(parsed.to_string())
}

/// Url with any embedded password masked, safe to log.
pub fn redact_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

/// Mask every occurrence of the password in `text`, raw or percent-encoded.
pub fn scrub_secret(text: &str, credentials: &Credentials) -> String {
    let password = &credentials.password;
    if password.is_empty() {
        return text.to_string();
    }

    let encoded = Url::parse("https://localhost/").ok().and_then(|mut probe| {
        probe.set_password(Some(password)).ok()?;
        probe.password().map(str::to_string)
    });

    let mut text = text.replace(password.as_str(), "***");
    if let Some(encoded) = encoded {
        text = text.replace(&encoded, "***");
    }
    text
}
