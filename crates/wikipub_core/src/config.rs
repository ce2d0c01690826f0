use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DOCS_DIR: &str = "docs";
pub const DEFAULT_MANIFEST: &str = "mkdocs.yml";
pub const DEFAULT_DESTINATION: &str = "wiki";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_ROOT_DOC: &str = "index.md";
pub const DEFAULT_RAW_HOST: &str = "raw.githubusercontent.com";

/// On-disk configuration file (`wikipub.toml`).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub publish: PublishSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct PublishSection {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub raw_host: Option<String>,
    pub docs_dir: Option<String>,
    pub docs_prefix: Option<String>,
    pub manifest: Option<String>,
    pub destination: Option<String>,
    pub root_doc: Option<String>,
}

/// Load and parse a ConfigFile from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<ConfigFile> {
    if !config_path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// CLI flag values, each taking precedence over env and config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub docs_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub root_doc: Option<String>,
}

/// Fully resolved publisher configuration, read-only for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: String,
    pub raw_host: String,
    pub docs_dir: PathBuf,
    /// Path of the docs directory inside the repository, used as the URL
    /// segment between the branch and the image path. Defaults to the
    /// configured docs dir, normalized.
    pub docs_prefix: String,
    pub manifest_path: PathBuf,
    pub destination: PathBuf,
    pub root_doc: String,
}

impl PublishConfig {
    /// Resolve each key as flag > env (`WIKIPUB_*`) > config file > default.
    pub fn resolve(file: &ConfigFile, overrides: &ConfigOverrides) -> Self {
        Self::resolve_with_lookup(file, overrides, |key| env::var(key).ok())
    }

    pub fn resolve_with_lookup(
        file: &ConfigFile,
        overrides: &ConfigOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let section = &file.publish;
        let pick_opt = |flag: &Option<String>, env_key: &str, from_file: &Option<String>| {
            if let Some(value) = flag {
                return Some(value.clone());
            }
            if let Some(value) = lookup(env_key) {
                let trimmed = value.trim().to_string();
                if !trimmed.is_empty() {
                    return Some(trimmed);
                }
            }
            from_file.clone()
        };
        let pick = |flag: &Option<String>, env_key: &str, from_file: &Option<String>, default: &str| {
            pick_opt(flag, env_key, from_file).unwrap_or_else(|| default.to_string())
        };
        let pick_path =
            |flag: &Option<PathBuf>, env_key: &str, from_file: &Option<String>, default: &str| {
                if let Some(value) = flag {
                    return value.clone();
                }
                PathBuf::from(pick(&None, env_key, from_file, default))
            };

        let docs_dir = pick_path(
            &overrides.docs_dir,
            "WIKIPUB_DOCS_DIR",
            &section.docs_dir,
            DEFAULT_DOCS_DIR,
        );
        let docs_prefix = normalize_prefix(&pick(
            &None,
            "WIKIPUB_DOCS_PREFIX",
            &section.docs_prefix,
            &docs_dir.to_string_lossy(),
        ));

        Self {
            owner: pick_opt(&overrides.owner, "WIKIPUB_OWNER", &section.owner),
            repo: pick_opt(&overrides.repo, "WIKIPUB_REPO", &section.repo),
            branch: pick(
                &overrides.branch,
                "WIKIPUB_BRANCH",
                &section.branch,
                DEFAULT_BRANCH,
            ),
            raw_host: pick(&None, "WIKIPUB_RAW_HOST", &section.raw_host, DEFAULT_RAW_HOST),
            docs_dir,
            docs_prefix,
            manifest_path: pick_path(
                &overrides.manifest,
                "WIKIPUB_MANIFEST",
                &section.manifest,
                DEFAULT_MANIFEST,
            ),
            destination: pick_path(
                &overrides.destination,
                "WIKIPUB_DEST",
                &section.destination,
                DEFAULT_DESTINATION,
            ),
            root_doc: pick(
                &overrides.root_doc,
                "WIKIPUB_ROOT_DOC",
                &section.root_doc,
                DEFAULT_ROOT_DOC,
            ),
        }
    }

    /// Absolute raw-content URL prefix up to the branch, or `None` when the
    /// repository coordinates are not configured.
    pub fn image_base(&self) -> Option<String> {
        let owner = self.owner.as_deref()?;
        let repo = self.repo.as_deref()?;
        Some(format!(
            "https://{}/{owner}/{repo}/{}",
            self.raw_host, self.branch
        ))
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "owner={}\nrepo={}\nbranch={}\nraw_host={}\ndocs_dir={}\ndocs_prefix={}\nmanifest={}\ndestination={}\nroot_doc={}",
            self.owner.as_deref().unwrap_or("<unset>"),
            self.repo.as_deref().unwrap_or("<unset>"),
            self.branch,
            self.raw_host,
            self.docs_dir.display(),
            self.docs_prefix,
            self.manifest_path.display(),
            self.destination.display(),
            self.root_doc,
        )
    }
}

fn normalize_prefix(raw: &str) -> String {
    raw.replace('\\', "/")
        .trim_start_matches("./")
        .trim_end_matches('/')
        .to_string()
}
