use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::PublishConfig;
use crate::manifest::{self, NavEntry};
use crate::transform::{HOME_NAME, TransformOptions, page_name, transform_page};

/// Version-control subdirectory preserved when clearing the destination.
pub const VCS_DIR: &str = ".git";
/// Generated index page listing every published page in manifest order.
pub const SIDEBAR_FILE: &str = "_Sidebar.md";
/// Fallback home page source when the configured root document is absent.
pub const README_DOC: &str = "README.md";

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub pages: usize,
    pub cleared_entries: usize,
    pub warnings: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub nav_entries: usize,
    pub pages: usize,
    pub unlisted: Vec<String>,
    pub warnings: Vec<String>,
}

/// One transformed page, keyed by its flattened wiki name.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub flat_name: String,
    pub content: String,
}

fn transform_options(config: &PublishConfig) -> TransformOptions {
    TransformOptions {
        image_base: config.image_base(),
        docs_prefix: config.docs_prefix.clone(),
        root_doc: config.root_doc.clone(),
    }
}

/// Read and transform every leaf entry, in manifest order. A flat-name
/// collision is a configuration error and aborts before any write.
pub fn build_pages(
    config: &PublishConfig,
    entries: &[NavEntry],
) -> Result<(Vec<PageRecord>, Vec<String>)> {
    let options = transform_options(config);
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for leaf in manifest::leaves(entries) {
        let source_rel = leaf
            .path
            .as_deref()
            .unwrap_or_default()
            .trim_start_matches("./")
            .to_string();
        let name = page_name(&source_rel, &config.root_doc);
        if let Some(previous) = seen.insert(name.clone(), source_rel.clone()) {
            bail!("flat name `{name}` collides: `{previous}` and `{source_rel}`");
        }
        let source = config.docs_dir.join(&source_rel);
        let raw = fs::read_to_string(&source)
            .with_context(|| format!("failed to read {}", source.display()))?;
        let transformed = transform_page(&source_rel, &raw, &options);
        warnings.extend(transformed.warnings);
        records.push(PageRecord {
            flat_name: name,
            content: transformed.content,
        });
    }
    Ok((records, warnings))
}

/// Run the full pipeline: read manifest, transform pages, rewrite the
/// destination. Structural errors abort before the destination is touched;
/// a write error leaves already-written files in place.
pub fn publish(config: &PublishConfig, options: &PublishOptions) -> Result<PublishReport> {
    let manifest = manifest::load_manifest(&config.manifest_path)?;
    manifest::validate_sources(&config.docs_dir, &manifest.nav)?;

    let (mut records, mut warnings) = build_pages(config, &manifest.nav)?;
    if !records.iter().any(|record| record.flat_name == HOME_NAME) {
        let (root_rel, root_source) = resolve_root_doc(config)?;
        let raw = fs::read_to_string(&root_source)
            .with_context(|| format!("failed to read {}", root_source.display()))?;
        let transformed = transform_page(&root_rel, &raw, &transform_options(config));
        warnings.extend(transformed.warnings);
        records.insert(
            0,
            PageRecord {
                flat_name: HOME_NAME.to_string(),
                content: transformed.content,
            },
        );
    }
    let sidebar = render_sidebar(&manifest.nav, manifest.site_name.as_deref(), &config.root_doc);

    if options.dry_run {
        return Ok(PublishReport {
            pages: records.len(),
            cleared_entries: 0,
            warnings,
            dry_run: true,
        });
    }

    let cleared_entries = clear_destination(&config.destination)?;
    for record in &records {
        write_page(
            &config.destination,
            &format!("{}.md", record.flat_name),
            &record.content,
        )?;
    }
    write_page(&config.destination, SIDEBAR_FILE, &sidebar)?;

    Ok(PublishReport {
        pages: records.len(),
        cleared_entries,
        warnings,
        dry_run: false,
    })
}

/// Locate the home page source: the configured root document, falling back
/// to a README at the docs root, then one level above it.
fn resolve_root_doc(config: &PublishConfig) -> Result<(String, PathBuf)> {
    let configured = config.docs_dir.join(&config.root_doc);
    if configured.is_file() {
        return Ok((config.root_doc.clone(), configured));
    }
    let docs_readme = config.docs_dir.join(README_DOC);
    if docs_readme.is_file() {
        return Ok((README_DOC.to_string(), docs_readme));
    }
    if let Some(parent) = config.docs_dir.parent() {
        let repo_readme = parent.join(README_DOC);
        if repo_readme.is_file() {
            return Ok((README_DOC.to_string(), repo_readme));
        }
    }
    bail!(
        "root document missing: {} (no {README_DOC} fallback found)",
        configured.display()
    );
}

/// Validate the manifest and page set without touching the destination.
pub fn check(config: &PublishConfig) -> Result<CheckReport> {
    let manifest = manifest::load_manifest(&config.manifest_path)?;
    manifest::validate_sources(&config.docs_dir, &manifest.nav)?;
    let (records, warnings) = build_pages(config, &manifest.nav)?;
    let unlisted = unlisted_pages(&config.docs_dir, &manifest.nav)?;
    Ok(CheckReport {
        nav_entries: manifest::leaves(&manifest.nav).len(),
        pages: records.len(),
        unlisted,
        warnings,
    })
}

/// Markdown pages present under the docs root but absent from the manifest.
pub fn unlisted_pages(docs_dir: &Path, entries: &[NavEntry]) -> Result<Vec<String>> {
    let referenced: HashSet<String> = manifest::leaves(entries)
        .iter()
        .filter_map(|leaf| leaf.path.as_deref())
        .map(|path| path.trim_start_matches("./").to_string())
        .collect();

    let mut unlisted = Vec::new();
    for entry in WalkDir::new(docs_dir) {
        let entry = entry.context("failed to scan docs tree")?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|ext| ext.to_str()) != Some("md") {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(docs_dir)
            .context("docs entry outside docs root")?
            .to_string_lossy()
            .replace('\\', "/");
        if !referenced.contains(&relative) {
            unlisted.push(relative);
        }
    }
    unlisted.sort();
    Ok(unlisted)
}

/// Remove every entry under the destination except the reserved
/// version-control subdirectory. Creates the destination when missing.
pub fn clear_destination(destination: &Path) -> Result<usize> {
    if !destination.exists() {
        fs::create_dir_all(destination)
            .with_context(|| format!("failed to create {}", destination.display()))?;
        return Ok(0);
    }
    let mut removed = 0;
    let listing = fs::read_dir(destination)
        .with_context(|| format!("failed to read {}", destination.display()))?;
    for entry in listing {
        let entry =
            entry.with_context(|| format!("failed to read {}", destination.display()))?;
        if entry.file_name() == VCS_DIR {
            continue;
        }
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to stat {}", path.display()))?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        } else {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        removed += 1;
    }
    Ok(removed)
}

fn write_page(destination: &Path, file_name: &str, content: &str) -> Result<()> {
    let path = destination.join(file_name);
    fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Serialize the navigation tree into the sidebar index: the site name as a
/// header, then sections as bold items, leaves as wiki links, nesting as
/// two-space indentation.
pub fn render_sidebar(entries: &[NavEntry], site_name: Option<&str>, root_doc: &str) -> String {
    let mut out = String::new();
    if let Some(site_name) = site_name {
        out.push_str(&format!("## {site_name}\n\n"));
    }
    out.push_str("### Table of Contents\n\n");
    render_sidebar_level(entries, root_doc, 0, &mut out);
    out
}

fn render_sidebar_level(entries: &[NavEntry], root_doc: &str, depth: usize, out: &mut String) {
    for entry in entries {
        for _ in 0..depth {
            out.push_str("  ");
        }
        match entry.path.as_deref() {
            Some(path) => {
                let name = page_name(path.trim_start_matches("./"), root_doc);
                out.push_str(&format!("- [{}]({name})\n", entry.title));
            }
            None => out.push_str(&format!("- **{}**\n", entry.title)),
        }
        render_sidebar_level(&entry.children, root_doc, depth + 1, out);
    }
}
