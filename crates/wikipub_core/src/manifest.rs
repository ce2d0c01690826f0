use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_yaml::Value;

/// Parsed navigation manifest: the optional site name and the ordered
/// navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub site_name: Option<String>,
    pub nav: Vec<NavEntry>,
}

/// One node of the navigation tree. Leaf entries carry a source path
/// relative to the docs root; section entries carry children instead.
/// The tree is read-only once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub title: String,
    pub path: Option<String>,
    pub children: Vec<NavEntry>,
}

impl NavEntry {
    pub fn is_leaf(&self) -> bool {
        self.path.is_some()
    }
}

/// Collect leaf entries in manifest order.
pub fn leaves(entries: &[NavEntry]) -> Vec<&NavEntry> {
    let mut out = Vec::new();
    collect_leaves(entries, &mut out);
    out
}

fn collect_leaves<'a>(entries: &'a [NavEntry], out: &mut Vec<&'a NavEntry>) {
    for entry in entries {
        if entry.is_leaf() {
            out.push(entry);
        }
        collect_leaves(&entry.children, out);
    }
}

/// Read and parse the navigation manifest. Any structural problem is fatal.
pub fn load_manifest(manifest_path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(manifest_path)
        .with_context(|| format!("failed to read manifest {}", manifest_path.display()))?;
    parse_manifest(&content)
        .with_context(|| format!("failed to parse manifest {}", manifest_path.display()))
}

/// Parse the mkdocs-style `nav` section. Entry grammar:
/// `Title: path`, `Title: [entries...]`, or a bare `path` string whose title
/// is derived from the file stem.
pub fn parse_manifest(content: &str) -> Result<Manifest> {
    let root: Value = serde_yaml::from_str(content).context("manifest is not valid YAML")?;
    let site_name = root
        .get("site_name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let nav = match root.get("nav") {
        Some(nav) => nav,
        None => bail!("manifest has no `nav` section"),
    };
    let sequence = nav
        .as_sequence()
        .ok_or_else(|| anyhow::anyhow!("`nav` must be a sequence"))?;
    let nav = sequence
        .iter()
        .map(parse_entry)
        .collect::<Result<Vec<_>>>()?;
    Ok(Manifest { site_name, nav })
}

fn parse_entry(value: &Value) -> Result<NavEntry> {
    match value {
        Value::String(path) => Ok(NavEntry {
            title: title_from_path(path),
            path: Some(path.clone()),
            children: Vec::new(),
        }),
        Value::Mapping(mapping) => {
            let Some((key, nested)) = mapping.iter().next() else {
                bail!("empty nav entry");
            };
            if mapping.len() != 1 {
                bail!("nav entry must have exactly one title key");
            }
            let title = key
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("nav entry title must be a string"))?
                .to_string();
            match nested {
                Value::String(path) => Ok(NavEntry {
                    title,
                    path: Some(path.clone()),
                    children: Vec::new(),
                }),
                Value::Sequence(children) => Ok(NavEntry {
                    title: title.clone(),
                    path: None,
                    children: children
                        .iter()
                        .map(parse_entry)
                        .collect::<Result<Vec<_>>>()
                        .with_context(|| format!("in section `{title}`"))?,
                }),
                _ => bail!("nav entry `{title}` must map to a path or a list of entries"),
            }
        }
        _ => bail!("nav entry must be a string or a single-key mapping"),
    }
}

/// Derive a human title from a source path: file stem, separators to spaces,
/// first letter upcased.
pub fn title_from_path(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = name.strip_suffix(".md").unwrap_or(name);
    let spaced = stem.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

/// Verify that every leaf path resolves to a file under the docs root.
/// Runs before any destination mutation so a bad manifest never half-publishes.
pub fn validate_sources(docs_dir: &Path, entries: &[NavEntry]) -> Result<()> {
    for leaf in leaves(entries) {
        let path = leaf.path.as_deref().unwrap_or_default();
        let source = docs_dir.join(path);
        if !source.is_file() {
            bail!(
                "manifest entry `{}` references missing file {}",
                leaf.title,
                source.display()
            );
        }
    }
    Ok(())
}
