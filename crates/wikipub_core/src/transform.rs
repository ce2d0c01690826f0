//! Pure text rewriting of documentation pages into wiki form. No markdown
//! AST is built; unrecognized syntax passes through unchanged.

/// Wiki name of the generated home page.
pub const HOME_NAME: &str = "Home";

#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Raw-content URL prefix up to the branch, when owner/repo are known.
    pub image_base: Option<String>,
    /// Docs directory path inside the repository, joined into image URLs.
    pub docs_prefix: String,
    /// Source path of the designated root document, relative to the docs root.
    pub root_doc: String,
}

#[derive(Debug, Clone, Default)]
pub struct Transformed {
    pub content: String,
    pub warnings: Vec<String>,
}

/// Flatten a docs-relative path into a single-level wiki name:
/// drop the `.md` extension, replace path separators and underscores
/// with hyphens. Deterministic, so collisions are detectable up front.
pub fn flat_name(source_path: &str) -> String {
    let trimmed = source_path.trim_start_matches("./");
    let stem = trimmed.strip_suffix(".md").unwrap_or(trimmed);
    stem.replace(['/', '_'], "-")
}

/// Wiki page name for a docs-relative path. The root document maps to the
/// fixed home name; everything else flattens.
pub fn page_name(resolved: &str, root_doc: &str) -> String {
    if resolved == root_doc {
        HOME_NAME.to_string()
    } else {
        flat_name(resolved)
    }
}

/// Resolve `target` against the directory of `source_rel`, collapsing `.`
/// and `..` segments. Returns `None` when the target escapes the docs root.
pub fn resolve_relative(source_rel: &str, target: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    if let Some((dir, _)) = source_rel.rsplit_once('/') {
        parts.extend(dir.split('/'));
    }
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Remove a leading YAML front-matter block (`---` ... `---`) if present,
/// along with blank lines that separated it from the body.
pub fn strip_front_matter(content: &str) -> &str {
    let Some(first_line_end) = content.find('\n') else {
        return content;
    };
    if content[..first_line_end].trim_end() != "---" {
        return content;
    }
    let mut pos = first_line_end + 1;
    while pos <= content.len() {
        let line_end = content[pos..]
            .find('\n')
            .map_or(content.len(), |offset| pos + offset);
        if content[pos..line_end].trim_end() == "---" {
            let after = (line_end + 1).min(content.len());
            return content[after..].trim_start_matches(['\r', '\n']);
        }
        pos = line_end + 1;
    }
    content
}

/// Transform one page: strip front matter, flatten internal page links,
/// absolutize relative image references. `source_rel` is the page's own
/// path relative to the docs root.
pub fn transform_page(source_rel: &str, raw: &str, options: &TransformOptions) -> Transformed {
    let body = strip_front_matter(raw);
    let mut out = String::with_capacity(body.len());
    let mut warnings = Vec::new();

    let mut rest = body;
    while let Some(start) = rest.find('[') {
        let (before, tail) = rest.split_at(start);
        out.push_str(before);
        let Some((len, text, target)) = split_link(tail) else {
            out.push('[');
            rest = &tail[1..];
            continue;
        };
        if target.chars().any(char::is_whitespace) {
            if !is_external(target) {
                warnings.push(format!(
                    "{source_rel}: unrecognized link target `{target}` left unchanged"
                ));
            }
            out.push_str(&tail[..len]);
            rest = &tail[len..];
            continue;
        }
        let rewritten = if out.ends_with('!') {
            rewrite_image_target(source_rel, target, options, &mut warnings)
        } else {
            rewrite_link_target(source_rel, target, options)
        };
        match rewritten {
            Some(new_target) => {
                out.push('[');
                out.push_str(text);
                out.push_str("](");
                out.push_str(&new_target);
                out.push(')');
            }
            None => out.push_str(&tail[..len]),
        }
        rest = &tail[len..];
    }
    out.push_str(rest);

    Transformed {
        content: out,
        warnings,
    }
}

/// Split a `[text](target)` span starting at the `[` byte.
/// Returns the total span length, the text, and the raw target.
fn split_link(segment: &str) -> Option<(usize, &str, &str)> {
    let text_end = segment.find(']')?;
    let after_text = &segment[text_end + 1..];
    if !after_text.starts_with('(') {
        return None;
    }
    let target_len = after_text[1..].find(')')?;
    let target = &after_text[1..1 + target_len];
    let len = text_end + 1 + 1 + target_len + 1;
    Some((len, &segment[1..text_end], target))
}

fn is_external(target: &str) -> bool {
    target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("mailto:")
        || target.starts_with("data:")
        || target.starts_with('/')
}

/// Flattened replacement for a page link target, or `None` to pass through.
fn rewrite_link_target(
    source_rel: &str,
    target: &str,
    options: &TransformOptions,
) -> Option<String> {
    let (path, fragment) = match target.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (target, None),
    };
    if path.is_empty() || is_external(path) || !path.ends_with(".md") {
        return None;
    }
    let resolved = resolve_relative(source_rel, path)?;
    let name = page_name(&resolved, &options.root_doc);
    match fragment {
        Some(fragment) => Some(format!("{name}#{fragment}")),
        None => Some(name),
    }
}

/// Absolute raw-content replacement for an image target, or `None` to pass
/// through.
fn rewrite_image_target(
    source_rel: &str,
    target: &str,
    options: &TransformOptions,
    warnings: &mut Vec<String>,
) -> Option<String> {
    if is_external(target) {
        return None;
    }
    let resolved = resolve_relative(source_rel, target)?;
    match &options.image_base {
        Some(base) => Some(format!("{base}/{}/{resolved}", options.docs_prefix)),
        None => {
            warnings.push(format!(
                "{source_rel}: image `{target}` left relative (owner/repo not configured)"
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        TransformOptions, flat_name, page_name, resolve_relative, strip_front_matter,
        transform_page,
    };

    fn options() -> TransformOptions {
        TransformOptions {
            image_base: Some("https://raw.githubusercontent.com/acme/handbook/main".to_string()),
            docs_prefix: "docs".to_string(),
            root_doc: "index.md".to_string(),
        }
    }

    #[test]
    fn flat_name_replaces_separators_and_drops_extension() {
        assert_eq!(flat_name("chapter_a/page_b.md"), "chapter-a-page-b");
        assert_eq!(flat_name("./about.md"), "about");
        assert_eq!(flat_name("deep/nested/intro.md"), "deep-nested-intro");
    }

    #[test]
    fn page_name_maps_root_doc_to_home() {
        assert_eq!(page_name("index.md", "index.md"), "Home");
        assert_eq!(page_name("about.md", "index.md"), "about");
    }

    #[test]
    fn resolve_relative_collapses_parent_segments() {
        assert_eq!(
            resolve_relative("chapter_x/page.md", "../chapter_a/page_b.md").as_deref(),
            Some("chapter_a/page_b.md")
        );
        assert_eq!(
            resolve_relative("index.md", "chapter_a/intro.md").as_deref(),
            Some("chapter_a/intro.md")
        );
        assert_eq!(resolve_relative("chapter_x/page.md", "./other.md").as_deref(), Some("chapter_x/other.md"));
    }

    #[test]
    fn resolve_relative_rejects_escape_from_docs_root() {
        assert_eq!(resolve_relative("index.md", "../outside.md"), None);
        assert_eq!(resolve_relative("chapter_x/page.md", "../../top.md"), None);
    }

    #[test]
    fn strips_front_matter_block() {
        let raw = "---\ntitle: Page\ncomments: true\n---\n\n# Heading\n";
        assert_eq!(strip_front_matter(raw), "# Heading\n");
    }

    #[test]
    fn front_matter_delimiters_tolerate_trailing_whitespace() {
        let raw = "--- \ntitle: Page\n---\t\n\n# Heading\n";
        assert_eq!(strip_front_matter(raw), "# Heading\n");
    }

    #[test]
    fn content_without_front_matter_is_untouched() {
        let raw = "# Heading\n\ntext --- with dashes\n";
        assert_eq!(strip_front_matter(raw), raw);
    }

    #[test]
    fn unterminated_front_matter_is_untouched() {
        let raw = "---\ntitle: Page\n\n# Heading\n";
        assert_eq!(strip_front_matter(raw), raw);
    }

    #[test]
    fn page_without_links_only_loses_front_matter() {
        let raw = "---\ntitle: Plain\n---\n\n# Plain\n\nJust prose with (parens) and [brackets].\n";
        let result = transform_page("chapter_a/plain.md", raw, &options());
        assert_eq!(
            result.content,
            "# Plain\n\nJust prose with (parens) and [brackets].\n"
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn relative_page_link_is_flattened() {
        let raw = "See [x](../chapter_a/page_b.md) for details.\n";
        let result = transform_page("chapter_x/page.md", raw, &options());
        assert_eq!(result.content, "See [x](chapter-a-page-b) for details.\n");
    }

    #[test]
    fn link_fragment_is_preserved() {
        let raw = "See [x](../chapter_a/page_b.md#section-2).\n";
        let result = transform_page("chapter_x/page.md", raw, &options());
        assert_eq!(result.content, "See [x](chapter-a-page-b#section-2).\n");
    }

    #[test]
    fn link_to_root_doc_points_at_home() {
        let raw = "Back to [start](../index.md).\n";
        let result = transform_page("chapter_x/page.md", raw, &options());
        assert_eq!(result.content, "Back to [start](Home).\n");
    }

    #[test]
    fn external_and_anchor_links_pass_through() {
        let raw = "[a](https://example.org/x.md) [b](#anchor) [c](/abs/path.md) [d](notes.txt)\n";
        let result = transform_page("index.md", raw, &options());
        assert_eq!(result.content, raw);
    }

    #[test]
    fn link_escaping_docs_root_passes_through() {
        let raw = "[readme](../README.md)\n";
        let result = transform_page("index.md", raw, &options());
        assert_eq!(result.content, raw);
    }

    #[test]
    fn relative_image_becomes_raw_url() {
        let raw = "![x](../assets/img.png)\n";
        let result = transform_page("chapter_a/page.md", raw, &options());
        assert_eq!(
            result.content,
            "![x](https://raw.githubusercontent.com/acme/handbook/main/docs/assets/img.png)\n"
        );
    }

    #[test]
    fn image_without_configured_base_warns_and_passes_through() {
        let mut opts = options();
        opts.image_base = None;
        let raw = "![x](../assets/img.png)\n";
        let result = transform_page("chapter_a/page.md", raw, &opts);
        assert_eq!(result.content, raw);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("assets/img.png"));
    }

    #[test]
    fn external_image_passes_through() {
        let raw = "![x](https://example.org/img.png)\n";
        let result = transform_page("index.md", raw, &options());
        assert_eq!(result.content, raw);
    }

    #[test]
    fn malformed_link_passes_through() {
        let raw = "broken [text](no-close and [ref][style] stay put\n";
        let result = transform_page("index.md", raw, &options());
        assert_eq!(result.content, raw);
    }

    #[test]
    fn link_target_with_spaces_warns_and_passes_through() {
        let raw = "[x](chapter a/page.md)\n";
        let result = transform_page("index.md", raw, &options());
        assert_eq!(result.content, raw);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn transformation_is_deterministic() {
        let raw = "---\nt: 1\n---\n[x](a_b/c.md) ![i](img/p.png)\n";
        let first = transform_page("d/e.md", raw, &options());
        let second = transform_page("d/e.md", raw, &options());
        assert_eq!(first.content, second.content);
    }
}
