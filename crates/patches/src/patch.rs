//! Context Patch Loading
//!
//! A context patch is a Markdown document with a frontmatter block carrying
//! at minimum an `id:` and a `trigger:` field, followed by a body template
//! that may reference a `{{topic}}` placeholder. Patches are parsed at
//! request time and never mutated after load.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// A trigger-conditioned prompt fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextPatch {
    /// Unique key referenced by detection matches.
    pub id: String,
    /// Natural-language description of when to apply the patch.
    pub trigger: String,
    /// Body template containing `{{topic}}` placeholders.
    pub content: String,
}

fn frontmatter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\A---\n(.*?)\n---\n(.*)\z").expect("valid regex"))
}

fn id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^id:\s*(.+)$").expect("valid regex"))
}

fn trigger_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^trigger:\s*(.+)$").expect("valid regex"))
}

/// Parse one frontmatter-delimited patch document.
///
/// Returns `None` when the frontmatter block or either required field is
/// missing.
pub fn parse_patch_file(content: &str) -> Option<ContextPatch> {
    let captures = frontmatter_regex().captures(content)?;
    let frontmatter = captures.get(1)?.as_str();
    let body = captures.get(2)?.as_str().trim();

    let id = id_regex().captures(frontmatter)?.get(1)?.as_str().trim();
    let trigger = trigger_regex()
        .captures(frontmatter)?
        .get(1)?
        .as_str()
        .trim();

    Some(ContextPatch {
        id: id.to_string(),
        trigger: trigger.to_string(),
        content: body.to_string(),
    })
}

/// Load all `*.md` patch files from a directory in filename-sorted order.
///
/// A missing directory yields an empty set, not an error. A file that fails
/// to read or parse is skipped with a warning.
pub fn load_patches(dir: &Path) -> Vec<ContextPatch> {
    let mut patches = Vec::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => {
            tracing::warn!(dir = %dir.display(), "patch directory not found");
            return patches;
        }
    };

    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();

    for file in files {
        let content = match fs::read_to_string(&file) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "failed to read patch file");
                continue;
            }
        };

        match parse_patch_file(&content) {
            Some(patch) => patches.push(patch),
            None => {
                tracing::warn!(file = %file.display(), "failed to parse patch file");
            }
        }
    }

    patches
}
