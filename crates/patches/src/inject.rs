//! Injection Rendering
//!
//! Renders matched patches into the string spliced onto the system prompt.

use crate::detection::PatchMatch;
use crate::patch::ContextPatch;

const TOPIC_PLACEHOLDER: &str = "{{topic}}";

/// Replace every occurrence of the literal `{{topic}}` placeholder.
pub fn replace_variables(content: &str, topic: &str) -> String {
    content.replace(TOPIC_PLACEHOLDER, topic)
}

/// Render matched patches under a fixed section header, separated from the
/// base prompt by a horizontal rule.
///
/// Matches whose patch id does not resolve are silently ignored. Zero matches
/// or zero resolved fragments yields an empty string: no injection, not an
/// empty section.
pub fn build_injection_content(patches: &[ContextPatch], matches: &[PatchMatch]) -> String {
    if matches.is_empty() {
        return String::new();
    }

    let injections: Vec<String> = matches
        .iter()
        .filter_map(|m| {
            patches
                .iter()
                .find(|p| p.id == m.patch_id)
                .map(|p| replace_variables(&p.content, &m.topic))
        })
        .collect();

    if injections.is_empty() {
        return String::new();
    }

    format!(
        "\n\n---\n\n## Context Patches\n\n{}",
        injections.join("\n\n")
    )
}
