//! Ponder Patches
//!
//! Trigger-conditioned context patch engine: loads frontmatter-delimited
//! prompt fragments from disk, classifies a user message against their
//! triggers with one lightweight model call, and renders matched fragments
//! (with `{{topic}}` substitution) into a string injectable onto the system
//! prompt.
//!
//! ## Module Organization
//!
//! - `patch` - On-disk patch format and directory loading
//! - `detection` - Classification prompt, verdict parsing, the sub-call itself
//! - `inject` - Variable substitution and injection-section assembly

pub mod detection;
pub mod inject;
pub mod patch;

// ── Patch Model ────────────────────────────────────────────────────────
pub use patch::{load_patches, parse_patch_file, ContextPatch};

// ── Detection ──────────────────────────────────────────────────────────
pub use detection::{
    build_detection_prompt, detect_patches, detection_model_for, parse_detection_response,
    PatchError, PatchMatch,
};

// ── Injection ──────────────────────────────────────────────────────────
pub use inject::{build_injection_content, replace_variables};

#[cfg(test)]
mod tests {
    use super::*;

    /// Full pipeline short of the network: load, (stubbed) verdict, inject.
    #[test]
    fn test_end_to_end_injection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("acf.md"),
            "---\nid: acf\ntrigger: WordPress custom field modeling\n---\n\nWhen the user is building {{topic}}, model content with ACF field groups.\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("seo.md"),
            "---\nid: seo\ntrigger: search engine optimization\n---\n\nOptimize {{topic}} for search.\n",
        )
        .unwrap();

        let patches = load_patches(dir.path());
        assert_eq!(patches.len(), 2);

        let prompt = build_detection_prompt(&patches, "help me structure a real estate site");
        assert!(prompt.contains("- acf:"));
        assert!(prompt.contains("- seo:"));

        let matches =
            parse_detection_response(r#"[{"patchId":"acf","topic":"real estate site"}]"#);
        let injection = build_injection_content(&patches, &matches);

        assert!(injection.contains("real estate site"));
        assert!(injection.contains("ACF field groups"));
        assert!(!injection.contains("{{topic}}"));
        assert!(!injection.contains("Optimize"));
    }
}
