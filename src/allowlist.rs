//! Allowlist gating application launches and website navigation.
//!
//! The persisted document is JSON:
//!
//! ```json
//! { "applications": ["Google Chrome", "Spotify"], "websites": ["github.com"] }
//! ```
//!
//! An empty set allows everything (first-run default). A non-empty set allows
//! a target only when a case-insensitive substring match exists in either
//! direction between the target and some entry. Matching is not anchored, so
//! a short entry such as `"a"` permits any target containing `a`; this is kept
//! for compatibility with existing allowlist files and is a known weakness for
//! any real deployment.
//!
//! [`AllowlistStore`] is read-only. Mutation lives in the management helpers at
//! the bottom of this module, used only by the `java-add` binary.

use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Persisted allowlist document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowlist {
    /// Permitted application names.
    #[serde(default)]
    pub applications: Vec<String>,
    /// Permitted website hostnames or URL fragments.
    #[serde(default)]
    pub websites: Vec<String>,
}

/// Which half of the allowlist an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Application,
    Website,
}

/// Read-only allowlist queried on every privileged action.
#[derive(Debug, Clone, Default)]
pub struct AllowlistStore {
    applications: Vec<String>,
    websites: Vec<String>,
}

impl AllowlistStore {
    /// Load the allowlist from `path`.
    ///
    /// Any read or parse failure falls back to the permissive empty allowlist;
    /// the assistant must still start.
    pub fn load(path: &Path) -> Self {
        match read_allowlist(path) {
            Ok(Some(list)) => {
                info!(
                    "allowlist loaded from {} ({} applications, {} websites)",
                    path.display(),
                    list.applications.len(),
                    list.websites.len()
                );
                Self::from_allowlist(list)
            }
            Ok(None) => {
                debug!(
                    "no allowlist at {}, allowing everything",
                    path.display()
                );
                Self::default()
            }
            Err(e) => {
                warn!("ignoring unreadable allowlist: {e}; allowing everything");
                Self::default()
            }
        }
    }

    /// Build a store from an in-memory document.
    pub fn from_allowlist(list: Allowlist) -> Self {
        Self {
            applications: list.applications,
            websites: list.websites,
        }
    }

    /// Whether launching `name` is permitted.
    pub fn is_application_allowed(&self, name: &str) -> bool {
        matches_any(&self.applications, name)
    }

    /// Whether navigating to `url` is permitted.
    ///
    /// `url` gets an `https://` scheme when it has none before matching.
    pub fn is_website_allowed(&self, url: &str) -> bool {
        if self.websites.is_empty() {
            return true;
        }
        matches_any(&self.websites, &normalize_url(url))
    }

    pub fn applications(&self) -> &[String] {
        &self.applications
    }

    pub fn websites(&self) -> &[String] {
        &self.websites
    }
}

/// Prepend `https://` unless `url` already carries an http(s) scheme.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_owned()
    } else {
        format!("https://{url}")
    }
}

fn matches_any(entries: &[String], target: &str) -> bool {
    if entries.is_empty() {
        return true;
    }
    let target = target.to_lowercase();
    entries.iter().any(|entry| {
        let entry = entry.to_lowercase();
        entry.contains(&target) || target.contains(&entry)
    })
}

/// Read the document. `Ok(None)` when the file does not exist.
fn read_allowlist(path: &Path) -> Result<Option<Allowlist>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AssistantError::Allowlist(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };
    serde_json::from_str(&content).map(Some).map_err(|e| {
        AssistantError::Allowlist(format!("failed to parse {}: {e}", path.display()))
    })
}

// ── Management (java-add) ──────────────────────────────────────

/// Load the document for editing.
///
/// Unlike [`AllowlistStore::load`] a malformed file is an error here, so the
/// management tool never silently overwrites a file it could not parse.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_for_edit(path: &Path) -> Result<Allowlist> {
    Ok(read_allowlist(path)?.unwrap_or_default())
}

/// Write the document as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save(path: &Path, list: &Allowlist) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(list)
        .map_err(|e| AssistantError::Allowlist(format!("failed to serialize allowlist: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

impl Allowlist {
    fn entries_mut(&mut self, kind: EntryKind) -> &mut Vec<String> {
        match kind {
            EntryKind::Application => &mut self.applications,
            EntryKind::Website => &mut self.websites,
        }
    }

    /// Add an entry. Returns `false` if an equal entry (ignoring case) exists.
    pub fn add(&mut self, kind: EntryKind, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let entries = self.entries_mut(kind);
        if entries.iter().any(|e| e.eq_ignore_ascii_case(value)) {
            return false;
        }
        entries.push(value.to_owned());
        true
    }

    /// Remove an entry (ignoring case). Returns `false` if it was not present.
    pub fn remove(&mut self, kind: EntryKind, value: &str) -> bool {
        let value = value.trim();
        let entries = self.entries_mut(kind);
        let before = entries.len();
        entries.retain(|e| !e.eq_ignore_ascii_case(value));
        entries.len() != before
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn store(apps: &[&str], sites: &[&str]) -> AllowlistStore {
        AllowlistStore::from_allowlist(Allowlist {
            applications: apps.iter().map(|s| (*s).to_owned()).collect(),
            websites: sites.iter().map(|s| (*s).to_owned()).collect(),
        })
    }

    #[test]
    fn empty_store_allows_everything() {
        let s = AllowlistStore::default();
        assert!(s.is_application_allowed(""));
        assert!(s.is_application_allowed("rm"));
        assert!(s.is_website_allowed("anything.example"));
    }

    #[test]
    fn app_matches_substring_in_either_direction() {
        let s = store(&["Google Chrome"], &[]);
        assert!(s.is_application_allowed("chrome"));
        assert!(s.is_application_allowed("GOOGLE CHROME BETA"));
        assert!(!s.is_application_allowed("firefox"));
    }

    #[test]
    fn website_gets_scheme_before_matching() {
        let s = store(&[], &["https://example.com/"]);
        assert!(s.is_website_allowed("example.com"));
        assert!(s.is_website_allowed("https://example.com"));
        assert!(!store(&[], &["other.com"]).is_website_allowed("example.com"));
    }

    #[test]
    fn bare_hostname_entry_matches_full_url() {
        let s = store(&[], &["github.com"]);
        assert!(s.is_website_allowed("https://github.com/rust-lang"));
        assert!(s.is_website_allowed("GitHub.com"));
    }

    #[test]
    fn short_entries_match_broadly() {
        let s = store(&["a"], &[]);
        assert!(s.is_application_allowed("slack"));
        assert!(!s.is_application_allowed("vim"));
    }

    #[test]
    fn app_set_does_not_gate_websites() {
        let s = store(&["Spotify"], &[]);
        assert!(s.is_website_allowed("example.com"));
    }

    #[test]
    fn normalize_url_keeps_existing_scheme() {
        assert_eq!(normalize_url("http://x.org"), "http://x.org");
        assert_eq!(normalize_url("x.org"), "https://x.org");
    }

    #[test]
    fn missing_file_is_permissive() {
        let dir = tempfile::tempdir().unwrap();
        let s = AllowlistStore::load(&dir.path().join("none.json"));
        assert!(s.applications().is_empty());
        assert!(s.websites().is_empty());
    }

    #[test]
    fn malformed_file_is_permissive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowlist.json");
        std::fs::write(&path, "{ not json").unwrap();
        let s = AllowlistStore::load(&path);
        assert!(s.is_application_allowed("anything"));
        assert!(load_for_edit(&path).is_err());
    }

    #[test]
    fn document_with_one_field_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowlist.json");
        std::fs::write(&path, r#"{"applications": ["Spotify"]}"#).unwrap();
        let s = AllowlistStore::load(&path);
        assert_eq!(s.applications(), ["Spotify".to_owned()]);
        assert!(s.websites().is_empty());
    }

    #[test]
    fn add_is_case_insensitive_and_deduplicates() {
        let mut list = Allowlist::default();
        assert!(list.add(EntryKind::Application, "Spotify"));
        assert!(!list.add(EntryKind::Application, "spotify"));
        assert!(!list.add(EntryKind::Website, "   "));
        assert_eq!(list.applications.len(), 1);
        assert!(list.websites.is_empty());
    }

    #[test]
    fn remove_reports_presence() {
        let mut list = Allowlist::default();
        list.add(EntryKind::Website, "github.com");
        assert!(list.remove(EntryKind::Website, "GITHUB.COM"));
        assert!(!list.remove(EntryKind::Website, "github.com"));
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("allowlist.json");
        let mut list = Allowlist::default();
        list.add(EntryKind::Application, "Google Chrome");
        list.add(EntryKind::Website, "example.com");
        save(&path, &list).unwrap();

        assert_eq!(load_for_edit(&path).unwrap(), list);
        let s = AllowlistStore::load(&path);
        assert!(s.is_application_allowed("chrome"));
        assert!(!s.is_website_allowed("other.org"));
    }
}
