// src/ingest/lookup.rs
//! Optional organization reference table, loaded once at startup.
//!
//! Entries are `{name, code?, kind?}`; a bare string counts as `{name}`.
//! Lookups fold case and whitespace, so `" δήμος  ΑΘΗΝΑΙΩΝ"` finds
//! `"Δήμος Αθηναίων"`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{extension_of, read_file, ConfigError};

pub const ENV_PATH: &str = "TENDER_ORG_LOOKUP_PATH";
const DEFAULT_TOML: &str = "config/organizations.toml";
const DEFAULT_JSON: &str = "config/organizations.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Name(String),
    Full(OrganizationEntry),
}

impl From<RawEntry> for OrganizationEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Name(name) => OrganizationEntry {
                name,
                code: None,
                kind: None,
            },
            RawEntry::Full(e) => e,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationLookup {
    entries: Vec<OrganizationEntry>,
    index: HashMap<String, usize>,
}

fn fold(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl OrganizationLookup {
    /// Trims names, drops blanks and keeps the first entry per folded name.
    pub fn new(items: impl IntoIterator<Item = OrganizationEntry>) -> Self {
        let mut out = Self::default();
        for mut it in items {
            it.name = it.name.split_whitespace().collect::<Vec<_>>().join(" ");
            if it.name.is_empty() {
                continue;
            }
            let key = fold(&it.name);
            if out.index.contains_key(&key) {
                continue;
            }
            out.index.insert(key, out.entries.len());
            out.entries.push(it);
        }
        out
    }

    pub fn find(&self, name: &str) -> Option<&OrganizationEntry> {
        self.index.get(&fold(name)).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[OrganizationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load the table from an explicit path. Supports TOML or JSON.
pub fn load_lookup_from(path: &Path) -> Result<OrganizationLookup, ConfigError> {
    let content = read_file(path)?;
    parse_lookup(&content, &extension_of(path)).map_err(|reason| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Resolve the table:
/// 1) `explicit` (from AppConfig) or $TENDER_ORG_LOOKUP_PATH
/// 2) config/organizations.toml
/// 3) config/organizations.json
///
/// Missing or broken files log a warning and yield an empty table.
pub fn load_lookup_default(explicit: Option<&Path>) -> OrganizationLookup {
    let configured = explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var(ENV_PATH)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    });

    let path = match configured {
        Some(p) => p,
        None => match [DEFAULT_TOML, DEFAULT_JSON]
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
        {
            Some(p) => p,
            None => return OrganizationLookup::default(),
        },
    };

    match load_lookup_from(&path) {
        Ok(lookup) => {
            tracing::info!(
                target: "ingest",
                path = %path.display(),
                entries = lookup.len(),
                "organization lookup loaded"
            );
            lookup
        }
        Err(e) => {
            tracing::warn!(
                target: "ingest",
                error = %e,
                kind = e.kind(),
                "organization lookup unavailable, continuing without it"
            );
            OrganizationLookup::default()
        }
    }
}

fn parse_lookup(s: &str, hint_ext: &str) -> Result<OrganizationLookup, String> {
    let try_toml = hint_ext == "toml" || s.contains("organizations");
    let mut last_err = String::from("unsupported lookup format");
    if try_toml {
        match parse_toml(s) {
            Ok(v) => return Ok(v),
            Err(e) => last_err = e,
        }
    }
    match parse_json(s) {
        Ok(v) => return Ok(v),
        Err(e) => {
            if !try_toml {
                last_err = e;
            }
        }
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(last_err)
}

fn parse_toml(s: &str) -> Result<OrganizationLookup, String> {
    #[derive(Deserialize)]
    struct TomlTable {
        organizations: Vec<RawEntry>,
    }
    let v: TomlTable = toml::from_str(s).map_err(|e| e.to_string())?;
    Ok(OrganizationLookup::new(v.organizations.into_iter().map(Into::into)))
}

fn parse_json(s: &str) -> Result<OrganizationLookup, String> {
    let v: Vec<RawEntry> = serde_json::from_str(s).map_err(|e| e.to_string())?;
    Ok(OrganizationLookup::new(v.into_iter().map(Into::into)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_shapes() {
        let toml = r#"
organizations = [
  "ΕΦΚΑ",
  { name = " Δήμος  Αθηναίων ", code = "6003", kind = "municipality" },
  "",
  "εφκα",
]
"#;
        let t = parse_toml(toml).unwrap();
        assert_eq!(t.len(), 2);
        let d = t.find("δήμος αθηναίων").unwrap();
        assert_eq!(d.name, "Δήμος Αθηναίων");
        assert_eq!(d.code.as_deref(), Some("6003"));

        let json = r#"["ΟΑΕΔ", {"name": "ΕΥΔΑΠ", "kind": "utility"}]"#;
        let j = parse_json(json).unwrap();
        assert_eq!(j.find("  ευδαπ ").and_then(|e| e.kind.as_deref()), Some("utility"));
        assert!(j.find("ΔΕΗ").is_none());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(parse_lookup("organizations = 5", "toml").is_err());
        assert!(parse_lookup("{", "json").is_err());
    }
}
