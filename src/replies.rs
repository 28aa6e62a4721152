//! Canned reply phrases, one YAML dictionary per language.
//!
//! A dictionary maps the kind of the recalled message to a list of
//! phrases, one of which accompanies the forwarded message:
//!
//! ```yaml
//! text:
//!   - "Remember this one?"
//!   - "Someone actually said this."
//! photo:
//!   - "This picture deserves a second look."
//! ```
//!
//! Dictionaries are loaded once at startup; a missing or unparsable file
//! is fatal there. An *empty* phrase list is only detected at recall time
//! and surfaces as a [`CatalogError`] — a deployment defect, logged, never
//! silently defaulted.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::CatalogError;
use crate::store::Language;

/// Kind of a recalled message, as classified from the forward response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Text,
    Photo,
}

impl ReplyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyKind::Text => "text",
            ReplyKind::Photo => "photo",
        }
    }
}

/// One language's phrase lists, as read from its YAML file. Unknown keys
/// are rejected so a typo'd `text`/`photo` key fails at startup instead
/// of silently leaving a list empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplySet {
    #[serde(default)]
    text: Vec<String>,
    #[serde(default)]
    photo: Vec<String>,
}

/// All loaded reply dictionaries.
pub struct ReplyCatalog {
    languages: HashMap<Language, ReplySet>,
}

impl ReplyCatalog {
    /// Load one `<code>.yml` dictionary per supported language from a
    /// directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut catalog = Self::empty();
        for language in Language::ALL {
            let path = dir.join(format!("{}.yml", language.code()));
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read reply dictionary {}", path.display()))?;
            let set: ReplySet = serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse reply dictionary {}", path.display()))?;
            catalog.insert(language, set.text, set.photo);
        }
        Ok(catalog)
    }

    /// A catalog with no languages. Populate with [`insert`](Self::insert).
    pub fn empty() -> Self {
        Self {
            languages: HashMap::new(),
        }
    }

    /// Add or replace the phrase lists for a language.
    pub fn insert(&mut self, language: Language, text: Vec<String>, photo: Vec<String>) {
        self.languages.insert(language, ReplySet { text, photo });
    }

    /// The phrases for a language and kind. Never returns an empty slice:
    /// a missing language or an empty list is a [`CatalogError`].
    pub fn lookup(&self, language: Language, kind: ReplyKind) -> Result<&[String], CatalogError> {
        let set = self
            .languages
            .get(&language)
            .ok_or(CatalogError::UnknownLanguage(language.code()))?;
        let phrases = match kind {
            ReplyKind::Text => &set.text,
            ReplyKind::Photo => &set.photo,
        };
        if phrases.is_empty() {
            return Err(CatalogError::EmptyPhrases {
                language: language.code(),
                kind: kind.as_str(),
            });
        }
        Ok(phrases)
    }
}

// ── Tests ───────────────────────────────────────────────────────
