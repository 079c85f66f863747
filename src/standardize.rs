//! Field standardization shared by every matching pass.
//!
//! Raw multi-valued cells (`"(555) 123-4567|MISSING"`) are parsed once into a
//! [`StandardizedField`], a set of comparable tokens. The `MISSING` sentinel
//! survives normalization so the passes can decide how much it counts.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

/// Placeholder for absent data. Matched case-insensitively on input,
/// always stored upper-case.
pub const SENTINEL: &str = "MISSING";

/// Separator between values inside one multi-valued cell.
pub const DEFAULT_DELIMITER: char = '|';

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").unwrap());

/// Which normalization applies to a field's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Keep digits only: "(555) 123-4567" -> "5551234567"
    Phone,
    /// Trim and lowercase
    Email,
    /// Trim and lowercase
    Text,
}

/// Normalized token set for one record's field.
///
/// The sentinel is stored as a regular token; `has_sentinel` caches whether
/// it is present so passes can ask "is there any real evidence here?" cheaply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardizedField {
    tokens: FxHashSet<String>,
    has_sentinel: bool,
}

impl StandardizedField {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: FxHashSet<String> = tokens.into_iter().map(Into::into).collect();
        let has_sentinel = tokens.contains(SENTINEL);
        Self {
            tokens,
            has_sentinel,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn has_sentinel(&self) -> bool {
        self.has_sentinel
    }

    /// True when the set is exactly `{MISSING}`.
    pub fn is_sentinel_only(&self) -> bool {
        self.has_sentinel && self.tokens.len() == 1
    }

    /// True when at least one token is something other than the sentinel.
    pub fn has_evidence(&self) -> bool {
        self.tokens.len() > usize::from(self.has_sentinel)
    }

    pub fn intersection(&self, other: &StandardizedField) -> StandardizedField {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        StandardizedField::from_tokens(
            small
                .tokens
                .iter()
                .filter(|t| large.tokens.contains(t.as_str()))
                .cloned(),
        )
    }

    /// In-place intersection, used by the running set of the linked pass.
    pub fn retain_common(&mut self, other: &StandardizedField) {
        self.tokens.retain(|t| other.tokens.contains(t));
        self.has_sentinel = self.tokens.contains(SENTINEL);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Tokens in lexical order, for stable display.
    pub fn sorted_tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.iter().collect();
        tokens.sort_unstable();
        tokens
    }
}

/// True if the value spells the sentinel, ignoring case and surrounding whitespace.
pub fn is_sentinel(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(SENTINEL)
}

fn normalize_value(value: &str, kind: FieldKind) -> String {
    match kind {
        FieldKind::Phone => NON_DIGIT.replace_all(value, "").into_owned(),
        FieldKind::Email | FieldKind::Text => value.trim().to_lowercase(),
    }
}

/// Split a raw multi-valued cell and normalize each value.
///
/// Empty segments are dropped before normalization; a segment that is
/// non-empty but normalizes to `""` (e.g. a phone cell of `"n/a"`) is kept
/// so a non-empty cell never yields an empty set.
pub fn standardize_field(raw: &str, delimiter: char, kind: FieldKind) -> StandardizedField {
    StandardizedField::from_tokens(raw.split(delimiter).filter(|s| !s.is_empty()).map(|s| {
        if is_sentinel(s) {
            SENTINEL.to_string()
        } else {
            normalize_value(s, kind)
        }
    }))
}

/// Single-valued normalization for the exact-attribute pass.
///
/// Trims and lowercases the whole cell into a singleton set. No splitting
/// and no sentinel handling: `"MISSING"` becomes the ordinary token `"missing"`.
pub fn standardize_exact(raw: &str) -> StandardizedField {
    StandardizedField::from_tokens([raw.trim().to_lowercase()])
}
