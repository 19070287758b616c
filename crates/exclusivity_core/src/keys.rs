//! Attribute-name encoding for matrix dimensions.
//!
//! # Responsibility
//! - Map a dimension tuple to the canonical attribute name of one cell.
//!
//! # Invariants
//! - Encoding is a pure function of its inputs and the override table.
//! - An empty result means "invalid key"; callers reject it before any
//!   schema lookup.
//! - `sanitize_brand` is idempotent, override targets included.
//!
//! Names are never decoded back into tuples. Callers re-derive the expected
//! name and check it against the attribute registry.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Prefix carried by every brand-keyed attribute.
pub const BRAND_PREFIX: &str = "brand_";

static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static NON_KEY_CHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid key char regex"));

/// Brands whose generic token splits a name the business spells as one word.
const BUILTIN_BRAND_OVERRIDES: &[(&str, &str)] = &[
    ("jumping_beans", "jumpingbeans"),
    ("baby_company", "babycompany"),
    ("toy_kingdom", "toykingdom"),
];

/// Rejected override table entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideError {
    EmptyKey(String),
    /// Target changes when sanitized again, which would break idempotence.
    UnstableTarget { key: String, target: String },
}

impl Display for OverrideError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyKey(raw) => write!(f, "brand override key `{raw}` sanitizes to nothing"),
            Self::UnstableTarget { key, target } => write!(
                f,
                "brand override `{key}` -> `{target}` must map to a lowercase [a-z0-9_] token that is not itself overridden"
            ),
        }
    }
}

impl Error for OverrideError {}

/// Encoder for both product lines, holding the brand override table.
#[derive(Debug, Clone)]
pub struct KeyEncoder {
    brand_overrides: BTreeMap<String, String>,
}

impl Default for KeyEncoder {
    fn default() -> Self {
        let brand_overrides = BUILTIN_BRAND_OVERRIDES
            .iter()
            .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
            .collect();
        Self { brand_overrides }
    }
}

impl KeyEncoder {
    /// Builds an encoder with the built-in overrides plus `extra` entries.
    ///
    /// Keys are normalized with the generic rule, so `"Jumping Beans"` and
    /// `"jumping_beans"` name the same entry.
    pub fn with_overrides<'a, I>(extra: I) -> Result<Self, OverrideError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut encoder = Self::default();
        for (raw_key, raw_target) in extra {
            let key = generic_brand_token(raw_key);
            if key.is_empty() {
                return Err(OverrideError::EmptyKey(raw_key.to_string()));
            }
            let target = raw_target.trim().to_string();
            if generic_brand_token(&target) != target {
                return Err(OverrideError::UnstableTarget { key, target });
            }
            encoder.brand_overrides.insert(key, target);
        }

        for (key, target) in &encoder.brand_overrides {
            if encoder.brand_overrides.contains_key(target) && target != key {
                return Err(OverrideError::UnstableTarget {
                    key: key.clone(),
                    target: target.clone(),
                });
            }
        }

        Ok(encoder)
    }

    /// Encodes an EPC cell: chain code followed by classification code.
    ///
    /// `("VChain", "ASEH")` encodes to `"VChainASEH"`. No collision handling
    /// happens here; registration rejects colliding pairs.
    pub fn encode_chain_class(&self, chain_code: &str, class_code: &str) -> String {
        let chain = chain_code.trim();
        let class = class_code.trim();
        if chain.is_empty() || class.is_empty() {
            return String::new();
        }
        format!("{chain}{class}")
    }

    /// Encodes an NBFI cell from a brand name: `brand_<token>`.
    pub fn encode_brand(&self, brand: &str) -> String {
        let token = self.sanitize_brand(brand);
        if token.is_empty() {
            return String::new();
        }
        format!("{BRAND_PREFIX}{token}")
    }

    /// Sanitizes a brand name into its attribute token.
    ///
    /// Generic rule: lowercase, trim, whitespace runs to `_`, drop anything
    /// outside `[A-Za-z0-9_]`. The override table is consulted afterwards.
    pub fn sanitize_brand(&self, brand: &str) -> String {
        let token = generic_brand_token(brand);
        match self.brand_overrides.get(&token) {
            Some(target) => target.clone(),
            None => token,
        }
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.brand_overrides
            .iter()
            .map(|(key, target)| (key.as_str(), target.as_str()))
    }
}

fn generic_brand_token(brand: &str) -> String {
    let lowered = brand.to_lowercase();
    let joined = WHITESPACE_RUN_RE.replace_all(lowered.trim(), "_");
    NON_KEY_CHAR_RE.replace_all(&joined, "").into_owned()
}
