//! Normalizing vendor column headers into `_`-separated sample names.
//!
//! Each vendor embeds the sample identifier differently, so the
//! reshaping is expressed as an explicit [`NamingScheme`] chosen by the
//! reader. Whatever the scheme, all names of one file must end up with
//! the same token arity and must be distinct.

use crate::design::{CollisionPolicy, NamingError};
use crate::sample_mapping::SampleMapping;
use log::{debug, warn};
use std::collections::HashMap;

/// Selects the columns of one quantity type and locates the sample
/// identifier inside their headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMatcher {
    /// `Intensity Grp1_Rep1`: the identifier follows the prefix.
    Prefix(String),
    /// `[1] Grp1_Rep1.PG.Quantity`: the tag appears inside the header.
    Contains(String),
}

impl ColumnMatcher {
    pub fn matches(&self, header: &str) -> bool {
        match self {
            ColumnMatcher::Prefix(p) => header.starts_with(p.as_str()) && header.len() > p.len(),
            ColumnMatcher::Contains(m) => header.contains(m.as_str()),
        }
    }
}

/// How sample identifiers are reshaped into canonical names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingScheme {
    /// Tokens are kept exactly as written.
    Verbatim,
    /// Spectronaut run labels, reshaped by [`SpectronautRule`].
    Spectronaut,
}

/// Named reshaping rules for Spectronaut run labels.
///
/// Labels of four or more tokens start with two acquisition tokens
/// (date, instrument) that are dropped before a rule is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectronautRule {
    /// `Ctrl_1` kept as is.
    Pair,
    /// `Ctrl_T1_1` kept as is.
    Triple,
    /// `D_I_Ctrl_T1_1` → `Ctrl_T1_1`.
    PrefixedTriple,
    /// `D_I_a_b_T1_x_y` → `ab_T1_xy`.
    PrefixedQuintuple,
    /// `D_I_Ctrl_T1_2_rep1` → `Ctrl_T1_2rep1`: a trailing replicate tag
    /// is fused to the token before it.
    PrefixedQuadReplicate,
    /// `D_I_a_b_T1_1` → `ab_T1_1`: the first two tokens are fused.
    PrefixedQuad,
}

impl SpectronautRule {
    const ACQUISITION_TOKENS: usize = 2;

    /// Pick the rule for an identifier split on `_`.
    pub fn select(tokens: &[&str]) -> Option<SpectronautRule> {
        match tokens.len() {
            2 => Some(SpectronautRule::Pair),
            3 => Some(SpectronautRule::Triple),
            n if n > Self::ACQUISITION_TOKENS => {
                let rest = &tokens[Self::ACQUISITION_TOKENS..];
                match rest.len() {
                    3 => Some(SpectronautRule::PrefixedTriple),
                    5 => Some(SpectronautRule::PrefixedQuintuple),
                    4 if rest[3].contains("rep") => Some(SpectronautRule::PrefixedQuadReplicate),
                    4 => Some(SpectronautRule::PrefixedQuad),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Reshape `tokens`; they must have the shape [`select`](Self::select)
    /// chose this rule for.
    pub fn apply(self, tokens: &[&str]) -> Vec<String> {
        let owned = |s: &&str| s.to_string();
        let t = &tokens[Self::ACQUISITION_TOKENS.min(tokens.len())..];
        match self {
            SpectronautRule::Pair | SpectronautRule::Triple => tokens.iter().map(owned).collect(),
            SpectronautRule::PrefixedTriple => t.iter().map(owned).collect(),
            SpectronautRule::PrefixedQuintuple => vec![
                format!("{}{}", t[0], t[1]),
                t[2].to_string(),
                format!("{}{}", t[3], t[4]),
            ],
            SpectronautRule::PrefixedQuadReplicate => vec![
                t[0].to_string(),
                t[1].to_string(),
                format!("{}{}", t[2], t[3]),
            ],
            SpectronautRule::PrefixedQuad => vec![
                format!("{}{}", t[0], t[1]),
                t[2].to_string(),
                t[3].to_string(),
            ],
        }
    }
}

/// Strip a leading positional marker such as `[12] `.
fn strip_positional_marker(header: &str) -> &str {
    let trimmed = header.trim_start();
    if trimmed.starts_with('[') {
        if let Some(end) = trimmed.find("] ") {
            return &trimmed[end + 2..];
        }
    }
    trimmed
}

impl NamingScheme {
    /// Extract the raw sample identifier from a header.
    pub fn identifier<'a>(&self, header: &'a str, matcher: &ColumnMatcher) -> Option<&'a str> {
        let id = match (self, matcher) {
            (NamingScheme::Spectronaut, _) => {
                let label = strip_positional_marker(header);
                label.split('.').next().unwrap_or("")
            }
            (NamingScheme::Verbatim, ColumnMatcher::Prefix(p)) => header.strip_prefix(p.as_str())?,
            (NamingScheme::Verbatim, ColumnMatcher::Contains(m)) => {
                let end = header.find(m.as_str())?;
                &header[..end]
            }
        };
        let id = id.trim();
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    /// Canonical tokens of an identifier. `header` only serves error messages.
    pub fn reshape(&self, identifier: &str, header: &str) -> Result<Vec<String>, NamingError> {
        let tokens: Vec<&str> = identifier.split('_').collect();
        match self {
            NamingScheme::Verbatim => Ok(tokens.iter().map(|s| s.to_string()).collect()),
            NamingScheme::Spectronaut => {
                let rule = SpectronautRule::select(&tokens).ok_or_else(|| NamingError::UnsupportedShape {
                    header: header.to_string(),
                    tokens: tokens.len(),
                })?;
                debug!("Column '{}' reshaped with rule {:?}", header, rule);
                Ok(rule.apply(&tokens))
            }
        }
    }

    /// Normalized sample name for a single header.
    pub fn normalize_header(&self, header: &str, matcher: &ColumnMatcher) -> Result<String, NamingError> {
        let identifier = self
            .identifier(header, matcher)
            .ok_or_else(|| NamingError::MissingIdentifier(header.to_string()))?;
        Ok(self.reshape(identifier, header)?.join("_"))
    }
}

/// Check that every name has the same number of `_`-separated tokens and
/// return that number (0 for no names).
pub fn validate_arity<S: AsRef<str>>(names: &[S]) -> Result<usize, NamingError> {
    let mut iter = names.iter().map(|n| n.as_ref());
    let expected = match iter.next() {
        Some(first) => first.split('_').count(),
        None => return Ok(0),
    };
    for name in iter {
        let found = name.split('_').count();
        if found != expected {
            return Err(NamingError::InconsistentArity {
                name: name.to_string(),
                expected,
                found,
            });
        }
    }
    Ok(expected)
}

/// Normalize `headers` into sample names, in the same order.
///
/// The optional `mapping` is applied after reshaping. Under
/// [`CollisionPolicy::Strict`] two headers ending up with the same name
/// fail with [`NamingError::Collision`]; under
/// [`CollisionPolicy::LegacyCount`] the repeated name is logged and kept,
/// so the caller decides which column wins. Names must agree in arity.
pub fn normalize_columns<S: AsRef<str>>(
    headers: &[S],
    scheme: NamingScheme,
    matcher: &ColumnMatcher,
    mapping: Option<&SampleMapping>,
    policy: CollisionPolicy,
) -> Result<Vec<String>, NamingError> {
    let mut names = Vec::with_capacity(headers.len());
    let mut origin: HashMap<String, &str> = HashMap::new();

    for header in headers {
        let header = header.as_ref();
        let mut name = scheme.normalize_header(header, matcher)?;
        if let Some(mapping) = mapping {
            name = mapping.apply(&name);
        }
        match (origin.get(&name), policy) {
            (Some(first), CollisionPolicy::Strict) => {
                return Err(NamingError::Collision {
                    name,
                    first: first.to_string(),
                    second: header.to_string(),
                });
            }
            (Some(first), CollisionPolicy::LegacyCount) => {
                warn!("Columns '{}' and '{}' both name sample '{}'", first, header, name);
            }
            (None, _) => {
                origin.insert(name.clone(), header);
            }
        }
        names.push(name);
    }

    validate_arity(&names)?;
    Ok(names)
}
