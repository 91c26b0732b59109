//! Composite label identifiers
//!
//! A label identifier is the operator-selected prefix concatenated with the
//! locally entered path id, with no separator: `("PTH", "0042")` becomes
//! `"PTH0042"`. Because there is no separator, going back from the composite
//! string to the path id needs the prefix and a [`DecomposePolicy`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// How a composite identifier is split back into its path id.
///
/// The two policies only disagree when the prefix also appears inside the
/// path id (or the composite does not start with the prefix at all).
/// With `StripFirstOccurrence`, `("PTH", "APTH1")` composes to `"PTHAPTH1"`
/// and decomposes to `"APTH1"`, but a stored `"XPTH1"` under prefix `"PTH"`
/// decomposes to `"X1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecomposePolicy {
    /// Remove the first textual occurrence of the prefix, wherever it is.
    #[default]
    StripFirstOccurrence,
    /// Remove the prefix only when the identifier starts with it.
    StripLeading,
}

impl DecomposePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecomposePolicy::StripFirstOccurrence => "strip-first-occurrence",
            DecomposePolicy::StripLeading => "strip-leading",
        }
    }
}

impl fmt::Display for DecomposePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecomposePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strip-first-occurrence" | "first-occurrence" => Ok(Self::StripFirstOccurrence),
            "strip-leading" | "leading" => Ok(Self::StripLeading),
            other => Err(AppError::validation(format!(
                "Unknown decompose policy: {other}"
            ))),
        }
    }
}

/// A (prefix, path id) pair, the identity printed on a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelIdentifier {
    pub prefix: String,
    pub local_id: String,
}

impl LabelIdentifier {
    /// Build an identifier, rejecting empty (or blank) parts.
    pub fn new(prefix: impl Into<String>, local_id: impl Into<String>) -> AppResult<Self> {
        let prefix = prefix.into();
        let local_id = local_id.into();
        if prefix.trim().is_empty() {
            return Err(
                AppError::validation("Prefix must not be empty").with_detail("field", "prefix")
            );
        }
        if local_id.trim().is_empty() {
            return Err(
                AppError::validation("Path ID must not be empty").with_detail("field", "pathId")
            );
        }
        Ok(Self { prefix, local_id })
    }

    /// Canonical composite form (`prefix ++ local_id`).
    pub fn composite(&self) -> String {
        format!("{}{}", self.prefix, self.local_id)
    }

    /// Rebuild an identifier from a stored composite string.
    pub fn from_composite(
        composite: &str,
        prefix: &str,
        policy: DecomposePolicy,
    ) -> AppResult<Self> {
        let local_id = decompose(composite, prefix, policy)?;
        Self::new(prefix, local_id)
    }
}

impl fmt::Display for LabelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.local_id)
    }
}

/// Concatenate prefix and path id into the composite identifier.
pub fn compose(prefix: &str, local_id: &str) -> AppResult<String> {
    LabelIdentifier::new(prefix, local_id).map(|id| id.composite())
}

/// Recover the path id from a composite identifier.
///
/// Fails with a validation error when the prefix is empty. A prefix that
/// does not occur at all leaves the identifier unchanged under
/// `StripFirstOccurrence` (matching `String::replacen(.., 1)`), and likewise
/// under `StripLeading` when the identifier does not start with it.
pub fn decompose(identifier: &str, prefix: &str, policy: DecomposePolicy) -> AppResult<String> {
    if prefix.is_empty() {
        return Err(AppError::validation("Prefix must not be empty").with_detail("field", "prefix"));
    }

    let local_id = match policy {
        DecomposePolicy::StripFirstOccurrence => identifier.replacen(prefix, "", 1),
        DecomposePolicy::StripLeading => identifier
            .strip_prefix(prefix)
            .unwrap_or(identifier)
            .to_string(),
    };

    Ok(local_id)
}
