//! Data-quality events collected while a document is built
//!
//! Nothing here stops a conversion. Events are logged as they are recorded and
//! summarized once the document is done.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::logger::{debug, warn};
use crate::types::TreeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    InvalidPath,
    DuplicateSlot,
    UnresolvedKey,
    DuplicateIndexKey,
    LevelMismatch,
    UnclassifiableHeading,
    MissingSectionIdentifier,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::InvalidPath => "invalid_path",
            DiagnosticKind::DuplicateSlot => "duplicate_slot",
            DiagnosticKind::UnresolvedKey => "unresolved_key",
            DiagnosticKind::DuplicateIndexKey => "duplicate_index_key",
            DiagnosticKind::LevelMismatch => "level_mismatch",
            DiagnosticKind::UnclassifiableHeading => "unclassifiable_heading",
            DiagnosticKind::MissingSectionIdentifier => "missing_section_identifier",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A record with a malformed path was skipped
    InvalidPath { path: String, reason: String },
    /// A leaf slot was overwritten
    DuplicateSlot {
        path: String,
        position: usize,
        previous: Option<String>,
        replacement: String,
    },
    /// A detail record had no index entry
    UnresolvedKey { key: String },
    /// The index listed the same surrogate key twice; the later entry is kept
    DuplicateIndexKey { key: String, kept_path: String },
    /// The declared nesting level disagrees with the path depth
    LevelMismatch {
        path: String,
        declared: usize,
        actual: usize,
    },
    UnclassifiableHeading { path: String, raw: String },
    MissingSectionIdentifier { path: String, raw: String },
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::InvalidPath { .. } => DiagnosticKind::InvalidPath,
            Diagnostic::DuplicateSlot { .. } => DiagnosticKind::DuplicateSlot,
            Diagnostic::UnresolvedKey { .. } => DiagnosticKind::UnresolvedKey,
            Diagnostic::DuplicateIndexKey { .. } => DiagnosticKind::DuplicateIndexKey,
            Diagnostic::LevelMismatch { .. } => DiagnosticKind::LevelMismatch,
            Diagnostic::UnclassifiableHeading { .. } => DiagnosticKind::UnclassifiableHeading,
            Diagnostic::MissingSectionIdentifier { .. } => DiagnosticKind::MissingSectionIdentifier,
        }
    }

    /// Diagnostic for a recoverable tree error
    pub fn from_error(err: &TreeError) -> Self {
        match err {
            TreeError::InvalidPath { path, reason } => Diagnostic::InvalidPath {
                path: path.clone(),
                reason: reason.clone(),
            },
            TreeError::DuplicateSlot {
                path,
                position,
                previous,
                replacement,
            } => Diagnostic::DuplicateSlot {
                path: path.clone(),
                position: *position,
                previous: Some(previous.clone()),
                replacement: replacement.clone(),
            },
            TreeError::UnresolvedKey(key) => Diagnostic::UnresolvedKey { key: key.clone() },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InvalidPath { path, reason } => {
                write!(f, "skipped record with invalid path '{}': {}", path, reason)
            }
            Diagnostic::DuplicateSlot {
                path,
                position,
                previous,
                replacement,
            } => write!(
                f,
                "slot {} under '{}' overwritten: {} -> {}",
                position,
                path,
                previous.as_deref().unwrap_or("<heading>"),
                replacement
            ),
            Diagnostic::UnresolvedKey { key } => write!(f, "no index entry for key '{}'", key),
            Diagnostic::DuplicateIndexKey { key, kept_path } => {
                write!(f, "key '{}' indexed twice, keeping '{}'", key, kept_path)
            }
            Diagnostic::LevelMismatch {
                path,
                declared,
                actual,
            } => write!(
                f,
                "'{}' declares level {} but sits at depth {}",
                path, declared, actual
            ),
            Diagnostic::UnclassifiableHeading { path, raw } => {
                write!(f, "unclassified heading at '{}': {:?}", path, raw)
            }
            Diagnostic::MissingSectionIdentifier { path, raw } => {
                write!(f, "section at '{}' has no identifier: {:?}", path, raw)
            }
        }
    }
}

/// Accumulated diagnostics for one document
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
    counts: BTreeMap<DiagnosticKind, usize>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        match diagnostic.kind() {
            DiagnosticKind::UnclassifiableHeading | DiagnosticKind::LevelMismatch => {
                debug(&diagnostic.to_string())
            }
            _ => warn(&diagnostic.to_string()),
        }
        *self.counts.entry(diagnostic.kind()).or_insert(0) += 1;
        self.events.push(diagnostic);
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append another document's events, e.g. when a run covers several codes
    pub fn extend(&mut self, other: Diagnostics) {
        for (kind, n) in other.counts {
            *self.counts.entry(kind).or_insert(0) += n;
        }
        self.events.extend(other.events);
    }

    /// One line per diagnostic kind that occurred, e.g. `unresolved_key: 3`
    pub fn summary(&self) -> String {
        if self.counts.is_empty() {
            return "no diagnostics".to_string();
        }
        self.counts
            .iter()
            .map(|(kind, n)| format!("{}: {}", kind, n))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "no diagnostics");

        diag.record(Diagnostic::UnresolvedKey { key: "D".to_string() });
        diag.record(Diagnostic::UnresolvedKey { key: "E".to_string() });
        diag.record(Diagnostic::LevelMismatch {
            path: "1.2".to_string(),
            declared: 3,
            actual: 2,
        });

        assert_eq!(diag.total(), 3);
        assert_eq!(diag.count(DiagnosticKind::UnresolvedKey), 2);
        assert_eq!(diag.count(DiagnosticKind::DuplicateSlot), 0);
        assert_eq!(diag.summary(), "unresolved_key: 2\nlevel_mismatch: 1");
    }

    #[test]
    fn test_from_error() {
        let err = TreeError::invalid_path("1.x", "non-numeric segment 'x'");
        let d = Diagnostic::from_error(&err);
        assert_eq!(d.kind(), DiagnosticKind::InvalidPath);
    }

    #[test]
    fn test_extend() {
        let mut a = Diagnostics::new();
        a.record(Diagnostic::UnresolvedKey { key: "A".to_string() });
        let mut b = Diagnostics::new();
        b.record(Diagnostic::UnresolvedKey { key: "B".to_string() });
        a.extend(b);
        assert_eq!(a.count(DiagnosticKind::UnresolvedKey), 2);
        assert_eq!(a.total(), 2);
    }
}
