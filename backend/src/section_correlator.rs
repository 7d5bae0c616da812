//! Joins section rows onto a built tree
//!
//! The index table says where each section sits; the detail table carries its
//! content handle. Both are keyed by a surrogate key, so the whole index has to
//! be read before any detail row can be placed. [`SectionIndex::build`] is that
//! first pass and [`SectionIndex::attach`] the second.

use std::collections::HashMap;

use serde::Serialize;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::path_tree::LeafSlot;
use crate::structure_builder::BuiltDocument;
use crate::types::{EnumSpec, HeadingDescriptor, Kind, SectionDetailRecord, SectionIndexRecord};

/// Outcome counts of one join
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorrelationReport {
    pub attached: usize,
    pub unresolved: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub path: String,
    pub position: usize,
    pub identifier: String,
}

/// Surrogate key to tree location, built from the whole index table
#[derive(Debug, Default)]
pub struct SectionIndex {
    entries: HashMap<String, IndexEntry>,
    diagnostics: Diagnostics,
}

impl SectionIndex {
    pub fn build<I>(index: I) -> Self
    where
        I: IntoIterator<Item = SectionIndexRecord>,
    {
        let mut section_index = SectionIndex::default();

        for record in index {
            let entry = IndexEntry {
                path: record.path,
                position: record.position,
                identifier: record.identifier,
            };
            if section_index.entries.contains_key(&record.surrogate_key) {
                section_index.diagnostics.record(Diagnostic::DuplicateIndexKey {
                    key: record.surrogate_key.clone(),
                    kept_path: entry.path.clone(),
                });
            }
            section_index.entries.insert(record.surrogate_key, entry);
        }

        section_index
    }

    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Place every detail row whose key is indexed; skip and count the rest.
    pub fn attach<I>(self, doc: &mut BuiltDocument, detail: I) -> CorrelationReport
    where
        I: IntoIterator<Item = SectionDetailRecord>,
    {
        let SectionIndex {
            entries,
            diagnostics,
        } = self;
        doc.diagnostics.extend(diagnostics);

        let mut report = CorrelationReport::default();

        for record in detail {
            let Some(entry) = entries.get(&record.surrogate_key) else {
                report.unresolved += 1;
                doc.diagnostics.record(Diagnostic::UnresolvedKey {
                    key: record.surrogate_key,
                });
                continue;
            };

            let parent = match doc.tree.get_or_create(&entry.path) {
                Ok(handle) => handle,
                Err(err) => {
                    report.skipped += 1;
                    doc.diagnostics.record(Diagnostic::from_error(&err));
                    continue;
                }
            };

            let replacement = record.content_ref.to_string();
            let slot = match doc.tree.attach_leaf(parent, entry.position, record.content_ref) {
                Ok(slot) => slot,
                Err(err) => {
                    report.skipped += 1;
                    doc.diagnostics.record(Diagnostic::from_error(&err));
                    continue;
                }
            };

            if let LeafSlot::Replaced { previous, .. } = &slot {
                report.duplicates += 1;
                doc.diagnostics.record(Diagnostic::DuplicateSlot {
                    path: entry.path.clone(),
                    position: entry.position,
                    previous: Some(previous.to_string()),
                    replacement,
                });
            }

            let handle = slot.handle();
            let descriptor = HeadingDescriptor {
                kind: Some(Kind::Section),
                enumeration: normalize_identifier(&entry.identifier).map(EnumSpec::Scalar),
                ..Default::default()
            };
            doc.tree.set_header(handle, descriptor);

            let meta = record.meta;
            if !meta.is_empty() {
                doc.tree.set_section_meta(handle, meta);
            }

            report.attached += 1;
        }

        report
    }
}

/// Runs both join passes over one document
pub struct SectionCorrelator;

impl SectionCorrelator {
    pub fn ingest<I, D>(doc: &mut BuiltDocument, index: I, detail: D) -> CorrelationReport
    where
        I: IntoIterator<Item = SectionIndexRecord>,
        D: IntoIterator<Item = SectionDetailRecord>,
    {
        SectionIndex::build(index).attach(doc, detail)
    }
}

/// Section number as printed in a table of contents: `"[12.5.]"` gives `12.5`,
/// `"Section 7."` gives `7`.
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| *c != '[' && *c != ']').collect();
    let last = cleaned.split_whitespace().last()?;
    let identifier = last.trim_end_matches('.');
    (!identifier.is_empty()).then(|| identifier.to_string())
}
