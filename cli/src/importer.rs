//! Importers turn one input source into a sequence of finished documents
//!
//! Each document is built, written, and dropped before the next one starts.

use std::path::{Path, PathBuf};

use anyhow::Result;

use lawtree_backend::diagnostics::Diagnostics;
use lawtree_backend::heading::{classify, ParseContext};
use lawtree_backend::grammar::{GrammarConfig, CFR_LEVELS, OUTLINE_LEVELS};
use lawtree_backend::logger;
use lawtree_backend::section_correlator::SectionCorrelator;
use lawtree_backend::structure_builder::{BuiltDocument, InvalidPathPolicy, StructureBuilder};
use lawtree_backend::types::{EnumSpec, HeadingDescriptor, Kind, TreeError};

use crate::fact_writer::FactWriter;
use crate::cfr::read_cfr;
use crate::outline::{read_outline, OutlineEntry};
use crate::tables::TableSet;
use crate::toc::Toc;
use crate::usc_toc::read_usc_toc;

/// Totals of one import run
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub documents: usize,
    /// Documents abandoned on an unaddressable heading record
    pub failed: Vec<String>,
    pub facts: usize,
    pub diagnostics: Diagnostics,
}

impl ImportSummary {
    pub fn report(&self) -> String {
        let mut lines = vec![format!(
            "documents: {}, failed: {}, facts: {}",
            self.documents,
            self.failed.len(),
            self.facts
        )];
        if !self.failed.is_empty() {
            lines.push(format!("failed documents: {}", self.failed.join(", ")));
        }
        lines.push(self.diagnostics.summary());
        lines.join("\n")
    }
}

pub trait LawImporter {
    fn import(&mut self, writer: &mut FactWriter) -> Result<ImportSummary>;
}

/// One document per code in a California table set
pub struct CodesImporter {
    tables: TableSet,
    codes: Vec<String>,
    grammar: GrammarConfig,
    policy: InvalidPathPolicy,
}

impl CodesImporter {
    /// `codes` restricts the run to those codes; empty means all.
    pub fn new(tables: TableSet, codes: &[String], grammar: GrammarConfig, policy: InvalidPathPolicy) -> Self {
        CodesImporter {
            tables,
            codes: codes.iter().map(|c| c.to_uppercase()).collect(),
            grammar,
            policy,
        }
    }
}

impl LawImporter for CodesImporter {
    fn import(&mut self, writer: &mut FactWriter) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        let mut org = self.tables.read_org()?;
        let mut index = self.tables.read_section_index()?;
        let mut detail = self.tables.read_section_detail()?;

        for entry in self.tables.read_codes()? {
            if !self.codes.is_empty() && !self.codes.contains(&entry.code.to_uppercase()) {
                continue;
            }
            logger::info(&format!("Building {} ({})", entry.code, entry.title));

            let root = HeadingDescriptor {
                kind: Some(Kind::Code),
                enumeration: Some(EnumSpec::scalar(&entry.code)),
                title: Some(entry.title.clone()),
                ..Default::default()
            };
            let records = org.remove(&entry.code).unwrap_or_default();
            let mut doc = match StructureBuilder::new(&self.grammar, root, self.policy).ingest(records) {
                Ok(doc) => doc,
                Err(e) => {
                    logger::error(&format!("{}: {}", entry.code, e));
                    summary.failed.push(entry.code.clone());
                    continue;
                }
            };

            let report = SectionCorrelator::ingest(
                &mut doc,
                index.remove(&entry.code).unwrap_or_default(),
                detail.remove(&entry.code).unwrap_or_default(),
            );
            logger::info(&format!(
                "{}: {} sections attached, {} unresolved, {} replaced, {} skipped",
                entry.code, report.attached, report.unresolved, report.duplicates, report.skipped
            ));

            summary.facts += writer.write_document(&entry.code, &doc.tree)?;
            summary.documents += 1;
            summary.diagnostics.extend(doc.diagnostics);
        }

        Ok(summary)
    }
}

/// Place every heading, then hang its paragraphs, notes and history on it.
fn build_outline(
    grammar: &GrammarConfig,
    root: HeadingDescriptor,
    policy: InvalidPathPolicy,
    entries: Vec<OutlineEntry>,
) -> Result<BuiltDocument, TreeError> {
    let mut builder = StructureBuilder::new(grammar, root, policy);
    for entry in entries {
        let Some(handle) = builder.ingest_record(&entry.record)? else {
            continue;
        };
        if let Some(content) = entry.body.content() {
            builder.set_content(handle, content);
        }
        let meta = entry.body.meta();
        if !meta.is_empty() {
            builder.set_section_meta(handle, meta);
        }
    }
    Ok(builder.finish())
}

/// One document per styled outline file
pub struct OutlineImporter {
    files: Vec<PathBuf>,
    grammar: GrammarConfig,
    policy: InvalidPathPolicy,
}

impl OutlineImporter {
    /// Uses the outline level table unless `grammar` already carries one.
    pub fn new(files: Vec<PathBuf>, grammar: GrammarConfig, keep_levels: bool, policy: InvalidPathPolicy) -> Self {
        let grammar = if keep_levels {
            grammar
        } else {
            grammar.with_levels(&OUTLINE_LEVELS)
        };
        OutlineImporter { files, grammar, policy }
    }
}

fn document_name(path: &Path, fallback: &str) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(fallback)
        .to_string()
}

impl LawImporter for OutlineImporter {
    fn import(&mut self, writer: &mut FactWriter) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        for path in &self.files {
            let name = document_name(path, "outline");
            logger::info(&format!("Building {}", path.display()));

            let outline = read_outline(path)?;
            for (style, n) in &outline.skipped {
                logger::debug(&format!("{}: skipped {} {} lines", name, n, style));
            }

            let root = HeadingDescriptor::title_only(&name);
            let doc = match build_outline(&self.grammar, root, self.policy, outline.entries) {
                Ok(doc) => doc,
                Err(e) => {
                    logger::error(&format!("{}: {}", name, e));
                    summary.failed.push(name);
                    continue;
                }
            };

            summary.facts += writer.write_document(&name, &doc.tree)?;
            summary.documents += 1;
            summary.diagnostics.extend(doc.diagnostics);
        }

        Ok(summary)
    }
}

/// Place every nested element of a table of contents, each followed by the
/// sections listed under it. The document heading becomes the root.
fn build_toc(
    grammar: &GrammarConfig,
    name: &str,
    policy: InvalidPathPolicy,
    toc: &Toc,
) -> Result<BuiltDocument, TreeError> {
    let root = if toc.heading.is_empty() {
        HeadingDescriptor::title_only(name)
    } else {
        classify(&toc.heading, &ParseContext::new(grammar))
    };

    let mut builder = StructureBuilder::new(grammar, root, policy);
    let root = builder.root();
    for section in &toc.sections {
        builder.attach_section(root, section)?;
    }
    for entry in &toc.entries {
        let Some(handle) = builder.ingest_record(&entry.record)? else {
            continue;
        };
        for section in &entry.sections {
            builder.attach_section(handle, section)?;
        }
    }
    Ok(builder.finish())
}

/// One document per nested table-of-contents file, read by `read`
fn import_tocs(
    files: &[PathBuf],
    grammar: &GrammarConfig,
    policy: InvalidPathPolicy,
    read: fn(&Path) -> Result<Toc>,
    writer: &mut FactWriter,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for path in files {
        let name = document_name(path, "toc");
        logger::info(&format!("Building {}", path.display()));

        let toc = read(path)?;
        logger::debug(&format!(
            "{}: {} elements, {} sections",
            name,
            toc.entries.len(),
            toc.section_count()
        ));

        let doc = match build_toc(grammar, &name, policy, &toc) {
            Ok(doc) => doc,
            Err(e) => {
                logger::error(&format!("{}: {}", name, e));
                summary.failed.push(name);
                continue;
            }
        };

        summary.facts += writer.write_document(&name, &doc.tree)?;
        summary.documents += 1;
        summary.diagnostics.extend(doc.diagnostics);
    }

    Ok(summary)
}

/// One document per US Code title TOC file
pub struct UscImporter {
    files: Vec<PathBuf>,
    grammar: GrammarConfig,
    policy: InvalidPathPolicy,
}

impl UscImporter {
    pub fn new(files: Vec<PathBuf>, grammar: GrammarConfig, policy: InvalidPathPolicy) -> Self {
        UscImporter { files, grammar, policy }
    }
}

impl LawImporter for UscImporter {
    fn import(&mut self, writer: &mut FactWriter) -> Result<ImportSummary> {
        import_tocs(&self.files, &self.grammar, self.policy, read_usc_toc, writer)
    }
}

/// One document per federal regulations volume
pub struct CfrImporter {
    files: Vec<PathBuf>,
    grammar: GrammarConfig,
    policy: InvalidPathPolicy,
}

impl CfrImporter {
    /// Uses the volume element nesting unless `grammar` already carries levels.
    pub fn new(files: Vec<PathBuf>, grammar: GrammarConfig, keep_levels: bool, policy: InvalidPathPolicy) -> Self {
        let grammar = if keep_levels {
            grammar
        } else {
            grammar.with_levels(&CFR_LEVELS)
        };
        CfrImporter { files, grammar, policy }
    }
}

impl LawImporter for CfrImporter {
    fn import(&mut self, writer: &mut FactWriter) -> Result<ImportSummary> {
        import_tocs(&self.files, &self.grammar, self.policy, read_cfr, writer)
    }
}

