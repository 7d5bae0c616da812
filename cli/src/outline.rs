//! Styled outline listings
//!
//! Regulation word-processor files are exported as one paragraph per line,
//! `STYLE<TAB>text`. The `LVL*` styles give a strict nesting; section and
//! appendix headings sit one level below the deepest `LVL6`. Body paragraphs,
//! notes and history lines belong to the heading above them. Every other style
//! is counted and skipped.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use lawtree_backend::logger;
use lawtree_backend::types::{ContentRef, OrgRecord, PathOrLevel, SectionMeta};

/// Nesting level of section and appendix headings
pub const SECTION_LEVEL: usize = 8;

/// Where a non-heading line goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    Text,
    Notes,
    History,
}

pub fn body_part(style: &str) -> Option<BodyPart> {
    match style {
        "SECTION PARAGRAPH" | "ANOTEP" => Some(BodyPart::Text),
        "NOTEP" => Some(BodyPart::Notes),
        "HISTP" => Some(BodyPart::History),
        _ => None,
    }
}

/// Lines found under one heading, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlineBody {
    pub text: Vec<String>,
    pub notes: Vec<String>,
    pub history: Vec<String>,
}

impl OutlineBody {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.notes.is_empty() && self.history.is_empty()
    }

    fn push(&mut self, part: BodyPart, line: &str) {
        match part {
            BodyPart::Text => self.text.push(line.to_string()),
            BodyPart::Notes => self.notes.push(line.to_string()),
            BodyPart::History => self.history.push(line.to_string()),
        }
    }

    /// Paragraph text carried inline as the node's content
    pub fn content(&self) -> Option<ContentRef> {
        (!self.text.is_empty()).then(|| ContentRef(self.text.join("\n")))
    }

    pub fn meta(&self) -> SectionMeta {
        SectionMeta {
            codification: None,
            history: (!self.history.is_empty()).then(|| self.history.join("\n")),
            notes: (!self.notes.is_empty()).then(|| self.notes.join("\n")),
        }
    }
}

/// A heading record with the body lines that follow it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub record: OrgRecord,
    pub body: OutlineBody,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    pub entries: Vec<OutlineEntry>,
    /// Heading and body lines per style
    pub counted: BTreeMap<String, usize>,
    /// Lines of other styles, and body lines before the first heading
    pub skipped: BTreeMap<String, usize>,
}

/// Nesting level for a paragraph style, if it is a heading style
pub fn style_level(style: &str) -> Option<usize> {
    match style {
        "SECTION" | "APPENDIX" => Some(SECTION_LEVEL),
        _ => {
            let n: usize = style.strip_prefix("LVL")?.parse().ok()?;
            (n <= 6).then_some(n + 1)
        }
    }
}

pub fn read_outline(path: &Path) -> Result<Outline> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open outline {}", path.display()))?;
    parse_outline(file).with_context(|| format!("Failed to read outline {}", path.display()))
}

pub fn parse_outline<R: std::io::Read>(input: R) -> Result<Outline> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut outline = Outline::default();

    for row in reader.records() {
        let row = row?;
        let style = row.get(0).unwrap_or("").trim();
        let text = row.get(1).unwrap_or("").trim();
        if style.is_empty() && text.is_empty() {
            continue;
        }

        if let Some(level) = style_level(style) {
            *outline.counted.entry(style.to_string()).or_insert(0) += 1;
            outline.entries.push(OutlineEntry {
                record: OrgRecord {
                    path_or_level: PathOrLevel::Level(level),
                    raw_heading: text.to_string(),
                    raw_status_flag: None,
                },
                body: OutlineBody::default(),
            });
            continue;
        }

        match (body_part(style), outline.entries.last_mut()) {
            (Some(part), Some(entry)) => {
                *outline.counted.entry(style.to_string()).or_insert(0) += 1;
                entry.body.push(part, text);
            }
            (Some(_), None) => {
                logger::warn(&format!("{} line before any heading: {}", style, text));
                *outline.skipped.entry(style.to_string()).or_insert(0) += 1;
            }
            (None, _) => {
                *outline.skipped.entry(style.to_string()).or_insert(0) += 1;
            }
        }
    }

    Ok(outline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_level() {
        assert_eq!(style_level("LVL0"), Some(1));
        assert_eq!(style_level("LVL6"), Some(7));
        assert_eq!(style_level("LVL7"), None);
        assert_eq!(style_level("SECTION"), Some(8));
        assert_eq!(style_level("APPENDIX"), Some(8));
        assert_eq!(style_level("SECTION PARAGRAPH"), None);
        assert_eq!(style_level("LVLX"), None);
    }

    #[test]
    fn test_parse_outline_counts_styles() {
        let text = "LVL0\tTITLE 1. General Provisions\n\
                    LVL2\tChapter 1. Office of Administrative Law\n\
                    SECTION\t§1. Definitions.\n\
                    SECTION PARAGRAPH\t(a) \"Agency\" means a state agency.\n\
                    HISTP\t1. New section filed 4-1-80.\n\
                    HISTP\t2. Amendment filed 6-2-92.\n\
                    FOOTER\tPage 3\n\
                    \n";
        let outline = parse_outline(text.as_bytes()).unwrap();

        assert_eq!(outline.entries.len(), 3);
        assert_eq!(outline.entries[2].record.path_or_level, PathOrLevel::Level(SECTION_LEVEL));
        assert_eq!(outline.counted.get("LVL2"), Some(&1));
        assert_eq!(outline.counted.get("HISTP"), Some(&2));
        assert_eq!(outline.counted.get("SECTION PARAGRAPH"), Some(&1));
        assert_eq!(outline.skipped.get("FOOTER"), Some(&1));
    }

    #[test]
    fn test_body_lines_follow_their_heading() {
        let text = "NOTEP\tstray note\n\
                    LVL2\tChapter 1. Fees\n\
                    SECTION PARAGRAPH\tThis chapter sets fees.\n\
                    SECTION\t§10. Amounts.\n\
                    SECTION PARAGRAPH\t(a) The fee is $10.\n\
                    ANOTEP\t(b) Waivers are allowed.\n\
                    NOTEP\tNote: Authority cited: Section 11.\n\
                    HISTP\t1. New section filed 1-1-90.\n\
                    HISTP\t2. Amendment filed 2-2-95.\n";
        let outline = parse_outline(text.as_bytes()).unwrap();

        assert_eq!(outline.entries.len(), 2);
        assert_eq!(outline.skipped.get("NOTEP"), Some(&1));

        let chapter = &outline.entries[0].body;
        assert_eq!(chapter.text, vec!["This chapter sets fees."]);
        assert!(chapter.notes.is_empty());

        let section = &outline.entries[1].body;
        assert_eq!(
            section.content(),
            Some(ContentRef::new("(a) The fee is $10.\n(b) Waivers are allowed."))
        );
        let meta = section.meta();
        assert_eq!(meta.notes.as_deref(), Some("Note: Authority cited: Section 11."));
        assert_eq!(
            meta.history.as_deref(),
            Some("1. New section filed 1-1-90.\n2. Amendment filed 2-2-95.")
        );
        assert!(OutlineBody::default().meta().is_empty());
    }
}
