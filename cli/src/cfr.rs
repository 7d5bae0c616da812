//! Code of Federal Regulations bulk XML
//!
//! A `CFRDOC` volume nests `SUBTITLE`, `CHAPTER`, `SUBCHAP` and `PART`
//! elements. Each takes its heading from its first `HD` (a chapter's sits in
//! `TOC/TOCHD/HD`), or from `RESERVED` when it has none. A part lists its
//! sections in `CONTENTS` as `SECTNO` / `SUBJECT` pairs, possibly grouped
//! under `SUBPART` elements; `RESERVED` stands in for a withdrawn subject.
//! Section bodies (`SECTION` elements) and the `SUBPART` elements wrapping
//! them outside `CONTENTS` are not part of the structure.

use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

use lawtree_backend::grammar::CFR_LEVELS;
use lawtree_backend::logger;
use lawtree_backend::types::{ContentRef, EnumSpec, Kind, SectionRecord};

use crate::toc::{read_text_content, tag_name, Toc, TocEntry};

/// Nesting level of an organizational element, matching [`CFR_LEVELS`]
pub fn element_level(tag: &str) -> Option<usize> {
    let kind = match tag {
        "SUBTITLE" => Kind::Subtitle,
        "CHAPTER" => Kind::Chapter,
        "SUBCHAP" => Kind::Subchapter,
        "PART" => Kind::Part,
        "SUBPART" => Kind::Subpart,
        _ => return None,
    };
    CFR_LEVELS.iter().position(|k| *k == kind).map(|i| i + 1)
}

/// Level of `tag` as a structural element; subparts count only when listed
/// in a table of contents
fn structural_level(tag: &str, contents_depth: usize) -> Option<usize> {
    if tag == "SUBPART" && contents_depth == 0 {
        return None;
    }
    element_level(tag)
}

pub fn read_cfr(path: &Path) -> Result<Toc> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_cfr(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Element whose heading has not been read yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Awaiting {
    Document,
    Entry(usize),
}

pub fn parse_cfr(content: &str) -> Result<Toc> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut toc = Toc::default();
    // open organizational elements, innermost last
    let mut open: Vec<usize> = Vec::new();
    let mut awaiting: Option<Awaiting> = None;
    let mut contents_depth = 0usize;
    let mut section_depth = 0usize;
    let mut sectno: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let tag = tag_name(e);
                if let Some(level) = structural_level(&tag, contents_depth) {
                    toc.entries.push(TocEntry::new(level));
                    open.push(toc.entries.len() - 1);
                    awaiting = Some(Awaiting::Entry(toc.entries.len() - 1));
                    continue;
                }

                match tag.as_str() {
                    "TITLE" if toc.heading.is_empty() => awaiting = Some(Awaiting::Document),
                    "CONTENTS" => contents_depth += 1,
                    "SECTION" => section_depth += 1,
                    "HD" | "RESERVED" if awaiting.is_some() => {
                        let heading = read_text_content(&mut reader)?;
                        match awaiting.take() {
                            Some(Awaiting::Entry(i)) => toc.entries[i].record.raw_heading = heading,
                            Some(Awaiting::Document) => toc.heading = heading,
                            None => {}
                        }
                    }
                    "SECTNO" if contents_depth > 0 && section_depth == 0 => {
                        if let Some(orphan) = sectno.take() {
                            logger::warn(&format!("section {} has no subject", orphan));
                            push_section(&mut toc, &open, &orphan, "");
                        }
                        sectno = Some(read_text_content(&mut reader)?);
                    }
                    "SUBJECT" | "RESERVED" if contents_depth > 0 && section_depth == 0 => {
                        let reserved = tag == "RESERVED";
                        let text = read_text_content(&mut reader)?;
                        match sectno.take() {
                            Some(number) if reserved => push_section(&mut toc, &open, &number, "[Reserved]"),
                            Some(number) => push_section(&mut toc, &open, &number, &text),
                            None => logger::debug(&format!("{} without a section number: {}", tag, text)),
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if structural_level(&tag, contents_depth).is_some() {
                    if let Some(orphan) = sectno.take() {
                        push_section(&mut toc, &open, &orphan, "");
                    }
                    if let Some(Awaiting::Entry(i)) = awaiting {
                        if open.last() == Some(&i) {
                            logger::warn(&format!("{} without a heading", tag));
                            awaiting = None;
                        }
                    }
                    open.pop();
                } else if tag == "CONTENTS" {
                    contents_depth = contents_depth.saturating_sub(1);
                } else if tag == "SECTION" {
                    section_depth = section_depth.saturating_sub(1);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Error at position {}: {:?}", reader.buffer_position(), e)),
            _ => {}
        }
    }

    Ok(toc)
}

fn push_section(toc: &mut Toc, open: &[usize], number: &str, subject: &str) {
    let number = number.trim_start_matches('§').trim().trim_end_matches('.');
    let heading = format!("§ {} {}", number, subject).trim().to_string();
    let sections = toc.sections_mut(open.last().copied());
    sections.push(SectionRecord {
        position: sections.len() + 1,
        raw_heading: heading,
        content_ref: ContentRef(number.to_string()),
        identifier_hint: (!number.is_empty()).then(|| EnumSpec::scalar(number)),
    });
}
