//! US Code title tables of contents
//!
//! A title's TOC file nests `supsec` elements, one per title, subtitle,
//! chapter, subchapter or part. Each carries its heading in a `name` child and
//! lists its sections as `sec` children:
//!
//! ```xml
//! <supsec refid="T01" fragid="T01" lvl="0">
//!   <name>TITLE 1 - GENERAL PROVISIONS</name>
//!   <supsec refid="T01C01" fragid="T01C01" lvl="1">
//!     <name>CHAPTER 1 - RULES OF CONSTRUCTION</name>
//!     <sec refid="T01S1" fragid="T01F00001" num="1">§ 1. Words denoting number</sec>
//!   </supsec>
//! </supsec>
//! ```
//!
//! The outermost `supsec` is the document itself. A section's `fragid` names
//! the file holding its text.

use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

use lawtree_backend::logger;
use lawtree_backend::types::{ContentRef, EnumSpec, SectionRecord};

use crate::toc::{get_attribute, read_text_content, tag_name, Toc, TocEntry};

pub fn read_usc_toc(path: &Path) -> Result<Toc> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_usc_toc(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_usc_toc(content: &str) -> Result<Toc> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut toc = Toc::default();
    // one slot per open supsec: the entry it became, None for the document
    let mut open: Vec<Option<usize>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match tag_name(e).as_str() {
                "supsec" => {
                    if open.is_empty() {
                        open.push(None);
                    } else {
                        toc.entries.push(TocEntry::new(open.len()));
                        open.push(Some(toc.entries.len() - 1));
                    }
                    if let Some(lvl) = get_attribute(e, b"lvl") {
                        if lvl.parse::<usize>().ok() != Some(open.len() - 1) {
                            logger::debug(&format!("supsec lvl {} at depth {}", lvl, open.len() - 1));
                        }
                    }
                }
                "name" => {
                    let heading = read_text_content(&mut reader)?;
                    match open.last() {
                        Some(Some(i)) => toc.entries[*i].record.raw_heading = heading,
                        Some(None) => toc.heading = heading,
                        None => logger::warn(&format!("name outside any supsec: {}", heading)),
                    }
                }
                "sec" => {
                    let fragid = get_attribute(e, b"fragid");
                    let num = get_attribute(e, b"num");
                    let heading = read_text_content(&mut reader)?;
                    push_section(&mut toc, &open, heading, fragid, num);
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if tag_name(e) == "sec" {
                    let fragid = get_attribute(e, b"fragid");
                    let num = get_attribute(e, b"num");
                    push_section(&mut toc, &open, String::new(), fragid, num);
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"supsec" {
                    open.pop();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Error at position {}: {:?}", reader.buffer_position(), e)),
            _ => {}
        }
    }

    Ok(toc)
}

fn push_section(toc: &mut Toc, open: &[Option<usize>], heading: String, fragid: Option<String>, num: Option<String>) {
    let Some(owner) = open.last() else {
        logger::warn(&format!("sec outside any supsec: {}", heading));
        return;
    };
    let content_ref = match fragid {
        Some(fragid) => ContentRef(format!("{}.XML", fragid)),
        None => ContentRef(heading.clone()),
    };
    let sections = toc.sections_mut(*owner);
    sections.push(SectionRecord {
        position: sections.len() + 1,
        raw_heading: heading,
        content_ref,
        identifier_hint: num.as_deref().and_then(identifier_hint),
    });
}

/// Section number from a `num` attribute.
///
/// `"12"` is a single section, `"101_to_105"` a span, and `"7,_8"` lists
/// several; a list is kept as the span from its first to its last part.
pub fn identifier_hint(num: &str) -> Option<EnumSpec> {
    let parts: Vec<(&str, &str)> = num
        .split(",_")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.split_once("_to_").unwrap_or((s, s)))
        .collect();

    let (start, _) = parts.first()?;
    let (_, end) = parts.last()?;
    if start == end {
        Some(EnumSpec::scalar(start))
    } else {
        Some(EnumSpec::range(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lawtree_backend::types::PathOrLevel;

    const TITLE_TOC: &str = r#"<?xml version="1.0"?>
<supsec refid="T05" fragid="T05" lvl="0">
  <name>TITLE 5 - GOVERNMENT ORGANIZATION AND EMPLOYEES</name>
  <supsec refid="T05P1" fragid="T05P1" lvl="1">
    <name>PART I - THE AGENCIES GENERALLY</name>
    <supsec refid="T05P1C01" fragid="T05P1C01" lvl="2">
      <name>CHAPTER 1 - ORGANIZATION</name>
      <sec refid="T05S101" fragid="T05F00101" num="101">§ 101. Executive departments</sec>
      <sec refid="T05S102" fragid="T05F00102" num="102">§ 102. Military departments</sec>
    </supsec>
    <supsec refid="T05P1C03" fragid="T05P1C03" lvl="2">
      <name>CHAPTER 3 - POWERS</name>
      <sec refid="T05S301" fragid="T05F00301" num="301_to_304">§§ 301 to 304. Repealed.</sec>
    </supsec>
  </supsec>
  <sec refid="T05S1" fragid="T05F00001"/>
</supsec>
"#;

    #[test]
    fn test_nested_supsec() {
        let toc = parse_usc_toc(TITLE_TOC).unwrap();
        assert_eq!(toc.heading, "TITLE 5 - GOVERNMENT ORGANIZATION AND EMPLOYEES");

        let levels: Vec<(PathOrLevel, &str)> = toc
            .entries
            .iter()
            .map(|e| (e.record.path_or_level.clone(), e.record.raw_heading.as_str()))
            .collect();
        assert_eq!(
            levels,
            vec![
                (PathOrLevel::Level(1), "PART I - THE AGENCIES GENERALLY"),
                (PathOrLevel::Level(2), "CHAPTER 1 - ORGANIZATION"),
                (PathOrLevel::Level(2), "CHAPTER 3 - POWERS"),
            ]
        );

        let chapter1 = &toc.entries[1].sections;
        assert_eq!(chapter1.len(), 2);
        assert_eq!(chapter1[1].position, 2);
        assert_eq!(chapter1[1].raw_heading, "§ 102. Military departments");
        assert_eq!(chapter1[1].content_ref, ContentRef::new("T05F00102.XML"));

        let repealed = &toc.entries[2].sections[0];
        assert_eq!(repealed.identifier_hint, Some(EnumSpec::range("301", "304")));

        // the empty sec after the nested parts belongs to the title itself
        assert_eq!(toc.sections.len(), 1);
        assert_eq!(toc.sections[0].raw_heading, "");
        assert_eq!(toc.section_count(), 4);
    }

    #[test]
    fn test_identifier_hint() {
        assert_eq!(identifier_hint("12"), Some(EnumSpec::scalar("12")));
        assert_eq!(identifier_hint("101_to_105"), Some(EnumSpec::range("101", "105")));
        assert_eq!(identifier_hint("7,_8,_9"), Some(EnumSpec::range("7", "9")));
        assert_eq!(identifier_hint(""), None);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(parse_usc_toc("<supsec><name>TITLE 1</supsec>").is_err());
    }
}
