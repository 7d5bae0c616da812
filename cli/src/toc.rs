//! Nested table-of-contents documents flattened into level streams
//!
//! Both federal sources nest their organizational elements in XML and list
//! sections inline under the element that holds them. The readers turn that
//! nesting into [`PathOrLevel::Level`] records in document order, each with
//! its sections.

use anyhow::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use lawtree_backend::types::{OrgRecord, PathOrLevel, SectionRecord};

/// One organizational element and the sections listed directly under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub record: OrgRecord,
    pub sections: Vec<SectionRecord>,
}

impl TocEntry {
    pub fn new(level: usize) -> Self {
        TocEntry {
            record: OrgRecord {
                path_or_level: PathOrLevel::Level(level),
                raw_heading: String::new(),
                raw_status_flag: None,
            },
            sections: Vec::new(),
        }
    }
}

/// A whole table of contents: the document heading, sections sitting
/// directly under it, and every nested element in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
    pub heading: String,
    pub sections: Vec<SectionRecord>,
    pub entries: Vec<TocEntry>,
}

impl Toc {
    /// Section list of entry `index`, or the document's own for `None`
    pub fn sections_mut(&mut self, index: Option<usize>) -> &mut Vec<SectionRecord> {
        match index.and_then(|i| self.entries.get_mut(i)) {
            Some(entry) => &mut entry.sections,
            None => &mut self.sections,
        }
    }

    pub fn section_count(&self) -> usize {
        self.sections.len() + self.entries.iter().map(|e| e.sections.len()).sum::<usize>()
    }
}

/// Get an attribute value from a BytesStart element
pub fn get_attribute(element: &BytesStart, attr_name: &[u8]) -> Option<String> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == attr_name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

pub fn tag_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

/// Text of the element just opened, nested markup included, with whitespace
/// collapsed. Consumes the closing tag.
pub fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                text.push_str(&e.unescape()?);
                text.push(' ');
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e));
                text.push(' ');
            }
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Error reading text: {:?}", e)),
            _ => {}
        }
    }

    Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
}
