//! Core data structures for legal-code structure reconstruction
//!
//! This module defines the types shared by the tree, the heading classifier,
//! the builders and the emitter: structural kinds, enumerations, status flags,
//! heading descriptors and the input record shapes produced by table readers.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural type of an organizational element or section
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Document root (a whole code or title set)
    Code,
    Title,
    Subtitle,
    Division,
    Part,
    Subdivision,
    Chapter,
    Subchapter,
    Article,
    Subarticle,
    Section,
    Appendix,
    Subpart,
    /// Court-rule style section ("Rule 12.")
    Rule,
    /// Form style section ("Form 3.")
    Form,
}

impl Kind {
    /// Level words that may open an organizational heading
    pub const HEADING_WORDS: [Kind; 12] = [
        Kind::Title,
        Kind::Subtitle,
        Kind::Division,
        Kind::Part,
        Kind::Subdivision,
        Kind::Chapter,
        Kind::Subchapter,
        Kind::Article,
        Kind::Subarticle,
        Kind::Section,
        Kind::Appendix,
        Kind::Subpart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Code => "code",
            Kind::Title => "title",
            Kind::Subtitle => "subtitle",
            Kind::Division => "division",
            Kind::Part => "part",
            Kind::Subdivision => "subdivision",
            Kind::Chapter => "chapter",
            Kind::Subchapter => "subchapter",
            Kind::Article => "article",
            Kind::Subarticle => "subarticle",
            Kind::Section => "section",
            Kind::Appendix => "appendix",
            Kind::Subpart => "subpart",
            Kind::Rule => "rule",
            Kind::Form => "form",
        }
    }

    /// Parse a level word, tolerating case and a trailing plural "s".
    ///
    /// Returns the kind and whether the word was plural.
    pub fn from_level_word(word: &str) -> Option<(Kind, bool)> {
        let lower = word.trim().to_lowercase();
        if let Ok(kind) = lower.parse::<Kind>() {
            return Some((kind, false));
        }
        let singular = lower.strip_suffix('s')?;
        singular.parse::<Kind>().ok().map(|kind| (kind, true))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid Kind value: {0}")]
pub struct ParseKindError(String);

impl FromStr for Kind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "code" => Ok(Kind::Code),
            "title" => Ok(Kind::Title),
            "subtitle" => Ok(Kind::Subtitle),
            "division" => Ok(Kind::Division),
            "part" => Ok(Kind::Part),
            "subdivision" => Ok(Kind::Subdivision),
            "chapter" => Ok(Kind::Chapter),
            "subchapter" => Ok(Kind::Subchapter),
            "article" => Ok(Kind::Article),
            "subarticle" => Ok(Kind::Subarticle),
            "section" => Ok(Kind::Section),
            "appendix" => Ok(Kind::Appendix),
            "subpart" => Ok(Kind::Subpart),
            "rule" => Ok(Kind::Rule),
            "form" => Ok(Kind::Form),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

/// Enumeration of a structural element: a single label or a covered range
///
/// Range bounds are kept exactly as the source gave them; no ordering is
/// checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumSpec {
    Scalar(String),
    Range(String, String),
}

impl EnumSpec {
    pub fn scalar(label: &str) -> Self {
        EnumSpec::Scalar(label.to_string())
    }

    pub fn range(start: &str, end: &str) -> Self {
        EnumSpec::Range(start.to_string(), end.to_string())
    }
}

impl fmt::Display for EnumSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumSpec::Scalar(label) => f.write_str(label),
            EnumSpec::Range(start, end) => write!(f, "{}-{}", start, end),
        }
    }
}

/// Status flag carried by a heading marker or a table flag column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Repealed,
    Renumbered,
    Reserved,
    Transferred,
    Omitted,
    Vacant,
    /// Appendix to a numbered element ("TITLE 5, APPENDIX")
    Appendix,
    /// Row flagged inactive by the source table
    Inactive,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Repealed => "repealed",
            Status::Renumbered => "renumbered",
            Status::Reserved => "reserved",
            Status::Transferred => "transferred",
            Status::Omitted => "omitted",
            Status::Vacant => "vacant",
            Status::Appendix => "appendix",
            Status::Inactive => "inactive",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid Status value: {0}")]
pub struct ParseStatusError(String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim().trim_matches(|c| c == '[' || c == ']' || c == '*').trim();
        match cleaned.to_lowercase().as_str() {
            "repealed" => Ok(Status::Repealed),
            "renumbered" => Ok(Status::Renumbered),
            "reserved" => Ok(Status::Reserved),
            "transferred" => Ok(Status::Transferred),
            "omitted" => Ok(Status::Omitted),
            "vacant" => Ok(Status::Vacant),
            "appendix" => Ok(Status::Appendix),
            "inactive" => Ok(Status::Inactive),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

pub type StatusSet = BTreeSet<Status>;

/// Classified heading: what a raw heading string says about its element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingDescriptor {
    pub kind: Option<Kind>,
    pub enumeration: Option<EnumSpec>,
    pub title: Option<String>,
    pub status: Option<StatusSet>,
    /// Bracketed span of section numbers covered by the element ("[100 - 200]")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_range: Option<(String, String)>,
}

impl HeadingDescriptor {
    /// Descriptor carrying only a free-text title
    pub fn title_only(text: &str) -> Self {
        HeadingDescriptor {
            title: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.enumeration.is_none()
            && self.title.is_none()
            && self.status.is_none()
            && self.section_range.is_none()
    }

    pub fn has_status(&self, status: Status) -> bool {
        self.status.as_ref().is_some_and(|set| set.contains(&status))
    }

    /// Union `extra` into the status set, keeping `None` for an empty result.
    pub fn merge_status(&mut self, extra: &StatusSet) {
        if extra.is_empty() {
            return;
        }
        self.status.get_or_insert_with(StatusSet::new).extend(extra.iter().copied());
    }
}

/// Opaque handle to externally stored section text (e.g. an archive member name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(pub String);

impl ContentRef {
    pub fn new(name: &str) -> Self {
        ContentRef(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session law a code section was codified from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codification {
    pub statute_year: Option<String>,
    pub chapter: Option<String>,
    pub section: Option<String>,
}

impl Codification {
    pub fn is_empty(&self) -> bool {
        self.statute_year.is_none() && self.chapter.is_none() && self.section.is_none()
    }
}

/// Section attributes carried by the detail table next to the content handle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codification: Option<Codification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    /// Authority and reference notes printed under a regulation section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SectionMeta {
    pub fn is_empty(&self) -> bool {
        self.codification.is_none() && self.history.is_none() && self.notes.is_none()
    }
}

/// How an organizational record addresses its place in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOrLevel {
    /// Dotted one-based path, with the nesting level the source declares (if any)
    Path {
        path: String,
        declared_level: Option<usize>,
    },
    /// Nesting level of a strictly nested stream; position comes from record order
    Level(usize),
}

/// One organizational row: a title, division, part, chapter, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgRecord {
    pub path_or_level: PathOrLevel,
    pub raw_heading: String,
    pub raw_status_flag: Option<String>,
}

/// Section index row: where a section sits in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionIndexRecord {
    pub surrogate_key: String,
    pub path: String,
    pub position: usize,
    pub identifier: String,
}

/// Section detail row: the content handle for a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDetailRecord {
    pub surrogate_key: String,
    pub content_ref: ContentRef,
    pub meta: SectionMeta,
}

impl SectionDetailRecord {
    pub fn new(key: &str, content_ref: &str) -> Self {
        SectionDetailRecord {
            surrogate_key: key.to_string(),
            content_ref: ContentRef::new(content_ref),
            meta: SectionMeta::default(),
        }
    }
}

/// Section listed inline under its organizational element, as tables of
/// contents list them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    /// One-based slot among the element's sections
    pub position: usize,
    pub raw_heading: String,
    pub content_ref: ContentRef,
    /// Identifier the source gives outside the heading, used when the
    /// heading itself has none ("Repealed.")
    pub identifier_hint: Option<EnumSpec>,
}

/// Errors raised while addressing or filling the tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Slot {position} under '{path}' already holds '{previous}', replaced by '{replacement}'")]
    DuplicateSlot {
        path: String,
        position: usize,
        previous: String,
        replacement: String,
    },

    #[error("Surrogate key '{0}' has no section index entry")]
    UnresolvedKey(String),
}

impl TreeError {
    pub fn invalid_path(path: &str, reason: &str) -> Self {
        TreeError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
