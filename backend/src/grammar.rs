//! Heading grammars of the supported datasets
//!
//! Each dataset family writes its headings a little differently. A
//! [`GrammarConfig`] is built once per run from a [`GrammarVariant`] and passed
//! by reference to the classifier and the builders.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrammarVariant {
    /// California codes and regulations: `Chapter 14. Administration. [Repealed]`
    BracketHeavy,
    /// US Code tables of contents: `CHAPTER 3 - ORGANIZATION, APPENDIX`
    DashHeavy,
    /// Code of Federal Regulations: `Subpart B—Procedures [Reserved]`
    EmDashHeavy,
}

impl GrammarVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrammarVariant::BracketHeavy => "bracket-heavy",
            GrammarVariant::DashHeavy => "dash-heavy",
            GrammarVariant::EmDashHeavy => "em-dash-heavy",
        }
    }
}

impl fmt::Display for GrammarVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid grammar variant: {0}")]
pub struct ParseGrammarError(String);

impl FromStr for GrammarVariant {
    type Err = ParseGrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "bracket-heavy" | "bracket" | "ca" => Ok(GrammarVariant::BracketHeavy),
            "dash-heavy" | "dash" | "usc" => Ok(GrammarVariant::DashHeavy),
            "em-dash-heavy" | "em-dash" | "emdash" | "cfr" => Ok(GrammarVariant::EmDashHeavy),
            _ => Err(ParseGrammarError(s.to_string())),
        }
    }
}

/// Level words the numbered-outline exports use, by outline depth.
///
/// Depth 8 holds sections and appendices; the heading word wins over this
/// table whenever one is present.
pub const OUTLINE_LEVELS: [Kind; 8] = [
    Kind::Title,
    Kind::Division,
    Kind::Part,
    Kind::Chapter,
    Kind::Subchapter,
    Kind::Article,
    Kind::Subarticle,
    Kind::Section,
];

/// Nesting of the organizational elements in a federal regulations volume.
pub const CFR_LEVELS: [Kind; 5] = [
    Kind::Subtitle,
    Kind::Chapter,
    Kind::Subchapter,
    Kind::Part,
    Kind::Subpart,
];

/// Immutable heading grammar for one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarConfig {
    pub variant: GrammarVariant,
    /// Kind implied by tree depth (index 0 is depth 1) when a heading has no
    /// level word of its own
    pub levels: Vec<Kind>,
    /// Accept unbracketed status keywords standing in for a title ("CHAPTER 5 - REPEALED")
    pub keyword_markers: bool,
    /// Accept a trailing `[start - end]` span of covered section numbers
    pub bracket_ranges: bool,
    /// Accept `, APPENDIX` after the enumeration
    pub appendix_suffix: bool,
    /// Repair known level-word typos ("S ubpart", "SubpartA")
    pub repair_level_words: bool,
    /// End section titles with a period
    pub terminate_section_titles: bool,
}

impl GrammarConfig {
    pub fn for_variant(variant: GrammarVariant) -> Self {
        match variant {
            GrammarVariant::BracketHeavy => GrammarConfig {
                variant,
                levels: vec![Kind::Division, Kind::Part, Kind::Chapter, Kind::Article],
                keyword_markers: false,
                bracket_ranges: true,
                appendix_suffix: false,
                repair_level_words: false,
                terminate_section_titles: true,
            },
            GrammarVariant::DashHeavy => GrammarConfig {
                variant,
                levels: vec![
                    Kind::Subtitle,
                    Kind::Chapter,
                    Kind::Subchapter,
                    Kind::Part,
                    Kind::Subpart,
                ],
                keyword_markers: true,
                bracket_ranges: false,
                appendix_suffix: true,
                repair_level_words: false,
                terminate_section_titles: true,
            },
            GrammarVariant::EmDashHeavy => GrammarConfig {
                variant,
                levels: vec![Kind::Chapter, Kind::Subchapter, Kind::Part, Kind::Subpart],
                keyword_markers: false,
                bracket_ranges: false,
                appendix_suffix: false,
                repair_level_words: true,
                terminate_section_titles: false,
            },
        }
    }

    pub fn with_levels(mut self, levels: &[Kind]) -> Self {
        self.levels = levels.to_vec();
        self
    }

    /// Kind implied by a one-based tree depth
    pub fn kind_for_level(&self, depth: usize) -> Option<Kind> {
        depth.checked_sub(1).and_then(|i| self.levels.get(i)).copied()
    }

    /// Whether records at this depth carry section headings
    pub fn is_section_level(&self, depth: usize) -> bool {
        matches!(
            self.kind_for_level(depth),
            Some(Kind::Section) | Some(Kind::Rule) | Some(Kind::Form)
        )
    }
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig::for_variant(GrammarVariant::BracketHeavy)
    }
}
