//! Heading classification
//!
//! Turns a free-text heading such as `"Chapter 14. Administration."` into a
//! [`HeadingDescriptor`]. The cascade is best effort: every input yields a
//! descriptor, and the rule that produced it is reported so callers can flag
//! headings that fell through to the plain-title fallback.

use lazy_static::lazy_static;
use regex::Regex;

use crate::grammar::GrammarConfig;
use crate::types::{EnumSpec, HeadingDescriptor, Kind, Status, StatusSet};

lazy_static! {
    // [Repealed]  [RESERVED]*  [ Renumbered ]
    static ref RE_BRACKET_STATUS: Regex = Regex::new(
        r"(?i)\[\s*(repealed|renumbered|reserved|transferred|omitted|vacant)\s*\]\s*\**"
    ).unwrap();

    // Repealed. Pub. L. 94-455 / REPEALED: case matters, "repealed provisions" is a title
    static ref RE_KEYWORD_STATUS: Regex = Regex::new(
        r"^(Repealed|Renumbered|Transferred|Omitted|Vacant|REPEALED|RENUMBERED|TRANSFERRED|OMITTED|VACANT)\b"
    ).unwrap();

    // CHAPTER 5 - REPEALED: the keyword is the whole title
    static ref RE_KEYWORD_TITLE: Regex = Regex::new(
        r"^\[?(Repealed|Renumbered|Transferred|Omitted|Vacant|REPEALED|RENUMBERED|TRANSFERRED|OMITTED|VACANT)\]?\.?$"
    ).unwrap();

    // DIVISION 1. GENERAL PROVISIONS [100. - 199.]
    static ref RE_SECTION_SPAN: Regex = Regex::new(
        r"\[\s*([^\]\s]+?)\.?\s*[-–]\s*([^\]\s]+?)\.?\s*\]\s*$"
    ).unwrap();

    // TITLE 5, APPENDIX - FEDERAL ADVISORY COMMITTEE ACT
    static ref RE_APPENDIX_SUFFIX: Regex = Regex::new(r"(?i),\s*APPENDIX\b").unwrap();

    static ref RE_LEADING_WORD: Regex = Regex::new(r"^([A-Za-z]+)(.*)$").unwrap();

    static ref RE_WORD_RANGE: Regex = Regex::new(r"(?i)^(.+?)\s+(?:to|through)\s+(.+)$").unwrap();
    static ref RE_DASH_RANGE: Regex = Regex::new(r"^(\S+?)\s*[-–—]\s*(\S+)$").unwrap();

    static ref RE_NUMERIC_TOKEN: Regex = Regex::new(r"^\d[\w.\-–:]*$").unwrap();
    static ref RE_LETTER_TOKEN: Regex = Regex::new(r"^(?:[A-Za-z]|[A-Z]\d[\w.\-–]*)$").unwrap();
    static ref RE_ROMAN_TOKEN: Regex = Regex::new(
        r"^M{0,4}(?:CM|CD|D?C{0,3})(?:XC|XL|L?X{0,3})(?:IX|IV|V?I{0,3})$"
    ).unwrap();

    // Section marker: §, §§, Sec., Section, Rule(s), Form
    static ref RE_SECTION_MARKER: Regex = Regex::new(
        r"(?i)^(§§|§|sec\.|(?:section|rules|rule|form)\b)\s*"
    ).unwrap();

    // 101 to 105. Title / 1.1-1.5 Title / 201—204 [Reserved]
    static ref RE_SECTION_RANGE: Regex = Regex::new(
        r"(?i)^(\S+?)\s*(?:—|–|-|\bto\b|\bthrough\b)\s*(\S+?)\.?(?:\s+(.*))?$"
    ).unwrap();
    static ref RE_SECTION_WORD_RANGE: Regex = Regex::new(
        r"(?i)^(\S+?)\s+(?:to|through)\s+(\S+?)\.?(?:\s+(.*))?$"
    ).unwrap();

    // §12. Title / §12.5. Title
    static ref RE_SECTION_NUMBER_PERIOD: Regex = Regex::new(r"^(\d\S*?)\.(?:\s+(.*))?$").unwrap();
    // §12 Title
    static ref RE_SECTION_NUMBER: Regex = Regex::new(r"^(\d\S*)(?:\s+(.*))?$").unwrap();
    // §A12. Title
    static ref RE_SECTION_TEXT_PERIOD: Regex = Regex::new(
        r"^(\S*?\d\S*?|[A-Z]{1,4}|[a-z])\.(?:\s+(.*))?$"
    ).unwrap();
    // §A12 Title
    static ref RE_SECTION_TEXT: Regex = Regex::new(
        r"^(\S*\d\S*|[A-Z]{1,4}|[a-z])(?:\s+(.*))?$"
    ).unwrap();
}

/// Per-call classification context
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    /// Tree depth the record sits at, when the caller knows it
    pub expected_level: Option<usize>,
    pub grammar: &'a GrammarConfig,
}

impl<'a> ParseContext<'a> {
    pub fn new(grammar: &'a GrammarConfig) -> Self {
        ParseContext { expected_level: None, grammar }
    }

    pub fn at_level(grammar: &'a GrammarConfig, level: usize) -> Self {
        ParseContext { expected_level: Some(level), grammar }
    }
}

/// Which step of the cascade produced a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingRule {
    /// Only status markers were present
    StatusOnly,
    /// `TYPE ENUM <sep> TITLE`
    ExplicitSeparator,
    /// `TYPE ENUM TITLE` without a separator
    BareEnumeration,
    /// Level word without an enumeration
    TypeOnly,
    /// Leading number or Roman numeral, kind from the level table
    NumericPrefix,
    /// Section heading with an identifier
    Section,
    /// Section heading covering a span of identifiers
    SectionRange,
    /// Nothing matched; the whole text is the title
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub descriptor: HeadingDescriptor,
    pub rule: HeadingRule,
}

impl Classification {
    fn new(descriptor: HeadingDescriptor, rule: HeadingRule) -> Self {
        Classification { descriptor, rule }
    }

    pub fn is_unclassified(&self) -> bool {
        self.rule == HeadingRule::Unclassified
    }
}

/// Classify an organizational heading. Never fails.
pub fn classify(raw: &str, ctx: &ParseContext) -> HeadingDescriptor {
    classify_with_rule(raw, ctx).descriptor
}

/// Classify an organizational heading and report the rule that matched.
pub fn classify_with_rule(raw: &str, ctx: &ParseContext) -> Classification {
    let grammar = ctx.grammar;
    let mut text = normalize_whitespace(raw);
    if grammar.repair_level_words {
        text = repair_level_words(&text);
    }

    let mut status = StatusSet::new();

    // dash-heavy tables bracket a whole repealed heading: [CHAPTER 5 - FOO]
    if grammar.keyword_markers
        && text.starts_with('[')
        && text.ends_with(']')
        && !RE_BRACKET_STATUS.is_match(&text)
    {
        text = normalize_whitespace(&text[1..text.len() - 1]);
        status.insert(Status::Repealed);
    }

    text = strip_bracket_markers(&text, &mut status);

    let mut section_range = None;
    if grammar.bracket_ranges {
        if let Some(caps) = RE_SECTION_SPAN.captures(&text) {
            section_range = Some((caps[1].to_string(), caps[2].to_string()));
            text = normalize_whitespace(&RE_SECTION_SPAN.replace(&text, ""));
        }
    }

    let mut appendix = false;
    if grammar.appendix_suffix && RE_APPENDIX_SUFFIX.is_match(&text) {
        appendix = true;
        status.insert(Status::Appendix);
        text = normalize_whitespace(&RE_APPENDIX_SUFFIX.replace(&text, ""));
    }

    let text = text.trim_end_matches('*').trim();

    let mut classification = if !status.is_empty() && !has_content(text) {
        Classification::new(HeadingDescriptor::default(), HeadingRule::StatusOnly)
    } else {
        classify_structure(text, ctx)
    };

    if grammar.keyword_markers {
        let keyword = classification
            .descriptor
            .title
            .as_deref()
            .and_then(|title| RE_KEYWORD_TITLE.captures(title.trim()))
            .and_then(|caps| caps[1].parse::<Status>().ok());
        if let Some(keyword) = keyword {
            status.insert(keyword);
            classification.descriptor.title = None;
            if classification.is_unclassified() {
                classification.rule = HeadingRule::StatusOnly;
            }
        }
    }

    // a heading nothing recognized is kept as written
    if classification.is_unclassified()
        && status.is_empty()
        && section_range.is_none()
        && !appendix
    {
        classification.descriptor.title = Some(raw.trim().to_string());
    }

    let descriptor = &mut classification.descriptor;
    descriptor.merge_status(&status);
    descriptor.section_range = section_range;

    // appendices share the number of the element they follow
    if appendix {
        if let Some(EnumSpec::Scalar(label)) = descriptor.enumeration.as_mut() {
            label.push('A');
        }
    }

    classification
}

/// Classify a section heading such as `"§ 12. Definitions"`. Never fails.
///
/// A result with rule [`HeadingRule::Unclassified`] has no identifier.
pub fn classify_section(raw: &str, ctx: &ParseContext) -> Classification {
    let grammar = ctx.grammar;
    let mut status = StatusSet::new();
    let text = strip_bracket_markers(&normalize_whitespace(raw), &mut status);

    let (kind, marker, rest) = match RE_SECTION_MARKER.captures(&text) {
        Some(caps) => {
            let marker = caps[1].to_lowercase();
            let kind = match marker.as_str() {
                "rule" | "rules" => Kind::Rule,
                "form" => Kind::Form,
                _ => Kind::Section,
            };
            (kind, marker, text[caps[0].len()..].trim().to_string())
        }
        None => (Kind::Section, String::new(), text.clone()),
    };

    let mut descriptor = HeadingDescriptor {
        kind: Some(kind),
        ..Default::default()
    };

    descriptor.merge_status(&status);

    let rest = rest.trim_end_matches('*').trim();
    if let Some(keyword) = keyword_status(Some(rest), grammar) {
        return status_only_section(descriptor, keyword);
    }
    if rest.is_empty() {
        if descriptor.status.is_some() {
            return Classification::new(descriptor, HeadingRule::StatusOnly);
        }
        descriptor.title = Some(String::new());
        return Classification::new(descriptor, HeadingRule::Unclassified);
    }

    let range_re: &Regex = if marker == "§§" {
        &RE_SECTION_RANGE
    } else {
        &RE_SECTION_WORD_RANGE
    };
    if let Some(caps) = range_re.captures(rest) {
        let title = caps.get(3).map(|m| m.as_str());
        if let Some(keyword) = keyword_status(title, grammar) {
            return status_only_section(descriptor, keyword);
        }
        descriptor.enumeration = Some(EnumSpec::range(&caps[1], &caps[2]));
        descriptor.title = section_title(title, grammar);
        return Classification::new(descriptor, HeadingRule::SectionRange);
    }

    for re in [
        &*RE_SECTION_NUMBER_PERIOD,
        &*RE_SECTION_NUMBER,
        &*RE_SECTION_TEXT_PERIOD,
        &*RE_SECTION_TEXT,
    ] {
        if let Some(caps) = re.captures(rest) {
            let title = caps.get(2).map(|m| m.as_str());
            if let Some(keyword) = keyword_status(title, grammar) {
                return status_only_section(descriptor, keyword);
            }
            let ident = caps[1].trim_end_matches('.');
            descriptor.enumeration = Some(EnumSpec::scalar(ident));
            descriptor.title = section_title(title, grammar);
            return Classification::new(descriptor, HeadingRule::Section);
        }
    }

    descriptor.title = Some(rest.to_string());
    Classification::new(descriptor, HeadingRule::Unclassified)
}

/// Level word opening a heading, if any (`"Appendix A"` gives `Appendix`)
pub fn leading_kind(raw: &str) -> Option<Kind> {
    let text = normalize_whitespace(raw);
    let caps = RE_LEADING_WORD.captures(&text)?;
    let (kind, _) = Kind::from_level_word(&caps[1])?;
    Kind::HEADING_WORDS.contains(&kind).then_some(kind)
}

fn classify_structure(text: &str, ctx: &ParseContext) -> Classification {
    if let Some(caps) = RE_LEADING_WORD.captures(text) {
        if let Some((kind, plural)) = Kind::from_level_word(&caps[1]) {
            if Kind::HEADING_WORDS.contains(&kind) {
                if let Some(classification) = classify_typed(kind, plural, &caps[2]) {
                    return classification;
                }
            }
        }
    }

    if let Some(classification) = classify_numeric_prefix(text, ctx) {
        return classification;
    }

    Classification::new(HeadingDescriptor::title_only(text), HeadingRule::Unclassified)
}

/// `rest` is everything after the level word, leading whitespace included.
fn classify_typed(kind: Kind, plural: bool, rest: &str) -> Option<Classification> {
    // the level word must end at a word boundary: "Parts" yes, "Partial" no
    if rest.starts_with(|c: char| c.is_alphanumeric()) {
        return None;
    }

    if let Some((start, end)) = find_separator(rest) {
        let descriptor = HeadingDescriptor {
            kind: Some(kind),
            enumeration: enumeration_of(&rest[..start], plural),
            title: clean_field(&rest[end..]),
            ..Default::default()
        };
        return Some(Classification::new(descriptor, HeadingRule::ExplicitSeparator));
    }

    let rest = rest.trim();
    if rest.is_empty() {
        let descriptor = HeadingDescriptor {
            kind: Some(kind),
            ..Default::default()
        };
        return Some(Classification::new(descriptor, HeadingRule::TypeOnly));
    }

    let tokens: Vec<&str> = rest.split(' ').collect();

    // Sections 100 to 200 General
    if tokens.len() >= 3
        && is_enumeration_token(tokens[0])
        && matches!(tokens[1].to_lowercase().as_str(), "to" | "through")
        && is_enumeration_token(tokens[2])
    {
        let descriptor = HeadingDescriptor {
            kind: Some(kind),
            enumeration: Some(EnumSpec::range(
                tokens[0].trim_end_matches('.'),
                tokens[2].trim_end_matches('.'),
            )),
            title: clean_field(&tokens[3..].join(" ")),
            ..Default::default()
        };
        return Some(Classification::new(descriptor, HeadingRule::BareEnumeration));
    }

    if is_enumeration_token(tokens[0]) {
        let descriptor = HeadingDescriptor {
            kind: Some(kind),
            enumeration: enumeration_of(tokens[0], plural),
            title: clean_field(&tokens[1..].join(" ")),
            ..Default::default()
        };
        return Some(Classification::new(descriptor, HeadingRule::BareEnumeration));
    }

    None
}

fn classify_numeric_prefix(text: &str, ctx: &ParseContext) -> Option<Classification> {
    let kind = ctx
        .expected_level
        .and_then(|level| ctx.grammar.kind_for_level(level))?;

    let (token, rest) = match text.split_once(' ') {
        Some((token, rest)) => (token, rest),
        None => (text, ""),
    };
    let label = token.trim_end_matches('.');
    if label.is_empty() || !(RE_NUMERIC_TOKEN.is_match(label) || RE_ROMAN_TOKEN.is_match(label)) {
        return None;
    }

    let rest = rest.trim_start_matches(|c: char| c == '-' || c == '—' || c == '–' || c == ' ');
    let descriptor = HeadingDescriptor {
        kind: Some(kind),
        enumeration: Some(EnumSpec::scalar(label)),
        title: clean_field(rest),
        ..Default::default()
    };
    Some(Classification::new(descriptor, HeadingRule::NumericPrefix))
}

/// First separator after the level word, as a byte range.
///
/// Em and en dashes always separate. A hyphen separates unless it joins two
/// alphanumerics ("4-7", "12-A"). A period separates when followed by
/// whitespace or the end of the text.
fn find_separator(rest: &str) -> Option<(usize, usize)> {
    let chars: Vec<(usize, char)> = rest.char_indices().collect();
    for (i, &(pos, c)) in chars.iter().enumerate() {
        let end = pos + c.len_utf8();
        let prev = i.checked_sub(1).map(|j| chars[j].1);
        let next = chars.get(i + 1).map(|&(_, n)| n);
        match c {
            '—' | '–' => return Some((pos, end)),
            '-' => {
                let joined = prev.is_some_and(char::is_alphanumeric)
                    && next.is_some_and(char::is_alphanumeric);
                if !joined {
                    return Some((pos, end));
                }
            }
            '.' => {
                if next.is_none_or(char::is_whitespace) {
                    return Some((pos, end));
                }
            }
            _ => {}
        }
    }
    None
}

fn enumeration_of(raw: &str, plural: bool) -> Option<EnumSpec> {
    let label = raw.trim().trim_end_matches('.').trim();
    if !has_content(label) {
        return None;
    }

    if let Some(caps) = RE_WORD_RANGE.captures(label) {
        return Some(EnumSpec::range(caps[1].trim(), caps[2].trim()));
    }
    if plural {
        if let Some(caps) = RE_DASH_RANGE.captures(label) {
            return Some(EnumSpec::range(&caps[1], &caps[2]));
        }
    }
    Some(EnumSpec::scalar(label))
}

fn is_enumeration_token(token: &str) -> bool {
    let label = token.trim_end_matches('.');
    !label.is_empty()
        && (RE_NUMERIC_TOKEN.is_match(label)
            || RE_LETTER_TOKEN.is_match(label)
            || RE_ROMAN_TOKEN.is_match(label))
}

fn section_title(raw: Option<&str>, grammar: &GrammarConfig) -> Option<String> {
    let mut title = clean_field(raw?)?;
    if grammar.terminate_section_titles && !title.ends_with('.') {
        title.push('.');
    }
    Some(title)
}

fn strip_bracket_markers(text: &str, status: &mut StatusSet) -> String {
    if !RE_BRACKET_STATUS.is_match(text) {
        return text.to_string();
    }
    for caps in RE_BRACKET_STATUS.captures_iter(text) {
        if let Ok(s) = caps[1].parse::<Status>() {
            status.insert(s);
        }
    }
    normalize_whitespace(&RE_BRACKET_STATUS.replace_all(text, " "))
}

/// Status keyword opening a section title ("Repealed. Pub. L. 94-455")
fn keyword_status(title: Option<&str>, grammar: &GrammarConfig) -> Option<Status> {
    if !grammar.keyword_markers {
        return None;
    }
    let caps = RE_KEYWORD_STATUS.captures(title?.trim())?;
    caps[1].parse::<Status>().ok()
}

// a repealed or renumbered section keeps nothing but its status
fn status_only_section(mut descriptor: HeadingDescriptor, keyword: Status) -> Classification {
    descriptor.merge_status(&StatusSet::from([keyword]));
    Classification::new(descriptor, HeadingRule::StatusOnly)
}

/// Fix level words mangled by the CFR typesetting ("S ubpart", "SubpartA")
fn repair_level_words(text: &str) -> String {
    if let Some(rest) = text.strip_prefix("S ubpart") {
        return format!("Subpart{}", rest);
    }
    if let Some(rest) = text.strip_prefix("Supart") {
        return format!("Subpart{}", rest);
    }
    for word in ["Subparts", "Subpart"] {
        if let Some(rest) = text.strip_prefix(word) {
            let joined = rest
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() && !(word == "Subpart" && c == 's'));
            if joined {
                return format!("{} {}", word, rest);
            }
            break;
        }
    }
    text.to_string()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_content(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

/// Trimmed field, or `None` when nothing but punctuation is left
fn clean_field(text: &str) -> Option<String> {
    let trimmed = text.trim();
    has_content(trimmed).then(|| trimmed.to_string())
}
