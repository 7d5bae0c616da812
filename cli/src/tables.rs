//! Readers for the California codes table set
//!
//! The legislature publishes each code as four tab-delimited `.dat` tables
//! quoted with backticks. `NULL` stands for a missing value.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::StringRecord;
use thiserror::Error;

use lawtree_backend::logger;
use lawtree_backend::types::{
    Codification, OrgRecord, PathOrLevel, SectionDetailRecord, SectionIndexRecord, SectionMeta,
};

pub const CODES_TBL: &str = "CODES_TBL.dat";
pub const LAW_TOC_TBL: &str = "LAW_TOC_TBL.dat";
pub const LAW_TOC_SECTIONS_TBL: &str = "LAW_TOC_SECTIONS_TBL.dat";
pub const LAW_SECTION_TBL: &str = "LAW_SECTION_TBL.dat";

// CODES_TBL
const CODE_COL: usize = 0;
const CODE_TITLE_COL: usize = 1;

// LAW_TOC_TBL
const TOC_CODE_COL: usize = 0;
const TOC_HEADING_COL: usize = 6;
const TOC_ACTIVE_COL: usize = 7;
const TOC_LEVEL_COL: usize = 11;
const TOC_TREEPATH_COL: usize = 13;

// LAW_TOC_SECTIONS_TBL
const SEC_CODE_COL: usize = 1;
const SEC_TREEPATH_COL: usize = 2;
const SEC_NUM_COL: usize = 3;
const SEC_ORDER_COL: usize = 4;
const SEC_VERSION_COL: usize = 11;

// LAW_SECTION_TBL
const DETAIL_CODE_COL: usize = 1;
const DETAIL_STAT_YEAR_COL: usize = 3;
const DETAIL_STAT_CHAPTER_COL: usize = 4;
const DETAIL_STAT_SECTION_COL: usize = 5;
const DETAIL_VERSION_COL: usize = 7;
const DETAIL_HISTORY_COL: usize = 13;
const DETAIL_CONTENT_COL: usize = 14;
const DETAIL_ACTIVE_COL: usize = 15;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TableError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Missing {table} in {dir}")]
    MissingTable { table: &'static str, dir: PathBuf },

    #[error("{table} line {line}: missing column {col}")]
    MissingColumn { table: String, line: u64, col: usize },
}

/// One row of `CODES_TBL`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: String,
    pub title: String,
}

/// Directory holding an unpacked table set
#[derive(Debug, Clone)]
pub struct TableSet {
    dir: PathBuf,
}

impl TableSet {
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(TableError::NotADirectory(dir.to_path_buf()).into());
        }
        if !dir.join(CODES_TBL).exists() {
            return Err(TableError::MissingTable {
                table: CODES_TBL,
                dir: dir.to_path_buf(),
            }
            .into());
        }
        Ok(TableSet { dir: dir.to_path_buf() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn read_codes(&self) -> Result<Vec<CodeEntry>> {
        let mut codes = Vec::new();
        for row in self.rows(CODES_TBL)? {
            let row = row?;
            let code = field(&row, CODE_COL, CODES_TBL)?;
            // "* BUSINESS AND PROFESSIONS CODE - BPC"
            let title = field(&row, CODE_TITLE_COL, CODES_TBL)?
                .trim_matches(|c| c == '*' || c == ' ');
            let title = title.split(" - ").next().unwrap_or(title);
            codes.push(CodeEntry {
                code: code.to_string(),
                title: title.to_string(),
            });
        }
        Ok(codes)
    }

    /// Organizational rows grouped by code
    pub fn read_org(&self) -> Result<BTreeMap<String, Vec<OrgRecord>>> {
        let mut grouped: BTreeMap<String, Vec<OrgRecord>> = BTreeMap::new();
        for row in self.rows(LAW_TOC_TBL)? {
            let row = row?;
            let code = field(&row, TOC_CODE_COL, LAW_TOC_TBL)?;
            let declared_level = field(&row, TOC_LEVEL_COL, LAW_TOC_TBL)?.trim().parse().ok();
            let raw_status_flag = match field(&row, TOC_ACTIVE_COL, LAW_TOC_TBL)? {
                "N" => Some("inactive".to_string()),
                _ => None,
            };

            grouped.entry(code.to_string()).or_default().push(OrgRecord {
                path_or_level: PathOrLevel::Path {
                    path: field(&row, TOC_TREEPATH_COL, LAW_TOC_TBL)?.to_string(),
                    declared_level,
                },
                raw_heading: field(&row, TOC_HEADING_COL, LAW_TOC_TBL)?.to_string(),
                raw_status_flag,
            });
        }
        Ok(grouped)
    }

    /// Section locations grouped by code
    pub fn read_section_index(&self) -> Result<BTreeMap<String, Vec<SectionIndexRecord>>> {
        let mut grouped: BTreeMap<String, Vec<SectionIndexRecord>> = BTreeMap::new();
        for row in self.rows(LAW_TOC_SECTIONS_TBL)? {
            let row = row?;
            let key = field(&row, SEC_VERSION_COL, LAW_TOC_SECTIONS_TBL)?;
            let order = field(&row, SEC_ORDER_COL, LAW_TOC_SECTIONS_TBL)?;
            let Ok(position) = order.trim().parse::<usize>() else {
                logger::warn(&format!(
                    "{}: skipping section {} with order '{}'",
                    LAW_TOC_SECTIONS_TBL, key, order
                ));
                continue;
            };

            let code = field(&row, SEC_CODE_COL, LAW_TOC_SECTIONS_TBL)?;
            grouped.entry(code.to_string()).or_default().push(SectionIndexRecord {
                surrogate_key: key.to_string(),
                path: field(&row, SEC_TREEPATH_COL, LAW_TOC_SECTIONS_TBL)?.to_string(),
                position,
                identifier: field(&row, SEC_NUM_COL, LAW_TOC_SECTIONS_TBL)?.to_string(),
            });
        }
        Ok(grouped)
    }

    /// Section content handles grouped by code; inactive rows are dropped
    pub fn read_section_detail(&self) -> Result<BTreeMap<String, Vec<SectionDetailRecord>>> {
        let mut grouped: BTreeMap<String, Vec<SectionDetailRecord>> = BTreeMap::new();
        for row in self.rows(LAW_SECTION_TBL)? {
            let row = row?;
            let key = field(&row, DETAIL_VERSION_COL, LAW_SECTION_TBL)?;
            if field(&row, DETAIL_ACTIVE_COL, LAW_SECTION_TBL)? != "Y" {
                logger::warn(&format!("{}: skipping inactive section {}", LAW_SECTION_TBL, key));
                continue;
            }

            let codification = Codification {
                statute_year: nullable(field(&row, DETAIL_STAT_YEAR_COL, LAW_SECTION_TBL)?),
                chapter: nullable(field(&row, DETAIL_STAT_CHAPTER_COL, LAW_SECTION_TBL)?),
                section: nullable(field(&row, DETAIL_STAT_SECTION_COL, LAW_SECTION_TBL)?),
            };
            let mut record =
                SectionDetailRecord::new(key, field(&row, DETAIL_CONTENT_COL, LAW_SECTION_TBL)?);
            record.meta = SectionMeta {
                codification: (!codification.is_empty()).then_some(codification),
                history: nullable(field(&row, DETAIL_HISTORY_COL, LAW_SECTION_TBL)?),
                notes: None,
            };

            let code = field(&row, DETAIL_CODE_COL, LAW_SECTION_TBL)?;
            grouped.entry(code.to_string()).or_default().push(record);
        }
        Ok(grouped)
    }

    fn rows(&self, table: &str) -> Result<csv::StringRecordsIntoIter<File>> {
        let path = self.dir.join(table);
        let reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quote(b'`')
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(reader.into_records())
    }
}

fn field<'r>(row: &'r StringRecord, col: usize, table: &str) -> Result<&'r str, TableError> {
    row.get(col).ok_or_else(|| TableError::MissingColumn {
        table: table.to_string(),
        line: row.position().map(|p| p.line()).unwrap_or(0),
        col,
    })
}

fn nullable(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != "NULL").then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable() {
        assert_eq!(nullable("NULL"), None);
        assert_eq!(nullable(" "), None);
        assert_eq!(nullable("1872"), Some("1872".to_string()));
    }

    #[test]
    fn test_field_reports_missing_column() {
        let row = StringRecord::from(vec!["BPC", "1"]);
        assert_eq!(field(&row, 1, LAW_TOC_TBL), Ok("1"));
        assert!(matches!(
            field(&row, 13, LAW_TOC_TBL),
            Err(TableError::MissingColumn { col: 13, .. })
        ));
    }

    #[test]
    fn test_open_requires_codes_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = TableSet::open(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TableError>(),
            Some(TableError::MissingTable { .. })
        ));
        std::fs::write(dir.path().join(CODES_TBL), "").unwrap();
        assert!(TableSet::open(dir.path()).is_ok());
    }
}
