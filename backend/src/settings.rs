use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::grammar::{GrammarConfig, GrammarVariant};
use crate::structure_builder::InvalidPathPolicy;
use crate::types::Kind;

/// Converter settings, usually read from a JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterSettings {
    pub grammar: GrammarVariant,
    pub invalid_path_policy: InvalidPathPolicy,
    /// Replaces the grammar's depth to kind table
    pub levels: Option<Vec<Kind>>,
    /// Forces unbracketed status keywords on or off
    pub keyword_markers: Option<bool>,
    /// Where fact files are written; stdout when unset
    pub output_dir: Option<PathBuf>,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        ConverterSettings {
            grammar: GrammarVariant::BracketHeavy,
            invalid_path_policy: InvalidPathPolicy::Abort,
            levels: None,
            keyword_markers: None,
            output_dir: None,
        }
    }
}

impl ConverterSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    /// The selected grammar with the overrides applied
    pub fn grammar_config(&self) -> GrammarConfig {
        let mut config = GrammarConfig::for_variant(self.grammar);
        if let Some(levels) = &self.levels {
            config.levels = levels.clone();
        }
        if let Some(keyword_markers) = self.keyword_markers {
            config.keyword_markers = keyword_markers;
        }
        config
    }
}
