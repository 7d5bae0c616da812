pub mod types;
pub mod grammar;
pub mod path_tree;
pub mod heading;
pub mod diagnostics;
pub mod structure_builder;
pub mod section_correlator;
pub mod tree_emitter;
pub mod settings;
pub mod logger;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use grammar::{GrammarConfig, GrammarVariant};
pub use heading::{classify, classify_section, classify_with_rule, Classification, HeadingRule, ParseContext};
pub use path_tree::{LeafSlot, Node, NodeHandle, NodeRole, PathTree, SparseSeq};
pub use section_correlator::{CorrelationReport, SectionCorrelator, SectionIndex};
pub use settings::ConverterSettings;
pub use structure_builder::{BuiltDocument, InvalidPathPolicy, StructureBuilder};
pub use tree_emitter::{emit, Facts, StructuralFact};
pub use types::*;
