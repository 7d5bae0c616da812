//! Builds the organizational skeleton of a document from heading records

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::grammar::GrammarConfig;
use crate::heading::{classify_section, classify_with_rule, leading_kind, ParseContext};
use crate::path_tree::{LeafSlot, NodeHandle, NodeRole, PathTree};
use crate::types::{
    ContentRef, HeadingDescriptor, OrgRecord, PathOrLevel, SectionMeta, SectionRecord, Status,
    StatusSet, TreeError,
};

/// What to do with an organizational record whose path cannot be addressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidPathPolicy {
    /// Stop building this document and return the error
    #[default]
    Abort,
    /// Record a diagnostic and continue with the next record
    Skip,
}

/// A tree together with the diagnostics collected while building it
#[derive(Debug, Clone)]
pub struct BuiltDocument {
    pub tree: PathTree,
    pub diagnostics: Diagnostics,
}

impl BuiltDocument {
    pub fn new(tree: PathTree) -> Self {
        BuiltDocument {
            tree,
            diagnostics: Diagnostics::new(),
        }
    }
}

pub struct StructureBuilder<'a> {
    grammar: &'a GrammarConfig,
    policy: InvalidPathPolicy,
    tree: PathTree,
    diagnostics: Diagnostics,
    // open elements of a level-addressed stream, outermost first
    open_levels: Vec<(usize, NodeHandle)>,
}

impl<'a> StructureBuilder<'a> {
    pub fn new(grammar: &'a GrammarConfig, root: HeadingDescriptor, policy: InvalidPathPolicy) -> Self {
        StructureBuilder {
            grammar,
            policy,
            tree: PathTree::new(root),
            diagnostics: Diagnostics::new(),
            open_levels: Vec::new(),
        }
    }

    /// Ingest every record, in any order, and hand back the built document.
    ///
    /// Only an unaddressable record under [`InvalidPathPolicy::Abort`] fails.
    pub fn ingest<I>(mut self, records: I) -> Result<BuiltDocument, TreeError>
    where
        I: IntoIterator<Item = OrgRecord>,
    {
        for record in records {
            self.ingest_record(&record)?;
        }
        Ok(self.finish())
    }

    /// Place one record; `None` when it was skipped under [`InvalidPathPolicy::Skip`].
    pub fn ingest_record(&mut self, record: &OrgRecord) -> Result<Option<NodeHandle>, TreeError> {
        match self.place(&record.path_or_level) {
            Ok((handle, declared)) => {
                self.apply_heading(handle, declared, record);
                Ok(Some(handle))
            }
            Err(err) => match self.policy {
                InvalidPathPolicy::Abort => Err(err),
                InvalidPathPolicy::Skip => {
                    self.diagnostics.record(Diagnostic::from_error(&err));
                    Ok(None)
                }
            },
        }
    }

    /// Put a section listed under `parent` into its section slot.
    ///
    /// The heading is classified as a section heading; a heading without an
    /// identifier falls back to the record's hint. `None` when skipped under
    /// [`InvalidPathPolicy::Skip`].
    pub fn attach_section(
        &mut self,
        parent: NodeHandle,
        record: &SectionRecord,
    ) -> Result<Option<NodeHandle>, TreeError> {
        let slot = match self.tree.attach_leaf(parent, record.position, record.content_ref.clone()) {
            Ok(slot) => slot,
            Err(err) => match self.policy {
                InvalidPathPolicy::Abort => return Err(err),
                InvalidPathPolicy::Skip => {
                    self.diagnostics.record(Diagnostic::from_error(&err));
                    return Ok(None);
                }
            },
        };

        let handle = slot.handle();
        if let LeafSlot::Replaced { previous, .. } = &slot {
            self.diagnostics.record(Diagnostic::DuplicateSlot {
                path: self.tree.path_of(parent),
                position: record.position,
                previous: Some(previous.to_string()),
                replacement: record.content_ref.to_string(),
            });
        }

        let ctx = ParseContext::new(self.grammar);
        let mut descriptor = classify_section(&record.raw_heading, &ctx).descriptor;
        if descriptor.enumeration.is_none() {
            descriptor.enumeration = record.identifier_hint.clone();
        }
        if descriptor.enumeration.is_none() && descriptor.status.is_none() {
            self.diagnostics.record(Diagnostic::MissingSectionIdentifier {
                path: self.tree.path_of(handle),
                raw: record.raw_heading.clone(),
            });
        }
        self.tree.set_header(handle, descriptor);

        Ok(Some(handle))
    }

    /// Attach body text to a node placed earlier; returns what it replaced.
    pub fn set_content(&mut self, handle: NodeHandle, content_ref: ContentRef) -> Option<ContentRef> {
        self.tree.set_content(handle, content_ref)
    }

    pub fn set_section_meta(&mut self, handle: NodeHandle, meta: SectionMeta) {
        self.tree.set_section_meta(handle, meta);
    }

    pub fn root(&self) -> NodeHandle {
        self.tree.root()
    }

    pub fn finish(self) -> BuiltDocument {
        BuiltDocument {
            tree: self.tree,
            diagnostics: self.diagnostics,
        }
    }

    /// Node for a record and the nesting level its source declares.
    ///
    /// Level streams report no declared level: their depth is whatever the
    /// open levels make it, and skipping a level is ordinary.
    fn place(&mut self, path_or_level: &PathOrLevel) -> Result<(NodeHandle, Option<usize>), TreeError> {
        match path_or_level {
            PathOrLevel::Path {
                path,
                declared_level,
            } => {
                let handle = self.tree.get_or_create(path)?;
                Ok((handle, *declared_level))
            }
            PathOrLevel::Level(level) => {
                if *level == 0 {
                    return Err(TreeError::invalid_path("", "nesting level 0"));
                }

                // a new element closes every open element at its level or deeper
                while self.open_levels.last().is_some_and(|(open, _)| open >= level) {
                    self.open_levels.pop();
                }
                let parent = self
                    .open_levels
                    .last()
                    .map(|(_, handle)| *handle)
                    .unwrap_or_else(|| self.tree.root());

                let handle = self.tree.append_child_slot(parent)?;
                self.open_levels.push((*level, handle));
                Ok((handle, None))
            }
        }
    }

    fn apply_heading(&mut self, handle: NodeHandle, declared: Option<usize>, record: &OrgRecord) {
        let depth = self.tree.depth_of(handle);
        let path = self.tree.path_of(handle);

        if let Some(declared) = declared {
            if declared != depth {
                self.diagnostics.record(Diagnostic::LevelMismatch {
                    path: path.clone(),
                    declared,
                    actual: depth,
                });
            }
        }

        // level streams name their level outright; paths only know their depth
        let level = match record.path_or_level {
            PathOrLevel::Level(n) => n,
            PathOrLevel::Path { .. } => depth,
        };
        let ctx = ParseContext::at_level(self.grammar, level);

        let section_heading =
            self.grammar.is_section_level(level) && leading_kind(&record.raw_heading).is_none();

        let classification = if section_heading {
            let c = classify_section(&record.raw_heading, &ctx);
            if c.is_unclassified() {
                self.diagnostics.record(Diagnostic::MissingSectionIdentifier {
                    path: path.clone(),
                    raw: record.raw_heading.clone(),
                });
            }
            c
        } else {
            let c = classify_with_rule(&record.raw_heading, &ctx);
            if c.is_unclassified() {
                self.diagnostics.record(Diagnostic::UnclassifiableHeading {
                    path: path.clone(),
                    raw: record.raw_heading.clone(),
                });
            }
            c
        };

        let mut descriptor = classification.descriptor;
        if let Some(flag) = &record.raw_status_flag {
            descriptor.merge_status(&status_flags(flag));
        }

        let node = self.tree.node(handle);
        if node.role == NodeRole::Organizational {
            let parent_path = node
                .parent()
                .map(|parent| self.tree.path_of(parent))
                .unwrap_or_default();
            self.diagnostics.record(Diagnostic::DuplicateSlot {
                path: parent_path,
                position: node.position(),
                previous: node.descriptor.title.clone(),
                replacement: record.raw_heading.clone(),
            });
        }

        self.tree.set_header(handle, descriptor);
    }
}

/// Statuses named by a table flag column ("repealed", "inactive, reserved")
fn status_flags(flag: &str) -> StatusSet {
    flag.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<Status>() {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::debug!("ignoring status flag: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::grammar::{GrammarVariant, OUTLINE_LEVELS};
    use crate::types::{EnumSpec, Kind};

    fn path_record(path: &str, level: Option<usize>, heading: &str) -> OrgRecord {
        OrgRecord {
            path_or_level: PathOrLevel::Path {
                path: path.to_string(),
                declared_level: level,
            },
            raw_heading: heading.to_string(),
            raw_status_flag: None,
        }
    }

    fn level_record(level: usize, heading: &str) -> OrgRecord {
        OrgRecord {
            path_or_level: PathOrLevel::Level(level),
            raw_heading: heading.to_string(),
            raw_status_flag: None,
        }
    }

    fn root() -> HeadingDescriptor {
        HeadingDescriptor::title_only("Civil Code")
    }

    #[test]
    fn test_out_of_order_paths() {
        let g = GrammarConfig::for_variant(GrammarVariant::BracketHeavy);
        let records = vec![
            path_record("1.2", Some(2), "Chapter 2. Remedies."),
            path_record("1", Some(1), "Division 1. Persons."),
            path_record("1.1", Some(2), "Chapter 1. General."),
        ];
        let doc = StructureBuilder::new(&g, root(), InvalidPathPolicy::Abort)
            .ingest(records)
            .unwrap();

        let tree = &doc.tree;
        let division = tree.find("1").unwrap();
        assert_eq!(tree.node(division).kind(), Some(Kind::Division));
        assert_eq!(tree.node(division).children.filled_count(), 2);

        let chapter = tree.node(tree.find("1.2").unwrap());
        assert_eq!(chapter.descriptor.enumeration, Some(EnumSpec::scalar("2")));
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn test_level_mismatch_keeps_path_depth() {
        let g = GrammarConfig::default();
        let doc = StructureBuilder::new(&g, root(), InvalidPathPolicy::Abort)
            .ingest(vec![path_record("2.1", Some(3), "Article 1. Scope.")])
            .unwrap();

        assert_eq!(doc.diagnostics.count(DiagnosticKind::LevelMismatch), 1);
        let handle = doc.tree.find("2.1").unwrap();
        assert_eq!(doc.tree.depth_of(handle), 2);
        assert_eq!(doc.tree.node(handle).kind(), Some(Kind::Article));
    }

    #[test]
    fn test_invalid_path_policies() {
        let g = GrammarConfig::default();
        let records = vec![
            path_record("1", None, "Part 1. Scope."),
            path_record("1.x", None, "Chapter 1. Broken."),
            path_record("2", None, "Part 2. Other."),
        ];

        let err = StructureBuilder::new(&g, root(), InvalidPathPolicy::Abort)
            .ingest(records.clone())
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidPath { .. }));

        let doc = StructureBuilder::new(&g, root(), InvalidPathPolicy::Skip)
            .ingest(records)
            .unwrap();
        assert_eq!(doc.diagnostics.count(DiagnosticKind::InvalidPath), 1);
        assert!(doc.tree.find("2").is_some());
    }

    #[test]
    fn test_level_stream_nesting() {
        let g = GrammarConfig::default().with_levels(&OUTLINE_LEVELS);
        let records = vec![
            level_record(1, "TITLE 1. General Provisions"),
            level_record(4, "Chapter 1. Office of Administrative Law"),
            level_record(8, "§1. Definitions."),
            level_record(8, "§2. Scope."),
            level_record(2, "Division 2. Other"),
            level_record(4, "Chapter 1. Fees"),
        ];
        let doc = StructureBuilder::new(&g, root(), InvalidPathPolicy::Abort)
            .ingest(records)
            .unwrap();
        let tree = &doc.tree;

        let chapter = tree.find("1.1").unwrap();
        assert_eq!(tree.node(chapter).kind(), Some(Kind::Chapter));

        let second = tree.node(tree.find("1.1.2").unwrap());
        assert_eq!(second.kind(), Some(Kind::Section));
        assert_eq!(second.descriptor.enumeration, Some(EnumSpec::scalar("2")));
        assert_eq!(second.descriptor.title.as_deref(), Some("Scope."));

        // the division closes the chapter and becomes the title's second child
        let division = tree.node(tree.find("1.2").unwrap());
        assert_eq!(division.kind(), Some(Kind::Division));
        assert!(tree.find("1.2.1").is_some());

        // LVL0 to LVL2 skips a level without being a mismatch
        assert_eq!(doc.diagnostics.count(DiagnosticKind::LevelMismatch), 0);
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn test_skipped_outline_levels_are_quiet() {
        let g = GrammarConfig::default().with_levels(&OUTLINE_LEVELS);
        let records = vec![
            level_record(1, "TITLE 2. Administration"),
            level_record(2, "Division 1. Administrative Personnel"),
            level_record(5, "Article 1. General"),
            level_record(8, "§1. Purpose."),
            level_record(3, "Part 2. Boards"),
            level_record(8, "§10. Members."),
        ];
        let mut builder = StructureBuilder::new(&g, root(), InvalidPathPolicy::Abort);
        let mut handles = Vec::new();
        for record in &records {
            handles.push(builder.ingest_record(record).unwrap().unwrap());
        }
        let doc = builder.finish();

        assert_eq!(doc.diagnostics.count(DiagnosticKind::LevelMismatch), 0);
        assert_eq!(doc.tree.path_of(handles[2]), "1.1.1");
        assert_eq!(doc.tree.path_of(handles[3]), "1.1.1.1");
        assert_eq!(doc.tree.path_of(handles[5]), "1.1.2.1");
    }

    fn section(position: usize, heading: &str, content: &str) -> SectionRecord {
        SectionRecord {
            position,
            raw_heading: heading.to_string(),
            content_ref: ContentRef::new(content),
            identifier_hint: None,
        }
    }

    #[test]
    fn test_inline_sections() {
        let g = GrammarConfig::for_variant(GrammarVariant::DashHeavy);
        let mut builder = StructureBuilder::new(&g, root(), InvalidPathPolicy::Skip);
        let chapter = builder
            .ingest_record(&level_record(1, "CHAPTER 1 - RULES OF CONSTRUCTION"))
            .unwrap()
            .unwrap();

        let first = builder
            .attach_section(chapter, &section(1, "§ 1. Words denoting number, gender, and so forth", "T01F00001"))
            .unwrap()
            .unwrap();

        let mut repealed = section(2, "§ 2. Repealed. Pub. L. 80-278", "T01F00002");
        repealed.identifier_hint = Some(EnumSpec::scalar("2"));
        let second = builder.attach_section(chapter, &repealed).unwrap().unwrap();

        // slot 0 is skipped under the skip policy
        assert_eq!(builder.attach_section(chapter, &section(0, "§ 3. Gone", "x")).unwrap(), None);

        let doc = builder.finish();
        let tree = &doc.tree;
        assert_eq!(tree.path_of(first), "1:1");
        assert_eq!(tree.node(first).descriptor.enumeration, Some(EnumSpec::scalar("1")));
        assert_eq!(tree.node(second).descriptor.enumeration, Some(EnumSpec::scalar("2")));
        assert!(tree.node(second).descriptor.has_status(Status::Repealed));
        assert_eq!(tree.node(chapter).children.filled_count(), 0);
        assert_eq!(tree.node(chapter).sections.filled_count(), 2);
        assert_eq!(doc.diagnostics.count(DiagnosticKind::InvalidPath), 1);
        assert_eq!(doc.diagnostics.count(DiagnosticKind::MissingSectionIdentifier), 0);
    }

    #[test]
    fn test_body_content_on_placed_node() {
        let g = GrammarConfig::default().with_levels(&OUTLINE_LEVELS);
        let mut builder = StructureBuilder::new(&g, root(), InvalidPathPolicy::Abort);
        let section = builder
            .ingest_record(&level_record(8, "§1. Definitions."))
            .unwrap()
            .unwrap();
        assert_eq!(builder.set_content(section, ContentRef::new("(a) Text.")), None);
        builder.set_section_meta(
            section,
            SectionMeta {
                notes: Some("Note: Authority cited.".to_string()),
                ..Default::default()
            },
        );
        let doc = builder.finish();

        let node = doc.tree.node(section);
        assert_eq!(node.kind(), Some(Kind::Section));
        assert_eq!(node.leaf_content, Some(ContentRef::new("(a) Text.")));
        assert_eq!(
            node.section_meta.as_ref().and_then(|m| m.notes.as_deref()),
            Some("Note: Authority cited.")
        );
    }

    #[test]
    fn test_appendix_at_section_level_stays_organizational() {
        let g = GrammarConfig::default().with_levels(&OUTLINE_LEVELS);
        let doc = StructureBuilder::new(&g, root(), InvalidPathPolicy::Abort)
            .ingest(vec![level_record(8, "Appendix A Forms")])
            .unwrap();
        let node = doc.tree.node(doc.tree.find("1").unwrap());
        assert_eq!(node.kind(), Some(Kind::Appendix));
        assert_eq!(node.descriptor.enumeration, Some(EnumSpec::scalar("A")));
    }

    #[test]
    fn test_level_zero_is_invalid() {
        let g = GrammarConfig::default();
        let result = StructureBuilder::new(&g, root(), InvalidPathPolicy::Abort)
            .ingest(vec![level_record(0, "TITLE 1. General")]);
        assert!(matches!(result, Err(TreeError::InvalidPath { .. })));
    }

    #[test]
    fn test_status_flag_and_diagnostics() {
        let g = GrammarConfig::default();
        let mut flagged = path_record("1", None, "Part 1. Old Rules.");
        flagged.raw_status_flag = Some("inactive".to_string());

        let doc = StructureBuilder::new(&g, root(), InvalidPathPolicy::Abort)
            .ingest(vec![flagged, path_record("2", None, "Miscellaneous matters")])
            .unwrap();

        let part = doc.tree.node(doc.tree.find("1").unwrap());
        assert!(part.descriptor.has_status(Status::Inactive));
        assert_eq!(doc.diagnostics.count(DiagnosticKind::UnclassifiableHeading), 1);

        // recorded (and logged) once, from the builder only
        assert_eq!(doc.diagnostics.total(), 1);
        assert!(matches!(
            &doc.diagnostics.events()[0],
            Diagnostic::UnclassifiableHeading { raw, .. } if raw == "Miscellaneous matters"
        ));
    }

    #[test]
    fn test_repeated_path_is_reported() {
        let g = GrammarConfig::default();
        let doc = StructureBuilder::new(&g, root(), InvalidPathPolicy::Abort)
            .ingest(vec![
                path_record("1", None, "Part 1. First."),
                path_record("1", None, "Part 1. Second."),
            ])
            .unwrap();
        assert_eq!(doc.diagnostics.count(DiagnosticKind::DuplicateSlot), 1);
        let part = doc.tree.node(doc.tree.find("1").unwrap());
        assert_eq!(part.descriptor.title.as_deref(), Some("Second."));
    }
}
