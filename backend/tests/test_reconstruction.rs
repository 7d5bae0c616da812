use lawtree_backend::diagnostics::DiagnosticKind;
use lawtree_backend::grammar::{GrammarConfig, GrammarVariant};
use lawtree_backend::heading::{classify, ParseContext};
use lawtree_backend::path_tree::{NodeRole, PathTree};
use lawtree_backend::section_correlator::SectionCorrelator;
use lawtree_backend::structure_builder::{InvalidPathPolicy, StructureBuilder};
use lawtree_backend::tree_emitter::{emit, StructuralFact};
use lawtree_backend::types::{
    ContentRef, EnumSpec, HeadingDescriptor, Kind, OrgRecord, PathOrLevel, SectionDetailRecord,
    SectionIndexRecord, Status,
};

fn org(path: &str, level: usize, heading: &str) -> OrgRecord {
    OrgRecord {
        path_or_level: PathOrLevel::Path {
            path: path.to_string(),
            declared_level: Some(level),
        },
        raw_heading: heading.to_string(),
        raw_status_flag: None,
    }
}

fn index(key: &str, path: &str, position: usize, identifier: &str) -> SectionIndexRecord {
    SectionIndexRecord {
        surrogate_key: key.to_string(),
        path: path.to_string(),
        position,
        identifier: identifier.to_string(),
    }
}

#[test]
fn test_path_idempotence() {
    let mut tree = PathTree::new(HeadingDescriptor::default());
    let a = tree.get_or_create("3.1.4").unwrap();
    let len = tree.len();
    let b = tree.get_or_create("3.1.4").unwrap();
    assert_eq!(a, b);
    assert_eq!(tree.len(), len);
}

#[test]
fn test_auto_extension() {
    let mut tree = PathTree::new(HeadingDescriptor::default());
    let leaf = tree.get_or_create("2.3.1").unwrap();

    let two = tree.find("2").unwrap();
    let children = &tree.node(two).children;
    assert!(children.get(1).is_none());
    assert!(children.get(2).is_none());
    assert!(tree.find("2.1").is_none());
    assert!(tree.find("2.2").is_none());

    let three = tree.find("2.3").unwrap();
    assert_eq!(tree.node(three).role, NodeRole::Hole);
    assert_eq!(tree.node(three).children.get(1), Some(&leaf));
}

#[test]
fn test_classifier_examples() {
    let g = GrammarConfig::for_variant(GrammarVariant::BracketHeavy);
    let ctx = ParseContext::new(&g);

    let d = classify("Chapter 14. Administration.", &ctx);
    assert_eq!(
        d,
        HeadingDescriptor {
            kind: Some(Kind::Chapter),
            enumeration: Some(EnumSpec::scalar("14")),
            title: Some("Administration.".to_string()),
            status: None,
            section_range: None,
        }
    );

    let d = classify("Part 9. Reserved. [Reserved]", &ctx);
    assert!(d.has_status(Status::Reserved));
    assert_eq!(d.kind, Some(Kind::Part));
    assert_eq!(d.enumeration, Some(EnumSpec::scalar("9")));

    let d = classify("Articles 4-7—Miscellaneous", &ctx);
    assert_eq!(d.enumeration, Some(EnumSpec::range("4", "7")));

    for raw in ["", "   ", "...", "—", "[ ]"] {
        let d = classify(raw, &ctx);
        assert_eq!(d.title.as_deref(), Some(raw.trim()));
        assert_eq!(d.kind, None);
    }
}

#[test]
fn test_full_document() {
    let g = GrammarConfig::for_variant(GrammarVariant::BracketHeavy);
    let root = HeadingDescriptor {
        kind: Some(Kind::Code),
        title: Some("Business and Professions Code".to_string()),
        ..Default::default()
    };

    // organizational records in no particular order
    let mut doc = StructureBuilder::new(&g, root, InvalidPathPolicy::Abort)
        .ingest(vec![
            org("1.2", 2, "ARTICLE 2. Licenses [20. - 29.]"),
            org("1", 1, "DIVISION 1. GENERAL PROVISIONS [1. - 29.]"),
            org("1.1", 2, "ARTICLE 1. Definitions [1. - 19.]"),
            org("2", 1, "DIVISION 2. HEALING ARTS [500. - 4999.] [Repealed]"),
        ])
        .unwrap();
    assert!(doc.diagnostics.is_empty());

    let report = SectionCorrelator::ingest(
        &mut doc,
        vec![
            index("k1", "1.1", 1, "[1.]"),
            index("k2", "1.1", 3, "[3.]"),
            index("k3", "1.2", 1, "[20.]"),
        ],
        vec![
            SectionDetailRecord::new("k1", "bpc_1.xml"),
            SectionDetailRecord::new("k2", "bpc_3.xml"),
            SectionDetailRecord::new("k3", "bpc_20.xml"),
            SectionDetailRecord::new("k9", "bpc_99.xml"),
        ],
    );
    assert_eq!(report.attached, 3);
    assert_eq!(report.unresolved, 1);
    assert_eq!(doc.diagnostics.count(DiagnosticKind::UnresolvedKey), 1);

    let tree = &doc.tree;
    let division = tree.node(tree.find("2").unwrap());
    assert!(division.descriptor.has_status(Status::Repealed));
    assert_eq!(
        division.descriptor.section_range,
        Some(("500".to_string(), "4999".to_string()))
    );

    let facts: Vec<StructuralFact> = emit(tree).collect();

    let leaves: Vec<(&ContentRef, usize)> = facts
        .iter()
        .filter_map(|f| match f {
            StructuralFact::LeafAttached {
                content_ref,
                ordinal,
                ..
            } => Some((*content_ref, *ordinal)),
            _ => None,
        })
        .collect();
    assert_eq!(
        leaves,
        vec![
            (&ContentRef::new("bpc_1.xml"), 1),
            (&ContentRef::new("bpc_3.xml"), 2),
            (&ContentRef::new("bpc_20.xml"), 1),
        ]
    );

    // root and division 1 have two children; article 1 has two sections
    let sequences = facts
        .iter()
        .filter(|f| matches!(f, StructuralFact::SiblingSequence { .. }))
        .count();
    assert_eq!(sequences, 2);
    let section_sequences = facts
        .iter()
        .filter(|f| matches!(f, StructuralFact::SectionSequence { .. }))
        .count();
    assert_eq!(section_sequences, 1);

    let declared = facts
        .iter()
        .filter(|f| matches!(f, StructuralFact::NodeDeclared { .. }))
        .count();
    assert_eq!(declared, tree.len());
}

#[test]
fn test_em_dash_stream() {
    let g = GrammarConfig::for_variant(GrammarVariant::EmDashHeavy);
    let root = HeadingDescriptor::title_only("Title 40");
    let doc = StructureBuilder::new(&g, root, InvalidPathPolicy::Skip)
        .ingest(vec![
            org("1", 1, "CHAPTER I—ENVIRONMENTAL PROTECTION AGENCY"),
            org("1.1", 2, "SUBCHAPTER A—GENERAL"),
            org("1.1.1", 3, "PART 1—STATEMENT OF ORGANIZATION"),
            org("1.1.2", 3, "PARTS 4-5 [RESERVED]"),
            org("1.1.x", 3, "PART 9—BROKEN"),
        ])
        .unwrap();

    assert_eq!(doc.diagnostics.count(DiagnosticKind::InvalidPath), 1);

    let reserved = doc.tree.node(doc.tree.find("1.1.2").unwrap());
    assert_eq!(reserved.kind(), Some(Kind::Part));
    assert_eq!(reserved.descriptor.enumeration, Some(EnumSpec::range("4", "5")));
    assert!(reserved.descriptor.has_status(Status::Reserved));

    let chapter = doc.tree.node(doc.tree.find("1").unwrap());
    assert_eq!(chapter.descriptor.enumeration, Some(EnumSpec::scalar("I")));
}

#[test]
fn test_sections_and_headings_share_a_parent() {
    let g = GrammarConfig::for_variant(GrammarVariant::BracketHeavy);
    let root = HeadingDescriptor::title_only("Government Code");

    // sections 1-3 sit directly under the division, ahead of its chapters
    let mut doc = StructureBuilder::new(&g, root, InvalidPathPolicy::Abort)
        .ingest(vec![
            org("1", 1, "DIVISION 1. GENERAL [1. - 30.]"),
            org("1.1", 2, "CHAPTER 1. Definitions [10. - 19.]"),
            org("1.1.1", 3, "ARTICLE 1. Terms [10. - 12.]"),
            org("1.2", 2, "CHAPTER 2. Officers [20. - 30.]"),
        ])
        .unwrap();

    let report = SectionCorrelator::ingest(
        &mut doc,
        vec![
            index("s1", "1", 1, "1."),
            index("s2", "1", 2, "2."),
            index("s10", "1.1.1", 1, "10."),
        ],
        vec![
            SectionDetailRecord::new("s1", "gov_1.xml"),
            SectionDetailRecord::new("s2", "gov_2.xml"),
            SectionDetailRecord::new("s10", "gov_10.xml"),
        ],
    );
    assert_eq!(report.attached, 3);
    assert_eq!(report.duplicates, 0);
    assert_eq!(doc.diagnostics.count(DiagnosticKind::DuplicateSlot), 0);

    let tree = &doc.tree;
    let chapter = tree.node(tree.find("1.1").unwrap());
    assert_eq!(chapter.kind(), Some(Kind::Chapter));
    assert_eq!(chapter.role, NodeRole::Organizational);
    assert_eq!(chapter.leaf_content, None);
    assert!(tree.find("1.1.1").is_some());
    assert_eq!(tree.node(tree.find("1.2").unwrap()).kind(), Some(Kind::Chapter));

    let declared: Vec<String> = emit(tree)
        .filter_map(|f| match f {
            StructuralFact::NodeDeclared { path, .. } => Some(path),
            _ => None,
        })
        .collect();
    assert_eq!(declared, vec!["", "1", "1.1", "1.1.1", "1.1.1:1", "1.2", "1:1", "1:2"]);
}
