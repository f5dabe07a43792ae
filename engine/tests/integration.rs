use engine::{EditError, EditWarning, NodePath, commit_or_rollback, rename, reparent};
use outline::Outline;
use outline::block::Block;
use outline::parser::Parser;
use outline::serialize::serialize;

fn parse(source: &str) -> Outline {
    Parser::new(source.to_string(), 0).parse().outline
}

fn reparent_child(source: &str, dragged: &str, target: &str) -> String {
    reparent(source, dragged, target, "child")
        .expect("reparent failed")
        .text
}

// ---------------------------------------------------------------------------
// Round-trip and addressing
// ---------------------------------------------------------------------------

#[test]
fn round_trip_is_structurally_stable() {
    let sources = [
        "# T\n- A\n- B\n- C\n",
        "# Welcome\n- Item 1\n  - Item 1.1\n  - Item 1.2\n- Item 2\n\n## Another Topic\n- List A\n- List B\n",
        "1. first\n2. second\n",
        "# H\n\nplain paragraph\n\n- x\n",
        "- deep\n  - deeper\n    - deepest\n",
    ];
    for source in sources {
        let once = parse(source);
        let text = serialize(&once).expect("serialize failed");
        let twice = parse(&text);
        assert_eq!(once, twice, "round-trip diverged for {:?}", source);
    }
}

#[test]
fn serialization_is_canonical() {
    // Ordered items renumber from 1; markers and indentation normalize.
    let text = serialize(&parse("2. a\n5. b\n")).unwrap();
    assert_eq!(text, "1. a\n2. b\n");

    let text = serialize(&parse("* a\n* b\n")).unwrap();
    assert_eq!(text, "- a\n- b\n");
}

#[test]
fn handle_encode_decode_inverse() {
    let paths = [vec![0], vec![0, 1], vec![2, 0, 4], vec![9, 9, 9, 9]];
    for segments in paths {
        let path = NodePath(segments);
        let handle = engine::encode(&path);
        assert_eq!(engine::decode(&handle), Some(path));
    }
    assert_eq!(engine::encode(&NodePath(vec![0, 1])), "mm-1-2");
}

#[test]
fn handle_decode_rejects_malformed() {
    for bad in ["", "mm", "mm-", "mm-0", "mm-x", "mm-1-", "zz-1", "1-2"] {
        assert_eq!(engine::decode(bad), None, "accepted {:?}", bad);
    }
}

// ---------------------------------------------------------------------------
// Reparent
// ---------------------------------------------------------------------------

#[test]
fn end_to_end_reparent_example() {
    let source = "# T\n- A\n- B\n- C\n";
    let result = reparent(source, "mm-1-2", "mm-1-3", "child").unwrap();
    assert_eq!(result.text, "# T\n- A\n- C\n  - B\n");
    assert!(result.clear_selection);
}

#[test]
fn sibling_shift_target_still_resolves() {
    // Detaching A shifts C's structural index down by one; an
    // implementation that re-decodes the target path after detachment
    // resolves the wrong node (or nothing). Ids do not shift.
    let source = "# T\n- A\n- B\n- C\n";
    let text = reparent_child(source, "mm-1-1", "mm-1-3");
    assert_eq!(text, "# T\n- B\n- C\n  - A\n");
}

#[test]
fn reparent_onto_heading_without_list_inserts_one() {
    let source = "# T\n- A\n- B\n\n## H\n";
    let text = reparent_child(source, "mm-1-1", "mm-3");
    assert_eq!(text, "# T\n- B\n\n## H\n- A\n");
}

#[test]
fn reparent_onto_heading_with_list_appends() {
    let source = "# T\n- A\n\n## H\n- X\n";
    let text = reparent_child(source, "mm-1-1", "mm-3");
    assert_eq!(text, "# T\n\n## H\n- X\n- A\n");
}

#[test]
fn self_reference_is_rejected() {
    let source = "# T\n- A\n";
    let err = reparent(source, "mm-1-1", "mm-1-1", "child").unwrap_err();
    assert!(matches!(err, EditError::SelfReference));
}

#[test]
fn unsupported_relation_is_rejected() {
    let source = "# T\n- A\n- B\n";
    let err = reparent(source, "mm-1-1", "mm-1-2", "sibling").unwrap_err();
    assert!(matches!(err, EditError::UnsupportedRelation(_)));
}

#[test]
fn malformed_handles_are_rejected() {
    let source = "# T\n- A\n- B\n";
    let err = reparent(source, "zz-1", "mm-1-2", "child").unwrap_err();
    assert!(matches!(err, EditError::HandleDecode(_)));

    let err = reparent(source, "mm-1-1", "mm-nope", "child").unwrap_err();
    assert!(matches!(err, EditError::HandleDecode(_)));
}

#[test]
fn unresolvable_handle_is_not_found() {
    let source = "# T\n- A\n- B\n";
    let err = reparent(source, "mm-1-9", "mm-1-2", "child").unwrap_err();
    assert!(matches!(err, EditError::NodeNotFound(_)));
}

#[test]
fn list_target_is_unsupported() {
    // mm-2 is the list block itself; it cannot take a child directly.
    let source = "# T\n- A\n- B\n";
    let err = reparent(source, "mm-1-1", "mm-2", "child").unwrap_err();
    assert!(matches!(err, EditError::UnsupportedTarget { .. }));
}

#[test]
fn coercing_a_heading_drops_its_subtree() {
    // Dragging heading H onto item A wraps H's text into a synthesized
    // item; H's visual children X and Y do not survive. The loss is the
    // documented best-effort shim, asserted here so it can never become
    // silent behavior.
    let source = "# T\n- A\n\n## H\n- X\n- Y\n";
    let text = reparent_child(source, "mm-3", "mm-1-1");
    assert_eq!(text, "# T\n- A\n  - H\n");
    assert!(!text.contains('X'));
    assert!(!text.contains('Y'));
}

#[test]
fn reparent_target_inside_dragged_subtree_fails_cleanly() {
    // B's own nested child cannot adopt B: the target vanishes with the
    // detached subtree and the operation reports it unresolvable.
    let source = "# T\n- A\n- B\n  - B1\n";
    let err = reparent(source, "mm-1-2", "mm-1-2-1", "child").unwrap_err();
    assert!(matches!(err, EditError::NodeNotFound(_)));
}

#[test]
fn reparent_across_nesting_levels() {
    let source = "# T\n- A\n  - A1\n- B\n";
    let text = reparent_child(source, "mm-1-1-1", "mm-1-2");
    assert_eq!(text, "# T\n- A\n- B\n  - A1\n");
}

// ---------------------------------------------------------------------------
// Rename
// ---------------------------------------------------------------------------

#[test]
fn rename_resolves_by_handle() {
    let source = "# T\n- A\n- B\n";
    let result = rename(source, "mm-1-1", "A", "Alpha").unwrap();
    assert_eq!(result.text, "# T\n- Alpha\n- B\n");
    assert!(result.warnings.is_empty());
}

#[test]
fn rename_heading_by_handle() {
    let source = "# T\n- A\n";
    let result = rename(source, "mm-1", "T", "Topic").unwrap();
    assert_eq!(result.text, "# Topic\n- A\n");
}

#[test]
fn rename_with_stale_original_text_warns_but_applies() {
    // The handle is authoritative; the caller's snapshot of the text is a
    // diagnostic aid only.
    let source = "# T\n- A\n- B\n";
    let result = rename(source, "mm-1-1", "Z", "Alpha").unwrap();
    assert_eq!(result.text, "# T\n- Alpha\n- B\n");
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn rename_falls_back_to_text_match_when_handle_fails() {
    let source = "# T\n- A\n- B\n";
    let result = rename(source, "mm-9-9", "B", "Beta").unwrap();
    assert_eq!(result.text, "# T\n- A\n- Beta\n");
    assert!(matches!(
        result.warnings.as_slice(),
        [EditWarning::RenameAmbiguity(_)]
    ));
}

#[test]
fn rename_fallback_prefers_exact_match_over_substring() {
    // "B" is a substring of "AB" but an exact match of the second item.
    let source = "# T\n- AB\n- B\n";
    let result = rename(source, "mm-9-9", "B", "Beta").unwrap();
    assert_eq!(result.text, "# T\n- AB\n- Beta\n");
}

#[test]
fn rename_fallback_with_no_match_leaves_document_unchanged() {
    let source = "# T\n- A\n- B\n";
    let result = rename(source, "mm-9-9", "missing", "M").unwrap();
    assert_eq!(result.text, source);
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn rename_of_list_node_is_unsupported() {
    let source = "# T\n- A\n";
    let err = rename(source, "mm-2", "A", "Alpha").unwrap_err();
    assert!(matches!(err, EditError::UnsupportedTarget { .. }));
}

// ---------------------------------------------------------------------------
// Reconstruction / recovery
// ---------------------------------------------------------------------------

#[test]
fn corrupted_cache_rolls_back_to_pristine_text() {
    let source = "# T\n- A\n- B\n- C\n";
    let pristine = parse(source);
    let mut draft = pristine.clone();

    // Corrupt a raw-text cache without touching structure: the draft can
    // no longer be serialized consistently.
    let Some(Block::List(list)) = draft.blocks.get_mut(1) else {
        panic!("expected a list block");
    };
    list.raw = "corrupted".to_string();

    let err = commit_or_rollback(&draft, &pristine, source).unwrap_err();
    let EditError::Reconstruction { recovered } = err else {
        panic!("expected Reconstruction, got {:?}", err);
    };
    assert_eq!(recovered, source);
}

#[test]
fn idempotent_for_identical_input() {
    let source = "# T\n- A\n- B\n- C\n";
    let first = reparent_child(source, "mm-1-2", "mm-1-3");
    let second = reparent_child(source, "mm-1-2", "mm-1-3");
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Locator details
// ---------------------------------------------------------------------------

#[test]
fn paragraphs_are_not_counted_as_structural_siblings() {
    // The paragraph between the heading and the list neither consumes a
    // path index nor blocks the heading's descent into its list.
    let source = "# T\n\nintro text\n\n- A\n- B\n";
    let text = reparent_child(source, "mm-1-1", "mm-1-2");
    assert_eq!(text, "# T\n\nintro text\n\n- B\n  - A\n");
}

#[test]
fn heading_and_list_paths_address_the_same_items() {
    // mm-1-1 descends through the heading, mm-2-1 through the list block;
    // both reach item A.
    let source = "# T\n- A\n- B\n";
    let via_heading = reparent_child(source, "mm-1-1", "mm-1-2");
    let via_list = reparent_child(source, "mm-2-1", "mm-2-2");
    assert_eq!(via_heading, via_list);
}

#[test]
fn deep_paths_resolve_through_nested_lists() {
    let source = "# T\n- A\n  - A1\n    - A2\n- B\n";
    let text = reparent_child(source, "mm-1-1-1-1", "mm-1-2");
    assert_eq!(text, "# T\n- A\n  - A1\n- B\n  - A2\n");
}

// ---------------------------------------------------------------------------
// Parser diagnostics
// ---------------------------------------------------------------------------

#[test]
fn unsupported_blocks_are_skipped_with_warnings() {
    let source = "# T\n\n```\ncode\n```\n\n- A\n";
    let parsed = Parser::new(source.to_string(), 0).parse();
    assert_eq!(parsed.outline.blocks.len(), 2);
    assert_eq!(parsed.warnings.len(), 1);
    assert!(parsed.warnings[0].message.contains("code block"));
}
