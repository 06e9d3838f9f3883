//! Behaviour that must hold across the engines, exercised through the
//! public API the way an editor front end drives it.

use pretty_assertions::assert_eq;
use rstest::rstest;
use words_and_words_engine::engines::collapse::headings;
use words_and_words_engine::engines::{ThreadStatus, find_matches};
use words_and_words_engine::export::transpile;
use words_and_words_engine::{
    Cmd, CommentError, Document, Editor, EditorOptions, HeadingKey, ReplyPolicy, Variable,
};

fn editor(content: &str) -> Editor {
    Editor::open(&Document::new("Test", content), EditorOptions::default())
}

fn heading_key(editor: &Editor, text: &str) -> HeadingKey {
    headings(editor.tree())
        .find(|h| h.text == text)
        .map(|h| h.key)
        .unwrap()
}

#[test]
fn test_comment_anchor_tracks_edits() {
    let mut ed = editor("<p>The quick brown fox</p>");
    ed.set_selection(5..10);
    let thread = ed.add_comment("speed?").unwrap();
    ed.focus_thread(Some(&thread.id));

    ed.apply(Cmd::InsertText {
        at: 1,
        text: "Very ".into(),
    })
    .unwrap();
    assert_eq!(
        ed.comments().highlighted_text(ed.tree(), &thread.id),
        "quick"
    );

    // "ui" inside the highlighted word
    ed.apply(Cmd::DeleteRange { range: 11..13 }).unwrap();
    assert_eq!(ed.comments().highlighted_text(ed.tree(), &thread.id), "qck");

    let runs = ed.tree().comment_runs(&thread.id);
    let active: Vec<_> = ed
        .decorations()
        .iter()
        .filter(|d| d.class == "comment-active")
        .map(|d| d.range())
        .collect();
    assert_eq!(active, runs);
}

#[test]
fn test_search_is_idempotent() {
    let mut ed = editor("<p>one two one</p><p>ONE</p>");
    ed.set_search_term("one", false);
    let first = ed.search().matches().to_vec();
    ed.set_search_term("one", false);
    assert_eq!(ed.search().matches(), first.as_slice());
    assert_eq!(first.len(), 3);

    let fresh: Vec<_> = find_matches(ed.tree(), "one", false).collect();
    assert_eq!(fresh, first);
}

#[rstest]
#[case("dog")]
#[case("cats")]
#[case("")]
fn test_replace_all_leaves_no_original_matches(#[case] replacement: &str) {
    let mut ed = editor("<p>cat Cat</p><p><strong>cat</strong>alog</p>");
    ed.set_search_term("cat", false);
    assert_eq!(ed.search().matches().len(), 3);

    ed.replace_all(replacement).unwrap().unwrap();

    assert!(ed.search().matches().is_empty());
    assert_eq!(ed.search().term(), "cat");
    let expected = format!("{r} {r}\n{r}alog", r = replacement);
    assert_eq!(ed.tree().text(), expected);
    let remaining = find_matches(ed.tree(), "cat", false).count();
    assert_eq!(remaining, expected.to_lowercase().matches("cat").count());
}

#[test]
fn test_navigation_is_cyclic() {
    let mut ed = editor("<p>a b a c a</p>");
    ed.set_search_term("a", true);
    let n = ed.search().matches().len();
    assert_eq!(n, 3);

    let first = ed.find_next().unwrap();
    for _ in 0..n {
        ed.find_next();
    }
    assert_eq!(ed.search().current_match(), Some(first));
    assert_eq!(ed.session().selection(), first.range());

    ed.find_previous();
    assert_eq!(ed.search().current_index(), Some(n - 1));
}

#[test]
fn test_previous_from_fresh_search_goes_to_last() {
    let mut ed = editor("<p>x x</p>");
    ed.set_search_term("x", false);
    ed.find_previous();
    assert_eq!(ed.search().current_index(), Some(1));
}

#[test]
fn test_deleting_anchor_text_orphans_thread() {
    let mut ed = editor("<p>Dear friend</p>");
    ed.set_selection(6..12);
    let thread = ed.add_comment("too casual").unwrap();

    ed.apply(Cmd::DeleteRange { range: 6..12 }).unwrap();

    assert!(ed.comments().is_orphaned(ed.tree(), &thread.id));
    let threads = ed.comments().threads(ed.tree());
    assert_eq!(threads[0].status, ThreadStatus::Orphaned);
    assert!(ed.comments().get(&thread.id).is_some());

    ed.reply(&thread.id, "agreed").unwrap();
    assert_eq!(ed.comments().replies(&thread.id).len(), 1);

    let removed = ed.cleanup_orphaned_comments();
    assert_eq!(removed, vec![thread.id.clone()]);
    assert!(ed.comments().comments().is_empty());
}

#[test]
fn test_orphan_replies_can_be_rejected() {
    let options = EditorOptions {
        reply_policy: ReplyPolicy::RejectOrphaned,
        ..Default::default()
    };
    let mut ed = Editor::open(&Document::new("Test", "<p>Dear friend</p>"), options);
    ed.set_selection(6..12);
    let thread = ed.add_comment("too casual").unwrap();
    ed.reply(&thread.id, "before").unwrap();

    ed.apply(Cmd::DeleteRange { range: 6..12 }).unwrap();

    assert!(matches!(
        ed.reply(&thread.id, "after"),
        Err(CommentError::OrphanedThread(_))
    ));
}

#[test]
fn test_collapse_hides_only_its_section() {
    let mut ed = editor("<h1>A</h1><p>a</p><h2>B</h2><p>b</p><h1>C</h1><p>c</p>");
    let a = heading_key(&ed, "A");
    let b = heading_key(&ed, "B");

    ed.toggle_section(&b);
    let collapse = ed.collapse();
    assert!(collapse.is_hidden(ed.tree(), 10));
    assert!(!collapse.is_hidden(ed.tree(), 4));
    assert!(!collapse.is_hidden(ed.tree(), 7));
    assert!(!collapse.is_hidden(ed.tree(), 16));

    ed.toggle_section(&b);
    ed.toggle_section(&a);
    let collapse = ed.collapse();
    assert!(collapse.is_hidden(ed.tree(), 4));
    assert!(collapse.is_hidden(ed.tree(), 7));
    assert!(collapse.is_hidden(ed.tree(), 10));
    assert!(!collapse.is_hidden(ed.tree(), 1));
    assert!(!collapse.is_hidden(ed.tree(), 13));
    assert!(!collapse.is_hidden(ed.tree(), 16));

    // Collapsing never changes content
    assert_eq!(ed.tree().text(), "A\na\nB\nb\nC\nc");
}

#[test]
fn test_navigating_into_collapsed_section_expands_it() {
    let mut ed = editor("<h1>A</h1><h2>B</h2><p>deep</p>");
    let a = heading_key(&ed, "A");
    let b = heading_key(&ed, "B");
    ed.toggle_section(&a);
    ed.toggle_section(&b);

    let expanded = ed.navigate_to(8);
    assert_eq!(expanded.len(), 2);
    assert!(!ed.collapse().is_hidden(ed.tree(), 8));
    assert_eq!(ed.session().cursor(), 8);
}

#[test]
fn test_jumping_to_heading_keeps_peer_sections_collapsed() {
    let mut ed = editor(
        "<h1>A</h1><p>a</p><h2>B</h2><p>b</p><h2>C</h2><p>c</p><h1>D</h1><p>d</p>",
    );
    let a = heading_key(&ed, "A");
    let c = heading_key(&ed, "C");
    ed.toggle_section(&a);
    ed.toggle_section(&c);

    let target = ed
        .outline()
        .entries
        .iter()
        .find(|e| e.text == "D")
        .map(|e| e.jump_target())
        .unwrap();
    let expanded = ed.navigate_to(target);

    assert!(expanded.is_empty());
    assert!(ed.collapse().is_collapsed(&a));
    assert!(ed.collapse().is_collapsed(&c));
    assert_eq!(ed.session().cursor(), target);
}

#[test]
fn test_search_match_in_heading_keeps_peer_collapsed() {
    let mut ed = editor(
        "<h1>A</h1><p>a</p><h2>B</h2><p>b</p><h2>C</h2><p>c</p><h1>D</h1><p>d</p>",
    );
    let b = heading_key(&ed, "B");
    ed.toggle_section(&b);

    ed.set_search_term("C", true);
    let found = ed.find_next().unwrap();

    assert_eq!(found.range(), 13..14);
    assert!(ed.collapse().is_collapsed(&b));
    assert!(ed.collapse().is_hidden(ed.tree(), 10));
}

#[test]
fn test_variables_resolve_live() {
    let mut document = Document::new(
        "Letter",
        r#"<p>Dear <span data-variable-id="var_1" class="variable-node"></span></p>"#,
    );
    document.variables = vec![Variable {
        id: "var_1".into(),
        name: "client".into(),
        value: "ACME".into(),
    }];
    let mut ed = Editor::open(&document, EditorOptions::default());
    let persisted = ed.content();
    assert!(ed.render_view().contains(">ACME</span>"));

    ed.update_variable("var_1", "Globex").unwrap();
    assert!(ed.render_view().contains(">Globex</span>"));
    assert_eq!(ed.content(), persisted);

    let export = transpile(&ed.content(), ed.variables().variables());
    let words_and_words_engine::export::BodyElement::Paragraph(p) = &export.body[0] else {
        panic!("expected a paragraph");
    };
    assert_eq!(p.text(), "Dear Globex");

    ed.remove_variable("var_1").unwrap();
    assert!(ed.render_view().contains("[Deleted Variable]"));
    assert_eq!(ed.content(), persisted);
}

#[test]
fn test_inserted_variable_is_one_position() {
    let mut ed = editor("<p>Hi</p>");
    let var = ed.create_variable("name", "Ann").unwrap();
    let before = ed.tree().content_size();
    ed.set_selection(3..3);
    ed.insert_variable(&var.id).unwrap();

    assert_eq!(ed.tree().content_size(), before + 1);
    assert!(ed.render_view().contains(">Ann</span>"));
}

#[test]
fn test_save_round_trip_keeps_annotations() {
    let mut ed = editor("<h1>Title</h1><p>Body text here</p>");
    ed.set_selection(9..13);
    ed.add_comment("check").unwrap();
    let update = ed.to_update();

    let mut document = Document::new("Test", "");
    document.apply(update);
    let reopened = Editor::open(&document, EditorOptions::default());

    assert_eq!(reopened.tree(), ed.tree());
    assert_eq!(reopened.comments().comments(), ed.comments().comments());
}

#[test]
fn test_empty_term_never_matches() {
    let mut ed = editor("<p>anything at all</p>");
    ed.set_search_term("", false);
    assert!(ed.search().matches().is_empty());
    assert!(ed.find_next().is_none());
}

#[test]
fn test_replace_all_cat_with_dog() {
    let mut ed = editor("<p>cat cat cat</p>");
    ed.set_search_term("cat", false);
    ed.replace_all("dog").unwrap();
    assert_eq!(ed.tree().text(), "dog dog dog");

    ed.set_search_term("cat", false);
    assert!(ed.search().matches().is_empty());
}

#[test]
fn test_collapse_scoping_between_sibling_sections() {
    let mut ed = editor(
        "<h1>A</h1><p>a</p><h2>B</h2><p>b</p><h2>C</h2><p>c</p><h1>D</h1><p>d</p>",
    );
    let a = heading_key(&ed, "A");
    let b = heading_key(&ed, "B");

    ed.toggle_section(&a);
    let hidden: Vec<bool> = [4, 7, 10, 13, 16, 19, 22]
        .iter()
        .map(|&pos| ed.collapse().is_hidden(ed.tree(), pos))
        .collect();
    assert_eq!(hidden, vec![true, true, true, true, true, false, false]);

    ed.toggle_section(&a);
    ed.toggle_section(&b);
    let hidden: Vec<bool> = [4, 7, 10, 13, 16, 19, 22]
        .iter()
        .map(|&pos| ed.collapse().is_hidden(ed.tree(), pos))
        .collect();
    assert_eq!(hidden, vec![false, false, true, false, false, false, false]);
}

#[test]
fn test_export_round_trip_shape() {
    use words_and_words_engine::export::{BodyElement, InlineElement, ParagraphStyle};

    let ed = editor(
        "<h1>Report</h1><p><strong><em>both</em></strong></p>\
         <table><tbody><tr><td><p>a</p></td><td><p>b</p></td></tr>\
         <tr><td><p>c</p></td><td><p>d</p></td></tr></tbody></table>",
    );
    let doc = transpile(&ed.content(), &[]);

    let headings = doc
        .body
        .iter()
        .filter(|e| {
            matches!(e, BodyElement::Paragraph(p) if p.style == Some(ParagraphStyle::Heading(1)))
        })
        .count();
    assert_eq!(headings, 1);

    let styled = doc.body.iter().any(|e| match e {
        BodyElement::Paragraph(p) => p.children.iter().any(|c| {
            matches!(c, InlineElement::Run(run) if run.text == "both" && run.style.bold && run.style.italic)
        }),
        BodyElement::Table(_) => false,
    });
    assert!(styled);

    let tables: Vec<_> = doc
        .body
        .iter()
        .filter_map(|e| match e {
            BodyElement::Table(t) => Some(t),
            BodyElement::Paragraph(_) => None,
        })
        .collect();
    assert_eq!(tables.len(), 1);
    let shape: Vec<usize> = tables[0].rows.iter().map(|r| r.cells.len()).collect();
    assert_eq!(shape, vec![2, 2]);
}
