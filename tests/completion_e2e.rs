//! Completion E2E tests
//!
//! Drive the completion processor against replayed servers and apply the
//! resulting proposals to in-memory documents.

mod helper;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::timeout;

use helper::peers::{completion_server, completion_server_with, document, provider};
use lsp_assist::completion::{CompletionProcessor, Proposal, StyleRange};
use lsp_assist::config::{CONTINUE_TYPING_LABEL, CompletionConfig};
use lsp_assist::document::{Document, TextDocument};
use lsp_assist::edit::CompositorError;
use lsp_assist::server::ReplayPeer;

fn processor(servers: &[Arc<ReplayPeer>], config: CompletionConfig) -> CompletionProcessor {
    CompletionProcessor::new(provider(servers), config)
}

async fn proposals(doc: &TextDocument, offset: usize, items: Value) -> Vec<Proposal> {
    processor(
        &[completion_server("server", items)],
        CompletionConfig::default(),
    )
    .compute_completion_proposals(doc, offset)
    .await
}

fn labels(proposals: &[Proposal]) -> Vec<String> {
    proposals.iter().map(Proposal::display_string).collect()
}

fn edit(label: &str, start: (u32, u32), end: (u32, u32), new_text: &str) -> Value {
    json!({
        "label": label,
        "textEdit": {
            "range": {
                "start": { "line": start.0, "character": start.1 },
                "end": { "line": end.0, "character": end.1 }
            },
            "newText": new_text
        }
    })
}

fn insertion(line: u32, character: u32, text: &str) -> Value {
    json!({
        "range": {
            "start": { "line": line, "character": character },
            "end": { "line": line, "character": character }
        },
        "newText": text
    })
}

#[tokio::test]
async fn text_edit_replaces_typed_prefix() {
    let doc = document("First");
    let proposals = proposals(
        &doc,
        5,
        json!([
            edit("FirstClass", (0, 0), (0, 5), "FirstClass"),
            edit("Other", (0, 0), (0, 5), "Other"),
        ]),
    )
    .await;

    assert_eq!(labels(&proposals), vec!["FirstClass"]);
    let cursor = proposals[0].apply(&*doc).unwrap();

    assert_eq!(doc.text(), "FirstClass");
    assert_eq!(cursor, Some(10));
}

#[tokio::test]
async fn prefix_matching_ignores_case_unless_configured() {
    let items = json!([edit("FirstClass", (0, 0), (0, 5), "FirstClass")]);
    let doc = document("first");

    let insensitive = proposals(&doc, 5, items.clone()).await;
    let sensitive = processor(
        &[completion_server("server", items)],
        CompletionConfig {
            case_sensitive: true,
            ..CompletionConfig::default()
        },
    )
    .compute_completion_proposals(&*doc, 5)
    .await;

    assert_eq!(labels(&insensitive), vec!["FirstClass"]);
    assert!(sensitive.is_empty());
}

#[tokio::test]
async fn completes_at_end_of_file() {
    let doc = document("line1\nline2\nFi");
    let proposals = proposals(
        &doc,
        14,
        json!([edit("FirstClass", (2, 0), (2, 2), "FirstClass")]),
    )
    .await;

    proposals[0].apply(&*doc).unwrap();

    assert_eq!(doc.text(), "line1\nline2\nFirstClass");
}

#[tokio::test]
async fn applies_additional_text_edits_on_same_line() {
    let doc = document("this <> is <> the main <> content of the file");
    let mut item = edit("MainInsertText", (0, 24), (0, 24), "MainInsertText");
    item["additionalTextEdits"] = json!([
        insertion(0, 6, "addOnText1"),
        insertion(0, 12, "addOnText2")
    ]);
    let proposals = proposals(&doc, 24, json!([item])).await;

    let cursor = proposals[0].apply(&*doc).unwrap();

    assert_eq!(
        doc.text(),
        "this <addOnText1> is <addOnText2> the main <MainInsertText> content of the file"
    );
    assert_eq!(cursor, Some(58));
}

#[tokio::test]
async fn text_typed_after_invocation_moves_edits_on_invocation_line() {
    let doc = document(
        "this <> is <> the main <> content of the file\nthis is <> the second line",
    );
    let mut item = edit("MainInsertText", (0, 12), (0, 12), "MainInsertText");
    item["additionalTextEdits"] = json!([
        insertion(0, 6, "addOnText1"),
        insertion(0, 24, "addOnText2"),
        insertion(1, 9, "addOnText3")
    ]);
    let proposals = proposals(&doc, 12, json!([item])).await;

    doc.replace(12, 0, "Main").unwrap();
    proposals[0]
        .apply_with_typing(&*doc, None, 16)
        .unwrap();

    assert_eq!(
        doc.text(),
        "this <addOnText1> is <MainInsertText> the main <addOnText2> content of the file\nthis is <addOnText3> the second line"
    );
}

#[tokio::test]
async fn explicit_offset_without_typing_is_rejected() {
    let doc = document("fo bar");
    let proposals = proposals(&doc, 2, json!([{ "label": "foo" }])).await;

    let result = proposals[0].apply_with_typing(&*doc, None, 4);

    assert_eq!(result, Err(CompositorError::StaleSnapshot));
    assert_eq!(doc.text(), "fo bar");
}

#[tokio::test]
async fn typing_more_of_the_word_is_absorbed() {
    let doc = document("str");
    let proposals = proposals(
        &doc,
        3,
        json!([{ "label": "strncasecmp", "insertText": "strncasecmp()" }]),
    )
    .await;

    doc.replace(3, 0, "nc").unwrap();
    let cursor = proposals[0].apply(&*doc).unwrap();

    assert_eq!(doc.text(), "strncasecmp()");
    assert_eq!(cursor, Some(13));
}

#[tokio::test]
async fn typing_with_explicit_offset_is_absorbed() {
    let doc = document("str");
    let proposals = proposals(
        &doc,
        3,
        json!([{ "label": "strncasecmp", "insertText": "strncasecmp()" }]),
    )
    .await;

    doc.replace(3, 0, "nc").unwrap();
    proposals[0]
        .apply_with_typing(&*doc, None, 5)
        .unwrap();

    assert_eq!(doc.text(), "strncasecmp()");
}

#[tokio::test]
async fn range_past_line_end_is_clamped_and_absorbs_typing() {
    let doc = document("FirstNotMatchedLabel");
    let proposals = proposals(
        &doc,
        5,
        json!([edit("FirstClass", (0, 0), (0, 22), "FirstClass")]),
    )
    .await;

    doc.replace(5, 0, "X").unwrap();
    let cursor = proposals[0].apply(&*doc).unwrap();

    assert_eq!(doc.text(), "FirstClass");
    assert_eq!(cursor, Some(10));
}

#[tokio::test]
async fn replaces_rest_of_word_covered_by_text_edit() {
    let doc = document("line1\nlineInsertHere");
    let proposals = proposals(
        &doc,
        10,
        json!([edit("Inserted", (1, 4), (1, 14), "Inserted")]),
    )
    .await;

    proposals[0].apply(&*doc).unwrap();

    assert_eq!(doc.text(), "line1\nlineInserted");
}

#[tokio::test]
async fn prefix_matches_are_ordered_before_contains_matches() {
    let doc = document("B");
    let items: Vec<Value> = ["AA", "AB", "BA", "BB", "CB", "CC"]
        .into_iter()
        .map(|label| edit(label, (0, 0), (0, 1), label))
        .collect();

    let proposals = proposals(&doc, 1, json!(items)).await;

    assert_eq!(labels(&proposals), vec!["BA", "BB", "AB", "CB"]);
}

#[tokio::test]
async fn snippet_is_resolved_and_cursor_placed_on_final_tab_stop() {
    let doc = document("");
    let proposals = proposals(
        &doc,
        0,
        json!([{
            "label": "foo",
            "insertText": "foo(${1:a}, ${2|b,c|})$0;",
            "insertTextFormat": 2
        }]),
    )
    .await;

    let cursor = proposals[0].apply(&*doc).unwrap();

    assert_eq!(doc.text(), "foo(a, b);");
    assert_eq!(cursor, Some(9));
}

#[tokio::test]
async fn cursor_lands_between_inserted_tags() {
    let doc = document("<");
    let proposals = proposals(
        &doc,
        1,
        json!([{
            "label": "tag",
            "filterText": "<tag",
            "insertTextFormat": 2,
            "textEdit": {
                "range": { "start": { "line": 0, "character": 0 }, "end": { "line": 0, "character": 1 } },
                "newText": "<tag>$0</tag>"
            }
        }]),
    )
    .await;

    let cursor = proposals[0].apply(&*doc).unwrap();

    assert_eq!(doc.text(), "<tag></tag>");
    assert_eq!(cursor, doc.text().find("</tag>"));
}

#[tokio::test]
async fn merges_proposals_from_multiple_servers() {
    let doc = document("");
    let processor = processor(
        &[
            completion_server("first", json!([{ "label": "FirstServerItem" }])),
            completion_server(
                "second",
                json!({ "isIncomplete": false, "items": [{ "label": "SecondServerItem" }] }),
            ),
        ],
        CompletionConfig::default(),
    );

    let proposals = processor
        .compute_completion_proposals(&*doc, 0)
        .await;

    assert_eq!(labels(&proposals), vec!["FirstServerItem", "SecondServerItem"]);
    proposals[1].apply(&*doc).unwrap();
    assert_eq!(doc.text(), "SecondServerItem");
}

#[tokio::test]
async fn additional_info_renders_detail_and_documentation() {
    let doc = document("");
    let proposals = proposals(
        &doc,
        0,
        json!([
            {
                "label": "documented",
                "detail": "fn documented()",
                "documentation": { "kind": "markdown", "value": "# Heading 1\n\nBody" }
            },
            { "label": "bare" }
        ]),
    )
    .await;

    let info = proposals[0].additional_info();
    assert!(info.contains("fn documented()"));
    assert!(info.contains("<h1>Heading 1</h1>"));
    assert_eq!(proposals[1].additional_info(), "");
}

#[tokio::test]
async fn incomplete_list_appends_continue_typing_sentinel() {
    let doc = document("");
    let processor = processor(
        &[completion_server(
            "server",
            json!({ "isIncomplete": true, "items": [{ "label": "item" }] }),
        )],
        CompletionConfig {
            incomplete_as_proposal: true,
            ..CompletionConfig::default()
        },
    );

    let proposals = processor
        .compute_completion_proposals(&*doc, 0)
        .await;

    assert_eq!(proposals.len(), 2);
    assert_eq!(proposals[0].display_string(), "item");
    assert!(proposals[0].is_actionable());
    assert!(matches!(proposals[1], Proposal::ContinueTyping));
    assert_eq!(proposals[1].display_string(), CONTINUE_TYPING_LABEL);
    assert!(!proposals[1].is_actionable());
    assert_eq!(proposals[1].apply(&*doc), Ok(None));
    assert_eq!(doc.text(), "");
}

#[tokio::test]
async fn deprecated_items_are_struck_out() {
    let doc = document("old");
    let proposals = proposals(
        &doc,
        3,
        json!([{ "label": "oldMethod", "deprecated": true }, { "label": "oldField" }]),
    )
    .await;

    let deprecated = proposals[0].as_completion().unwrap();
    assert_eq!(
        deprecated.styled_label().ranges,
        vec![StyleRange { start: 0, len: 9, bold: false, strikeout: true }]
    );
    let highlighted = deprecated.styled_label_highlighted(&*doc, 3);
    assert!(highlighted.ranges.iter().all(|range| range.strikeout));
    assert!(highlighted.ranges.iter().any(|range| range.bold));
    assert!(proposals[1].styled_label().ranges.is_empty());
}

#[tokio::test]
async fn slow_server_is_cancelled_after_timeout() {
    let doc = document("");
    let slow = completion_server_with(
        "slow",
        json!({ "result": [{ "label": "late" }], "delayMs": 10_000 }),
    );
    let processor = processor(
        &[completion_server("fast", json!([{ "label": "early" }])), slow.clone()],
        CompletionConfig {
            timeout_ms: 200,
            ..CompletionConfig::default()
        },
    );

    let proposals = timeout(
        Duration::from_secs(5),
        processor.compute_completion_proposals(&*doc, 0),
    )
    .await
    .unwrap();

    assert_eq!(labels(&proposals), vec!["early"]);
    timeout(Duration::from_secs(5), async {
        while slow.cancelled().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn server_errors_become_proposals_when_enabled() {
    let doc = document("");
    let servers = [
        completion_server_with(
            "broken",
            json!({ "error": { "code": -32603, "message": "index not ready" } }),
        ),
        completion_server("working", json!([{ "label": "item" }])),
    ];

    let hidden = processor(&servers, CompletionConfig::default())
        .compute_completion_proposals(&*doc, 0)
        .await;
    let shown = processor(
        &servers,
        CompletionConfig {
            errors_as_proposals: true,
            ..CompletionConfig::default()
        },
    )
    .compute_completion_proposals(&*doc, 0)
    .await;

    assert_eq!(labels(&hidden), vec!["item"]);
    assert_eq!(shown.len(), 2);
    assert!(shown[1].display_string().contains("index not ready"));
    assert!(!shown[1].is_actionable());
}
