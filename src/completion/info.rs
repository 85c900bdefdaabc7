//! Additional information shown next to a completion proposal

use tower_lsp::lsp_types::{CompletionItem, Documentation, MarkupKind};

use crate::completion::markdown;

/// Detail and documentation of `item` as HTML.
///
/// Missing or empty fields contribute nothing; an item without either
/// yields an empty string.
pub fn additional_info(item: &CompletionItem) -> String {
    let detail = item
        .detail
        .as_deref()
        .filter(|detail| !detail.is_empty())
        .map(markdown::render);

    let documentation = match &item.documentation {
        Some(Documentation::String(text)) if !text.is_empty() => Some(paragraph(text)),
        Some(Documentation::MarkupContent(content)) if !content.value.is_empty() => {
            Some(match content.kind {
                MarkupKind::Markdown => markdown::render(&content.value),
                MarkupKind::PlainText => paragraph(&content.value),
            })
        }
        _ => None,
    };

    detail
        .into_iter()
        .chain(documentation)
        .collect::<Vec<_>>()
        .join("\n")
}

fn paragraph(text: &str) -> String {
    format!("<p>{}</p>", markdown::escape(text))
}
