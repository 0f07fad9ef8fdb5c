use std::fmt::Write as _;

use wikirag_core::types::{ContextBlock, NO_CONTEXT};

/// Render blocks and the question as the generation input.
///
/// ```text
/// <context>
///   <document id="S_tel" title="Telefon">
///     trimmed block text
///   </document>
/// </context>
///
/// <question>Kto wynalazł telefon?</question>
/// ```
///
/// Ids and titles are written verbatim. With no blocks the result is
/// [`NO_CONTEXT`].
pub fn serialize_context(blocks: &[ContextBlock], question: &str) -> String {
    if blocks.is_empty() {
        return NO_CONTEXT.to_string();
    }
    let mut out = String::from("<context>\n");
    for block in blocks {
        let _ = write!(
            out,
            "  <document id=\"{}\" title=\"{}\">\n    {}\n  </document>\n",
            block.source_id,
            block.source_title,
            block.text.trim()
        );
    }
    out.push_str("</context>");
    let _ = write!(out, "\n\n<question>{question}</question>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(source_id: &str, title: &str, text: &str) -> ContextBlock {
        ContextBlock {
            source_id: source_id.into(),
            source_title: title.into(),
            first_chunk_id: 0,
            last_chunk_id: 0,
            text: text.into(),
        }
    }

    #[test]
    fn renders_documents_in_block_order() {
        let blocks = vec![
            block("S_tel", "Telefon", "  Bell opatentował telefon w 1876. "),
            block("S_bell", "Alexander Graham Bell", "Urodził się w Edynburgu."),
        ];
        let expected = "<context>\n\
            \x20 <document id=\"S_tel\" title=\"Telefon\">\n\
            \x20   Bell opatentował telefon w 1876.\n\
            \x20 </document>\n\
            \x20 <document id=\"S_bell\" title=\"Alexander Graham Bell\">\n\
            \x20   Urodził się w Edynburgu.\n\
            \x20 </document>\n\
            </context>\n\n<question>Kto wynalazł telefon?</question>";
        assert_eq!(serialize_context(&blocks, "Kto wynalazł telefon?"), expected);
    }

    #[test]
    fn empty_blocks_give_fixed_string() {
        assert_eq!(serialize_context(&[], "Kto wynalazł telefon?"), NO_CONTEXT);
    }
}
