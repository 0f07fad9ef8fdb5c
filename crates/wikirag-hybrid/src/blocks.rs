use wikirag_core::types::{Chunk, ContextBlock};

/// Sort into reading order and stitch consecutive chunks of one source.
pub fn merge_blocks(mut chunks: Vec<Chunk>) -> Vec<ContextBlock> {
    chunks.sort_by(|a, b| a.source_id.cmp(&b.source_id).then(a.chunk_id.cmp(&b.chunk_id)));

    let mut blocks: Vec<ContextBlock> = Vec::new();
    for chunk in &chunks {
        match blocks.last_mut() {
            Some(current) if current.continues_with(chunk) => {
                current.text.push(' ');
                current.text.push_str(&chunk.text);
                current.last_chunk_id = chunk.chunk_id;
            }
            _ => blocks.push(ContextBlock::from_chunk(chunk)),
        }
    }
    blocks
}
