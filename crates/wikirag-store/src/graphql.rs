//! GraphQL documents sent to the chunk collection.
//!
//! Weaviate's `Get` queries take inline literals rather than variables, so
//! every user-provided string goes through [`string_literal`].

use std::fmt::Write as _;

use wikirag_core::types::KeysBySource;

/// Properties selected for every chunk row.
pub const CHUNK_FIELDS: &str = "source_id source_title chunk_id chunk_text _additional { score }";

/// Quote `s` as a GraphQL string. JSON string escaping is a valid subset.
pub fn string_literal(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

fn vector_literal(vector: &[f32]) -> String {
    let mut out = String::with_capacity(vector.len() * 10 + 2);
    out.push('[');
    for (i, x) in vector.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if x.is_finite() {
            let _ = write!(out, "{x}");
        } else {
            out.push('0');
        }
    }
    out.push(']');
    out
}

pub fn hybrid_query(collection: &str, query_text: &str, vector: &[f32], limit: usize, alpha: f32) -> String {
    format!(
        "{{ Get {{ {collection}(hybrid: {{query: {query}, vector: {vector}, alpha: {alpha}}}, limit: {limit}) {{ {CHUNK_FIELDS} }} }} }}",
        query = string_literal(query_text),
        vector = vector_literal(vector),
    )
}

/// `where` filter matching exactly the given keys.
///
/// One `source_id Equal AND chunk_id ContainsAny` clause per source, OR-ed
/// together; a single source is sent without the `Or` wrapper. `None` when
/// there is nothing to match.
pub fn keys_filter(keys: &KeysBySource) -> Option<String> {
    let clauses: Vec<String> = keys
        .iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(source_id, ids)| {
            let ids = ids.iter().map(u32::to_string).collect::<Vec<_>>().join(", ");
            format!(
                "{{operator: And, operands: [{{path: [\"source_id\"], operator: Equal, valueText: {source}}}, {{path: [\"chunk_id\"], operator: ContainsAny, valueInt: [{ids}]}}]}}",
                source = string_literal(source_id),
            )
        })
        .collect();
    match clauses.len() {
        0 => None,
        1 => clauses.into_iter().next(),
        _ => Some(format!("{{operator: Or, operands: [{}]}}", clauses.join(", "))),
    }
}

pub fn fetch_query(collection: &str, filter: &str, limit: usize) -> String {
    format!("{{ Get {{ {collection}(where: {filter}, limit: {limit}) {{ {CHUNK_FIELDS} }} }} }}")
}

/// Collection names are spliced into queries unquoted.
pub fn is_valid_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
