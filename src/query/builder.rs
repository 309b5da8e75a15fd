//! Lexical clause construction

use crate::backend::LexicalClause;

/// Field boosts for the lexical base retrieval: category matches carry
/// the most weight, then name, with the params text and the trigram field
/// as unweighted support.
pub const LEXICAL_FIELD_BOOSTS: &[(&str, f32)] = &[
    ("name", 2.0),
    ("categories", 3.0),
    ("params_text", 1.0),
    ("ngrams", 1.0),
];

/// Tokenize the raw query text into a weighted multi-field clause.
///
/// Terms are OR'd; each term matches across all boosted fields with
/// most-fields semantics. Returns `None` for text with no terms, which
/// callers treat as the pure-vector degenerate case.
pub fn build_lexical_clause(text: &str) -> Option<LexicalClause> {
    let terms: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    if terms.is_empty() {
        return None;
    }

    Some(LexicalClause {
        terms,
        fields: LEXICAL_FIELD_BOOSTS
            .iter()
            .map(|(name, boost)| (name.to_string(), *boost))
            .collect(),
    })
}
