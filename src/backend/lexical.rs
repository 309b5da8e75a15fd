//! Tantivy lexical index, one per collection
//!
//! Indexes the canonical text fields plus an auxiliary character-trigram
//! field over the product name for partial-word matching. Scoring is BM25;
//! multi-field weighting happens at query build time through boost queries.

use super::LexicalClause;
use crate::catalog::CanonicalProduct;
use std::collections::HashMap;
use std::path::PathBuf;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, INDEXED, STORED, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError, Term};
use thiserror::Error;

/// Searchable text fields in schema order
const TEXT_FIELDS: &[&str] = &[
    "name",
    "brand",
    "description",
    "categories",
    "params_text",
    "ngrams",
];

#[derive(Error, Debug)]
pub enum LexicalIndexError {
    #[error("Index initialization failed: {0}")]
    Initialization(String),

    #[error("Insert failed: {0}")]
    Insert(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),
}

/// Per-collection full-text index with BM25 ranking
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    writer: IndexWriter,
    id_field: Field,
    fields: HashMap<String, Field>,
    #[allow(dead_code)]
    index_path: PathBuf,
}

impl LexicalIndex {
    /// Open an existing index at `index_path`, or create a fresh one
    pub fn new(index_path: PathBuf) -> Result<Self, LexicalIndexError> {
        if index_path.exists() && index_path.join("meta.json").exists() {
            Self::load(index_path)
        } else {
            Self::create(index_path)
        }
    }

    fn create(index_path: PathBuf) -> Result<Self, LexicalIndexError> {
        std::fs::create_dir_all(&index_path)?;

        let mut schema_builder = Schema::builder();
        let id_field = schema_builder.add_u64_field("id", INDEXED | STORED);
        let mut fields = HashMap::new();
        for name in TEXT_FIELDS {
            fields.insert(name.to_string(), schema_builder.add_text_field(name, TEXT));
        }
        let schema = schema_builder.build();

        let index = Index::create_in_dir(&index_path, schema)
            .map_err(|e| LexicalIndexError::Initialization(e.to_string()))?;

        Self::finish_open(index, id_field, fields, index_path)
    }

    fn load(index_path: PathBuf) -> Result<Self, LexicalIndexError> {
        let index = Index::open_in_dir(&index_path)
            .map_err(|e| LexicalIndexError::Initialization(e.to_string()))?;

        let schema = index.schema();
        let id_field = schema.get_field("id").map_err(|_| {
            LexicalIndexError::Initialization("Missing 'id' field in schema".to_string())
        })?;

        let mut fields = HashMap::new();
        for name in TEXT_FIELDS {
            let field = schema.get_field(name).map_err(|_| {
                LexicalIndexError::Initialization(format!("Missing '{name}' field in schema"))
            })?;
            fields.insert(name.to_string(), field);
        }

        Self::finish_open(index, id_field, fields, index_path)
    }

    fn finish_open(
        index: Index,
        id_field: Field,
        fields: HashMap<String, Field>,
        index_path: PathBuf,
    ) -> Result<Self, LexicalIndexError> {
        let writer = index
            .writer(50_000_000)
            .map_err(|e| LexicalIndexError::Initialization(e.to_string()))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e: TantivyError| LexicalIndexError::Initialization(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            writer,
            id_field,
            fields,
            index_path,
        })
    }

    /// Index one product under `id`
    pub fn insert(&mut self, id: u64, product: &CanonicalProduct) -> Result<(), LexicalIndexError> {
        let mut doc = TantivyDocument::new();
        doc.add_u64(self.id_field, id);
        doc.add_text(self.fields["name"], &product.name);
        doc.add_text(self.fields["brand"], &product.brand);
        doc.add_text(self.fields["description"], &product.description);
        doc.add_text(self.fields["categories"], &product.categories);
        doc.add_text(self.fields["params_text"], &product.params_text);
        doc.add_text(self.fields["ngrams"], &ngram_text(&product.name));

        self.writer
            .add_document(doc)
            .map_err(|e| LexicalIndexError::Insert(e.to_string()))?;

        Ok(())
    }

    /// Commit pending writes and reload the reader
    pub fn commit(&mut self) -> Result<(), LexicalIndexError> {
        self.writer
            .commit()
            .map_err(|e| LexicalIndexError::Insert(e.to_string()))?;
        self.reader
            .reload()
            .map_err(|e| LexicalIndexError::Search(e.to_string()))?;
        Ok(())
    }

    /// Execute a weighted multi-field clause, returning (id, BM25 score)
    /// pairs, best first.
    ///
    /// Every term is a should-clause over all weighted fields; matching
    /// subqueries sum, which gives the most-fields/OR semantics.
    pub fn search(
        &self,
        clause: &LexicalClause,
        limit: usize,
    ) -> Result<Vec<(u64, f32)>, LexicalIndexError> {
        if limit == 0 || clause.terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut term_clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for term in &clause.terms {
            let word = term.to_lowercase();
            let mut field_queries: Vec<(Occur, Box<dyn Query>)> = Vec::new();

            for (field_name, boost) in &clause.fields {
                let Some(field) = self.fields.get(field_name) else {
                    continue;
                };

                if field_name == "ngrams" {
                    // The trigram field stores shingled tokens; the query
                    // word is shingled the same way
                    for gram in trigrams(&word) {
                        field_queries.push(boosted_term(*field, &gram, *boost));
                    }
                } else {
                    field_queries.push(boosted_term(*field, &word, *boost));
                }
            }

            if !field_queries.is_empty() {
                term_clauses.push((Occur::Should, Box::new(BooleanQuery::new(field_queries))));
            }
        }

        if term_clauses.is_empty() {
            return Ok(Vec::new());
        }

        let query = BooleanQuery::new(term_clauses);
        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .map_err(|e| LexicalIndexError::Search(e.to_string()))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let retrieved: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| LexicalIndexError::Search(e.to_string()))?;

            let id = retrieved
                .get_first(self.id_field)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| {
                    LexicalIndexError::Search("Missing or invalid id field".to_string())
                })?;

            results.push((id, score));
        }

        Ok(results)
    }

    /// Number of committed documents
    pub fn len(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn boosted_term(field: Field, text: &str, boost: f32) -> (Occur, Box<dyn Query>) {
    let term_query = TermQuery::new(
        Term::from_field_text(field, text),
        IndexRecordOption::WithFreqs,
    );
    (
        Occur::Should,
        Box::new(BoostQuery::new(Box::new(term_query), boost)),
    )
}

/// Character trigrams of one lowercased token; tokens shorter than three
/// characters index as themselves
fn trigrams(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() < 3 {
        return vec![word.to_string()];
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Shingle whitespace-separated tokens into space-joined trigrams
pub(crate) fn ngram_text(text: &str) -> String {
    text.split_whitespace()
        .flat_map(|token| trigrams(&token.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}
