use std::collections::HashMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use quottit_core::domain::search::{SearchDocument, SearchHit, SearchQuery, SearchResult};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, QueryParser, RangeQuery, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, SchemaBuilder, Value, FAST, STORED, STRING, TEXT,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use thiserror::Error;

const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Debug, Error)]
pub enum SearchIndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
    #[error("query parse error: {0}")]
    QueryParse(#[from] tantivy::query::QueryParserError),
    #[error("missing field in schema: {0}")]
    MissingField(&'static str),
    #[error("missing stored value: {0}")]
    MissingValue(&'static str),
    #[error("invalid stored timestamp: {0}")]
    InvalidTimestamp(&'static str),
    #[error("index writer lock poisoned")]
    WriterPoisoned,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchIndexStats {
    pub num_docs: u64,
    pub num_segments: usize,
}

#[derive(Debug, Clone)]
struct SearchFields {
    id: Field,
    text: Field,
    author: Field,
    source: Field,
    tags: Field,
    created: Field,
    checksum: Field,
}

pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    fields: SearchFields,
    // tantivy allows a single writer per index
    write_lock: Mutex<()>,
}

impl SearchIndex {
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self, SearchIndexError> {
        let dir = path.as_ref();
        std::fs::create_dir_all(dir)?;
        let index = if dir.join("meta.json").exists() {
            Index::open_in_dir(dir)?
        } else {
            Index::create_in_dir(dir, build_schema())?
        };
        Self::from_index(index)
    }

    pub fn in_memory() -> Result<Self, SearchIndexError> {
        Self::from_index(Index::create_in_ram(build_schema()))
    }

    fn from_index(index: Index) -> Result<Self, SearchIndexError> {
        let fields = SearchFields::from_schema(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;
        Ok(Self {
            index,
            reader,
            fields,
            write_lock: Mutex::new(()),
        })
    }

    pub fn search(
        &self,
        query: &SearchQuery,
        limit: usize,
        offset: usize,
    ) -> Result<SearchResult, SearchIndexError> {
        let searcher = self.reader.searcher();
        let tantivy_query = build_query(&self.index, &self.fields, query);
        let total = searcher.search(&tantivy_query, &Count)?;
        if limit == 0 {
            return Ok(SearchResult {
                total,
                hits: Vec::new(),
            });
        }
        let docs = searcher.search(
            &tantivy_query,
            &TopDocs::with_limit(limit.saturating_add(offset)),
        )?;

        let mut hits = Vec::new();
        for (_, address) in docs.into_iter().skip(offset).take(limit) {
            let doc: TantivyDocument = searcher.doc(address)?;
            hits.push(self.document_to_hit(&doc)?);
        }
        Ok(SearchResult { total, hits })
    }

    /// Checksums of every indexed quote, keyed by id.
    pub fn checksums(&self) -> Result<HashMap<String, String>, SearchIndexError> {
        let searcher = self.reader.searcher();
        let total = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
        let mut checksums = HashMap::with_capacity(total);
        if total == 0 {
            return Ok(checksums);
        }
        let docs = searcher.search(&AllQuery, &TopDocs::with_limit(total))?;
        for (_, address) in docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let id = get_string(&doc, self.fields.id).ok_or(SearchIndexError::MissingValue("id"))?;
            let checksum = get_string(&doc, self.fields.checksum)
                .ok_or(SearchIndexError::MissingValue("checksum"))?;
            checksums.insert(id, checksum);
        }
        Ok(checksums)
    }

    pub fn upsert_documents(&self, documents: &[SearchDocument]) -> Result<(), SearchIndexError> {
        self.write(|writer, fields| {
            for doc in documents {
                writer.delete_term(Term::from_field_text(fields.id, &doc.id));
                writer.add_document(to_document(fields, doc))?;
            }
            Ok(())
        })
    }

    pub fn delete_documents(&self, ids: &[String]) -> Result<(), SearchIndexError> {
        self.write(|writer, fields| {
            for id in ids {
                writer.delete_term(Term::from_field_text(fields.id, id));
            }
            Ok(())
        })
    }

    pub fn delete_all(&self) -> Result<(), SearchIndexError> {
        self.write(|writer, _| {
            writer.delete_all_documents()?;
            Ok(())
        })
    }

    pub fn stats(&self) -> SearchIndexStats {
        let searcher = self.reader.searcher();
        SearchIndexStats {
            num_docs: searcher.num_docs(),
            num_segments: searcher.segment_readers().len(),
        }
    }

    fn write<F>(&self, apply: F) -> Result<(), SearchIndexError>
    where
        F: FnOnce(&mut IndexWriter<TantivyDocument>, &SearchFields) -> Result<(), SearchIndexError>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SearchIndexError::WriterPoisoned)?;
        let mut writer = self.index.writer::<TantivyDocument>(WRITER_HEAP_BYTES)?;
        apply(&mut writer, &self.fields)?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn document_to_hit(&self, doc: &TantivyDocument) -> Result<SearchHit, SearchIndexError> {
        let id = get_string(doc, self.fields.id).ok_or(SearchIndexError::MissingValue("id"))?;
        let text =
            get_string(doc, self.fields.text).ok_or(SearchIndexError::MissingValue("text"))?;
        let author =
            get_string(doc, self.fields.author).ok_or(SearchIndexError::MissingValue("author"))?;
        let created = get_i64(doc, self.fields.created)
            .ok_or(SearchIndexError::MissingValue("created"))?;
        Ok(SearchHit {
            id,
            text,
            author,
            source: get_string(doc, self.fields.source),
            tags: get_strings(doc, self.fields.tags),
            created_at: DateTime::<Utc>::from_timestamp_millis(created)
                .ok_or(SearchIndexError::InvalidTimestamp("created"))?,
        })
    }
}

impl SearchFields {
    fn from_schema(schema: &Schema) -> Result<Self, SearchIndexError> {
        let field = |name: &'static str| {
            schema
                .get_field(name)
                .map_err(|_| SearchIndexError::MissingField(name))
        };
        Ok(Self {
            id: field("id")?,
            text: field("text")?,
            author: field("author")?,
            source: field("source")?,
            tags: field("tags")?,
            created: field("created")?,
            checksum: field("checksum")?,
        })
    }
}

fn build_schema() -> Schema {
    let mut builder = SchemaBuilder::default();
    builder.add_text_field("id", STRING | STORED);
    builder.add_text_field("text", TEXT | STORED);
    builder.add_text_field("author", TEXT | STORED);
    builder.add_text_field("source", TEXT | STORED);
    builder.add_text_field("tags", STRING | STORED);
    builder.add_i64_field("created", STORED | FAST);
    builder.add_text_field("checksum", STRING | STORED);
    builder.build()
}

fn to_document(fields: &SearchFields, doc: &SearchDocument) -> TantivyDocument {
    let mut document = TantivyDocument::default();
    document.add_text(fields.id, &doc.id);
    document.add_text(fields.text, &doc.text);
    document.add_text(fields.author, &doc.author);
    if let Some(source) = &doc.source {
        document.add_text(fields.source, source);
    }
    for tag in &doc.tags {
        document.add_text(fields.tags, tag);
    }
    document.add_i64(fields.created, doc.created_at.timestamp_millis());
    document.add_text(fields.checksum, &doc.checksum);
    document
}

/// Keyword and author clauses are parsed leniently so stray query syntax in
/// user input never turns into an error.
fn build_query(index: &Index, fields: &SearchFields, query: &SearchQuery) -> Box<dyn Query> {
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

    if !query.keywords.is_empty() {
        let parser = QueryParser::for_index(index, vec![fields.text, fields.author, fields.source]);
        let (keyword_query, _) = parser.parse_query_lenient(&query.keywords.join(" "));
        clauses.push((Occur::Must, keyword_query));
    }

    if let Some(author) = &query.author {
        let parser = QueryParser::for_index(index, vec![fields.author]);
        let (author_query, _) = parser.parse_query_lenient(&format!("\"{author}\""));
        clauses.push((Occur::Must, author_query));
    }

    for tag in &query.tags {
        let term = Term::from_field_text(fields.tags, tag);
        clauses.push((
            Occur::Must,
            Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
        ));
    }

    if let Some(range) = &query.range {
        let (start, end) = range.to_millis_bounds();
        let bound = |value: Option<i64>| match value {
            Some(ms) => Bound::Included(Term::from_field_i64(fields.created, ms)),
            None => Bound::Unbounded,
        };
        clauses.push((Occur::Must, Box::new(RangeQuery::new(bound(start), bound(end)))));
    }

    if clauses.is_empty() {
        Box::new(AllQuery)
    } else {
        Box::new(BooleanQuery::from(clauses))
    }
}

fn get_string(doc: &TantivyDocument, field: Field) -> Option<String> {
    doc.get_first(field)?.as_str().map(|val| val.to_string())
}

fn get_strings(doc: &TantivyDocument, field: Field) -> Vec<String> {
    doc.get_all(field)
        .filter_map(|value| value.as_str().map(|text| text.to_string()))
        .collect()
}

fn get_i64(doc: &TantivyDocument, field: Field) -> Option<i64> {
    doc.get_first(field)?.as_i64()
}
