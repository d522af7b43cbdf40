//! In-memory document index
//!
//! Owns documents, their vectors and the concept relationship graph.
//! Reads (scans) share a `parking_lot::RwLock`; writes are exclusive, so a
//! document and its vector are always inserted and removed together.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::analyzer::QueryAnalyzer;
use super::embeddings::{Embedder, Vector};
use super::graph::RelationshipGraph;
use crate::error::{RankError, Result};

pub type DocumentId = String;

/// An indexed unit of text with metadata and derived terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entities: BTreeSet<String>,
    #[serde(default)]
    pub concepts: BTreeSet<String>,
}

impl Document {
    /// Metadata words folded into the document vector.
    pub fn context_words(&self) -> Vec<String> {
        self.category
            .iter()
            .chain(self.domain.iter())
            .cloned()
            .collect()
    }
}

/// Ingestion payload for [`DocumentIndex::add`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInput {
    /// Generated (UUID v4) when absent
    #[serde(default)]
    pub id: Option<DocumentId>,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Defaults to ingestion time
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DocumentInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPatch {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.category.is_none()
            && self.domain.is_none()
            && self.difficulty.is_none()
            && self.timestamp.is_none()
    }
}

/// Outcome of loading persisted documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub documents: usize,
    /// Vectors recomputed because they were missing
    pub missing_vectors: usize,
    /// Vectors recomputed because their dimension was wrong
    pub mismatched_vectors: usize,
    /// Vectors with no matching document, dropped
    pub orphaned_vectors: usize,
}

#[derive(Debug, Default)]
struct IndexInner {
    documents: BTreeMap<DocumentId, Document>,
    vectors: HashMap<DocumentId, Vector>,
    graph: RelationshipGraph,
    /// Rebuilt whenever `graph` gains concepts
    analyzer: Arc<QueryAnalyzer>,
    generation: u64,
}

impl IndexInner {
    /// Insert a prepared document, re-deriving its terms if the vocabulary
    /// changed since it was prepared.
    fn insert(&mut self, prepared: Prepared) -> Result<DocumentId> {
        let Prepared {
            mut document,
            vector,
            analyzer,
        } = prepared;
        let id = document.id.clone();
        if self.documents.contains_key(&id) {
            return Err(RankError::DuplicateDocument(id));
        }
        if !Arc::ptr_eq(&analyzer, &self.analyzer) {
            annotate(&self.analyzer, &mut document);
        }
        self.vectors.insert(id.clone(), vector);
        self.documents.insert(id.clone(), document);
        Ok(id)
    }
}

/// A validated, vectorized document waiting for the write lock.
struct Prepared {
    document: Document,
    vector: Vector,
    analyzer: Arc<QueryAnalyzer>,
}

pub struct DocumentIndex {
    inner: RwLock<IndexInner>,
    embedder: Arc<dyn Embedder>,
}

impl DocumentIndex {
    pub fn new(embedder: Arc<dyn Embedder>, graph: RelationshipGraph) -> Self {
        Self {
            inner: RwLock::new(IndexInner {
                analyzer: Arc::new(QueryAnalyzer::new(&graph)),
                graph,
                ..Default::default()
            }),
            embedder,
        }
    }

    /// Analyzer over the current concept vocabulary.
    pub fn analyzer(&self) -> Arc<QueryAnalyzer> {
        Arc::clone(&self.inner.read().analyzer)
    }

    pub fn dims(&self) -> usize {
        self.embedder.dims()
    }

    pub fn len(&self) -> usize {
        self.inner.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().documents.is_empty()
    }

    /// Bumped on every write; readers use it to detect staleness.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.inner.read().documents.get(id).cloned()
    }

    pub fn graph(&self) -> RelationshipGraph {
        self.inner.read().graph.clone()
    }

    /// Shared read view for a scan. Writers wait until it is dropped.
    pub fn read(&self) -> IndexView<'_> {
        IndexView {
            guard: self.inner.read(),
        }
    }

    pub fn add(&self, input: DocumentInput) -> Result<DocumentId> {
        let prepared = self.prepare(input, self.analyzer())?;

        let mut inner = self.inner.write();
        let id = inner.insert(prepared)?;
        inner.generation += 1;
        drop(inner);

        info!(document_id = %id, "document indexed");
        Ok(id)
    }

    /// Vectorize in parallel, then insert under a single write lock.
    ///
    /// Results line up with `inputs`.
    pub fn add_batch(&self, inputs: Vec<DocumentInput>) -> Vec<Result<DocumentId>> {
        let analyzer = self.analyzer();
        let prepared: Vec<Result<Prepared>> = inputs
            .into_par_iter()
            .map(|input| self.prepare(input, Arc::clone(&analyzer)))
            .collect();

        let mut inner = self.inner.write();
        let mut added = 0usize;
        let results = prepared
            .into_iter()
            .map(|item| {
                let id = inner.insert(item?)?;
                added += 1;
                Ok(id)
            })
            .collect::<Vec<_>>();
        if added > 0 {
            inner.generation += 1;
        }
        drop(inner);

        info!(added, total = results.len(), "document batch indexed");
        results
    }

    pub fn update(&self, id: &str, patch: DocumentPatch) -> Result<()> {
        if let Some(content) = &patch.content {
            if content.trim().is_empty() {
                return Err(RankError::InvalidDocument(format!(
                    "update of '{id}' would leave empty content"
                )));
            }
        }

        let mut inner = self.inner.write();
        let analyzer = Arc::clone(&inner.analyzer);
        let Some(document) = inner.documents.get_mut(id) else {
            return Err(RankError::DocumentNotFound(id.to_string()));
        };

        let content_changed = patch
            .content
            .as_ref()
            .is_some_and(|c| *c != document.content);
        let vector_inputs_changed = content_changed
            || patch.category.as_ref().is_some_and(|c| Some(c) != document.category.as_ref())
            || patch.domain.as_ref().is_some_and(|d| Some(d) != document.domain.as_ref());

        if let Some(content) = patch.content {
            document.content = content;
        }
        if let Some(category) = patch.category {
            document.category = Some(category);
        }
        if let Some(domain) = patch.domain {
            document.domain = Some(domain);
        }
        if let Some(difficulty) = patch.difficulty {
            document.difficulty = Some(difficulty);
        }
        if let Some(timestamp) = patch.timestamp {
            document.timestamp = Some(timestamp);
        }

        if content_changed {
            annotate(&analyzer, document);
        }

        let new_vector = vector_inputs_changed.then(|| {
            self.embedder
                .embed(&document.content, &document.context_words())
        });
        if let Some(vector) = new_vector {
            inner.vectors.insert(id.to_string(), vector);
        }
        inner.generation += 1;
        drop(inner);

        debug!(document_id = %id, revectorized = vector_inputs_changed, "document updated");
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<Document> {
        let mut inner = self.inner.write();
        let Some(document) = inner.documents.remove(id) else {
            return Err(RankError::DocumentNotFound(id.to_string()));
        };
        inner.vectors.remove(id);
        inner.generation += 1;
        drop(inner);

        info!(document_id = %id, "document removed");
        Ok(document)
    }

    /// Add a symmetric concept relation.
    ///
    /// When either side is a new concept every document's terms are
    /// re-derived, so the whole index is rewritten under the write lock.
    pub fn relate(&self, a: &str, b: &str) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        inner.graph.relate(a, b);
        let analyzer = QueryAnalyzer::new(&inner.graph);
        if analyzer != *inner.analyzer {
            for document in inner.documents.values_mut() {
                annotate(&analyzer, document);
            }
            inner.analyzer = Arc::new(analyzer);
            debug!(a, b, documents = inner.documents.len(), "concept vocabulary extended");
        }
        inner.generation += 1;
    }

    /// Documents, vectors and graph for persistence.
    pub fn export(&self) -> (Vec<Document>, HashMap<DocumentId, Vector>, RelationshipGraph) {
        let inner = self.inner.read();
        (
            inner.documents.values().cloned().collect(),
            inner.vectors.clone(),
            inner.graph.clone(),
        )
    }

    /// Replace the whole index with persisted state.
    ///
    /// Missing or wrongly sized vectors are recomputed from content.
    pub fn restore(
        &self,
        documents: Vec<Document>,
        mut vectors: HashMap<DocumentId, Vector>,
        graph: RelationshipGraph,
    ) -> RestoreReport {
        let dims = self.dims();
        let analyzer = QueryAnalyzer::new(&graph);
        let mut report = RestoreReport::default();
        let mut restored_docs = BTreeMap::new();
        let mut restored_vectors = HashMap::with_capacity(documents.len());

        for mut document in documents {
            annotate(&analyzer, &mut document);
            let vector = match vectors.remove(&document.id) {
                Some(vector) if vector.len() == dims => vector,
                Some(vector) => {
                    let err = RankError::VectorDimensionMismatch {
                        document_id: document.id.clone(),
                        expected: dims,
                        actual: vector.len(),
                    };
                    warn!(error = %err, "recomputing persisted vector");
                    report.mismatched_vectors += 1;
                    self.embedder
                        .embed(&document.content, &document.context_words())
                }
                None => {
                    report.missing_vectors += 1;
                    self.embedder
                        .embed(&document.content, &document.context_words())
                }
            };
            restored_vectors.insert(document.id.clone(), vector);
            restored_docs.insert(document.id.clone(), document);
        }
        report.orphaned_vectors = vectors.len();
        report.documents = restored_docs.len();

        let mut inner = self.inner.write();
        inner.documents = restored_docs;
        inner.vectors = restored_vectors;
        inner.graph = graph;
        inner.analyzer = Arc::new(analyzer);
        inner.generation += 1;
        drop(inner);

        info!(
            documents = report.documents,
            missing = report.missing_vectors,
            mismatched = report.mismatched_vectors,
            orphaned = report.orphaned_vectors,
            "index restored"
        );
        report
    }

    fn prepare(&self, input: DocumentInput, analyzer: Arc<QueryAnalyzer>) -> Result<Prepared> {
        if input.content.trim().is_empty() {
            return Err(RankError::InvalidDocument(format!(
                "document {} has empty content",
                input.id.as_deref().unwrap_or("<new>")
            )));
        }

        let id = input
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut document = Document {
            entities: BTreeSet::new(),
            concepts: BTreeSet::new(),
            id,
            content: input.content,
            category: input.category,
            domain: input.domain,
            difficulty: input.difficulty,
            timestamp: Some(input.timestamp.unwrap_or_else(Utc::now)),
        };
        annotate(&analyzer, &mut document);
        let vector = self
            .embedder
            .embed(&document.content, &document.context_words());
        Ok(Prepared {
            document,
            vector,
            analyzer,
        })
    }
}

/// Derive a document's entity and concept terms from its content.
fn annotate(analyzer: &QueryAnalyzer, document: &mut Document) {
    document.entities = analyzer
        .extract_entities(&document.content)
        .into_iter()
        .map(|e| e.text)
        .collect();
    document.concepts = analyzer.extract_concepts(&document.content);
}

/// Read-locked view of the index for the duration of a scan.
pub struct IndexView<'a> {
    guard: RwLockReadGuard<'a, IndexInner>,
}

impl IndexView<'_> {
    pub fn len(&self) -> usize {
        self.guard.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.documents.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.guard.generation
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.guard.graph
    }

    pub fn get(&self, id: &str) -> Option<(&Document, &[f32])> {
        let document = self.guard.documents.get(id)?;
        Some((document, self.vector(id)))
    }

    /// Every document with its vector, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&Document, &[f32])> + '_ {
        self.guard
            .documents
            .values()
            .map(|document| (document, self.vector(&document.id)))
    }

    fn vector(&self, id: &str) -> &[f32] {
        self.guard.vectors.get(id).map_or(&[], Vec::as_slice)
    }
}
