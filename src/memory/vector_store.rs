//! Bounded vector memory
//!
//! Keeps the most recent interactions (FIFO by insertion) and a term index
//! over them for similarity retrieval. The index is rebuilt eagerly on every
//! add, so it always describes exactly the stored records. Each add costs
//! O(corpus).

use crate::memory::index::TermIndex;
use crate::models::{JsonObject, MemoryRecord, SimilarMemory};
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::io::Write;
use tracing::debug;

pub const DEFAULT_MAX_MEMORIES: usize = 100;

/// Hits must score strictly above this
pub const SIMILARITY_THRESHOLD: f64 = 0.1;

pub struct VectorMemoryStore {
    records: VecDeque<MemoryRecord>,
    /// `Some` iff at least two records are stored
    index: Option<TermIndex>,
    max_memories: usize,
    next_sequence: u64,
}

impl VectorMemoryStore {
    /// A capacity of zero is treated as one
    pub fn new(max_memories: usize) -> Self {
        let max_memories = max_memories.max(1);
        Self {
            records: VecDeque::with_capacity(max_memories + 1),
            index: None,
            max_memories,
            next_sequence: 0,
        }
    }

    /// Store an interaction, evict the oldest beyond capacity, rebuild the
    /// index. Returns the new record's sequence id.
    pub fn add(&mut self, query: &str, response: &Value, context: &JsonObject) -> u64 {
        let sequence_id = self.next_sequence;
        self.next_sequence += 1;

        self.records.push_back(MemoryRecord {
            sequence_id,
            query: query.to_string(),
            response: response.clone(),
            context_snapshot: context.clone(),
            context_hash: compute_context_hash(context),
            created_at: Utc::now(),
        });

        while self.records.len() > self.max_memories {
            if let Some(evicted) = self.records.pop_front() {
                debug!(sequence_id = evicted.sequence_id, "Evicted oldest memory");
            }
        }

        self.rebuild_index();
        sequence_id
    }

    fn rebuild_index(&mut self) {
        if self.records.len() < 2 {
            self.index = None;
            return;
        }

        let documents: Vec<String> = self.records.iter().map(document_text).collect();
        self.index = Some(TermIndex::build(&documents));
    }

    /// Up to `top_k` stored records scoring above the threshold, best first.
    /// Equal scores keep insertion order.
    pub fn find_similar(&self, query: &str, top_k: usize) -> Vec<SimilarMemory> {
        let Some(index) = &self.index else {
            return Vec::new();
        };
        if top_k == 0 {
            return Vec::new();
        }
        debug_assert_eq!(index.document_count(), self.records.len());

        let mut scored: Vec<(usize, f64)> = index
            .similarities(query)
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > SIMILARITY_THRESHOLD)
            .collect();

        // Stable: ties stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        scored
            .into_iter()
            .filter_map(|(i, score)| {
                self.records.get(i).map(|record| SimilarMemory {
                    record: record.clone(),
                    similarity_score: score,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_memories
    }

    /// Stored records, oldest first
    pub fn records(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.records.iter()
    }
}

impl Default for VectorMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MEMORIES)
    }
}

/// Text indexed for a record: the query followed by the compact response JSON
fn document_text(record: &MemoryRecord) -> String {
    format!("{} {}", record.query, record.response)
}

/// SHA-256 of a context map, streamed straight into the hasher
pub fn compute_context_hash(context: &JsonObject) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), context).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
