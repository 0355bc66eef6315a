//! Conversation log
//!
//! Raw interactions in arrival order, bounded by entry count. The oldest
//! entries are dropped first.

use crate::models::Interaction;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLog {
    interactions: VecDeque<Interaction>,
    limit: usize,
}

impl ConversationLog {
    pub fn new(limit: usize) -> Self {
        Self {
            interactions: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Append an interaction
    pub fn push(&mut self, query: &str, response: &Value) {
        self.interactions.push_back(Interaction {
            query: query.to_string(),
            response: response.clone(),
            timestamp: Utc::now(),
        });

        while self.interactions.len() > self.limit {
            self.interactions.pop_front();
        }
    }

    /// The `count` most recent interactions, most recent last
    pub fn recent(&self, count: usize) -> Vec<Interaction> {
        let skip = self.interactions.len().saturating_sub(count);
        self.interactions.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
