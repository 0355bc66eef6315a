//! Term-weighted vector index
//!
//! Projects a corpus of documents into a fixed vocabulary of at most
//! `MAX_FEATURES` terms. Weights are raw term counts scaled by a smoothed
//! inverse document frequency, `ln((1 + n) / (1 + df)) + 1`, and every vector
//! is L2-normalized, so a dot product is the cosine similarity.
//!
//! The index is a pure function of the corpus it was built from. It is never
//! updated in place; a changed corpus means a new index.

use std::collections::HashMap;

/// Vocabulary bound
pub const MAX_FEATURES: usize = 1000;

/// Common English words carrying no signal
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "else",
    "etc", "even", "ever", "every", "few", "for", "from", "further", "had", "has", "have",
    "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "however",
    "i", "if", "in", "into", "is", "it", "its", "itself", "just", "least", "less", "may", "me",
    "might", "more", "most", "much", "must", "my", "myself", "neither", "no", "nor", "not", "now",
    "of", "off", "often", "on", "once", "only", "or", "other", "others", "otherwise", "our",
    "ours", "ourselves", "out", "over", "own", "per", "perhaps", "please", "rather", "same",
    "several", "she", "should", "show", "since", "so", "some", "still", "such", "than", "that",
    "the", "their", "theirs", "them", "themselves", "then", "there", "therefore", "these",
    "they", "this", "those", "though", "through", "thus", "to", "together", "too", "toward",
    "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were", "what",
    "whatever", "when", "whence", "where", "whether", "which", "while", "who", "whoever",
    "whole", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet", "you",
    "your", "yours", "yourself", "yourselves",
];

/// Split text into lower-cased terms of two or more word characters,
/// dropping stop words
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Immutable index over one corpus snapshot
#[derive(Debug, Clone)]
pub struct TermIndex {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<Vec<f64>>,
}

impl TermIndex {
    /// Fit the vocabulary and weights to `documents` and project each of them
    pub fn build<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        // Corpus-wide counts and document frequencies
        let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();

        for terms in &tokenized {
            let mut seen: Vec<&str> = Vec::with_capacity(terms.len());
            for term in terms {
                *corpus_counts.entry(term.as_str()).or_insert(0) += 1;
                if !seen.contains(&term.as_str()) {
                    seen.push(term.as_str());
                    *doc_freq.entry(term.as_str()).or_insert(0) += 1;
                }
            }
        }

        // Keep the most frequent terms, ties broken alphabetically
        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(MAX_FEATURES);

        let mut kept: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort_unstable();

        let n = documents.len() as f64;
        let vocabulary: HashMap<String, usize> = kept
            .iter()
            .enumerate()
            .map(|(i, term)| (term.to_string(), i))
            .collect();
        let idf: Vec<f64> = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let mut index = Self {
            vocabulary,
            idf,
            vectors: Vec::new(),
        };
        let vectors: Vec<Vec<f64>> = tokenized.iter().map(|terms| index.weigh(terms)).collect();
        index.vectors = vectors;
        index
    }

    /// Number of documents this index was built from
    pub fn document_count(&self) -> usize {
        self.vectors.len()
    }

    /// Project arbitrary text into this index's space
    pub fn project(&self, text: &str) -> Vec<f64> {
        self.weigh(&tokenize(text))
    }

    /// Cosine similarity of `text` against every indexed document, in
    /// document order
    pub fn similarities(&self, text: &str) -> Vec<f64> {
        let query = self.project(text);
        self.vectors.iter().map(|doc| dot(&query, doc)).collect()
    }

    fn weigh(&self, terms: &[String]) -> Vec<f64> {
        let mut vector = vec![0.0; self.idf.len()];
        for term in terms {
            if let Some(&i) = self.vocabulary.get(term) {
                vector[i] += 1.0;
            }
        }
        for (weight, idf) in vector.iter_mut().zip(&self.idf) {
            *weight *= idf;
        }

        let norm = vector.iter().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 1e-12 {
            for weight in &mut vector {
                *weight /= norm;
            }
        }
        vector
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words_and_short_terms() {
        let terms = tokenize("What is the Q4 churn-rate for a customer_segment?");
        assert_eq!(terms, vec!["q4", "churn", "rate", "customer_segment"]);
    }

    #[test]
    fn test_identical_text_scores_one() {
        let index = TermIndex::build(&["customer churn analysis", "quarterly revenue forecast"]);
        let sims = index.similarities("customer churn analysis");

        assert!((sims[0] - 1.0).abs() < 1e-9);
        assert!(sims[1].abs() < 1e-9);
    }

    #[test]
    fn test_unknown_terms_project_to_zero() {
        let index = TermIndex::build(&["support tickets", "revenue"]);
        let vector = index.project("completely unrelated words");
        assert!(vector.iter().all(|w| *w == 0.0));
        assert_eq!(index.similarities("zzz"), vec![0.0, 0.0]);
    }

    #[test]
    fn test_vocabulary_is_bounded() {
        let docs: Vec<String> = (0..1200).map(|i| format!("term{}", i)).collect();
        let index = TermIndex::build(&docs);
        assert_eq!(index.project("term1").len(), MAX_FEATURES);
        assert_eq!(index.document_count(), 1200);
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let index = TermIndex::build(&[
            "customer churn",
            "customer revenue",
            "customer support",
        ]);
        let vector = index.project("customer churn");
        let customer = index.vocabulary["customer"];
        let churn = index.vocabulary["churn"];
        assert!(vector[churn] > vector[customer]);
    }
}
