//! Lexical document index
//!
//! Default `IndexBuilder`: splits loaded pages into chunks and ranks them for
//! a query with BM25 scoring over an inverted index. Deterministic and needs
//! no embedding service.

use async_trait::async_trait;
use axon_sdk::collaborators::{DocumentIndex, IndexBuilder};
use axon_sdk::errors::Result;
use axon_sdk::types::{Fragment, PageText};
use std::collections::HashMap;
use std::sync::Arc;

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// Target chunk size in characters
pub const CHUNK_CHARS: usize = 1000;

/// Tokenize text into lower-cased search terms
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_' && c != '-')
        .filter(|s| s.chars().count() >= 2)
        .map(String::from)
        .collect()
}

/// Split text into chunks of roughly `max_chars`, breaking on paragraph or
/// line boundaries where possible
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if !current.is_empty() && current.len() + line.len() + 1 > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if line.len() > max_chars {
            let mut piece = String::new();
            for word in line.split_whitespace() {
                if !piece.is_empty() && piece.len() + word.len() + 1 > max_chars {
                    chunks.push(std::mem::take(&mut piece));
                }
                if !piece.is_empty() {
                    piece.push(' ');
                }
                piece.push_str(word);
            }
            current = piece;
            continue;
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks.retain(|c| !c.trim().is_empty());
    chunks
}

struct Chunk {
    fragment: Fragment,
    length: usize,
}

/// Inverted index over the chunks of one document
pub struct KeywordIndex {
    chunks: Vec<Chunk>,
    /// term -> (chunk position, term frequency)
    postings: HashMap<String, Vec<(usize, u32)>>,
    avg_length: f32,
}

impl KeywordIndex {
    pub fn from_pages(pages: &[PageText]) -> Self {
        let mut chunks = Vec::new();
        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();

        for page in pages {
            for text in chunk_text(&page.text, CHUNK_CHARS) {
                let tokens = tokenize(&text);
                let position = chunks.len();

                let mut counts: HashMap<String, u32> = HashMap::new();
                for token in &tokens {
                    *counts.entry(token.clone()).or_insert(0) += 1;
                }
                for (token, tf) in counts {
                    postings.entry(token).or_default().push((position, tf));
                }

                chunks.push(Chunk {
                    fragment: Fragment::new(text, page.page),
                    length: tokens.len(),
                });
            }
        }

        let total: usize = chunks.iter().map(|c| c.length).sum();
        let avg_length = if chunks.is_empty() {
            0.0
        } else {
            total as f32 / chunks.len() as f32
        };

        Self {
            chunks,
            postings,
            avg_length,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top `k` chunks for `query`, best first; chunks sharing no term are skipped
    pub fn top(&self, query: &str, k: usize) -> Vec<Fragment> {
        let mut scores: HashMap<usize, f32> = HashMap::new();
        let n_docs = self.chunks.len() as f32;

        for token in tokenize(query) {
            let Some(posting) = self.postings.get(&token) else {
                continue;
            };
            let n = posting.len() as f32;
            let idf = ((n_docs - n + 0.5) / (n + 0.5) + 1.0).ln();

            for &(position, tf) in posting {
                let len = self.chunks[position].length as f32;
                let norm = 1.0 - B + B * (len / self.avg_length.max(1.0));
                let tf = tf as f32;
                *scores.entry(position).or_insert(0.0) += idf * (tf * (K1 + 1.0)) / (tf + K1 * norm);
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().collect();
        // Score desc, then document order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .take(k)
            .map(|(position, _)| self.chunks[position].fragment.clone())
            .collect()
    }
}

#[async_trait]
impl DocumentIndex for KeywordIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Fragment>> {
        Ok(self.top(query, k))
    }
}

/// Builds a `KeywordIndex` per uploaded document
pub struct KeywordIndexBuilder;

#[async_trait]
impl IndexBuilder for KeywordIndexBuilder {
    async fn build(&self, pages: Vec<PageText>) -> Result<Arc<dyn DocumentIndex>> {
        let index = KeywordIndex::from_pages(&pages);
        tracing::debug!("Indexed {} pages into {} chunks", pages.len(), index.len());
        Ok(Arc::new(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str, page: Option<u32>) -> PageText {
        PageText {
            text: text.to_string(),
            page,
        }
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("Newton's 2nd law: F = ma!");
        assert!(tokens.contains(&"newton".to_string()));
        assert!(tokens.contains(&"2nd".to_string()));
        assert!(tokens.contains(&"ma".to_string()));
        assert!(!tokens.contains(&"f".to_string()));
    }

    #[test]
    fn test_chunk_text_respects_limit() {
        let text = (0..50)
            .map(|i| format!("line number {} about cells", i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk_text(&text, 120);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 120));
    }

    #[test]
    fn test_ranking_prefers_matching_chunk_and_keeps_page() {
        let index = KeywordIndex::from_pages(&[
            page("Plants use chlorophyll to capture light.", Some(1)),
            page("Newton's second law relates force, mass and acceleration.", Some(2)),
            page("Mitochondria produce ATP.", Some(3)),
        ]);

        let hits = index.top("What does the second law say about force?", 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page, Some(2));
    }

    #[test]
    fn test_no_overlap_yields_nothing() {
        let index = KeywordIndex::from_pages(&[page("Photosynthesis in plants", None)]);
        assert!(index.top("quantum chromodynamics", 3).is_empty());
    }

    #[tokio::test]
    async fn test_builder_produces_searchable_index() {
        let index = KeywordIndexBuilder
            .build(vec![page("Gravity pulls masses together.", None)])
            .await
            .unwrap();

        let hits = index.search("gravity", 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "Gravity pulls masses together.");
    }
}
