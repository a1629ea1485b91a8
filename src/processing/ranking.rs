//! Cosine similarity scoring and stable ranking.

use super::types::{IndexedChunk, RankedResult};
use std::cmp::Ordering;

/// Cosine similarity of `a` and `b`; `0.0` when either vector has zero magnitude.
///
/// Vectors are expected to share a dimension. Extra trailing components of the longer vector
/// are ignored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "embedding dimensions differ");
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Score every chunk against `query` and order by descending similarity.
///
/// The sort is stable: chunks with identical scores keep their index order. NaN scores (only
/// possible with NaN inputs) sink to the end.
pub fn rank(query: &[f32], chunks: &[IndexedChunk]) -> Vec<RankedResult> {
    let mut scored: Vec<(usize, f32)> = chunks
        .iter()
        .enumerate()
        .map(|(idx, chunk)| (idx, cosine_similarity(query, &chunk.embedding)))
        .collect();

    scored.sort_by(|(_, a), (_, b)| descending(*a, *b));

    scored
        .into_iter()
        .map(|(idx, score)| RankedResult {
            chunk_text: chunks[idx].text.clone(),
            score,
        })
        .collect()
}

fn descending(a: f32, b: f32) -> Ordering {
    let key = |value: f32| if value.is_nan() { f32::NEG_INFINITY } else { value };
    key(b).total_cmp(&key(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(position: usize, text: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            position,
            text: text.into(),
            embedding,
        }
    }

    #[test]
    fn cosine_identities_hold() {
        let v = [0.3, -1.2, 4.0];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&v, &neg) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&v, &[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 2.0]), 0.0);
    }

    #[test]
    fn rank_orders_by_descending_score() {
        let chunks = vec![
            chunk(0, "low", vec![0.0, 1.0]),
            chunk(1, "high", vec![1.0, 0.0]),
            chunk(2, "mid", vec![1.0, 1.0]),
        ];
        let ranked = rank(&[1.0, 0.0], &chunks);
        let texts: Vec<&str> = ranked.iter().map(|r| r.chunk_text.as_str()).collect();
        assert_eq!(texts, vec!["high", "mid", "low"]);
        assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn rank_is_stable_on_ties() {
        let chunks = vec![
            chunk(0, "first", vec![1.0, 0.0]),
            chunk(1, "other", vec![0.0, 1.0]),
            chunk(2, "second", vec![2.0, 0.0]),
            chunk(3, "third", vec![0.5, 0.0]),
        ];
        let ranked = rank(&[1.0, 0.0], &chunks);
        let texts: Vec<&str> = ranked.iter().map(|r| r.chunk_text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third", "other"]);
    }

    #[test]
    fn rank_of_empty_index_is_empty() {
        assert!(rank(&[1.0, 0.0], &[]).is_empty());
    }

    #[test]
    fn nan_scores_sink_without_panicking() {
        let chunks = vec![
            chunk(0, "nan", vec![f32::NAN, 0.0]),
            chunk(1, "good", vec![1.0, 0.0]),
        ];
        let ranked = rank(&[1.0, 0.0], &chunks);
        assert_eq!(ranked[0].chunk_text, "good");
    }
}
