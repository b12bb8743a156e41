// src/signals/score.rs
//! Similarity-to-score mapping for user-facing relevance.

/// Map a raw cosine similarity in [0,1] to a 0-10 relevance score.
///
/// Piecewise-linear with four segments, continuous at the joints and
/// monotone. Low similarities compress toward 0 and high ones spread toward
/// 10, so clearly relevant items separate visually from marginal ones.
/// Callers must pass similarities in [0,1]; out-of-range input is a contract
/// violation upstream (the index promises [0,1]).
pub fn similarity_to_score(similarity: f64) -> f64 {
    if similarity >= 0.8 {
        8.0 + (similarity - 0.8) * 10.0 // 8-10
    } else if similarity >= 0.6 {
        5.0 + (similarity - 0.6) * 15.0 // 5-8
    } else if similarity >= 0.4 {
        2.0 + (similarity - 0.4) * 15.0 // 2-5
    } else {
        similarity * 5.0 // 0-2
    }
}

/// Round to one decimal place, the precision exposed on [`crate::signals::Signal::score`].
pub fn round_score(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

/// Round to three decimal places, the precision exposed on
/// [`crate::signals::Signal::similarity`].
pub fn round_similarity(similarity: f64) -> f64 {
    (similarity * 1000.0).round() / 1000.0
}
