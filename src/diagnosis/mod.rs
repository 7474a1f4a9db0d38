//! Multi-view diagnostic aggregation.
//!
//! Combines the five independent per-view classifications into one reported
//! diagnosis. The final state follows a severity-priority policy: the most
//! severe per-view verdict governs the final call. Four clean views never
//! mask one ruptured view, so this is deliberately not a majority vote.

mod suggestions;

pub use suggestions::{suggestion_for, FALLBACK_SUGGESTION};

use thiserror::Error;

use crate::types::{ConfidenceEntry, PartVocabulary, StateVocabulary, ViewPrediction};

/// Input that violates the aggregator's contract with the classifier.
///
/// The view count is a boundary concern and is validated before the
/// aggregator is invoked; these errors cover per-vector violations only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("view {view}: {head} vector has {got} entries, vocabulary has {expected}")]
    LengthMismatch {
        view: usize,
        head: &'static str,
        got: usize,
        expected: usize,
    },
    #[error("view {view}: {head} vector contains a non-finite value")]
    NonFinite { view: usize, head: &'static str },
}

/// Aggregated fields computed from the per-view predictions.
///
/// Identifier and timestamp are assigned by the caller at report-creation
/// time; identical inputs always produce an identical `Diagnosis`.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub part: String,
    pub state: String,
    pub confidence_panel: Vec<ConfidenceEntry>,
    pub suggestion: String,
    pub view_states: Vec<String>,
}

/// Aggregate the per-view predictions into one diagnostic verdict.
///
/// Pure function of its inputs and the two fixed vocabularies:
///
/// - **Part**: per-view arg-max over `part_probabilities`, then the mode of
///   the winning indices across views. All ties break to the lowest index.
/// - **State, per view**: arg-max over `state_probabilities` (lowest index
///   wins ties), mapped to labels and kept verbatim for audit.
/// - **State, aggregate**: the most severe per-view winner under the state
///   vocabulary's severity order.
/// - **Confidence panel**: element-wise mean of the state vectors, one
///   percentage string per state label.
pub fn aggregate(
    views: &[ViewPrediction],
    parts: &PartVocabulary,
    states: &StateVocabulary,
) -> Result<Diagnosis, InvalidInput> {
    for (view, prediction) in views.iter().enumerate() {
        validate_head(view, "part", &prediction.part_probabilities, parts.len())?;
        validate_head(view, "state", &prediction.state_probabilities, states.len())?;
    }

    let mut votes = vec![0usize; parts.len()];
    for prediction in views {
        votes[arg_max(&prediction.part_probabilities)] += 1;
    }
    let part_index = mode_index(&votes);

    let winner_indices: Vec<usize> = views
        .iter()
        .map(|p| arg_max(&p.state_probabilities))
        .collect();
    let view_states: Vec<String> = winner_indices
        .iter()
        .map(|&i| states.label(i).to_string())
        .collect();

    // Severity order is the vocabulary index order, so the most severe
    // per-view verdict is simply the largest winning index.
    let state_index = winner_indices.iter().copied().max().unwrap_or(0);
    let state = states.label(state_index).to_string();

    Ok(Diagnosis {
        part: parts.label(part_index).to_string(),
        suggestion: suggestion_for(&state).to_string(),
        state,
        confidence_panel: confidence_panel(views, states),
        view_states,
    })
}

fn validate_head(
    view: usize,
    head: &'static str,
    values: &[f32],
    expected: usize,
) -> Result<(), InvalidInput> {
    if values.len() != expected {
        return Err(InvalidInput::LengthMismatch {
            view,
            head,
            got: values.len(),
            expected,
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(InvalidInput::NonFinite { view, head });
    }
    Ok(())
}

/// Index of the maximum value; ties break to the lowest index.
///
/// The tie-break is an explicit invariant, not an artifact of a library
/// arg-max: only a strictly greater value displaces the current winner.
fn arg_max(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Index with the highest vote count; ties break to the lowest index.
fn mode_index(votes: &[usize]) -> usize {
    let mut best = 0;
    for (i, &count) in votes.iter().enumerate().skip(1) {
        if count > votes[best] {
            best = i;
        }
    }
    best
}

/// Element-wise mean of the per-view state vectors, one entry per state
/// label in vocabulary order, formatted as `"NN.NN%"`.
fn confidence_panel(views: &[ViewPrediction], states: &StateVocabulary) -> Vec<ConfidenceEntry> {
    let n = views.len() as f64;
    (0..states.len())
        .map(|s| {
            let mean: f64 = views
                .iter()
                .map(|p| p.state_probabilities[s] as f64)
                .sum::<f64>()
                / n;
            ConfidenceEntry {
                state: states.label(s).to_string(),
                confidence: format!("{:.2}%", mean * 100.0),
            }
        })
        .collect()
}
