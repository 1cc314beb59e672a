//! Label extraction and matching policy.
//!
//! Backends are instructed to lead their response with an ALL-CAPS label,
//! but the output is free-form text under a tight token budget. The parser
//! extracts a candidate token; the [`LabelSet`] then matches it against the
//! declared labels with a policy that never accepts a truncated token as a
//! full match; ambiguous output counts as "no match" for every event.

use crate::scenario::EventDefinition;

/// Implicit no-event sentinel. Always appended to the classification prompt;
/// never a valid event label.
pub const NONE_LABEL: &str = "NONE";

/// Extracts the label token from a raw backend response.
///
/// Returns `(label, confidence)`: the first word made entirely of `[A-Z_]`
/// with at least 3 characters (excludes "A", "I", "OK") at confidence 1.0,
/// or the first word uppercased at confidence 0.5 when no such token exists.
/// An empty response yields `("UNKNOWN", 0.5)`.
pub fn parse_label(raw: &str) -> (String, f32) {
    for word in raw.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
        if word.len() >= 3 && word.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            return (word.to_string(), 1.0);
        }
    }
    let fallback = raw
        .split_whitespace()
        .next()
        .map(|w| w.to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    (fallback, 0.5)
}

/// How a parsed label relates to the declared event set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Exact match against the event at this declaration-order index.
    Match(usize),
    /// The explicit no-event sentinel.
    NoEvent,
    /// Strict prefix of a declared label, almost certainly a label
    /// truncated by the output budget. Never counted as a match.
    Ambiguous(String),
    /// Matches nothing declared. Garbled or off-script output.
    Unknown(String),
}

impl Observation {
    /// Declaration-order index of the matched event, if any. Everything
    /// else feeds the reset branch of the confirmation state machine.
    pub fn matched(&self) -> Option<usize> {
        match self {
            Observation::Match(idx) => Some(*idx),
            _ => None,
        }
    }
}

/// Declared labels in declaration order, for resolving parsed output.
#[derive(Debug, Clone)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn from_events(events: &[EventDefinition]) -> Self {
        Self {
            labels: events.iter().map(|e| e.label.clone()).collect(),
        }
    }

    /// Resolves a parsed label against the declared set.
    ///
    /// Exact equality only; when two events share a label the first declared
    /// wins. A token that is a strict prefix of some declared label is
    /// [`Observation::Ambiguous`]: accepting the fragment would risk
    /// crediting the wrong event, so it counts as no match. Keeping labels
    /// short enough to survive the output budget is the scenario author's
    /// job.
    pub fn resolve(&self, label: &str) -> Observation {
        if label == NONE_LABEL {
            return Observation::NoEvent;
        }
        if let Some(idx) = self.labels.iter().position(|l| l == label) {
            return Observation::Match(idx);
        }
        if !label.is_empty()
            && self
                .labels
                .iter()
                .any(|l| l.len() > label.len() && l.starts_with(label))
        {
            tracing::debug!(
                target: "vigil::label",
                label = %label,
                "truncated label fragment; treating as no match"
            );
            return Observation::Ambiguous(label.to_string());
        }
        Observation::Unknown(label.to_string())
    }
}
