//! Scenario definitions: a named, versioned set of candidate events to watch
//! for during one monitoring context.
//!
//! Scenarios are loaded from YAML, validated eagerly, and immutable once
//! loaded; consumers reload to pick up edits. Validation rejects malformed
//! definitions before any inference call is issued.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DetectError;
use crate::label::NONE_LABEL;

fn default_confirm_frames() -> u32 {
    3
}

/// One candidate event within a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDefinition {
    /// Identifier, unique within the scenario (e.g. "cutting_vegetables").
    pub id: String,
    /// Exact token the backend must output to count as a match. Uppercase,
    /// short: keep it under the backend's output-token budget so it cannot
    /// be truncated mid-label.
    pub label: String,
    /// Human-readable criteria fed to the backend in the classification
    /// prompt.
    pub description: String,
    /// Consecutive matching classifications required to fire. Must be >= 1;
    /// 1 fires on the first match.
    #[serde(default = "default_confirm_frames")]
    pub confirm_frames: u32,
    /// Free-form operator notes, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A declarative monitoring context: ordered candidate events plus the
/// metadata the evaluation tooling keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Stable scenario identifier.
    #[serde(rename = "scenario")]
    pub id: String,
    /// Bumped whenever event descriptions change, so recorded triggers can
    /// be matched to the prompt wording that produced them.
    pub version: u32,
    #[serde(default)]
    pub description: String,
    /// Candidate events in declaration order. Order is meaningful: it breaks
    /// ties when more than one event could fire on the same tick.
    pub events: Vec<EventDefinition>,
    /// Append-only evaluation entries, written by the reporting tooling.
    /// The detection engine parses and preserves this list but never
    /// modifies it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evaluations: Vec<serde_json::Value>,
}

impl Scenario {
    /// Parses and validates a scenario from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, DetectError> {
        let scenario: Scenario = serde_yaml::from_str(text)
            .map_err(|e| DetectError::ScenarioValidation(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Reads, parses, and validates a scenario file.
    pub fn from_path(path: &Path) -> Result<Self, DetectError> {
        let text = std::fs::read_to_string(path).map_err(|source| DetectError::ScenarioIo {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Scenario =
            serde_yaml::from_str(&text).map_err(|source| DetectError::ScenarioParse {
                path: path.to_path_buf(),
                source,
            })?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Checks the scenario invariants: at least one event, unique event ids,
    /// non-empty labels that do not collide with the no-event sentinel, and
    /// `confirm_frames >= 1` everywhere.
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.events.is_empty() {
            return Err(DetectError::ScenarioValidation(format!(
                "scenario '{}' declares no events",
                self.id
            )));
        }
        let mut seen_ids = HashSet::new();
        let mut seen_labels = HashSet::new();
        for event in &self.events {
            if !seen_ids.insert(event.id.as_str()) {
                return Err(DetectError::ScenarioValidation(format!(
                    "duplicate event id '{}'",
                    event.id
                )));
            }
            if event.label.trim().is_empty() {
                return Err(DetectError::ScenarioValidation(format!(
                    "event '{}' has an empty label",
                    event.id
                )));
            }
            if event.label == NONE_LABEL {
                return Err(DetectError::ScenarioValidation(format!(
                    "event '{}' uses the reserved no-event label '{}'",
                    event.id, NONE_LABEL
                )));
            }
            if !seen_labels.insert(event.label.as_str()) {
                // Legal but unusual: when two events share a label, the one
                // declared first always wins the tick.
                tracing::warn!(
                    target: "vigil::scenario",
                    event_id = %event.id,
                    label = %event.label,
                    "label is shared with an earlier event; the earlier event takes precedence"
                );
            }
            if event.confirm_frames == 0 {
                return Err(DetectError::ScenarioValidation(format!(
                    "event '{}' has confirm_frames=0 (must be >= 1)",
                    event.id
                )));
            }
            if event.label != event.label.to_uppercase() {
                tracing::warn!(
                    target: "vigil::scenario",
                    event_id = %event.id,
                    label = %event.label,
                    "label is not uppercase; backends are instructed to answer in ALL CAPS"
                );
            }
        }
        Ok(())
    }

    /// Builds the forced-label classification prompt from the event list.
    ///
    /// Small VLMs respond more reliably to forced label classification than
    /// to free-form description, so the prompt asks for exactly one label
    /// from the declared set plus the no-event sentinel.
    pub fn classification_prompt(&self) -> String {
        let mut lines = String::new();
        for event in &self.events {
            lines.push_str(&format!("- {}: {}\n", event.label, event.description));
        }
        format!(
            "Classify the current activity in this image.\n\
             Respond with EXACTLY one of these labels:\n\
             {lines}- {NONE_LABEL}: none of the above are clearly visible\n\n\
             Respond with the label ONLY. No explanation."
        )
    }

    /// Replaces every event's `confirm_frames` with a uniform value
    /// (the CLI `--confirm-frames` override).
    pub fn apply_confirm_override(&mut self, confirm_frames: u32) {
        for event in &mut self.events {
            event.confirm_frames = confirm_frames;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
scenario: cooking_prep
version: 2
description: Kitchen activity monitoring
events:
  - id: cutting_vegetables
    label: CUT
    description: someone is cutting or chopping vegetables
    confirm_frames: 3
  - id: washing_dishes
    label: WASH
    description: someone is washing dishes at the sink
"#;

    #[test]
    fn parses_and_validates_scenario() {
        let s = Scenario::from_yaml(VALID_YAML).unwrap();
        assert_eq!(s.id, "cooking_prep");
        assert_eq!(s.version, 2);
        assert_eq!(s.events.len(), 2);
        assert_eq!(s.events[0].confirm_frames, 3);
        // confirm_frames falls back to the default when omitted
        assert_eq!(s.events[1].confirm_frames, 3);
        assert!(s.evaluations.is_empty());
    }

    #[test]
    fn rejects_duplicate_event_ids() {
        let yaml = r#"
scenario: s
version: 1
events:
  - { id: a, label: CUT, description: d }
  - { id: a, label: WASH, description: d }
"#;
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, DetectError::ScenarioValidation(_)));
        assert!(err.to_string().contains("duplicate event id"));
    }

    #[test]
    fn rejects_zero_confirm_frames() {
        let yaml = r#"
scenario: s
version: 1
events:
  - { id: a, label: CUT, description: d, confirm_frames: 0 }
"#;
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("confirm_frames=0"));
    }

    #[test]
    fn rejects_empty_label() {
        let yaml = r#"
scenario: s
version: 1
events:
  - { id: a, label: "", description: d }
"#;
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("empty label"));
    }

    #[test]
    fn rejects_reserved_none_label() {
        let yaml = r#"
scenario: s
version: 1
events:
  - { id: a, label: NONE, description: d }
"#;
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn rejects_empty_event_list() {
        let yaml = "scenario: s\nversion: 1\nevents: []\n";
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("no events"));
    }

    #[test]
    fn prompt_lists_every_label_and_the_sentinel() {
        let s = Scenario::from_yaml(VALID_YAML).unwrap();
        let prompt = s.classification_prompt();
        assert!(prompt.contains("- CUT: someone is cutting"));
        assert!(prompt.contains("- WASH: someone is washing"));
        assert!(prompt.contains("- NONE: none of the above"));
        assert!(prompt.contains("EXACTLY one"));
    }

    #[test]
    fn confirm_override_applies_to_all_events() {
        let mut s = Scenario::from_yaml(VALID_YAML).unwrap();
        s.apply_confirm_override(5);
        assert!(s.events.iter().all(|e| e.confirm_frames == 5));
    }

    #[test]
    fn preserves_evaluations_entries() {
        let yaml = r#"
scenario: s
version: 1
events:
  - { id: a, label: CUT, description: d }
evaluations:
  - { date: "2026-01-10", accuracy: 0.9 }
"#;
        let s = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(s.evaluations.len(), 1);
        assert_eq!(s.evaluations[0]["accuracy"], 0.9);
    }
}
