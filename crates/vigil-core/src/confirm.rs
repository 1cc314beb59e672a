//! Temporal confirmation state machine.
//!
//! One consecutive-match counter per declared event. A tick's observed label
//! increments exactly one counter and resets every other counter to zero, so
//! a single spurious misclassification cannot fire an event and a single
//! spurious miss resets progress toward a true positive. The policy trades
//! sensitivity for false-positive suppression: a delayed detection is
//! recoverable by re-running, a false trigger pollutes the evaluation record.

use crate::scenario::EventDefinition;

/// Per-event consecutive-match counters for one detection session.
///
/// No state survives the session: the tracker is constructed at session
/// start with every counter at zero and discarded after the first fire.
#[derive(Debug)]
pub struct ConfirmationTracker {
    thresholds: Vec<u32>,
    counters: Vec<u32>,
}

impl ConfirmationTracker {
    /// Builds a tracker over the scenario's events in declaration order.
    pub fn new(events: &[EventDefinition]) -> Self {
        Self {
            thresholds: events.iter().map(|e| e.confirm_frames).collect(),
            counters: vec![0; events.len()],
        }
    }

    /// Applies one tick.
    ///
    /// `matched` is the declaration-order index of the event whose label
    /// equals this tick's observed label, or `None` when the tick observed
    /// the no-event sentinel, an unknown token, an ambiguous fragment, or a
    /// failed classification. Returns `Some(index)` when that event's
    /// counter reaches its threshold: the event has FIRED and the session
    /// must end. Counters are scanned in declaration order, so if several
    /// events could cross on the same tick the first declared wins.
    pub fn observe(&mut self, matched: Option<usize>) -> Option<usize> {
        for (idx, counter) in self.counters.iter_mut().enumerate() {
            if Some(idx) == matched {
                *counter += 1;
            } else {
                *counter = 0;
            }
        }
        self.counters
            .iter()
            .position(|&c| c > 0)
            .filter(|&idx| self.counters[idx] >= self.thresholds[idx])
    }

    /// Current counter values, for status lines and tests.
    pub fn counters(&self) -> &[u32] {
        &self.counters
    }

    /// Renders the non-zero counters as `LABEL=n` pairs for the per-frame
    /// status line.
    pub fn progress_line(&self, events: &[EventDefinition]) -> String {
        self.counters
            .iter()
            .zip(events)
            .filter(|(&c, _)| c > 0)
            .map(|(c, e)| format!("{}={}", e.label, c))
            .collect::<Vec<_>>()
            .join("  ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(defs: &[(&str, u32)]) -> Vec<EventDefinition> {
        defs.iter()
            .map(|(label, confirm_frames)| EventDefinition {
                id: label.to_lowercase(),
                label: label.to_string(),
                description: String::new(),
                confirm_frames: *confirm_frames,
                notes: None,
            })
            .collect()
    }

    /// Feeds a tick sequence of matched indices, returning the tick number
    /// (1-based) of the first fire, if any.
    fn drive(tracker: &mut ConfirmationTracker, ticks: &[Option<usize>]) -> Option<(usize, usize)> {
        for (i, &matched) in ticks.iter().enumerate() {
            if let Some(fired) = tracker.observe(matched) {
                return Some((i + 1, fired));
            }
        }
        None
    }

    #[test]
    fn fires_at_exactly_k_consecutive_matches() {
        let evs = events(&[("CUT", 3)]);
        let mut t = ConfirmationTracker::new(&evs);
        // non-match, then exactly 3 matches, fires on the 3rd
        let fired = drive(&mut t, &[None, Some(0), Some(0), Some(0)]);
        assert_eq!(fired, Some((4, 0)));
    }

    #[test]
    fn single_miss_resets_progress() {
        let evs = events(&[("CUT", 3)]);
        let mut t = ConfirmationTracker::new(&evs);
        // k-1 matches, one miss, k-1 matches: never fires
        let fired = drive(&mut t, &[Some(0), Some(0), None, Some(0), Some(0)]);
        assert_eq!(fired, None);
        assert_eq!(t.counters(), &[2]);
    }

    #[test]
    fn worked_example_fires_at_tick_seven() {
        // Labels {CUT, WASH, IDLE, NONE}; only CUT is tracked here with k=3.
        // Sequence [NONE, CUT, CUT, IDLE, CUT, CUT, CUT]: the IDLE at tick 4
        // resets the streak, so the fire lands exactly on tick 7.
        let evs = events(&[("CUT", 3)]);
        let mut t = ConfirmationTracker::new(&evs);
        let ticks = [
            None,    // NONE
            Some(0), // CUT
            Some(0), // CUT
            None,    // IDLE
            Some(0), // CUT
            Some(0), // CUT
            Some(0), // CUT
        ];
        assert_eq!(drive(&mut t, &ticks), Some((7, 0)));
    }

    #[test]
    fn confirm_frames_one_fires_immediately() {
        let evs = events(&[("CUT", 1)]);
        let mut t = ConfirmationTracker::new(&evs);
        assert_eq!(t.observe(Some(0)), Some(0));
    }

    #[test]
    fn a_tick_advances_at_most_one_counter() {
        let evs = events(&[("CUT", 3), ("WASH", 3)]);
        let mut t = ConfirmationTracker::new(&evs);
        t.observe(Some(0));
        t.observe(Some(0));
        assert_eq!(t.counters(), &[2, 0]);
        // a WASH tick resets CUT's progress
        t.observe(Some(1));
        assert_eq!(t.counters(), &[0, 1]);
    }

    #[test]
    fn first_declared_event_wins_ties() {
        // Two events with confirm_frames=1 that would both be satisfied by
        // the same matched index (shared labels resolve to the first
        // declared, but the tracker also breaks ties by scan order).
        let evs = events(&[("CUT", 1), ("CUT", 1)]);
        let mut t = ConfirmationTracker::new(&evs);
        assert_eq!(t.observe(Some(0)), Some(0));
    }

    #[test]
    fn unknown_and_ambiguous_ticks_reset_everything() {
        let evs = events(&[("CUT", 2), ("WASH", 2)]);
        let mut t = ConfirmationTracker::new(&evs);
        t.observe(Some(0));
        t.observe(Some(1));
        t.observe(None);
        assert_eq!(t.counters(), &[0, 0]);
    }
}
