//! Staged progress reporting for long-running backend calls
//!
//! Stages advance on a timer owned by the caller. The tracker never reports
//! 100% on its own; only [`ProgressTracker::complete`] does, once the
//! response has resolved.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressStage {
    pub percent: u8,
    pub message: String,
}

impl ProgressStage {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
        }
    }
}

pub fn sprint_stages() -> Vec<ProgressStage> {
    vec![
        ProgressStage::new(15, "Analyzing sprint data..."),
        ProgressStage::new(35, "Processing team capacity..."),
        ProgressStage::new(55, "Evaluating backlog items..."),
        ProgressStage::new(75, "Generating AI response..."),
        ProgressStage::new(90, "Finalizing plan..."),
    ]
}

pub fn risk_stages(risk_count: usize) -> Vec<ProgressStage> {
    vec![
        ProgressStage::new(15, format!("Analyzing {} risk(s) data...", risk_count)),
        ProgressStage::new(35, "Evaluating severity levels across all risks..."),
        ProgressStage::new(55, "Assessing mitigation strategies for all risks..."),
        ProgressStage::new(75, "Generating comprehensive AI response..."),
        ProgressStage::new(90, "Finalizing multi-risk assessment..."),
    ]
}

/// Stages shown while a comment is being applied
pub fn comment_stages(subject: &str, data: &str) -> Vec<ProgressStage> {
    vec![
        ProgressStage::new(15, "Analyzing your comment..."),
        ProgressStage::new(35, format!("Processing {}...", subject)),
        ProgressStage::new(55, format!("Evaluating {}...", data)),
        ProgressStage::new(75, "Generating AI response..."),
        ProgressStage::new(90, "Finalizing updates..."),
    ]
}

#[derive(Debug, Default)]
struct ProgressState {
    stages: Vec<ProgressStage>,
    next: usize,
    percent: u8,
    message: String,
    complete: bool,
}

/// Shared progress handle; clones observe the same state
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    state: Rc<RefCell<ProgressState>>,
}

impl ProgressTracker {
    pub fn new(stages: Vec<ProgressStage>) -> Self {
        Self {
            state: Rc::new(RefCell::new(ProgressState {
                stages,
                ..ProgressState::default()
            })),
        }
    }

    /// Move to the next stage. Returns `None` once every stage has been
    /// shown or the tracker is complete.
    pub fn advance(&self) -> Option<ProgressStage> {
        let mut state = self.state.borrow_mut();
        if state.complete {
            return None;
        }
        let stage = state.stages.get(state.next)?.clone();
        state.next += 1;
        // Never step backwards or reach 100 before completion
        state.percent = state.percent.max(stage.percent.min(99));
        state.message = stage.message.clone();
        Some(stage)
    }

    pub fn complete(&self) {
        let mut state = self.state.borrow_mut();
        state.complete = true;
        state.percent = 100;
    }

    pub fn percent(&self) -> u8 {
        self.state.borrow().percent
    }

    pub fn message(&self) -> String {
        self.state.borrow().message.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.state.borrow().complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_stages_advance_then_stop_short_of_100() {
        let tracker = ProgressTracker::new(sprint_stages());
        let seen: Vec<u8> = std::iter::from_fn(|| tracker.advance().map(|s| s.percent)).collect();
        assert_eq!(seen, vec![15, 35, 55, 75, 90]);
        assert_eq!(tracker.percent(), 90);
        assert_eq!(tracker.message(), "Finalizing plan...");
        assert!(!tracker.is_complete());

        tracker.complete();
        assert_eq!(tracker.percent(), 100);
        assert!(tracker.advance().is_none());
    }

    #[test]
    fn test_complete_before_stages_finish() {
        let tracker = ProgressTracker::new(risk_stages(3));
        let first = tracker.advance().unwrap();
        assert_eq!(first.message, "Analyzing 3 risk(s) data...");
        let handle = tracker.clone();
        handle.complete();
        assert_eq!(tracker.percent(), 100);
        assert!(tracker.advance().is_none());
    }

    proptest! {
        #[test]
        fn prop_percent_is_monotonic_and_below_100(percents in proptest::collection::vec(0u8..=100, 0..10)) {
            let stages = percents.iter().map(|p| ProgressStage::new(*p, "x")).collect();
            let tracker = ProgressTracker::new(stages);
            let mut last = 0;
            while tracker.advance().is_some() {
                prop_assert!(tracker.percent() >= last);
                prop_assert!(tracker.percent() < 100);
                last = tracker.percent();
            }
            tracker.complete();
            prop_assert_eq!(tracker.percent(), 100);
        }
    }
}
