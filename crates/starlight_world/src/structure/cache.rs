//! Per-instance structure match cache and its edge trigger.

use std::sync::Arc;

use starlight_shared::{BlockPos, WorldId};
use tracing::{debug, warn};

use super::matcher::StructureMatcher;
use crate::block::BlockGrid;
use crate::pattern::PatternBlockArray;

/// Last known match state of a structure instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchState {
    /// Not evaluated since load.
    #[default]
    Uninitialized,
    /// Pattern matched on the last evaluation.
    Matched,
    /// Pattern did not match on the last evaluation.
    Unmatched,
}

impl MatchState {
    const fn from_result(matched: bool) -> Self {
        if matched {
            Self::Matched
        } else {
            Self::Unmatched
        }
    }
}

/// Turns a stream of evaluation results into transitions.
///
/// From `Uninitialized` the first result is compared against `baseline`
/// (the state the instance already believes, e.g. its persisted flag);
/// afterwards each result is compared against the previous one.
#[derive(Clone, Copy, Debug)]
pub struct EdgeTrigger {
    state: MatchState,
    baseline: bool,
}

impl EdgeTrigger {
    /// Creates a trigger that considers `baseline` the current state.
    #[must_use]
    pub const fn new(baseline: bool) -> Self {
        Self {
            state: MatchState::Uninitialized,
            baseline,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> MatchState {
        self.state
    }

    /// Feeds one result. Returns `Some(result)` only when it differs from
    /// the previous state.
    pub fn observe(&mut self, matched: bool) -> Option<bool> {
        let previous = match self.state {
            MatchState::Uninitialized => self.baseline,
            MatchState::Matched => true,
            MatchState::Unmatched => false,
        };
        self.state = MatchState::from_result(matched);
        (previous != matched).then_some(matched)
    }
}

/// Structure match record of one instance.
///
/// The matcher is built on first evaluation and reused afterwards. A build
/// failure counts as "not matched" and is retried on the next evaluation.
#[derive(Debug)]
pub struct StructureMatchCache {
    world: WorldId,
    anchor: BlockPos,
    pattern: Arc<PatternBlockArray>,
    matcher: Option<StructureMatcher>,
    trigger: EdgeTrigger,
    build_failures: u64,
}

impl StructureMatchCache {
    /// Creates a cache for the instance at `anchor`. `baseline` is the
    /// match state the instance already reflects.
    #[must_use]
    pub const fn new(
        world: WorldId,
        anchor: BlockPos,
        pattern: Arc<PatternBlockArray>,
        baseline: bool,
    ) -> Self {
        Self {
            world,
            anchor,
            pattern,
            matcher: None,
            trigger: EdgeTrigger::new(baseline),
            build_failures: 0,
        }
    }

    /// Live evaluation. Safe to call every step.
    pub fn evaluate(&mut self, grid: &BlockGrid) -> bool {
        if self.matcher.is_none() {
            match StructureMatcher::new(self.anchor, Arc::clone(&self.pattern)) {
                Ok(matcher) => {
                    debug!(world = %self.world, anchor = %self.anchor, "structure matcher built");
                    self.matcher = Some(matcher);
                }
                Err(e) => {
                    self.build_failures += 1;
                    // Retried every step; only the first failure is worth a warning.
                    if self.build_failures == 1 {
                        warn!(world = %self.world, anchor = %self.anchor, error = %e, "structure matcher unavailable");
                    } else {
                        debug!(
                            world = %self.world,
                            anchor = %self.anchor,
                            failures = self.build_failures,
                            "structure matcher still unavailable"
                        );
                    }
                    return false;
                }
            }
        }
        self.matcher.as_mut().is_some_and(|m| m.matches(grid))
    }

    /// Evaluates and returns `Some(matched)` only on a transition.
    pub fn poll_transition(&mut self, grid: &BlockGrid) -> Option<bool> {
        let matched = self.evaluate(grid);
        self.trigger.observe(matched)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> MatchState {
        self.trigger.state()
    }

    /// Anchor of the owning instance.
    #[must_use]
    pub const fn anchor(&self) -> BlockPos {
        self.anchor
    }

    /// Bound matcher, once built.
    #[must_use]
    pub const fn matcher(&self) -> Option<&StructureMatcher> {
        self.matcher.as_ref()
    }

    /// Failed matcher builds so far.
    #[must_use]
    pub const fn build_failures(&self) -> u64 {
        self.build_failures
    }
}
