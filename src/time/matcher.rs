//! Time matching
//!
//! During playback every non-driving layer must answer the question "which
//! of your frames belongs to the simulated time t_sim?". The answer is a
//! policy decision; the default takes the latest frame that is not from
//! the future, so layers with sparser timelines hold their last frame
//! until a newer one becomes valid.

use std::ops::Bound;

use chrono::{DateTime, Utc};

use crate::model::dataset::ProductDataset;
use crate::model::timeline::Timeline;

/// Strategy mapping a query time onto a layer's timeline.
pub trait MatchPolicy {
    /// Time step of `timeline` that should be displayed at `query`, or
    /// `None` when the timeline has nothing suitable. A miss is a normal
    /// outcome, not an error.
    fn matched_time(&self, timeline: &Timeline, query: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// Default policy: the greatest time step at or before the query.
///
/// A layer showing data "from the future" would mislead forecasters, so
/// a query before the first time step matches nothing at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestPastPolicy;

impl MatchPolicy for NearestPastPolicy {
    fn matched_time(&self, timeline: &Timeline, query: DateTime<Utc>) -> Option<DateTime<Utc>> {
        timeline.range(..=query).next_back().map(|(t, _)| *t)
    }
}

/// Alternative policy: the time step closest to the query in absolute
/// distance, preferring the past on a tie.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestPolicy;

impl MatchPolicy for NearestPolicy {
    fn matched_time(&self, timeline: &Timeline, query: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let past = timeline.range(..=query).next_back().map(|(t, _)| *t);
        let future = timeline
            .range((Bound::Excluded(query), Bound::Unbounded))
            .next()
            .map(|(t, _)| *t);
        match (past, future) {
            (Some(p), Some(f)) => {
                if query - p <= f - query {
                    Some(p)
                } else {
                    Some(f)
                }
            }
            (Some(p), None) => Some(p),
            (None, f) => f,
        }
    }
}

/// Wrapper the time manager matches through; holds the active policy.
pub struct TimeMatcher {
    policy: Box<dyn MatchPolicy>,
}

impl Default for TimeMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeMatcher {
    /// Matcher with the default nearest-past policy.
    pub fn new() -> Self {
        Self::with_policy(Box::new(NearestPastPolicy))
    }

    pub fn with_policy(policy: Box<dyn MatchPolicy>) -> Self {
        Self { policy }
    }

    /// Matched time step for `query`, per the active policy.
    pub fn match_time(&self, timeline: &Timeline, query: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.policy.matched_time(timeline, query)
    }

    /// Matched dataset for `query`, per the active policy.
    pub fn match_dataset<'a>(
        &self,
        timeline: &'a Timeline,
        query: DateTime<Utc>,
    ) -> Option<&'a ProductDataset> {
        self.match_time(timeline, query)
            .and_then(|t| timeline.get(&t))
    }
}
