//! The single stage transition the relay acts on.

use serde::{Deserialize, Serialize};

use crate::{DealId, EventError, StageId, StageTransitionEvent};

/// A `(source, target)` pair of stage ids.
///
/// This is an allow-list of exactly one transition, compared with exact
/// equality. A deal moving `source → target` is relayed; every other move,
/// including `target → source`, is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    /// Stage the deal must leave (`previous.stage_id`).
    pub source: StageId,
    /// Stage the deal must enter (`current.stage_id`).
    pub target: StageId,
}

/// Outcome of testing an event against the configured transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDecision {
    /// The event matches; the deal should be fetched and forwarded.
    Relay(DealId),
    /// Any other transition.
    Ignore,
}

impl StageTransition {
    /// Creates a transition from raw stage ids.
    pub fn new(source: StageId, target: StageId) -> Self {
        Self { source, target }
    }

    /// Returns `true` if `event` moves a deal from `source` to `target`.
    pub fn matches(&self, event: &StageTransitionEvent) -> bool {
        event.previous_stage == self.source && event.current_stage == self.target
    }

    /// Decides what to do with `event`.
    ///
    /// A matching event without a usable `current.id` is malformed; a
    /// non-matching one is ignored regardless of its deal id.
    pub fn evaluate(&self, event: &StageTransitionEvent) -> Result<TransitionDecision, EventError> {
        if !self.matches(event) {
            return Ok(TransitionDecision::Ignore);
        }
        event
            .deal_id
            .map(TransitionDecision::Relay)
            .ok_or(EventError::InvalidDealId)
    }
}

impl std::fmt::Display for StageTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(previous: u64, current: u64, deal: Option<u64>) -> StageTransitionEvent {
        StageTransitionEvent {
            deal_id: deal.map(DealId::new),
            previous_stage: StageId::new(previous),
            current_stage: StageId::new(current),
            event: None,
        }
    }

    fn four_to_five() -> StageTransition {
        StageTransition::new(StageId::new(4), StageId::new(5))
    }

    #[test]
    fn matching_transition_relays_deal() {
        assert_eq!(
            four_to_five().evaluate(&event(4, 5, Some(1824))),
            Ok(TransitionDecision::Relay(DealId::new(1824)))
        );
    }

    #[test]
    fn other_transitions_are_ignored() {
        let transition = four_to_five();
        for (previous, current) in [(4, 3), (3, 5), (5, 4), (4, 4), (5, 5)] {
            assert_eq!(
                transition.evaluate(&event(previous, current, Some(1824))),
                Ok(TransitionDecision::Ignore),
                "{previous} -> {current}"
            );
        }
    }

    #[test]
    fn ignored_event_does_not_need_a_deal_id() {
        assert_eq!(
            four_to_five().evaluate(&event(4, 3, None)),
            Ok(TransitionDecision::Ignore)
        );
    }

    #[test]
    fn matching_event_without_deal_id_is_malformed() {
        assert_eq!(
            four_to_five().evaluate(&event(4, 5, None)),
            Err(EventError::InvalidDealId)
        );
    }

    #[test]
    fn displays_as_arrow() {
        assert_eq!(four_to_five().to_string(), "4 -> 5");
    }
}
