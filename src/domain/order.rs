use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    #[default]
    Draft,
    Placed,
    Fulfilling,
    Completed,
    Canceled,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Draft => "draft",
            OrderState::Placed => "placed",
            OrderState::Fulfilling => "fulfilling",
            OrderState::Completed => "completed",
            OrderState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named workflow transitions.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Place,
    Fulfill,
    Complete,
    Cancel,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Place => "place",
            Transition::Fulfill => "fulfill",
            Transition::Complete => "complete",
            Transition::Cancel => "cancel",
        }
    }

    /// Target state if the transition is legal from `from`.
    pub fn target(&self, from: OrderState) -> Option<OrderState> {
        match (self, from) {
            (Transition::Place, OrderState::Draft) => Some(OrderState::Placed),
            (Transition::Fulfill, OrderState::Placed) => Some(OrderState::Fulfilling),
            (Transition::Complete, OrderState::Fulfilling) => Some(OrderState::Completed),
            (
                Transition::Cancel,
                OrderState::Draft | OrderState::Placed | OrderState::Fulfilling,
            ) => Some(OrderState::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An order and its single authoritative workflow state.
///
/// `version` increases on every applied transition and is used by stores
/// for compare-and-swap.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderAggregate {
    pub id: u64,
    pub state: OrderState,
    pub version: u64,
}

impl OrderAggregate {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            state: OrderState::Draft,
            version: 0,
        }
    }

    pub fn can_apply(&self, transition: Transition) -> bool {
        transition.target(self.state).is_some()
    }

    /// Moves the order to the transition's target state.
    pub fn apply(&mut self, transition: Transition) -> Result<OrderState, WorkflowError> {
        let target =
            transition
                .target(self.state)
                .ok_or(WorkflowError::TransitionUnavailable {
                    transition: transition.name(),
                    from: self.state,
                })?;
        self.state = target;
        self.version += 1;
        Ok(target)
    }
}
