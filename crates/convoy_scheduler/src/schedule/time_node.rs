use jiff::SignedDuration;
use jiff::civil::DateTime;
use smallvec::SmallVec;

use crate::problem::{customer::CustomerIdx, travel_matrix::Distance};

/// Tentative node buffer produced by one evaluation. Small enough to stay
/// on the stack for the common drive/wait/service shape.
pub type NodeBuf = SmallVec<[TimeNode; 8]>;

/// What an interval on a vehicle's timeline represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeNodeKind {
    Drive,
    Break,
    Wait,
    Delay,
    Collect,
    Deliver,
    Return,
}

/// A single interval of a vehicle's day. Produced tentatively during
/// evaluation and moved onto the route's timeline on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeNode {
    kind: TimeNodeKind,
    start: DateTime,
    end: DateTime,
    distance: Distance,
    customer: Option<CustomerIdx>,
}

impl TimeNode {
    pub fn new(kind: TimeNodeKind, start: DateTime, end: DateTime, customer: Option<CustomerIdx>) -> Self {
        TimeNode {
            kind,
            start,
            end,
            distance: 0,
            customer,
        }
    }

    pub fn drive(
        kind: TimeNodeKind,
        start: DateTime,
        end: DateTime,
        distance: Distance,
        customer: Option<CustomerIdx>,
    ) -> Self {
        debug_assert!(matches!(kind, TimeNodeKind::Drive | TimeNodeKind::Return));
        TimeNode {
            kind,
            start,
            end,
            distance,
            customer,
        }
    }

    pub fn kind(&self) -> TimeNodeKind {
        self.kind
    }

    pub fn start(&self) -> DateTime {
        self.start
    }

    pub fn end(&self) -> DateTime {
        self.end
    }

    pub fn duration(&self) -> SignedDuration {
        self.end.duration_since(self.start)
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    pub fn customer(&self) -> Option<CustomerIdx> {
        self.customer
    }
}
