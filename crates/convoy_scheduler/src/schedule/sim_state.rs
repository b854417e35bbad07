use jiff::SignedDuration;
use jiff::civil::DateTime;

use crate::problem::site::SiteIdx;

/// The simulation cursor carried across successive insertions on one route.
/// Threaded explicitly through every feasibility check — evaluation works on
/// a copy, commit adopts the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimState {
    pub time: DateTime,
    pub site: SiteIdx,

    /// Drive time since the last qualifying break.
    pub continuous_drive: SignedDuration,

    /// Drive time since the last delivery reset.
    pub daily_drive: SignedDuration,

    /// Break time since the last delivery reset.
    pub break_time: SignedDuration,

    /// Non-drive on-duty time (waiting + service) since the last delivery
    /// reset.
    pub other_time: SignedDuration,
}

impl SimState {
    pub fn at(time: DateTime, site: SiteIdx) -> Self {
        SimState {
            time,
            site,
            continuous_drive: SignedDuration::ZERO,
            daily_drive: SignedDuration::ZERO,
            break_time: SignedDuration::ZERO,
            other_time: SignedDuration::ZERO,
        }
    }

    /// On-duty time used by the working-time break rules.
    pub fn on_duty(&self) -> SignedDuration {
        self.daily_drive + self.other_time + self.break_time
    }

    /// A completed delivery closes the pickup-to-delivery cycle and restarts
    /// the regulatory bookkeeping used for the ceiling checks. Continuous
    /// drive is untouched: only a qualifying break resets it.
    pub fn reset_regulatory(&mut self) {
        self.daily_drive = SignedDuration::ZERO;
        self.break_time = SignedDuration::ZERO;
        self.other_time = SignedDuration::ZERO;
    }
}
