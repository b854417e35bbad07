use jiff::SignedDuration;

use crate::problem::{customer::CustomerIdx, vehicle::DrivingRules};
use crate::schedule::{
    sim_state::SimState,
    time_node::{NodeBuf, TimeNode, TimeNodeKind},
};

/// First half of the split short break.
const SHORT_BREAK: SignedDuration = SignedDuration::from_mins(15);

/// Second half of the split short break.
const SHORT_BREAK_TAIL: SignedDuration = SignedDuration::from_mins(30);

/// Break owed once the working-time thresholds are crossed.
const REST_BREAK: SignedDuration = SignedDuration::from_mins(45);

/// Accumulated break below which a rest is still owed.
const QUALIFYING_BREAK: SignedDuration = SignedDuration::from_mins(45);

const WORKING_BREAK_FLOOR: SignedDuration = SignedDuration::from_hours(6);
const WORKING_BREAK_CEILING: SignedDuration = SignedDuration::from_hours(9);

fn push_break(
    state: &mut SimState,
    nodes: &mut NodeBuf,
    duration: SignedDuration,
    customer: Option<CustomerIdx>,
) {
    let start = state.time;
    let end = start + duration;
    nodes.push(TimeNode::new(TimeNodeKind::Break, start, end, customer));
    state.time = end;
    state.break_time += duration;
}

/// Applies the driving-time break rules. Invoked after every drive leg and
/// after every service stop; breaks advance the simulated time and reset
/// the continuous-drive clock.
///
/// The rules run in fixed order:
/// 1. continuous drive at the limit without a qualifying break yet: the
///    15m + 30m split rest;
/// 2. on-duty time in [6h, 9h) without a qualifying break: one 45m rest;
/// 3. on-duty time past 9h without a qualifying break: one 45m rest.
pub fn apply_breaks(
    rules: &DrivingRules,
    state: &mut SimState,
    nodes: &mut NodeBuf,
    customer: Option<CustomerIdx>,
) {
    if state.continuous_drive >= rules.continuous_drive_limit()
        && state.break_time < QUALIFYING_BREAK
    {
        push_break(state, nodes, SHORT_BREAK, customer);
        push_break(state, nodes, SHORT_BREAK_TAIL, customer);
        state.continuous_drive = SignedDuration::ZERO;
    }

    let on_duty = state.on_duty();
    if on_duty >= WORKING_BREAK_FLOOR
        && on_duty < WORKING_BREAK_CEILING
        && state.break_time < QUALIFYING_BREAK
    {
        push_break(state, nodes, REST_BREAK, customer);
        state.continuous_drive = SignedDuration::ZERO;
    }

    if state.on_duty() >= WORKING_BREAK_CEILING && state.break_time < QUALIFYING_BREAK {
        push_break(state, nodes, REST_BREAK, customer);
        state.continuous_drive = SignedDuration::ZERO;
    }
}
