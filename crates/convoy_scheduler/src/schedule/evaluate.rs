use jiff::SignedDuration;
use jiff::civil::DateTime;
use smallvec::SmallVec;

use crate::problem::{
    customer::{CustomerIdx, StopKind},
    instance::Instance,
    site::SiteIdx,
    travel_matrix::Distance,
    vehicle::DrivingRules,
};
use crate::schedule::{
    break_rules::apply_breaks,
    route::Route,
    sim_state::SimState,
    time_node::{NodeBuf, TimeNode, TimeNodeKind},
};

/// Why a candidate insertion was refused. A rejection is a normal branch of
/// construction, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TimeWindowMissed,
    CapacityExceeded,
    PrecedenceViolated,
    RouteDurationExceeded,
    DailyDriveExceeded,
}

/// Which stops a successful evaluation covers, and which the commit must
/// therefore append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionStep {
    Collect,
    Deliver,
    Combined,
}

/// Cost descriptor of a feasible insertion. Candidates compete on the
/// earliest resulting time, never on distance or load balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionCost {
    pub finish: DateTime,
    pub end_site: SiteIdx,
    pub added_break: SignedDuration,
    pub added_distance: Distance,
}

/// The outcome of a successful evaluation: the tentative nodes, the state
/// the route would end in, and the cost descriptor. Nothing is written to
/// the route until the engine commits the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertionPlan {
    pub customer: CustomerIdx,
    pub step: InsertionStep,
    pub nodes: NodeBuf,
    pub state: SimState,
    pub cost: InsertionCost,
}

/// Advances the simulation to one stop: drive if the site differs, break
/// check, wait if the window is not yet open, service, break check. The
/// arrival used for the window test is the post-drive, post-break time.
fn advance_to_stop(
    instance: &Instance,
    rules: &DrivingRules,
    state: &mut SimState,
    nodes: &mut NodeBuf,
    customer: CustomerIdx,
    kind: StopKind,
) -> Result<(), Rejection> {
    let stop = instance.customer(customer).stop(kind);

    if state.site != stop.site() {
        let leg = instance.travel(state.site, stop.site());
        let start = state.time;
        state.time += leg.duration;
        state.continuous_drive += leg.duration;
        state.daily_drive += leg.duration;
        state.site = stop.site();
        nodes.push(TimeNode::drive(
            TimeNodeKind::Drive,
            start,
            state.time,
            leg.distance,
            Some(customer),
        ));
        apply_breaks(rules, state, nodes, Some(customer));
    }

    let window = stop.window();
    if state.time < window.start() {
        let start = state.time;
        nodes.push(TimeNode::new(
            TimeNodeKind::Wait,
            start,
            window.start(),
            Some(customer),
        ));
        state.other_time += window.start().duration_since(start);
        state.time = window.start();
    } else if !window.is_satisfied(state.time) {
        return Err(Rejection::TimeWindowMissed);
    }

    let service_kind = match kind {
        StopKind::Collect => TimeNodeKind::Collect,
        StopKind::Deliver => TimeNodeKind::Deliver,
    };
    let start = state.time;
    state.time += stop.service_duration();
    state.other_time += stop.service_duration();
    nodes.push(TimeNode::new(service_kind, start, state.time, Some(customer)));
    apply_breaks(rules, state, nodes, Some(customer));

    Ok(())
}

/// The two regulatory ceilings, checked once a delivery completes.
pub(crate) fn check_ceilings(
    rules: &DrivingRules,
    route_start: DateTime,
    state: &SimState,
) -> Result<(), Rejection> {
    if state.time.duration_since(route_start) > rules.route_duration_limit() {
        return Err(Rejection::RouteDurationExceeded);
    }

    if state.daily_drive > rules.daily_drive_limit() {
        return Err(Rejection::DailyDriveExceeded);
    }

    Ok(())
}

fn into_plan(
    customer: CustomerIdx,
    step: InsertionStep,
    nodes: NodeBuf,
    state: SimState,
    break_before: SignedDuration,
) -> InsertionPlan {
    let added_distance = nodes.iter().map(TimeNode::distance).sum();

    InsertionPlan {
        customer,
        step,
        cost: InsertionCost {
            finish: state.time,
            end_site: state.site,
            added_break: state.break_time - break_before,
            added_distance,
        },
        nodes,
        state,
    }
}

/// Separated policy, collect half: appends the collect stop only. Capacity
/// and the regulatory ceilings are deferred to the deliver half.
pub fn evaluate_collect(
    instance: &Instance,
    route: &Route,
    customer: CustomerIdx,
) -> Result<InsertionPlan, Rejection> {
    route.check_precedence(customer, StopKind::Collect)?;

    let mut state = route.state();
    let break_before = state.break_time;
    let mut nodes: NodeBuf = SmallVec::new();
    advance_to_stop(instance, route.rules(instance), &mut state, &mut nodes, customer, StopKind::Collect)?;

    Ok(into_plan(customer, InsertionStep::Collect, nodes, state, break_before))
}

/// Separated policy, deliver half: only valid on the route that already
/// holds the customer's collect. This is where the deferred capacity check
/// and the ceiling checks happen.
pub fn evaluate_deliver(
    instance: &Instance,
    route: &Route,
    customer: CustomerIdx,
) -> Result<InsertionPlan, Rejection> {
    route.check_precedence(customer, StopKind::Deliver)?;

    // The collect already committed its weight, so the current load is
    // "accumulated weight + customer weight" of the capacity rule.
    if route.load() > instance.vehicle(route.vehicle()).capacity() {
        return Err(Rejection::CapacityExceeded);
    }

    let rules = route.rules(instance);
    let mut state = route.state();
    let break_before = state.break_time;
    let mut nodes: NodeBuf = SmallVec::new();
    advance_to_stop(instance, rules, &mut state, &mut nodes, customer, StopKind::Deliver)?;
    check_ceilings(rules, route.start_time(), &state)?;

    Ok(into_plan(customer, InsertionStep::Deliver, nodes, state, break_before))
}

/// Combined policy: collect immediately followed by deliver in one atomic
/// evaluation.
pub fn evaluate_customer(
    instance: &Instance,
    route: &Route,
    customer: CustomerIdx,
) -> Result<InsertionPlan, Rejection> {
    route.check_precedence(customer, StopKind::Collect)?;

    let request = instance.customer(customer);
    if route.load() + request.weight() > instance.vehicle(route.vehicle()).capacity() {
        return Err(Rejection::CapacityExceeded);
    }

    let rules = route.rules(instance);
    let mut state = route.state();
    let break_before = state.break_time;
    let mut nodes: NodeBuf = SmallVec::new();
    advance_to_stop(instance, rules, &mut state, &mut nodes, customer, StopKind::Collect)?;
    advance_to_stop(instance, rules, &mut state, &mut nodes, customer, StopKind::Deliver)?;
    check_ceilings(rules, route.start_time(), &state)?;

    Ok(into_plan(customer, InsertionStep::Combined, nodes, state, break_before))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::route::Route;
    use crate::test_utils;

    #[test]
    fn test_combined_produces_drive_wait_service_nodes() {
        // One customer: collect at site 1 (window opens one hour after the
        // vehicle can arrive), deliver at site 2.
        let instance = test_utils::instance_with_customers(vec![test_utils::customer_spec(
            1,
            2,
            ("2024-03-04T10:00:00", "2024-03-04T12:00:00"),
            ("2024-03-04T10:00:00", "2024-03-04T16:00:00"),
            10.0,
        )]);
        let route = Route::empty(&instance, 0.into());

        let plan = evaluate_customer(&instance, &route, 0.into()).unwrap();

        let kinds: Vec<TimeNodeKind> = plan.nodes.iter().map(|node| node.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                TimeNodeKind::Drive,
                TimeNodeKind::Wait,
                TimeNodeKind::Collect,
                TimeNodeKind::Drive,
                TimeNodeKind::Deliver,
            ]
        );

        // 08:00 start, 1h drive, wait until 10:00, 10m service, 1h drive,
        // 10m service.
        assert_eq!(plan.cost.finish, "2024-03-04T11:20:00".parse().unwrap());
        assert_eq!(plan.cost.added_distance, 200);
        assert_eq!(plan.state.site, 2.into());
    }

    #[test]
    fn test_missed_window_rejects() {
        let instance = test_utils::instance_with_customers(vec![test_utils::customer_spec(
            1,
            2,
            ("2024-03-04T08:00:00", "2024-03-04T08:30:00"),
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            10.0,
        )]);
        let route = Route::empty(&instance, 0.into());

        // The drive alone takes an hour; the collect window closes at 08:30.
        let result = evaluate_customer(&instance, &route, 0.into());
        assert_eq!(result.unwrap_err(), Rejection::TimeWindowMissed);
    }

    #[test]
    fn test_over_capacity_rejects() {
        let instance = test_utils::instance_with_customers(vec![test_utils::customer_spec(
            1,
            2,
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            test_utils::VEHICLE_CAPACITY + 1.0,
        )]);
        let route = Route::empty(&instance, 0.into());

        let result = evaluate_customer(&instance, &route, 0.into());
        assert_eq!(result.unwrap_err(), Rejection::CapacityExceeded);
    }

    #[test]
    fn test_duplicate_customer_rejects() {
        let instance = test_utils::instance_with_customers(vec![test_utils::customer_spec(
            1,
            2,
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            10.0,
        )]);
        let mut route = Route::empty(&instance, 0.into());

        let plan = evaluate_customer(&instance, &route, 0.into()).unwrap();
        route.commit(&instance, &plan);

        let result = evaluate_customer(&instance, &route, 0.into());
        assert_eq!(result.unwrap_err(), Rejection::PrecedenceViolated);
    }

    #[test]
    fn test_deliver_without_collect_rejects() {
        let instance = test_utils::instance_with_customers(vec![test_utils::customer_spec(
            1,
            2,
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            10.0,
        )]);
        let route = Route::empty(&instance, 0.into());

        let result = evaluate_deliver(&instance, &route, 0.into());
        assert_eq!(result.unwrap_err(), Rejection::PrecedenceViolated);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let instance = test_utils::instance_with_customers(vec![test_utils::customer_spec(
            1,
            2,
            ("2024-03-04T09:00:00", "2024-03-04T12:00:00"),
            ("2024-03-04T09:00:00", "2024-03-04T16:00:00"),
            10.0,
        )]);
        let route = Route::empty(&instance, 0.into());

        let first = evaluate_customer(&instance, &route, 0.into()).unwrap();
        let second = evaluate_customer(&instance, &route, 0.into()).unwrap();
        assert_eq!(first, second);
    }
}
