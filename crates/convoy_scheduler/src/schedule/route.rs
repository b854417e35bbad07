use fxhash::FxHashSet;
use jiff::SignedDuration;
use jiff::civil::DateTime;
use smallvec::SmallVec;

use crate::problem::{
    customer::{CustomerIdx, StopKind},
    instance::Instance,
    travel_matrix::Distance,
    vehicle::{DrivingRules, VehicleIdx},
};
use crate::schedule::{
    break_rules::apply_breaks,
    evaluate::{InsertionPlan, InsertionStep, Rejection, check_ceilings},
    sim_state::SimState,
    time_node::{NodeBuf, TimeNode, TimeNodeKind},
};
use crate::define_index_newtype;

define_index_newtype!(RouteIdx, Route);

/// One committed stop of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stop {
    pub customer: CustomerIdx,
    pub kind: StopKind,
}

/// A vehicle's schedule under construction: the committed stop sequence,
/// the committed timeline, running totals and the simulation state at the
/// route's current end.
pub struct Route {
    vehicle: VehicleIdx,
    stops: Vec<Stop>,

    /// Customers in the order their first stop was committed.
    commit_order: Vec<CustomerIdx>,

    start_time: DateTime,
    timeline: Vec<TimeNode>,
    state: SimState,

    /// Weight currently on board: collected but not yet delivered.
    load: f64,

    distance: Distance,
    break_time: SignedDuration,

    /// Collected-but-undelivered customers of this route.
    open_collects: FxHashSet<CustomerIdx>,

    finalized: bool,
}

impl Route {
    pub fn empty(instance: &Instance, vehicle: VehicleIdx) -> Self {
        let v = instance.vehicle(vehicle);
        Route {
            vehicle,
            stops: Vec::new(),
            commit_order: Vec::new(),
            start_time: v.start_time(),
            timeline: Vec::new(),
            state: SimState::at(v.start_time(), v.start_site()),
            load: 0.0,
            distance: 0,
            break_time: SignedDuration::ZERO,
            open_collects: FxHashSet::default(),
            finalized: false,
        }
    }

    /// Drops every commitment, back to the state of `empty`. Used by the
    /// engine when a route must be rebuilt without one of its customers.
    pub fn reset(&mut self, instance: &Instance) {
        let vehicle = instance.vehicle(self.vehicle);
        self.stops.clear();
        self.commit_order.clear();
        self.timeline.clear();
        self.state = SimState::at(vehicle.start_time(), vehicle.start_site());
        self.load = 0.0;
        self.distance = 0;
        self.break_time = SignedDuration::ZERO;
        self.open_collects.clear();
        self.finalized = false;
    }

    pub fn vehicle(&self) -> VehicleIdx {
        self.vehicle
    }

    pub fn rules<'a>(&self, instance: &'a Instance) -> &'a DrivingRules {
        instance.vehicle(self.vehicle).rules()
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn commit_order(&self) -> &[CustomerIdx] {
        &self.commit_order
    }

    pub fn timeline(&self) -> &[TimeNode] {
        &self.timeline
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn start_time(&self) -> DateTime {
        self.start_time
    }

    pub fn load(&self) -> f64 {
        self.load
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    pub fn break_time(&self) -> SignedDuration {
        self.break_time
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Elapsed on-duty span of the route so far.
    pub fn duration(&self) -> SignedDuration {
        self.state.time.duration_since(self.start_time)
    }

    pub fn contains(&self, customer: CustomerIdx) -> bool {
        self.stops.iter().any(|stop| stop.customer == customer)
    }

    pub fn has_stop(&self, customer: CustomerIdx, kind: StopKind) -> bool {
        self.stops
            .iter()
            .any(|stop| stop.customer == customer && stop.kind == kind)
    }

    /// Has this route collected the customer without delivering yet?
    pub fn holds_collect(&self, customer: CustomerIdx) -> bool {
        self.open_collects.contains(&customer)
    }

    /// Scans the committed sequence for the partner stop. Stops are only
    /// ever appended at the tail, so "collect strictly before deliver"
    /// reduces to which halves are already present.
    pub fn check_precedence(&self, customer: CustomerIdx, kind: StopKind) -> Result<(), Rejection> {
        let has_collect = self.has_stop(customer, StopKind::Collect);
        let has_deliver = self.has_stop(customer, StopKind::Deliver);

        match kind {
            StopKind::Collect if has_collect || has_deliver => Err(Rejection::PrecedenceViolated),
            StopKind::Deliver if has_deliver || !has_collect => Err(Rejection::PrecedenceViolated),
            _ => Ok(()),
        }
    }

    /// Commits an evaluated plan: moves the tentative nodes onto the
    /// timeline, appends the stop(s), folds the cost into the totals and
    /// adopts the resulting state. A completed delivery restarts the
    /// regulatory bookkeeping.
    pub fn commit(&mut self, instance: &Instance, plan: &InsertionPlan) {
        debug_assert!(!self.finalized, "commit on a finalized route");

        self.timeline.extend(plan.nodes.iter().copied());
        self.distance += plan.cost.added_distance;
        self.break_time += plan.cost.added_break;
        self.state = plan.state;

        let customer = plan.customer;
        let weight = instance.customer(customer).weight();

        match plan.step {
            InsertionStep::Collect => {
                self.stops.push(Stop {
                    customer,
                    kind: StopKind::Collect,
                });
                self.commit_order.push(customer);
                self.open_collects.insert(customer);
                self.load += weight;
            }
            InsertionStep::Deliver => {
                self.stops.push(Stop {
                    customer,
                    kind: StopKind::Deliver,
                });
                self.open_collects.remove(&customer);
                self.load -= weight;
                self.state.reset_regulatory();
            }
            InsertionStep::Combined => {
                self.stops.push(Stop {
                    customer,
                    kind: StopKind::Collect,
                });
                self.stops.push(Stop {
                    customer,
                    kind: StopKind::Deliver,
                });
                self.commit_order.push(customer);
                self.state.reset_regulatory();
            }
        }
    }

    /// Appends the final leg back to the vehicle's end site (zero-length if
    /// the route already ends there) and re-checks the regulatory ceilings.
    /// A violation leaves the route untouched and is reported as a
    /// rejection for the engine to repair.
    pub fn return_to_depot(&mut self, instance: &Instance) -> Result<(), Rejection> {
        debug_assert!(!self.finalized, "return_to_depot on a finalized route");

        let vehicle = instance.vehicle(self.vehicle);
        let rules = vehicle.rules();
        let mut state = self.state;
        let mut nodes: NodeBuf = SmallVec::new();

        let leg = instance.travel(state.site, vehicle.end_site());
        let start = state.time;
        state.time += leg.duration;
        state.continuous_drive += leg.duration;
        state.daily_drive += leg.duration;
        state.site = vehicle.end_site();
        nodes.push(TimeNode::drive(
            TimeNodeKind::Return,
            start,
            state.time,
            leg.distance,
            None,
        ));
        apply_breaks(rules, &mut state, &mut nodes, None);

        check_ceilings(rules, self.start_time, &state)?;

        let added_break: SignedDuration = nodes
            .iter()
            .filter(|node| node.kind() == TimeNodeKind::Break)
            .map(TimeNode::duration)
            .sum();

        self.timeline.extend(nodes);
        self.distance += leg.distance;
        self.break_time += added_break;
        self.state = state;
        self.finalized = true;

        Ok(())
    }
}
