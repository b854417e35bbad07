use fxhash::FxHashMap;
use rand::{SeedableRng, rngs::SmallRng, seq::SliceRandom};
use tracing::{debug, warn};

use crate::problem::{
    customer::{CustomerIdx, StopKind},
    instance::Instance,
    vehicle::VehicleIdx,
};
use crate::schedule::{
    evaluate::{InsertionPlan, evaluate_collect, evaluate_customer, evaluate_deliver},
    route::{Route, RouteIdx},
    solution::Solution,
};

/// Below this demand size the two-sweep separated mode is never worth it.
const SEPARATED_MODE_FLOOR: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct ConstructionParams {
    /// Seed for the vehicle-slot shuffle of the large-instance initializer.
    /// The run is fully deterministic given the seed.
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepMode {
    /// Two full sweeps: all collects first, then all delivers.
    Separated,
    /// One sweep committing collect + deliver atomically.
    Combined,
}

/// Per-run bookkeeping, created fresh for every construction pass and
/// threaded through the whole call chain.
struct ConstructionContext<'a> {
    instance: &'a Instance,
    routes: Vec<Route>,

    /// Customer -> route holding at least its collect stop.
    assigned: FxHashMap<CustomerIdx, RouteIdx>,

    unassigned: Vec<CustomerIdx>,
}

impl<'a> ConstructionContext<'a> {
    fn new(instance: &'a Instance, vehicle_order: Vec<VehicleIdx>) -> Self {
        let routes = vehicle_order
            .iter()
            .map(|&vehicle_id| Route::empty(instance, vehicle_id))
            .collect();

        ConstructionContext {
            instance,
            routes,
            assigned: FxHashMap::default(),
            unassigned: Vec::new(),
        }
    }

    fn park(&mut self, customer: CustomerIdx) {
        if !self.unassigned.contains(&customer) {
            self.unassigned.push(customer);
        }
    }

    fn unpark(&mut self, customer: CustomerIdx) {
        self.unassigned.retain(|&parked| parked != customer);
    }

    fn into_solution(self) -> Solution {
        Solution::new(self.routes, self.unassigned)
    }
}

fn select_mode(instance: &Instance) -> SweepMode {
    let customers = instance.customers().len();
    if instance.vehicles().len() >= customers && customers >= SEPARATED_MODE_FLOOR {
        SweepMode::Separated
    } else {
        SweepMode::Combined
    }
}

/// Builds one schedule for the instance: greedy cheapest-feasible insertion,
/// a repair pass for requests that only half fit, one fresh-route retry per
/// leftover request, and a return leg per used vehicle.
pub fn construct(instance: &Instance, params: &ConstructionParams) -> Solution {
    let mut rng = SmallRng::seed_from_u64(params.seed);
    let mode = select_mode(instance);

    let mut vehicle_order: Vec<VehicleIdx> = (0..instance.vehicles().len())
        .map(VehicleIdx::new)
        .collect();
    if mode == SweepMode::Separated {
        vehicle_order.shuffle(&mut rng);
    }

    let mut ctx = ConstructionContext::new(instance, vehicle_order);
    debug!(
        customers = instance.customers().len(),
        vehicles = instance.vehicles().len(),
        ?mode,
        "starting construction"
    );

    match mode {
        SweepMode::Separated => separated_sweeps(&mut ctx),
        SweepMode::Combined => combined_sweep(&mut ctx),
    }

    repair(&mut ctx, mode);
    open_fresh_routes(&mut ctx);
    finalize_routes(&mut ctx, mode);

    debug!(
        unassigned = ctx.unassigned.len(),
        "construction finished"
    );

    ctx.into_solution()
}

/// Large-instance mode: every collect stop first (sorted by collect site),
/// then every deliver stop, each into the route that holds its collect.
fn separated_sweeps(ctx: &mut ConstructionContext) {
    let mut order: Vec<CustomerIdx> = (0..ctx.instance.customers().len())
        .map(CustomerIdx::new)
        .collect();

    order.sort_by_key(|&customer| {
        (
            ctx.instance.customer(customer).collect().site().get(),
            customer.get(),
        )
    });
    for &customer in &order {
        insert_collect_anywhere(ctx, customer);
    }

    order.sort_by_key(|&customer| {
        (
            ctx.instance.customer(customer).deliver().site().get(),
            customer.get(),
        )
    });
    for &customer in &order {
        if ctx.assigned.contains_key(&customer) {
            insert_deliver(ctx, customer);
        }
    }
}

/// Small-instance mode: one sweep in input order, collect + deliver
/// committed atomically.
fn combined_sweep(ctx: &mut ConstructionContext) {
    for index in 0..ctx.instance.customers().len() {
        let customer = CustomerIdx::new(index);
        let mut best: Option<(RouteIdx, InsertionPlan)> = None;

        for (slot, route) in ctx.routes.iter().enumerate() {
            if let Ok(plan) = evaluate_customer(ctx.instance, route, customer) {
                let better = best
                    .as_ref()
                    .is_none_or(|(_, incumbent)| plan.cost.finish < incumbent.cost.finish);
                if better {
                    best = Some((RouteIdx::new(slot), plan));
                }
            }
        }

        match best {
            Some((route_id, plan)) => {
                ctx.routes[route_id].commit(ctx.instance, &plan);
                ctx.assigned.insert(customer, route_id);
            }
            None => {
                debug!(customer = %customer, "no feasible route, parking");
                ctx.park(customer);
            }
        }
    }
}

fn insert_collect_anywhere(ctx: &mut ConstructionContext, customer: CustomerIdx) {
    let mut best: Option<(RouteIdx, InsertionPlan)> = None;

    for (slot, route) in ctx.routes.iter().enumerate() {
        if let Ok(plan) = evaluate_collect(ctx.instance, route, customer) {
            let better = best
                .as_ref()
                .is_none_or(|(_, incumbent)| plan.cost.finish < incumbent.cost.finish);
            if better {
                best = Some((RouteIdx::new(slot), plan));
            }
        }
    }

    match best {
        Some((route_id, plan)) => {
            ctx.routes[route_id].commit(ctx.instance, &plan);
            ctx.assigned.insert(customer, route_id);
        }
        None => {
            debug!(customer = %customer, "no feasible collect, parking");
            ctx.park(customer);
        }
    }
}

fn insert_deliver(ctx: &mut ConstructionContext, customer: CustomerIdx) {
    let route_id = ctx.assigned[&customer];
    debug_assert!(ctx.routes[route_id].holds_collect(customer));

    match evaluate_deliver(ctx.instance, &ctx.routes[route_id], customer) {
        Ok(plan) => ctx.routes[route_id].commit(ctx.instance, &plan),
        Err(rejection) => {
            debug!(customer = %customer, ?rejection, "deliver infeasible, parking");
            ctx.park(customer);
        }
    }
}

/// Undoes half-committed requests: a parked customer whose collect made it
/// into a route cannot stay half-done, so the affected route is rebuilt
/// from empty without it.
fn repair(ctx: &mut ConstructionContext, mode: SweepMode) {
    loop {
        let half_committed = ctx.unassigned.iter().copied().find(|&customer| {
            ctx.assigned
                .get(&customer)
                .is_some_and(|&route_id| !ctx.routes[route_id].has_stop(customer, StopKind::Deliver))
        });

        let Some(customer) = half_committed else {
            break;
        };

        let route_id = ctx.assigned[&customer];
        debug!(customer = %customer, route = %route_id, "stripping half-committed collect");
        rebuild_route(ctx, route_id, Some(customer), mode);
    }
}

/// Resets the route and re-runs assignment over its remaining customers in
/// the mode the route was built with. Customers that no longer fit are
/// parked; customers that come back fully paired are unparked.
fn rebuild_route(
    ctx: &mut ConstructionContext,
    route_id: RouteIdx,
    exclude: Option<CustomerIdx>,
    mode: SweepMode,
) {
    let mut members = ctx.routes[route_id].commit_order().to_vec();
    if let Some(excluded) = exclude {
        members.retain(|&member| member != excluded);
        ctx.assigned.remove(&excluded);
    }

    ctx.routes[route_id].reset(ctx.instance);
    for member in &members {
        ctx.assigned.remove(member);
    }

    match mode {
        SweepMode::Combined => {
            for &member in &members {
                match evaluate_customer(ctx.instance, &ctx.routes[route_id], member) {
                    Ok(plan) => {
                        ctx.routes[route_id].commit(ctx.instance, &plan);
                        ctx.assigned.insert(member, route_id);
                        ctx.unpark(member);
                    }
                    Err(rejection) => {
                        debug!(customer = %member, ?rejection, "lost during rebuild");
                        ctx.park(member);
                    }
                }
            }
        }
        SweepMode::Separated => {
            let mut order = members.clone();
            order.sort_by_key(|&member| {
                (
                    ctx.instance.customer(member).collect().site().get(),
                    member.get(),
                )
            });
            for &member in &order {
                match evaluate_collect(ctx.instance, &ctx.routes[route_id], member) {
                    Ok(plan) => {
                        ctx.routes[route_id].commit(ctx.instance, &plan);
                        ctx.assigned.insert(member, route_id);
                    }
                    Err(rejection) => {
                        debug!(customer = %member, ?rejection, "lost during rebuild");
                        ctx.park(member);
                    }
                }
            }

            order.sort_by_key(|&member| {
                (
                    ctx.instance.customer(member).deliver().site().get(),
                    member.get(),
                )
            });
            for &member in &order {
                if !ctx.assigned.contains_key(&member) {
                    continue;
                }
                match evaluate_deliver(ctx.instance, &ctx.routes[route_id], member) {
                    Ok(plan) => {
                        ctx.routes[route_id].commit(ctx.instance, &plan);
                        ctx.unpark(member);
                    }
                    Err(rejection) => {
                        debug!(customer = %member, ?rejection, "deliver lost during rebuild");
                        ctx.park(member);
                    }
                }
            }
        }
    }
}

/// One retry per leftover customer: the first unused vehicle gets a fresh
/// route with the whole pair.
fn open_fresh_routes(ctx: &mut ConstructionContext) {
    let parked: Vec<CustomerIdx> = ctx.unassigned.clone();

    for customer in parked {
        if ctx.assigned.contains_key(&customer) {
            continue;
        }

        let Some(route_id) = ctx
            .routes
            .iter()
            .position(|route| route.is_empty())
            .map(RouteIdx::new)
        else {
            break;
        };

        match evaluate_customer(ctx.instance, &ctx.routes[route_id], customer) {
            Ok(plan) => {
                ctx.routes[route_id].commit(ctx.instance, &plan);
                ctx.assigned.insert(customer, route_id);
                ctx.unpark(customer);
                debug!(customer = %customer, route = %route_id, "rescued on a fresh route");
            }
            Err(rejection) => {
                debug!(customer = %customer, ?rejection, "fresh route also infeasible");
            }
        }
    }
}

/// Appends the return leg to every used route. A ceiling violation on the
/// return leg defers the route's last-committed customer and tries again.
fn finalize_routes(ctx: &mut ConstructionContext, mode: SweepMode) {
    for slot in 0..ctx.routes.len() {
        let route_id = RouteIdx::new(slot);

        loop {
            if ctx.routes[route_id].is_empty() {
                break;
            }

            match ctx.routes[route_id].return_to_depot(ctx.instance) {
                Ok(()) => break,
                Err(rejection) => {
                    let last = *ctx.routes[route_id]
                        .commit_order()
                        .last()
                        .expect("non-empty route has a commit order");
                    warn!(customer = %last, ?rejection, "return leg infeasible, deferring last customer");
                    rebuild_route(ctx, route_id, Some(last), mode);
                    ctx.park(last);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_combined_mode_assigns_all_feasible_customers() {
        let instance = test_utils::instance_with_customers(vec![
            test_utils::customer_spec(
                1,
                2,
                ("2024-03-04T08:00:00", "2024-03-04T18:00:00"),
                ("2024-03-04T08:00:00", "2024-03-04T18:00:00"),
                10.0,
            ),
            test_utils::customer_spec(
                3,
                4,
                ("2024-03-04T08:00:00", "2024-03-04T18:00:00"),
                ("2024-03-04T08:00:00", "2024-03-04T18:00:00"),
                20.0,
            ),
        ]);

        let solution = construct(&instance, &ConstructionParams::default());

        assert!(solution.unassigned().is_empty());
        let route = solution.non_empty_routes().next().unwrap();
        assert_eq!(route.commit_order().len(), 2);
        assert!(route.is_finalized());
        assert!(solution.cost() > 0.0);
    }

    #[test]
    fn test_infeasible_customer_is_parked() {
        // The deliver window closes before any vehicle can arrive.
        let instance = test_utils::instance_with_customers(vec![test_utils::customer_spec(
            1,
            2,
            ("2024-03-04T08:00:00", "2024-03-04T18:00:00"),
            ("2024-03-04T08:00:00", "2024-03-04T08:30:00"),
            10.0,
        )]);

        let solution = construct(&instance, &ConstructionParams::default());

        assert_eq!(solution.unassigned(), &[CustomerIdx::new(0)]);
        assert_eq!(solution.non_empty_routes().count(), 0);
        assert_eq!(solution.cost(), 0.0);
    }

    #[test]
    fn test_daily_drive_ceiling_parks_customer() {
        // Collect at the start site, deliver nine and a half hours away:
        // under the route-duration ceiling, over the daily-drive limit.
        let instance = test_utils::instance_with_leg_duration(
            jiff::SignedDuration::from_mins(570),
            vec![test_utils::customer_spec(
                0,
                1,
                ("2024-03-04T08:00:00", "2024-03-05T18:00:00"),
                ("2024-03-04T08:00:00", "2024-03-05T18:00:00"),
                10.0,
            )],
        );

        let solution = construct(&instance, &ConstructionParams::default());

        assert_eq!(solution.unassigned(), &[CustomerIdx::new(0)]);
    }

    #[test]
    fn test_repair_strips_half_committed_collect() {
        // Customer 1's deliver window is impossible, so its collect commits
        // in the first sweep and is stripped again by the repair pass.
        let instance = test_utils::instance_with_customers(vec![
            test_utils::customer_spec(
                1,
                2,
                ("2024-03-04T08:00:00", "2024-03-04T18:00:00"),
                ("2024-03-04T08:00:00", "2024-03-04T18:00:00"),
                10.0,
            ),
            test_utils::customer_spec(
                3,
                4,
                ("2024-03-04T08:00:00", "2024-03-04T18:00:00"),
                ("2024-03-04T08:00:00", "2024-03-04T08:10:00"),
                10.0,
            ),
        ]);

        let vehicle_order = vec![VehicleIdx::new(0)];
        let mut ctx = ConstructionContext::new(&instance, vehicle_order);
        separated_sweeps(&mut ctx);

        // Half-committed after the two sweeps
        assert!(ctx.routes[0].has_stop(CustomerIdx::new(1), StopKind::Collect));
        assert!(!ctx.routes[0].has_stop(CustomerIdx::new(1), StopKind::Deliver));
        assert!(ctx.unassigned.contains(&CustomerIdx::new(1)));

        repair(&mut ctx, SweepMode::Separated);

        assert!(!ctx.routes[0].contains(CustomerIdx::new(1)));
        assert!(ctx.routes[0].has_stop(CustomerIdx::new(0), StopKind::Collect));
        assert!(ctx.routes[0].has_stop(CustomerIdx::new(0), StopKind::Deliver));
        assert!(ctx.unassigned.contains(&CustomerIdx::new(1)));
        assert!(!ctx.unassigned.contains(&CustomerIdx::new(0)));
    }

    #[test]
    fn test_construction_is_deterministic_per_seed() {
        let specs: Vec<test_utils::CustomerSpec> = (0..60)
            .map(|index| {
                test_utils::customer_spec(
                    1 + (index % 4),
                    5 + (index % 4),
                    ("2024-03-04T08:00:00", "2024-03-04T20:00:00"),
                    ("2024-03-04T08:00:00", "2024-03-04T20:00:00"),
                    5.0,
                )
            })
            .collect();
        let instance = test_utils::instance_with_fleet(70, specs);

        let params = ConstructionParams { seed: 7 };
        let first = construct(&instance, &params);
        let second = construct(&instance, &params);

        assert_eq!(first.cost(), second.cost());
        assert_eq!(first.unassigned(), second.unassigned());

        let first_stops: Vec<Vec<_>> = first.routes().iter().map(|r| r.stops().to_vec()).collect();
        let second_stops: Vec<Vec<_>> = second.routes().iter().map(|r| r.stops().to_vec()).collect();
        assert_eq!(first_stops, second_stops);
    }
}
