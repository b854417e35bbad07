use crate::problem::customer::CustomerIdx;
use crate::schedule::route::{Route, RouteIdx};

/// The finished construction result: every route (empty slots included),
/// the customers that fit nowhere, and the scalar cost — the sum of the
/// per-route elapsed durations in hours.
pub struct Solution {
    routes: Vec<Route>,
    unassigned: Vec<CustomerIdx>,
    cost: f64,
}

impl Solution {
    pub(crate) fn new(routes: Vec<Route>, unassigned: Vec<CustomerIdx>) -> Self {
        let cost = routes
            .iter()
            .filter(|route| !route.is_empty())
            .map(|route| route.duration().as_secs_f64() / 3600.0)
            .sum();

        Solution {
            routes,
            unassigned,
            cost,
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, route_id: RouteIdx) -> &Route {
        &self.routes[route_id]
    }

    pub fn non_empty_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(|route| !route.is_empty())
    }

    pub fn unassigned(&self) -> &[CustomerIdx] {
        &self.unassigned
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }
}
