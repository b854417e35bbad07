use std::fmt::Write as _;

use jiff::SignedDuration;
use jiff::civil::DateTime;

use crate::problem::{
    customer::{CustomerIdx, StopKind},
    instance::Instance,
    travel_matrix::Distance,
};
use crate::schedule::{
    route::Route,
    solution::Solution,
    time_node::{TimeNode, TimeNodeKind},
};

pub const REPORT_HEADER: &str = "VehicleName,JobId,JourneyTime,ArrivalTime,WaitTime,DelayTime,ServiceTime,DepartureTime,Break1Time,Break1Duration,Break2Time,Break2Duration,Distance,SequenceNo";

/// Renders the fixed-column text table: a header, then per used route one
/// start marker, one line per fully paired collect/deliver job in commit
/// order, and one return marker.
pub fn render_report(instance: &Instance, solution: &Solution) -> String {
    let mut out = String::new();
    out.push_str(REPORT_HEADER);
    out.push('\n');

    for route in solution.non_empty_routes() {
        render_route(&mut out, instance, route);
    }

    out
}

/// One job line of the table, folded together from the timeline nodes that
/// belong to the same stop: the leading drive, breaks on either side of the
/// service, waiting and the service interval itself.
struct Row {
    stop: Option<(CustomerIdx, StopKind)>,
    is_return: bool,
    journey: SignedDuration,
    arrival: Option<DateTime>,
    wait: SignedDuration,
    delay: SignedDuration,
    service: SignedDuration,
    departure: Option<DateTime>,
    breaks: Vec<(DateTime, SignedDuration)>,
    distance: Distance,
}

impl Row {
    fn new() -> Self {
        Row {
            stop: None,
            is_return: false,
            journey: SignedDuration::ZERO,
            arrival: None,
            wait: SignedDuration::ZERO,
            delay: SignedDuration::ZERO,
            service: SignedDuration::ZERO,
            departure: None,
            breaks: Vec::new(),
            distance: 0,
        }
    }

    fn is_open(&self) -> bool {
        self.stop.is_some() || self.is_return
    }

    fn absorb(&mut self, node: &TimeNode) {
        match node.kind() {
            TimeNodeKind::Drive | TimeNodeKind::Return => {
                self.journey = node.duration();
                self.distance = node.distance();
                self.arrival = Some(node.end());
                self.is_return = node.kind() == TimeNodeKind::Return;
            }
            TimeNodeKind::Break => {
                self.breaks.push((node.start(), node.duration()));
            }
            TimeNodeKind::Wait => {
                self.wait += node.duration();
                self.arrival.get_or_insert(node.start());
            }
            TimeNodeKind::Delay => {
                self.delay += node.duration();
            }
            TimeNodeKind::Collect => {
                self.service = node.duration();
                self.arrival.get_or_insert(node.start());
                self.stop = node.customer().map(|customer| (customer, StopKind::Collect));
            }
            TimeNodeKind::Deliver => {
                self.service = node.duration();
                self.arrival.get_or_insert(node.start());
                self.stop = node.customer().map(|customer| (customer, StopKind::Deliver));
            }
        }

        self.departure = Some(node.end());
    }
}

/// Folds a route's chronological timeline back into per-stop rows. A row
/// stays open for trailing breaks until the next non-break node.
fn group_timeline(timeline: &[TimeNode]) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut current = Row::new();

    for node in timeline {
        if current.is_open() && node.kind() != TimeNodeKind::Break {
            rows.push(current);
            current = Row::new();
        }

        current.absorb(node);
    }

    if current.is_open() || current.arrival.is_some() {
        rows.push(current);
    }

    rows
}

fn render_route(out: &mut String, instance: &Instance, route: &Route) {
    let vehicle = instance.vehicle(route.vehicle());
    let start = route.start_time();

    push_line(
        out,
        vehicle.name(),
        "Start",
        SignedDuration::ZERO,
        start,
        SignedDuration::ZERO,
        SignedDuration::ZERO,
        SignedDuration::ZERO,
        start,
        &[],
        0,
        0,
    );

    let mut sequence = 0;
    for row in group_timeline(route.timeline()) {
        let job_id = match row.stop {
            Some((customer, kind)) => {
                // Only fully paired requests appear in the table
                if !(route.has_stop(customer, StopKind::Collect)
                    && route.has_stop(customer, StopKind::Deliver))
                {
                    continue;
                }
                instance.customer(customer).stop(kind).job_id().to_owned()
            }
            None if row.is_return => String::from("Return"),
            None => continue,
        };

        sequence += 1;
        let arrival = row.arrival.expect("grouped row has an arrival");
        let departure = row.departure.expect("grouped row has a departure");
        push_line(
            out,
            vehicle.name(),
            &job_id,
            row.journey,
            arrival,
            row.wait,
            row.delay,
            row.service,
            departure,
            &row.breaks,
            row.distance,
            sequence,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn push_line(
    out: &mut String,
    vehicle_name: &str,
    job_id: &str,
    journey: SignedDuration,
    arrival: DateTime,
    wait: SignedDuration,
    delay: SignedDuration,
    service: SignedDuration,
    departure: DateTime,
    breaks: &[(DateTime, SignedDuration)],
    distance: Distance,
    sequence: usize,
) {
    let (break1_time, break1_duration) = fmt_break(breaks.first());
    let (break2_time, break2_duration) = fmt_break(breaks.get(1));

    writeln!(
        out,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        vehicle_name,
        job_id,
        fmt_duration(journey),
        fmt_clock(arrival),
        fmt_duration(wait),
        fmt_duration(delay),
        fmt_duration(service),
        fmt_clock(departure),
        break1_time,
        break1_duration,
        break2_time,
        break2_duration,
        distance,
        sequence,
    )
    .expect("writing to a String cannot fail");
}

fn fmt_break(entry: Option<&(DateTime, SignedDuration)>) -> (String, String) {
    match entry {
        Some(&(start, duration)) => (fmt_clock(start), fmt_duration(duration)),
        None => (String::new(), String::new()),
    }
}

/// `HhMm`, whole minutes: 90 minutes renders as `1h30m`.
fn fmt_duration(duration: SignedDuration) -> String {
    let minutes = duration.as_secs() / 60;
    format!("{}h{}m", minutes / 60, minutes % 60)
}

/// `HH:mm` clock time.
fn fmt_clock(time: DateTime) -> String {
    time.strftime("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::construct::{ConstructionParams, construct};
    use crate::test_utils;

    #[test]
    fn test_fmt_duration() {
        assert_eq!(fmt_duration(SignedDuration::ZERO), "0h0m");
        assert_eq!(fmt_duration(SignedDuration::from_mins(90)), "1h30m");
        assert_eq!(fmt_duration(SignedDuration::from_mins(60)), "1h0m");
        assert_eq!(fmt_duration(SignedDuration::from_secs(45 * 60)), "0h45m");
    }

    #[test]
    fn test_report_shape() {
        let instance = test_utils::instance_with_customers(vec![test_utils::customer_spec(
            1,
            2,
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            10.0,
        )]);
        let solution = construct(&instance, &ConstructionParams::default());

        let report = render_report(&instance, &solution);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], REPORT_HEADER);
        // start marker, collect, deliver, return marker
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("Truck1,Start,0h0m,08:00,"));
        assert!(lines[1].ends_with(",0,0"));
        assert!(lines[2].starts_with("Truck1,C1,1h0m,09:00,"));
        assert!(lines[3].starts_with("Truck1,D1,1h0m,10:10,"));
        assert!(lines[4].starts_with("Truck1,Return,1h0m,"));
        assert!(lines[4].ends_with(",100,3"));
    }

    #[test]
    fn test_unpaired_customers_are_skipped() {
        let instance = test_utils::instance_with_customers(vec![test_utils::customer_spec(
            1,
            2,
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            ("2024-03-04T08:00:00", "2024-03-04T16:00:00"),
            10.0,
        )]);
        let mut route = crate::schedule::route::Route::empty(&instance, 0.into());
        let plan =
            crate::schedule::evaluate::evaluate_collect(&instance, &route, 0.into()).unwrap();
        route.commit(&instance, &plan);

        let mut out = String::new();
        render_route(&mut out, &instance, &route);

        let lines: Vec<&str> = out.lines().collect();
        // Only the start marker: the collect without its deliver is omitted
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(",Start,"));
    }
}
