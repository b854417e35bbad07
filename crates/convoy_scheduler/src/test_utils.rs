use jiff::SignedDuration;

use crate::problem::{
    customer::{Customer, StopSpec},
    instance::Instance,
    site::Site,
    time_window::TimeWindow,
    travel_matrix::TravelMatrix,
    vehicle::{Vehicle, VehicleBuilder},
};

pub const VEHICLE_CAPACITY: f64 = 100.0;

const NUM_SITES: usize = 10;

/// Shorthand description of one paired request for test instances.
pub struct CustomerSpec {
    pub collect_site: usize,
    pub deliver_site: usize,
    pub collect_window: (&'static str, &'static str),
    pub deliver_window: (&'static str, &'static str),
    pub weight: f64,
}

pub fn customer_spec(
    collect_site: usize,
    deliver_site: usize,
    collect_window: (&'static str, &'static str),
    deliver_window: (&'static str, &'static str),
    weight: f64,
) -> CustomerSpec {
    CustomerSpec {
        collect_site,
        deliver_site,
        collect_window,
        deliver_window,
        weight,
    }
}

fn create_sites() -> Vec<Site> {
    (0..NUM_SITES)
        .map(|index| Site::new(50.0 + index as f64 * 0.1, 4.0))
        .collect()
}

fn create_vehicles(count: usize) -> Vec<Vehicle> {
    (0..count)
        .map(|index| {
            let mut builder = VehicleBuilder::default();
            builder.set_name(format!("Truck{}", index + 1));
            builder.set_start_site(0);
            builder.set_start_time("2024-03-04T08:00:00".parse().unwrap());
            builder.set_end_site(0);
            builder.set_capacity(VEHICLE_CAPACITY);
            builder.build()
        })
        .collect()
}

fn create_customers(specs: Vec<CustomerSpec>) -> Vec<Customer> {
    specs
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            let collect = StopSpec::new(
                format!("C{}", index + 1),
                spec.collect_site.into(),
                TimeWindow::from_iso(spec.collect_window.0, spec.collect_window.1),
                SignedDuration::from_mins(10),
            );
            let deliver = StopSpec::new(
                format!("D{}", index + 1),
                spec.deliver_site.into(),
                TimeWindow::from_iso(spec.deliver_window.0, spec.deliver_window.1),
                SignedDuration::from_mins(10),
            );
            Customer::new(collect, deliver, spec.weight)
        })
        .collect()
}

fn create_instance(vehicles: usize, leg_duration: SignedDuration, specs: Vec<CustomerSpec>) -> Instance {
    Instance::new(
        String::from("test_instance"),
        create_sites(),
        create_vehicles(vehicles),
        create_customers(specs),
        TravelMatrix::from_constant(NUM_SITES, 100, leg_duration),
    )
}

/// One vehicle, ten sites, every leg one hour and 100 distance units.
pub fn instance_with_customers(specs: Vec<CustomerSpec>) -> Instance {
    create_instance(1, SignedDuration::from_mins(60), specs)
}

/// Like `instance_with_customers`, with a fleet of the given size.
pub fn instance_with_fleet(vehicles: usize, specs: Vec<CustomerSpec>) -> Instance {
    create_instance(vehicles, SignedDuration::from_mins(60), specs)
}

/// One vehicle, every leg the given duration.
pub fn instance_with_leg_duration(duration: SignedDuration, specs: Vec<CustomerSpec>) -> Instance {
    create_instance(1, duration, specs)
}
