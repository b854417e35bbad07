use crate::problem::{
    customer::{Customer, CustomerIdx},
    site::{Site, SiteIdx},
    travel_matrix::{Leg, TravelMatrix},
    vehicle::{Vehicle, VehicleIdx},
};

/// The immutable problem instance: sites, vehicles, paired requests and the
/// all-pairs travel matrix. Everything construction needs, nothing it
/// mutates.
#[derive(Debug)]
pub struct Instance {
    name: String,
    sites: Vec<Site>,
    vehicles: Vec<Vehicle>,
    customers: Vec<Customer>,
    matrix: TravelMatrix,
}

impl Instance {
    pub fn new(
        name: String,
        sites: Vec<Site>,
        vehicles: Vec<Vehicle>,
        customers: Vec<Customer>,
        matrix: TravelMatrix,
    ) -> Self {
        Instance {
            name,
            sites,
            vehicles,
            customers,
            matrix,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, vehicle_id: VehicleIdx) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn customer(&self, customer_id: CustomerIdx) -> &Customer {
        &self.customers[customer_id]
    }

    pub fn matrix(&self) -> &TravelMatrix {
        &self.matrix
    }

    #[inline]
    pub fn travel(&self, from: SiteIdx, to: SiteIdx) -> Leg {
        self.matrix.lookup(from, to)
    }
}
