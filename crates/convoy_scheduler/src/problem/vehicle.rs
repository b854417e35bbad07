use jiff::SignedDuration;
use jiff::civil::DateTime;

use crate::{define_index_newtype, problem::site::SiteIdx};

define_index_newtype!(VehicleIdx, Vehicle);

/// Regulatory ceilings applied to one vehicle shift. The instance document
/// carries no regulation fields, so these default to the EU values and can
/// be overridden from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrivingRules {
    continuous_drive_limit: SignedDuration,
    daily_drive_limit: SignedDuration,
    route_duration_limit: SignedDuration,
}

impl DrivingRules {
    pub fn new(
        continuous_drive_limit: SignedDuration,
        daily_drive_limit: SignedDuration,
        route_duration_limit: SignedDuration,
    ) -> Self {
        DrivingRules {
            continuous_drive_limit,
            daily_drive_limit,
            route_duration_limit,
        }
    }

    pub fn continuous_drive_limit(&self) -> SignedDuration {
        self.continuous_drive_limit
    }

    pub fn daily_drive_limit(&self) -> SignedDuration {
        self.daily_drive_limit
    }

    pub fn route_duration_limit(&self) -> SignedDuration {
        self.route_duration_limit
    }
}

impl Default for DrivingRules {
    fn default() -> Self {
        DrivingRules {
            continuous_drive_limit: SignedDuration::from_mins(270),
            daily_drive_limit: SignedDuration::from_hours(9),
            route_duration_limit: SignedDuration::from_hours(13),
        }
    }
}

/// A vehicle slot: one shift starting at a fixed time from a fixed site,
/// ending at the designated end site.
#[derive(Debug)]
pub struct Vehicle {
    name: String,
    start_site: SiteIdx,
    start_time: DateTime,
    end_site: SiteIdx,
    capacity: f64,
    rules: DrivingRules,
}

impl Vehicle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_site(&self) -> SiteIdx {
        self.start_site
    }

    pub fn start_time(&self) -> DateTime {
        self.start_time
    }

    pub fn end_site(&self) -> SiteIdx {
        self.end_site
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn rules(&self) -> &DrivingRules {
        &self.rules
    }
}

#[derive(Default)]
pub struct VehicleBuilder {
    name: Option<String>,
    start_site: Option<usize>,
    start_time: Option<DateTime>,
    end_site: Option<usize>,
    capacity: Option<f64>,
    rules: Option<DrivingRules>,
}

impl VehicleBuilder {
    pub fn set_name(&mut self, name: String) -> &mut VehicleBuilder {
        self.name = Some(name);
        self
    }

    pub fn set_start_site(&mut self, start_site: usize) -> &mut VehicleBuilder {
        self.start_site = Some(start_site);
        self
    }

    pub fn set_start_time(&mut self, start_time: DateTime) -> &mut VehicleBuilder {
        self.start_time = Some(start_time);
        self
    }

    pub fn set_end_site(&mut self, end_site: usize) -> &mut VehicleBuilder {
        self.end_site = Some(end_site);
        self
    }

    pub fn set_capacity(&mut self, capacity: f64) -> &mut VehicleBuilder {
        self.capacity = Some(capacity);
        self
    }

    pub fn set_rules(&mut self, rules: DrivingRules) -> &mut VehicleBuilder {
        self.rules = Some(rules);
        self
    }

    pub fn build(self) -> Vehicle {
        Vehicle {
            name: self.name.expect("Vehicle name is required"),
            start_site: self.start_site.expect("Start site is required").into(),
            start_time: self.start_time.expect("Start time is required"),
            end_site: self.end_site.expect("End site is required").into(),
            capacity: self.capacity.unwrap_or(0.0),
            rules: self.rules.unwrap_or_default(),
        }
    }
}
