use jiff::SignedDuration;

use crate::{
    define_index_newtype,
    problem::{site::SiteIdx, time_window::TimeWindow},
};

define_index_newtype!(CustomerIdx, Customer);

/// Which half of a paired request a stop belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopKind {
    Collect,
    Deliver,
}

/// One of the two stops of a customer request.
#[derive(Debug, Clone)]
pub struct StopSpec {
    job_id: String,
    site: SiteIdx,
    window: TimeWindow,
    service_duration: SignedDuration,
}

impl StopSpec {
    pub fn new(
        job_id: String,
        site: SiteIdx,
        window: TimeWindow,
        service_duration: SignedDuration,
    ) -> Self {
        StopSpec {
            job_id,
            site,
            window,
            service_duration,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn site(&self) -> SiteIdx {
        self.site
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn service_duration(&self) -> SignedDuration {
        self.service_duration
    }
}

/// A paired collect/deliver request. Collect strictly precedes deliver in
/// any route that carries the customer.
#[derive(Debug, Clone)]
pub struct Customer {
    collect: StopSpec,
    deliver: StopSpec,
    weight: f64,
}

impl Customer {
    pub fn new(collect: StopSpec, deliver: StopSpec, weight: f64) -> Self {
        Customer {
            collect,
            deliver,
            weight,
        }
    }

    pub fn collect(&self) -> &StopSpec {
        &self.collect
    }

    pub fn deliver(&self) -> &StopSpec {
        &self.deliver
    }

    pub fn stop(&self, kind: StopKind) -> &StopSpec {
        match kind {
            StopKind::Collect => &self.collect,
            StopKind::Deliver => &self.deliver,
        }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}
