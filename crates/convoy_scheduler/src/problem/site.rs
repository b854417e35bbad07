use crate::define_index_newtype;

define_index_newtype!(SiteIdx, Site);

/// A serviceable location. The index is the row/column of the travel matrix.
#[derive(Debug)]
pub struct Site {
    lat: f64,
    lon: f64,
}

impl Site {
    pub fn new(lat: f64, lon: f64) -> Self {
        Site { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}
