use jiff::SignedDuration;

use crate::problem::site::SiteIdx;

pub type Distance = i64;

/// One matrix cell: the drive between two sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub distance: Distance,
    pub duration: SignedDuration,
}

impl Leg {
    pub const ZERO: Leg = Leg {
        distance: 0,
        duration: SignedDuration::ZERO,
    };
}

/// All-pairs travel distances and durations in a flat row-major layout:
/// `index = from * num_sites + to`.
#[derive(Debug)]
pub struct TravelMatrix {
    distances: Vec<Distance>,
    durations: Vec<SignedDuration>,
    num_sites: usize,
}

impl TravelMatrix {
    pub fn from_rows(rows: Vec<Vec<Leg>>) -> Self {
        let num_sites = rows.len();
        let mut distances = Vec::with_capacity(num_sites * num_sites);
        let mut durations = Vec::with_capacity(num_sites * num_sites);

        for row in rows {
            for leg in row {
                distances.push(leg.distance);
                durations.push(leg.duration);
            }
        }

        TravelMatrix {
            distances,
            durations,
            num_sites,
        }
    }

    #[cfg(test)]
    pub fn from_constant(num_sites: usize, distance: Distance, duration: SignedDuration) -> Self {
        TravelMatrix {
            distances: vec![distance; num_sites * num_sites],
            durations: vec![duration; num_sites * num_sites],
            num_sites,
        }
    }

    #[inline(always)]
    fn index(&self, from: SiteIdx, to: SiteIdx) -> usize {
        from.get() * self.num_sites + to.get()
    }

    #[inline(always)]
    pub fn lookup(&self, from: SiteIdx, to: SiteIdx) -> Leg {
        if from == to {
            return Leg::ZERO;
        }

        let index = self.index(from, to);
        Leg {
            distance: self.distances[index],
            duration: self.durations[index],
        }
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }
}
