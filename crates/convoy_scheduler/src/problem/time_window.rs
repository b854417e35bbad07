use jiff::SignedDuration;
use jiff::civil::DateTime;

/// Earliest/latest instants within which a stop must start service.
/// Arriving early means waiting; arriving after `end` is infeasible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime,
    end: DateTime,
}

impl TimeWindow {
    pub fn new(start: DateTime, end: DateTime) -> Self {
        TimeWindow { start, end }
    }

    pub fn from_iso(start: &str, end: &str) -> Self {
        TimeWindow {
            start: start.parse().expect("Error parsing ISO"),
            end: end.parse().expect("Error parsing ISO"),
        }
    }

    pub fn start(&self) -> DateTime {
        self.start
    }

    pub fn end(&self) -> DateTime {
        self.end
    }

    pub fn is_satisfied(&self, arrival: DateTime) -> bool {
        arrival <= self.end
    }

    /// How long a vehicle arriving at `arrival` has to stand still before
    /// the window opens. Zero when the window is already open.
    pub fn waiting_duration(&self, arrival: DateTime) -> SignedDuration {
        if arrival < self.start {
            self.start.duration_since(arrival)
        } else {
            SignedDuration::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_satisfied() {
        let window = TimeWindow::from_iso("2024-03-04T08:00:00", "2024-03-04T10:00:00");

        assert!(window.is_satisfied("2024-03-04T07:00:00".parse().unwrap()));
        assert!(window.is_satisfied("2024-03-04T10:00:00".parse().unwrap()));
        assert!(!window.is_satisfied("2024-03-04T10:00:01".parse().unwrap()));
    }

    #[test]
    fn test_waiting_duration() {
        let window = TimeWindow::from_iso("2024-03-04T08:00:00", "2024-03-04T10:00:00");

        assert_eq!(
            window.waiting_duration("2024-03-04T06:30:00".parse().unwrap()),
            SignedDuration::from_mins(90)
        );
        assert_eq!(
            window.waiting_duration("2024-03-04T09:00:00".parse().unwrap()),
            SignedDuration::ZERO
        );
    }
}
