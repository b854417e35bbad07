use jiff::civil::DateTime;
use thiserror::Error;

/// A malformed instance document. Any of these aborts before construction
/// begins; feasibility failures during construction are never errors.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("failed to parse instance document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("invalid timestamp {value:?}: {source}")]
    Timestamp { value: String, source: jiff::Error },

    #[error("invalid location string {value:?} at site {site}")]
    Location { value: String, site: usize },

    #[error("site id {id} out of range ({sites} sites)")]
    UnknownSite { id: usize, sites: usize },

    #[error("matrix data must contain exactly one block, found {0}")]
    MatrixShape(usize),

    #[error("matrix block has {found} rows, expected one per site ({expected})")]
    MatrixSize { found: usize, expected: usize },

    #[error("matrix row {row} has {found} entries, expected {expected}")]
    MatrixRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("time window of job {job} ends before it starts ({start} > {end})")]
    InvertedTimeWindow {
        job: String,
        start: DateTime,
        end: DateTime,
    },

    #[error("vehicle {index} has no capacity compartment")]
    MissingCompartment { index: usize },
}
