use std::io::Read;

use jiff::SignedDuration;
use jiff::civil::DateTime;
use serde::Deserialize;

use crate::error::InstanceError;
use crate::problem::{
    customer::{Customer, StopSpec},
    instance::Instance,
    site::Site,
    time_window::TimeWindow,
    travel_matrix::{Leg, TravelMatrix},
    vehicle::{DrivingRules, Vehicle, VehicleBuilder},
};

/// Typed mirror of the instance document. Field names follow the document
/// verbatim; the validating build into [`Instance`] happens separately so
/// shape errors and semantic errors stay apart.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceDocument {
    pub instance_name: String,
    pub matrix: MatrixDocument,
    pub vehicles: Vec<VehicleRecord>,
    pub orders: Vec<OrderRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MatrixDocument {
    /// `"lat,lon"` strings; the position is the site id.
    pub locations: Vec<String>,

    /// One block, indexed `[from][to]`, each entry `[distance, durationSeconds]`.
    pub data: Vec<Vec<Vec<[i64; 2]>>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VehicleRecord {
    pub vehicle_capacity: Vec<CompartmentRecord>,
    pub start_site: usize,
    pub start_time: String,
    pub end_site: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompartmentRecord {
    pub compartment_id: String,
    pub weight: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderRecord {
    pub collect_site_id: usize,
    pub deliver_site_id: usize,
    pub earliest_collect1: String,
    pub latest_collect1: String,
    pub earliest_deliver1: String,
    pub latest_deliver1: String,
    pub collect_id: String,
    pub deliver_id: String,
    pub collect_time_in_minutes: i64,
    pub deliver_time_in_minutes: i64,
    pub weight: f64,
}

/// Reads and validates one instance document. `rules` applies to every
/// vehicle; the document itself carries no regulation fields.
pub fn read_instance(reader: impl Read, rules: DrivingRules) -> Result<Instance, InstanceError> {
    let document: InstanceDocument = serde_json::from_reader(reader)?;
    build_instance(document, rules)
}

pub fn build_instance(
    document: InstanceDocument,
    rules: DrivingRules,
) -> Result<Instance, InstanceError> {
    let sites = parse_sites(&document.matrix.locations)?;
    let matrix = parse_matrix(&document.matrix, sites.len())?;
    let vehicles = parse_vehicles(&document.vehicles, sites.len(), rules)?;
    let customers = parse_orders(&document.orders, sites.len())?;

    Ok(Instance::new(
        document.instance_name,
        sites,
        vehicles,
        customers,
        matrix,
    ))
}

fn parse_sites(locations: &[String]) -> Result<Vec<Site>, InstanceError> {
    locations
        .iter()
        .enumerate()
        .map(|(site, value)| {
            let invalid = || InstanceError::Location {
                value: value.clone(),
                site,
            };

            let (lat, lon) = value.split_once(',').ok_or_else(invalid)?;
            let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
            let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
            Ok(Site::new(lat, lon))
        })
        .collect()
}

fn parse_matrix(document: &MatrixDocument, num_sites: usize) -> Result<TravelMatrix, InstanceError> {
    if document.data.len() != 1 {
        return Err(InstanceError::MatrixShape(document.data.len()));
    }

    let block = &document.data[0];
    if block.len() != num_sites {
        return Err(InstanceError::MatrixSize {
            found: block.len(),
            expected: num_sites,
        });
    }

    let mut rows = Vec::with_capacity(num_sites);
    for (index, row) in block.iter().enumerate() {
        if row.len() != num_sites {
            return Err(InstanceError::MatrixRow {
                row: index,
                found: row.len(),
                expected: num_sites,
            });
        }

        rows.push(
            row.iter()
                .map(|&[distance, seconds]| Leg {
                    distance,
                    duration: SignedDuration::from_secs(seconds),
                })
                .collect(),
        );
    }

    Ok(TravelMatrix::from_rows(rows))
}

fn parse_vehicles(
    records: &[VehicleRecord],
    num_sites: usize,
    rules: DrivingRules,
) -> Result<Vec<Vehicle>, InstanceError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let compartment = record
                .vehicle_capacity
                .first()
                .ok_or(InstanceError::MissingCompartment { index })?;

            let mut builder = VehicleBuilder::default();
            builder.set_name(compartment.compartment_id.clone());
            builder.set_capacity(compartment.weight);
            builder.set_start_site(check_site(record.start_site, num_sites)?);
            builder.set_end_site(check_site(record.end_site, num_sites)?);
            builder.set_start_time(parse_datetime(&record.start_time)?);
            builder.set_rules(rules);
            Ok(builder.build())
        })
        .collect()
}

fn parse_orders(records: &[OrderRecord], num_sites: usize) -> Result<Vec<Customer>, InstanceError> {
    records
        .iter()
        .map(|record| {
            let collect = StopSpec::new(
                record.collect_id.clone(),
                check_site(record.collect_site_id, num_sites)?.into(),
                parse_window(
                    &record.collect_id,
                    &record.earliest_collect1,
                    &record.latest_collect1,
                )?,
                SignedDuration::from_mins(record.collect_time_in_minutes),
            );
            let deliver = StopSpec::new(
                record.deliver_id.clone(),
                check_site(record.deliver_site_id, num_sites)?.into(),
                parse_window(
                    &record.deliver_id,
                    &record.earliest_deliver1,
                    &record.latest_deliver1,
                )?,
                SignedDuration::from_mins(record.deliver_time_in_minutes),
            );

            Ok(Customer::new(collect, deliver, record.weight))
        })
        .collect()
}

fn check_site(id: usize, num_sites: usize) -> Result<usize, InstanceError> {
    if id < num_sites {
        Ok(id)
    } else {
        Err(InstanceError::UnknownSite {
            id,
            sites: num_sites,
        })
    }
}

fn parse_datetime(value: &str) -> Result<DateTime, InstanceError> {
    value.parse().map_err(|source| InstanceError::Timestamp {
        value: value.to_owned(),
        source,
    })
}

fn parse_window(job: &str, earliest: &str, latest: &str) -> Result<TimeWindow, InstanceError> {
    let start = parse_datetime(earliest)?;
    let end = parse_datetime(latest)?;

    if start > end {
        return Err(InstanceError::InvertedTimeWindow {
            job: job.to_owned(),
            start,
            end,
        });
    }

    Ok(TimeWindow::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_document() -> serde_json::Value {
        serde_json::json!({
            "InstanceName": "mini",
            "Matrix": {
                "Locations": ["50.85,4.35", "50.95,4.45"],
                "Data": [[
                    [[0, 0], [100, 3600]],
                    [[100, 3600], [0, 0]]
                ]]
            },
            "Vehicles": [{
                "VehicleCapacity": [{"CompartmentId": "Truck1", "Weight": 500.0}],
                "StartSite": 0,
                "StartTime": "2024-03-04T08:00:00",
                "EndSite": 0
            }],
            "Orders": [{
                "CollectSiteId": 0,
                "DeliverSiteId": 1,
                "EarliestCollect1": "2024-03-04T08:00:00",
                "LatestCollect1": "2024-03-04T12:00:00",
                "EarliestDeliver1": "2024-03-04T08:00:00",
                "LatestDeliver1": "2024-03-04T16:00:00",
                "CollectId": "C1",
                "DeliverId": "D1",
                "CollectTimeInMinutes": 15,
                "DeliverTimeInMinutes": 10,
                "Weight": 120.0
            }]
        })
    }

    fn read(value: serde_json::Value) -> Result<Instance, InstanceError> {
        read_instance(value.to_string().as_bytes(), DrivingRules::default())
    }

    #[test]
    fn test_parses_minimal_document() {
        let instance = read(minimal_document()).unwrap();

        assert_eq!(instance.name(), "mini");
        assert_eq!(instance.sites().len(), 2);
        assert_eq!(instance.vehicles().len(), 1);
        assert_eq!(instance.customers().len(), 1);

        let vehicle = &instance.vehicles()[0];
        assert_eq!(vehicle.name(), "Truck1");
        assert_eq!(vehicle.capacity(), 500.0);

        let customer = &instance.customers()[0];
        assert_eq!(customer.collect().job_id(), "C1");
        assert_eq!(
            customer.collect().service_duration(),
            SignedDuration::from_mins(15)
        );
        assert_eq!(customer.weight(), 120.0);

        let leg = instance.travel(0.into(), 1.into());
        assert_eq!(leg.distance, 100);
        assert_eq!(leg.duration, SignedDuration::from_hours(1));
    }

    #[test]
    fn test_out_of_range_site_is_fatal() {
        let mut document = minimal_document();
        document["Orders"][0]["DeliverSiteId"] = serde_json::json!(7);

        let error = read(document).unwrap_err();
        assert!(matches!(
            error,
            InstanceError::UnknownSite { id: 7, sites: 2 }
        ));
    }

    #[test]
    fn test_inverted_window_is_fatal() {
        let mut document = minimal_document();
        document["Orders"][0]["LatestCollect1"] = serde_json::json!("2024-03-04T07:00:00");

        let error = read(document).unwrap_err();
        assert!(matches!(error, InstanceError::InvertedTimeWindow { .. }));
    }

    #[test]
    fn test_missing_compartment_is_fatal() {
        let mut document = minimal_document();
        document["Vehicles"][0]["VehicleCapacity"] = serde_json::json!([]);

        let error = read(document).unwrap_err();
        assert!(matches!(
            error,
            InstanceError::MissingCompartment { index: 0 }
        ));
    }

    #[test]
    fn test_malformed_matrix_is_fatal() {
        let mut document = minimal_document();
        document["Matrix"]["Data"] = serde_json::json!([]);

        let error = read(document).unwrap_err();
        assert!(matches!(error, InstanceError::MatrixShape(0)));
    }
}
