//! Conversion of loosely-typed JSON documents into domain entities
//!
//! Upstream documents are produced by several tools and people. The same
//! field may arrive camelCase or snake_case, numbers may be strings with
//! thousands separators or units ("12,500 SF"), and booleans may be "Yes" or
//! `1`. Everything is resolved here so the engines only see typed values.

use crate::models::{
    BrokerExperience, BuildingClass, DelineatedArea, DesiredFeatures, GeoPoint,
    GovernmentPropertyRecord, LocationRequirement, MandatoryFeatures, OpportunityRequirement,
    Ownership, PropertyListing, SpaceRequirement,
};
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("Expected a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

type Object = Map<String, Value>;

fn as_object(value: &Value) -> Result<&Object, NormalizeError> {
    // Document stores often nest the payload under "data"
    let object = value.as_object().ok_or(NormalizeError::NotAnObject)?;
    match object.get("data").and_then(Value::as_object) {
        Some(inner) => Ok(inner),
        None => Ok(object),
    }
}

/// First non-null value among alternative key spellings
fn field<'a>(object: &'a Object, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| object.get(*name))
        .find(|value| !value.is_null())
}

/// Parse a number from a JSON number or a string such as "12,500 SF"
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

/// Parse a boolean from `true`, `1`, "yes", "Y", "true" and their negatives
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "required" | "mandatory" => Some(true),
            "false" | "no" | "n" | "0" | "" | "none" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y"];

/// Parse a calendar date from ISO dates, RFC 3339 timestamps or US formats
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(s) {
        return Some(timestamp.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

fn string_field(object: &Object, names: &[&str]) -> Option<String> {
    match field(object, names)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_field(object: &Object, names: &[&str]) -> Option<f64> {
    field(object, names).and_then(parse_number)
}

fn bool_field(object: &Object, names: &[&str]) -> bool {
    field(object, names).and_then(parse_bool).unwrap_or(false)
}

fn date_field(object: &Object, names: &[&str]) -> Option<NaiveDate> {
    field(object, names).and_then(parse_date)
}

fn required_id(object: &Object) -> Result<String, NormalizeError> {
    string_field(object, &["id", "$id", "_id"]).ok_or(NormalizeError::MissingField("id"))
}

fn coordinate(object: &Object, names: &[&str], name: &'static str, limit: f64) -> Result<f64, NormalizeError> {
    let value = number_field(object, names).ok_or(NormalizeError::MissingField(name))?;
    if value.abs() > limit {
        return Err(NormalizeError::InvalidField {
            field: name,
            reason: format!("{} is out of range", value),
        });
    }
    Ok(value)
}

fn location(object: &Object) -> Result<(f64, f64), NormalizeError> {
    // Coordinates may be flat or nested under "location"/"coordinates"
    let nested = field(object, &["location", "coordinates", "geo"]).and_then(Value::as_object);
    let source = nested
        .filter(|inner| field(inner, &["latitude", "lat"]).is_some())
        .unwrap_or(object);

    let lat = coordinate(source, &["latitude", "lat"], "latitude", 90.0)?;
    let lng = coordinate(source, &["longitude", "lng", "lon"], "longitude", 180.0)?;
    Ok((lat, lng))
}

fn building_class(value: &Value) -> Option<BuildingClass> {
    value.as_str().and_then(|s| s.parse().ok())
}

fn building_classes(object: &Object) -> Vec<BuildingClass> {
    match field(object, &["buildingClasses", "building_classes", "buildingClass", "building_class"]) {
        Some(Value::Array(items)) => items.iter().filter_map(building_class).collect(),
        // "A, B" or "Class A or B"
        Some(Value::String(s)) => s
            .split([',', '/', ';'])
            .flat_map(|part| part.split(" or "))
            .filter_map(|part| part.parse().ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn geo_point(value: &Value) -> Option<GeoPoint> {
    match value {
        Value::Array(pair) if pair.len() == 2 => {
            // GeoJSON order: [lng, lat]
            let lng = parse_number(&pair[0])?;
            let lat = parse_number(&pair[1])?;
            Some(GeoPoint::new(lat, lng))
        }
        Value::Object(object) => {
            let lat = number_field(object, &["latitude", "lat"])?;
            let lng = number_field(object, &["longitude", "lng", "lon"])?;
            Some(GeoPoint::new(lat, lng))
        }
        _ => None,
    }
}

fn delineated_area(value: &Value) -> Result<Option<DelineatedArea>, NormalizeError> {
    let Some(object) = value.as_object() else {
        return Ok(None);
    };

    if let Some(vertices) = field(object, &["vertices", "polygon", "points"]).and_then(Value::as_array) {
        let vertices: Vec<GeoPoint> = vertices.iter().filter_map(geo_point).collect();
        if vertices.len() < 3 {
            return Err(NormalizeError::InvalidField {
                field: "delineatedArea",
                reason: "polygon needs at least 3 vertices".into(),
            });
        }
        return Ok(Some(DelineatedArea::Polygon { vertices }));
    }

    let center = field(object, &["center", "centre"]).and_then(geo_point);
    let radius = number_field(object, &["radiusMiles", "radius_miles", "radius"]);
    match (center, radius) {
        (Some(center), Some(radius_miles)) if radius_miles > 0.0 => {
            Ok(Some(DelineatedArea::Radius { center, radius_miles }))
        }
        (Some(_), Some(_)) => Err(NormalizeError::InvalidField {
            field: "delineatedArea",
            reason: "radius must be positive".into(),
        }),
        _ => Ok(None),
    }
}

/// Normalize a broker listing document
pub fn listing_from_json(value: &Value) -> Result<PropertyListing, NormalizeError> {
    let object = as_object(value)?;
    let (latitude, longitude) = location(object)?;

    let available_sf = number_field(object, &["availableSf", "available_sf", "availableSF", "availableSpace"])
        .ok_or(NormalizeError::MissingField("availableSf"))?;
    if available_sf < 0.0 {
        return Err(NormalizeError::InvalidField {
            field: "availableSf",
            reason: "must not be negative".into(),
        });
    }

    Ok(PropertyListing {
        id: required_id(object)?,
        latitude,
        longitude,
        state: string_field(object, &["state"]).map(|s| s.to_ascii_uppercase()),
        city: string_field(object, &["city"]),
        available_sf,
        total_sf: number_field(object, &["totalSf", "total_sf", "totalSF", "buildingSize"])
            .unwrap_or(available_sf),
        building_class: field(object, &["buildingClass", "building_class"]).and_then(building_class),
        ada_compliant: bool_field(object, &["adaCompliant", "ada_compliant", "ada"]),
        leed_certified: bool_field(object, &["leedCertified", "leed_certified", "leed"]),
        energy_star: bool_field(object, &["energyStar", "energy_star"]),
        parking_ratio: number_field(object, &["parkingRatio", "parking_ratio"]),
        backup_power: bool_field(object, &["backupPower", "backup_power", "generator"]),
        fiber_connectivity: bool_field(object, &["fiberConnectivity", "fiber_connectivity", "fiber"]),
        scif_capable: bool_field(object, &["scifCapable", "scif_capable", "scif"]),
        security_clearance_capable: bool_field(
            object,
            &["securityClearanceCapable", "security_clearance_capable", "securityClearance"],
        ),
        divisible: bool_field(object, &["divisible", "isDivisible", "is_divisible"]),
        min_divisible_sf: number_field(object, &["minDivisibleSf", "min_divisible_sf", "minDivisibleSF"]),
        available_date: date_field(object, &["availableDate", "available_date", "availableFrom"]),
        broker_id: string_field(object, &["brokerId", "broker_id", "userId"]),
    })
}

/// Normalize an opportunity requirement document
pub fn requirement_from_json(value: &Value) -> Result<OpportunityRequirement, NormalizeError> {
    let object = as_object(value)?;

    let location_object = field(object, &["location", "locationRequirement"]).and_then(Value::as_object);
    let location_source = location_object.unwrap_or(object);
    let area = match field(location_source, &["delineatedArea", "delineated_area"]) {
        Some(value) => delineated_area(value)?,
        None => None,
    };

    let space_object = field(object, &["space", "spaceRequirement"]).and_then(Value::as_object);
    let space_source = space_object.unwrap_or(object);
    let space = SpaceRequirement {
        min_sf: number_field(space_source, &["minSf", "min_sf", "minSF", "minimumSf"]),
        max_sf: number_field(space_source, &["maxSf", "max_sf", "maxSF", "maximumSf"]),
        target_sf: number_field(space_source, &["targetSf", "target_sf", "targetSF"]),
    };
    if let (Some(min), Some(max)) = (space.min_sf, space.max_sf) {
        if min > max {
            return Err(NormalizeError::InvalidField {
                field: "space",
                reason: format!("minimum {} exceeds maximum {}", min, max),
            });
        }
    }

    let desired_source = field(object, &["desiredFeatures", "desired_features"])
        .and_then(Value::as_object)
        .unwrap_or(object);
    let mandatory_source = field(object, &["mandatoryFeatures", "mandatory_features"])
        .and_then(Value::as_object)
        .unwrap_or(object);

    Ok(OpportunityRequirement {
        id: required_id(object)?,
        agency: string_field(object, &["agency", "agencyName", "agency_name"]),
        location: LocationRequirement {
            state: string_field(location_source, &["state"]).map(|s| s.to_ascii_uppercase()),
            city: string_field(location_source, &["city"]),
            delineated_area: area,
        },
        space,
        building_classes: building_classes(object),
        occupancy_date: date_field(object, &["occupancyDate", "occupancy_date", "requiredOccupancy"]),
        term_months: number_field(object, &["termMonths", "term_months", "term"])
            .filter(|months| *months >= 0.0)
            .map(|months| months.round() as u32),
        desired_features: DesiredFeatures {
            leed: bool_field(desired_source, &["leed", "leedRequired", "leed_required"]),
            energy_star: bool_field(desired_source, &["energyStar", "energy_star"]),
            backup_power: bool_field(desired_source, &["backupPower", "backup_power"]),
            fiber: bool_field(desired_source, &["fiber", "fiberConnectivity"]),
            min_parking_ratio: number_field(desired_source, &["minParkingRatio", "min_parking_ratio", "parkingRatio"]),
        },
        mandatory_features: MandatoryFeatures {
            ada: bool_field(mandatory_source, &["ada", "adaRequired", "ada_required"]),
            scif: bool_field(mandatory_source, &["scif", "scifRequired", "scif_required"]),
            security_clearance: bool_field(
                mandatory_source,
                &["securityClearance", "security_clearance", "clearanceRequired"],
            ),
        },
    })
}

/// Normalize a broker experience document
pub fn broker_experience_from_json(value: &Value) -> Result<BrokerExperience, NormalizeError> {
    let object = as_object(value)?;
    let count = |names: &[&str]| {
        number_field(object, names)
            .filter(|n| *n >= 0.0)
            .map(|n| n.round() as u32)
    };

    let agencies_served = match field(object, &["agenciesServed", "agencies_served", "agencies"]) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    Ok(BrokerExperience {
        broker_id: string_field(object, &["brokerId", "broker_id", "id", "$id"])
            .ok_or(NormalizeError::MissingField("brokerId"))?,
        federal_transactions: count(&["federalTransactions", "federal_transactions", "totalFederalTransactions"])
            .unwrap_or(0),
        gsa_transactions: count(&["gsaTransactions", "gsa_transactions"]).unwrap_or(0),
        agencies_served,
        years_active: count(&["yearsActive", "years_active", "yearsExperience"]),
    })
}

/// Normalize one government property reference record
pub fn government_record_from_json(value: &Value) -> Result<GovernmentPropertyRecord, NormalizeError> {
    let object = as_object(value)?;
    let (latitude, longitude) = location(object)?;

    let ownership = string_field(object, &["ownership", "ownershipType", "ownership_type"])
        .ok_or(NormalizeError::MissingField("ownership"))?
        .parse::<Ownership>()
        .map_err(|reason| NormalizeError::InvalidField {
            field: "ownership",
            reason,
        })?;

    Ok(GovernmentPropertyRecord {
        id: required_id(object)?,
        latitude,
        longitude,
        ownership,
        rsf: number_field(object, &["rsf", "RSF", "rentableSquareFeet", "totalRsf"])
            .filter(|rsf| *rsf >= 0.0)
            .unwrap_or(0.0),
        lease_expiration: date_field(object, &["leaseExpiration", "lease_expiration", "expirationDate"]),
        agency: string_field(object, &["agency", "agencyName", "tenantAgency"]),
    })
}

/// Normalize a JSON array of government records, skipping invalid entries
pub fn government_records_from_json(value: &Value) -> Result<Vec<GovernmentPropertyRecord>, NormalizeError> {
    let items = value
        .as_array()
        .or_else(|| value.get("records").and_then(Value::as_array))
        .ok_or(NormalizeError::NotAnObject)?;

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match government_record_from_json(item) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping government record at index {}: {}", index, e),
        }
    }
    Ok(records)
}
