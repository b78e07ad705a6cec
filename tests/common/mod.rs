// Shared fixtures for the integration tests
#![allow(dead_code)]

use chrono::NaiveDate;
use fedlease_score::models::{
    BrokerExperience, BuildingClass, GovernmentPropertyRecord, LocationRequirement,
    OpportunityRequirement, Ownership, PropertyListing, SpaceRequirement,
};

pub const DC_LAT: f64 = 38.9072;
pub const DC_LNG: f64 = -77.0369;

pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

/// Point `miles` from the origin at `bearing_deg`, using the flat-earth
/// approximation (accurate to well under 1% at these distances)
pub fn offset(lat: f64, lng: f64, miles: f64, bearing_deg: f64) -> (f64, f64) {
    let bearing = bearing_deg.to_radians();
    let dlat = miles * bearing.cos() / 69.0;
    let dlng = miles * bearing.sin() / (69.0 * lat.to_radians().cos());
    (lat + dlat, lng + dlng)
}

/// 40 properties within 2.5 miles of downtown Washington: 30 leased, 10 owned,
/// 8 of the leases expiring within 12 months of [`as_of`]
pub fn dc_records() -> Vec<GovernmentPropertyRecord> {
    let agencies = ["GSA", "IRS", "SSA", "DHS", "DOJ", "USDA"];

    (0..40)
        .map(|i| {
            let miles = 0.5 + (i % 5) as f64 * 0.5;
            let (latitude, longitude) = offset(DC_LAT, DC_LNG, miles, i as f64 * 9.0);
            let leased = i < 30;

            let lease_expiration = if !leased {
                None
            } else if i < 8 {
                // Expiring within the next 12 months
                as_of().checked_add_days(chrono::Days::new(30 + i as u64 * 40))
            } else {
                // Expiring well outside the forward window
                NaiveDate::from_ymd_opt(2031 + (i % 4) as i32, 6, 30)
            };

            GovernmentPropertyRecord {
                id: format!("dc-{:02}", i),
                latitude,
                longitude,
                ownership: if leased { Ownership::Leased } else { Ownership::Owned },
                rsf: 20_000.0 + (i % 7) as f64 * 5_000.0,
                lease_expiration,
                agency: Some(agencies[i % agencies.len()].to_string()),
            }
        })
        .collect()
}

pub fn listing(id: &str, available_sf: f64) -> PropertyListing {
    PropertyListing {
        id: id.to_string(),
        latitude: DC_LAT,
        longitude: DC_LNG,
        state: Some("DC".to_string()),
        city: Some("Washington".to_string()),
        available_sf,
        total_sf: 120_000.0,
        building_class: Some(BuildingClass::A),
        ada_compliant: true,
        leed_certified: true,
        energy_star: false,
        parking_ratio: Some(2.5),
        backup_power: true,
        fiber_connectivity: false,
        scif_capable: false,
        security_clearance_capable: false,
        divisible: false,
        min_divisible_sf: None,
        available_date: NaiveDate::from_ymd_opt(2026, 3, 1),
        broker_id: None,
    }
}

pub fn requirement(id: &str, min_sf: f64, max_sf: f64) -> OpportunityRequirement {
    OpportunityRequirement {
        id: id.to_string(),
        agency: Some("GSA".to_string()),
        location: LocationRequirement {
            state: Some("DC".to_string()),
            city: Some("Washington".to_string()),
            delineated_area: None,
        },
        space: SpaceRequirement {
            min_sf: Some(min_sf),
            max_sf: Some(max_sf),
            target_sf: None,
        },
        building_classes: vec![BuildingClass::A, BuildingClass::B],
        occupancy_date: NaiveDate::from_ymd_opt(2026, 10, 1),
        term_months: Some(120),
        desired_features: Default::default(),
        mandatory_features: Default::default(),
    }
}

pub fn broker(id: &str, federal_transactions: u32) -> BrokerExperience {
    BrokerExperience {
        broker_id: id.to_string(),
        federal_transactions,
        gsa_transactions: federal_transactions / 2,
        agencies_served: vec!["GSA".to_string()],
        years_active: Some(12),
    }
}
