use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Whether the government leases or owns a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    Leased,
    Owned,
}

impl FromStr for Ownership {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leased" | "lease" | "l" => Ok(Ownership::Leased),
            "owned" | "own" | "o" | "federally owned" => Ok(Ownership::Owned),
            other => Err(format!("unknown ownership '{}'", other)),
        }
    }
}

/// Government property reference record (the spatially indexed set)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernmentPropertyRecord {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub ownership: Ownership,
    #[serde(default)]
    pub rsf: f64,
    #[serde(default)]
    pub lease_expiration: Option<NaiveDate>,
    #[serde(default)]
    pub agency: Option<String>,
}

impl GovernmentPropertyRecord {
    pub fn is_leased(&self) -> bool {
        self.ownership == Ownership::Leased
    }
}

/// Letter grade derived from a numeric score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "F")]
    F,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A+" => Ok(Grade::APlus),
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            other => Err(format!("unknown grade '{}'", other)),
        }
    }
}

/// The six neighborhood factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NeighborhoodFactor {
    Density,
    LeaseActivity,
    ExpiringLeases,
    Demand,
    Vacancy,
    Growth,
}

/// Aggregate counts over the properties found in a radius
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodMetrics {
    pub total_properties: u32,
    pub leased_properties: u32,
    pub owned_properties: u32,
    #[serde(rename = "totalRSF")]
    pub total_rsf: f64,
    pub expiring_leases_count: u32,
}

/// One row of the per-factor breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScore {
    pub factor: NeighborhoodFactor,
    pub raw_value: f64,
    pub score: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodScoreResult {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_miles: f64,
    pub score: f64,
    pub grade: Grade,
    pub percentile: f64,
    pub metrics: NeighborhoodMetrics,
    pub factors: Vec<FactorScore>,
    pub weights_version: String,
    pub computed_at: DateTime<Utc>,
}

impl NeighborhoodScoreResult {
    pub fn factor(&self, factor: NeighborhoodFactor) -> Option<&FactorScore> {
        self.factors.iter().find(|f| f.factor == factor)
    }
}

/// Building class of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingClass {
    A,
    B,
    C,
}

impl fmt::Display for BuildingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildingClass::A => "A",
            BuildingClass::B => "B",
            BuildingClass::C => "C",
        };
        f.write_str(s)
    }
}

impl FromStr for BuildingClass {
    type Err = String;

    /// Accepts "A", "class a", "Class-B", "class_c"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let stripped = lowered
            .trim_start_matches("class")
            .trim_start_matches(|c: char| c == ' ' || c == '-' || c == '_');
        match stripped {
            "a" | "a+" => Ok(BuildingClass::A),
            "b" => Ok(BuildingClass::B),
            "c" => Ok(BuildingClass::C),
            _ => Err(format!("unknown building class '{}'", s)),
        }
    }
}

/// Property listing offered by a broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyListing {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    pub available_sf: f64,
    #[serde(default)]
    pub total_sf: f64,
    #[serde(default)]
    pub building_class: Option<BuildingClass>,
    #[serde(default)]
    pub ada_compliant: bool,
    #[serde(default)]
    pub leed_certified: bool,
    #[serde(default)]
    pub energy_star: bool,
    #[serde(default)]
    pub parking_ratio: Option<f64>,
    #[serde(default)]
    pub backup_power: bool,
    #[serde(default)]
    pub fiber_connectivity: bool,
    #[serde(default)]
    pub scif_capable: bool,
    #[serde(default)]
    pub security_clearance_capable: bool,
    #[serde(default)]
    pub divisible: bool,
    #[serde(default)]
    pub min_divisible_sf: Option<f64>,
    #[serde(default)]
    pub available_date: Option<NaiveDate>,
    #[serde(default)]
    pub broker_id: Option<String>,
}

impl PropertyListing {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Geographic sub-region a requirement is restricted to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DelineatedArea {
    #[serde(rename_all = "camelCase")]
    Radius { center: GeoPoint, radius_miles: f64 },
    Polygon { vertices: Vec<GeoPoint> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequirement {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub delineated_area: Option<DelineatedArea>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceRequirement {
    #[serde(default)]
    pub min_sf: Option<f64>,
    #[serde(default)]
    pub max_sf: Option<f64>,
    #[serde(default)]
    pub target_sf: Option<f64>,
}

impl SpaceRequirement {
    /// Explicit target, else the midpoint of whichever bounds exist
    pub fn target(&self) -> Option<f64> {
        match (self.target_sf, self.min_sf, self.max_sf) {
            (Some(target), _, _) => Some(target),
            (None, Some(min), Some(max)) => Some((min + max) / 2.0),
            (None, Some(min), None) => Some(min),
            (None, None, Some(max)) => Some(max),
            (None, None, None) => None,
        }
    }
}

/// Features that improve the building score when present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredFeatures {
    #[serde(default)]
    pub leed: bool,
    #[serde(default)]
    pub energy_star: bool,
    #[serde(default)]
    pub backup_power: bool,
    #[serde(default)]
    pub fiber: bool,
    #[serde(default)]
    pub min_parking_ratio: Option<f64>,
}

/// Hard-stop features; each is enforced only when set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandatoryFeatures {
    #[serde(default)]
    pub ada: bool,
    #[serde(default)]
    pub scif: bool,
    #[serde(default)]
    pub security_clearance: bool,
}

/// Lease requirement extracted from a solicitation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityRequirement {
    pub id: String,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub location: LocationRequirement,
    #[serde(default)]
    pub space: SpaceRequirement,
    #[serde(default)]
    pub building_classes: Vec<BuildingClass>,
    #[serde(default)]
    pub occupancy_date: Option<NaiveDate>,
    #[serde(default)]
    pub term_months: Option<u32>,
    #[serde(default)]
    pub desired_features: DesiredFeatures,
    #[serde(default)]
    pub mandatory_features: MandatoryFeatures,
}

/// Prior federal-transaction history of the listing broker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerExperience {
    pub broker_id: String,
    #[serde(default)]
    pub federal_transactions: u32,
    #[serde(default)]
    pub gsa_transactions: u32,
    #[serde(default)]
    pub agencies_served: Vec<String>,
    #[serde(default)]
    pub years_active: Option<u32>,
}

/// The five match categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchCategory {
    Location,
    Space,
    Building,
    Timeline,
    Experience,
}

impl MatchCategory {
    pub fn label(&self) -> &'static str {
        match self {
            MatchCategory::Location => "location",
            MatchCategory::Space => "space",
            MatchCategory::Building => "building",
            MatchCategory::Timeline => "timeline",
            MatchCategory::Experience => "experience",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub location: f64,
    pub space: f64,
    pub building: f64,
    pub timeline: f64,
    pub experience: f64,
}

impl CategoryScores {
    pub fn entries(&self) -> [(MatchCategory, f64); 5] {
        [
            (MatchCategory::Location, self.location),
            (MatchCategory::Space, self.space),
            (MatchCategory::Building, self.building),
            (MatchCategory::Timeline, self.timeline),
            (MatchCategory::Experience, self.experience),
        ]
    }

    pub fn get(&self, category: MatchCategory) -> f64 {
        match category {
            MatchCategory::Location => self.location,
            MatchCategory::Space => self.space,
            MatchCategory::Building => self.building,
            MatchCategory::Timeline => self.timeline,
            MatchCategory::Experience => self.experience,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScoreResult {
    pub property_id: String,
    pub opportunity_id: String,
    pub overall_score: f64,
    pub grade: Grade,
    pub qualified: bool,
    pub competitive: bool,
    pub category_scores: CategoryScores,
    pub disqualifiers: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub checks_evaluated: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl MatchScoreResult {
    /// A hard-stop result: no partial credit
    pub fn disqualified(
        property_id: &str,
        opportunity_id: &str,
        reason: String,
        checks_evaluated: Vec<String>,
    ) -> Self {
        Self {
            property_id: property_id.to_string(),
            opportunity_id: opportunity_id.to_string(),
            overall_score: 0.0,
            grade: Grade::F,
            qualified: false,
            competitive: false,
            category_scores: CategoryScores::default(),
            disqualifiers: vec![reason],
            strengths: vec![],
            weaknesses: vec![],
            recommendations: vec![],
            checks_evaluated,
            computed_at: Utc::now(),
        }
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Neighborhood factor weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborhoodWeights {
    pub version: String,
    pub density: f64,
    pub lease_activity: f64,
    pub expiring_leases: f64,
    pub demand: f64,
    pub vacancy: f64,
    pub growth: f64,
}

impl Default for NeighborhoodWeights {
    fn default() -> Self {
        Self {
            version: "neighborhood-v1".to_string(),
            density: 0.25,
            lease_activity: 0.25,
            expiring_leases: 0.20,
            demand: 0.15,
            vacancy: 0.10,
            growth: 0.05,
        }
    }
}

impl NeighborhoodWeights {
    pub fn weight(&self, factor: NeighborhoodFactor) -> f64 {
        match factor {
            NeighborhoodFactor::Density => self.density,
            NeighborhoodFactor::LeaseActivity => self.lease_activity,
            NeighborhoodFactor::ExpiringLeases => self.expiring_leases,
            NeighborhoodFactor::Demand => self.demand,
            NeighborhoodFactor::Vacancy => self.vacancy,
            NeighborhoodFactor::Growth => self.growth,
        }
    }

    pub fn total(&self) -> f64 {
        self.density
            + self.lease_activity
            + self.expiring_leases
            + self.demand
            + self.vacancy
            + self.growth
    }
}

/// Match category weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    pub version: String,
    pub location: f64,
    pub space: f64,
    pub building: f64,
    pub timeline: f64,
    pub experience: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            version: "match-v1".to_string(),
            location: 0.30,
            space: 0.25,
            building: 0.20,
            timeline: 0.15,
            experience: 0.10,
        }
    }
}

impl MatchWeights {
    pub fn weight(&self, category: MatchCategory) -> f64 {
        match category {
            MatchCategory::Location => self.location,
            MatchCategory::Space => self.space,
            MatchCategory::Building => self.building,
            MatchCategory::Timeline => self.timeline,
            MatchCategory::Experience => self.experience,
        }
    }

    pub fn total(&self) -> f64 {
        self.location + self.space + self.building + self.timeline + self.experience
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((NeighborhoodWeights::default().total() - 1.0).abs() < 1e-9);
        assert!((MatchWeights::default().total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_building_class_parsing() {
        assert_eq!("A".parse::<BuildingClass>(), Ok(BuildingClass::A));
        assert_eq!("Class B".parse::<BuildingClass>(), Ok(BuildingClass::B));
        assert_eq!("class_c".parse::<BuildingClass>(), Ok(BuildingClass::C));
        assert!("warehouse".parse::<BuildingClass>().is_err());
    }

    #[test]
    fn test_grade_serializes_with_plus() {
        let json = serde_json::to_string(&Grade::APlus).unwrap();
        assert_eq!(json, "\"A+\"");
        assert_eq!("A+".parse::<Grade>(), Ok(Grade::APlus));
    }

    #[test]
    fn test_space_target_defaults_to_midpoint() {
        let space = SpaceRequirement {
            min_sf: Some(70_000.0),
            max_sf: Some(80_000.0),
            target_sf: None,
        };
        assert_eq!(space.target(), Some(75_000.0));
    }

    #[test]
    fn test_category_label_matches_wire_name() {
        for (category, _) in CategoryScores::default().entries() {
            let wire = serde_json::to_value(category).unwrap();
            assert_eq!(wire, category.label());
        }
    }
}
