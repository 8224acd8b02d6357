//! Per-province reports for a single country.

use serde::{Deserialize, Serialize};

/// Fatality rate above which a location is flagged as high.
const HIGH_FATALITY_RATE: f64 = 0.02;

/// Fatality rate above which a location is flagged as medium.
const MEDIUM_FATALITY_RATE: f64 = 0.01;

/// Severity band for a fatality rate, used to color badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalityLevel {
    Low,
    Medium,
    High,
}

impl FatalityLevel {
    pub fn from_rate(rate: f64) -> Self {
        if rate > HIGH_FATALITY_RATE {
            FatalityLevel::High
        } else if rate > MEDIUM_FATALITY_RATE {
            FatalityLevel::Medium
        } else {
            FatalityLevel::Low
        }
    }
}

/// One province/state of a country at the most recent reporting date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryReport {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub last_update: String,
    #[serde(default)]
    pub confirmed: i64,
    #[serde(default)]
    pub deaths: i64,
    #[serde(default)]
    pub recovered: i64,
    #[serde(default)]
    pub active: i64,
    #[serde(default)]
    pub fatality_rate: f64,
    #[serde(default)]
    pub confirmed_diff: i64,
    #[serde(default)]
    pub deaths_diff: i64,
    #[serde(default)]
    pub recovered_diff: i64,
    #[serde(default)]
    pub active_diff: i64,
    pub region: ReportRegion,
}

impl CountryReport {
    /// Province name, falling back to the country name when the report
    /// covers the whole country.
    pub fn display_name(&self) -> &str {
        self.region.display_name()
    }

    pub fn fatality_level(&self) -> FatalityLevel {
        FatalityLevel::from_rate(self.fatality_rate)
    }
}

/// The location a report refers to, with its nested cities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRegion {
    #[serde(default)]
    pub iso: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub cities: Vec<City>,
}

impl ReportRegion {
    pub fn display_name(&self) -> &str {
        if self.province.is_empty() {
            &self.name
        } else {
            &self.province
        }
    }
}

/// A city nested under a province report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub last_update: String,
    #[serde(default)]
    pub confirmed: i64,
    #[serde(default)]
    pub deaths: i64,
    #[serde(default)]
    pub confirmed_diff: i64,
    #[serde(default)]
    pub deaths_diff: i64,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub fips: Option<i64>,
}

impl City {
    /// Cities carry no fatality rate upstream, so derive it.
    pub fn fatality_rate(&self) -> f64 {
        if self.confirmed > 0 {
            self.deaths as f64 / self.confirmed as f64
        } else {
            0.0
        }
    }

    pub fn fatality_level(&self) -> FatalityLevel {
        FatalityLevel::from_rate(self.fatality_rate())
    }
}
