use serde::{Deserialize, Serialize};

use super::FatalityLevel;

/// Worldwide totals for the most recent reporting date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
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
}

impl GlobalStats {
    pub fn fatality_level(&self) -> FatalityLevel {
        FatalityLevel::from_rate(self.fatality_rate)
    }
}
