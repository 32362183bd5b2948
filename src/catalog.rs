//! In-memory station catalog snapshot.

use std::fs;
use std::path::Path;

use crate::error::CatalogError;
use crate::model::ChargingStation;
use crate::traits::StationCatalog;

/// A frozen list of stations, typically loaded from a JSON export of the
/// station database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    stations: Vec<ChargingStation>,
}

impl InMemoryCatalog {
    pub fn new(stations: Vec<ChargingStation>) -> Self {
        Self { stations }
    }

    /// Parses a JSON array of stations.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let stations: Vec<ChargingStation> = serde_json::from_str(json)?;
        Ok(Self { stations })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl StationCatalog for InMemoryCatalog {
    fn stations(&self) -> &[ChargingStation] {
        &self.stations
    }
}
