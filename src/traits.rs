//! Collaborator seams for the route planner.
//!
//! These are intentionally minimal. The planner never talks to a mapping
//! service or a station database directly; deployments plug their own
//! implementations in here.

use std::sync::Arc;

use crate::error::DirectionsError;
use crate::model::{ChargingStation, Coordinate, RoadSegment};

/// Provides a drivable segment between two coordinates.
///
/// Implementations must be pure lookups: the graph builder calls them from
/// several worker threads at once and memoizes the answers per request.
/// A call that cannot be answered (timeout, no route) returns an error and
/// the corresponding edge is left out of the graph.
pub trait DirectionsProvider: Send + Sync {
    fn segment(&self, from: Coordinate, to: Coordinate) -> Result<RoadSegment, DirectionsError>;
}

impl<T: DirectionsProvider + ?Sized> DirectionsProvider for Box<T> {
    fn segment(&self, from: Coordinate, to: Coordinate) -> Result<RoadSegment, DirectionsError> {
        (**self).segment(from, to)
    }
}

impl<T: DirectionsProvider + ?Sized> DirectionsProvider for Arc<T> {
    fn segment(&self, from: Coordinate, to: Coordinate) -> Result<RoadSegment, DirectionsError> {
        (**self).segment(from, to)
    }
}

impl<T: DirectionsProvider + ?Sized> DirectionsProvider for &T {
    fn segment(&self, from: Coordinate, to: Coordinate) -> Result<RoadSegment, DirectionsError> {
        (**self).segment(from, to)
    }
}

/// Read-only snapshot of the charging station catalog.
///
/// The catalog is refreshed out-of-band; the planner never mutates it.
pub trait StationCatalog: Send + Sync {
    fn stations(&self) -> &[ChargingStation];
}
