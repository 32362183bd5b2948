//! OSRM HTTP adapter for road segments.

use serde::Deserialize;

use crate::error::DirectionsError;
use crate::model::{Coordinate, RoadSegment, SpeedClass};
use crate::polyline::Polyline;
use crate::traits::DirectionsProvider;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    /// Per-call timeout; a timed-out lookup drops the edge.
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Road segments from the OSRM `route` service.
///
/// OSRM reports no elevation, so every segment has zero gain and loss and
/// the vehicle's climb and regen coefficients never change its cost. Use a
/// `DirectionsProvider` that fills in elevation if climbs must be costed.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn route_url(&self, from: Coordinate, to: Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=polyline",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            from.lng,
            from.lat,
            to.lng,
            to.lat
        )
    }
}

impl DirectionsProvider for OsrmClient {
    fn segment(&self, from: Coordinate, to: Coordinate) -> Result<RoadSegment, DirectionsError> {
        let body = self
            .client
            .get(self.route_url(from, to))
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmRouteResponse>())?;

        segment_from_response(body, from, to)
    }
}

fn segment_from_response(
    body: OsrmRouteResponse,
    from: Coordinate,
    to: Coordinate,
) -> Result<RoadSegment, DirectionsError> {
    if body.code != "Ok" {
        return Err(DirectionsError::NoRoute(format!(
            "{:?} and {:?} ({})",
            from.as_tuple(),
            to.as_tuple(),
            body.code
        )));
    }

    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| DirectionsError::NoRoute(format!("{:?} and {:?}", from.as_tuple(), to.as_tuple())))?;

    let polyline = match route.geometry.as_deref() {
        Some(encoded) => Polyline::decode(encoded, 5)
            .map_err(|err| DirectionsError::InvalidResponse(err.to_string()))?,
        None => Polyline::new(vec![from.as_tuple(), to.as_tuple()]),
    };

    let distance_km = route.distance / 1000.0;
    let duration_minutes = route.duration / 60.0;
    let speed_class = if duration_minutes > 0.0 {
        SpeedClass::from_average_kmh(distance_km / (duration_minutes / 60.0))
    } else {
        SpeedClass::Urban
    };

    // OSRM does not report elevation.
    Ok(RoadSegment {
        polyline,
        distance_km,
        elevation_gain_m: 0.0,
        elevation_loss_m: 0.0,
        duration_minutes,
        speed_class,
    })
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: Option<String>,
}
