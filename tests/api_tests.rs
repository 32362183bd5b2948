//! HTTP contract tests for `POST /route-planner` and `GET /health`.

mod fixtures;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ev_route_planner::catalog::InMemoryCatalog;
use ev_route_planner::model::ChargingStation;
use ev_route_planner::planner::{Planner, PlannerConfig};
use ev_route_planner::server::router;

use fixtures::{at_km, GridRoad, TestStation};

fn app(stations: Vec<ChargingStation>) -> Router {
    let planner = Planner::new(GridRoad::new(), InMemoryCatalog::new(stations), PlannerConfig::default());
    router(Arc::new(planner))
}

fn one_station() -> Vec<ChargingStation> {
    vec![TestStation::new("km40").at(at_km(40.0)).ccs2(50.0).build()]
}

fn request_body(current_soc: f64) -> Value {
    let end = at_km(150.0);
    json!({
        "start": {"lat": 0.0, "lng": 0.0},
        "destination": {"lat": end.lat, "lng": end.lng},
        "vehicle": {
            "make": "Tata",
            "model": "Nexon EV",
            "year": 2023,
            "batteryCapacity": 40,
            "chargingAC": {"supported": true, "maxPower": 7.2, "connectorTypes": ["type2"]},
            "chargingDC": {"supported": true, "maxPower": 50, "connectorTypes": ["ccs2"]},
            "efficiency": 0.18
        },
        "currentSOC": current_soc,
        "departureTime": "2024-05-01T08:00"
    })
}

async fn post(app: Router, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/route-planner")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn plans_single_stop_trip() {
    let (status, body) = post(app(one_station()), request_body(30.0).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["departureTime"], "2024-05-01T08:00:00Z");
    assert_eq!(data["totalDistance"], 150.0);
    assert_eq!(data["totalTime"], 142.8);
    assert_eq!(data["finalArrivalSOC"], 10.0);
    assert!(data.get("noStationsAvailable").is_none());

    let stops = data["chargingStops"].as_array().unwrap();
    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0]["stationId"], "km40");
    assert_eq!(stops[0]["connectorType"], "ccs2");
    assert_eq!(stops[0]["arrivalSOC"], 12.0);
    assert_eq!(stops[0]["chargeToSOC"], 59.5);
    assert_eq!(stops[0]["chargingTime"], 22.8);
    assert_eq!(stops[0]["energyAdded"], 19.0);
    assert_eq!(stops[0]["arrivalTime"], "2024-05-01T08:32:00Z");
}

#[tokio::test]
async fn direct_trip_has_no_stops() {
    let (status, body) = post(app(one_station()), request_body(80.0).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["chargingStops"], json!([]));
    assert_eq!(body["data"]["finalArrivalSOC"], 12.5);
    assert_eq!(body["data"]["estimatedArrival"], "2024-05-01T10:00:00Z");
}

#[tokio::test]
async fn reports_no_stations_available() {
    let (status, body) = post(app(Vec::new()), request_body(30.0).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["noStationsAvailable"], true);
    assert_eq!(body["data"]["chargingStops"], json!([]));
    assert_eq!(body["data"]["totalDistance"], 0.0);
}

#[tokio::test]
async fn accepts_dms_coordinates() {
    let mut body = request_body(80.0);
    body["start"] = json!({"dms": "0°0'0\"N 0°0'0\"E"});
    let (status, response) = post(app(one_station()), body.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["data"]["totalDistance"], 150.0);
}

#[tokio::test]
async fn rejects_soc_out_of_range() {
    let (status, body) = post(app(one_station()), request_body(120.0).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["field"], "currentSOC");
    assert!(body["message"].as_str().unwrap().contains("120"));
}

#[tokio::test]
async fn rejects_missing_coordinates() {
    let mut body = request_body(50.0);
    body["start"] = json!({});
    let (status, response) = post(app(one_station()), body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["field"], "start");
}

#[tokio::test]
async fn rejects_malformed_json() {
    let (status, body) = post(app(one_station()), "{\"start\": ".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body.get("field").is_none());
}

#[tokio::test]
async fn rejects_missing_required_field() {
    let mut body = request_body(50.0);
    body.as_object_mut().unwrap().remove("vehicle");
    let (status, response) = post(app(one_station()), body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert!(response["message"].as_str().unwrap().contains("vehicle"));
}

#[tokio::test]
async fn health_reports_catalog_size() {
    let response = app(one_station())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok", "stations": 1}));
}
