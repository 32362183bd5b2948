//! Road segments from a real OSRM container.
//!
//! Needs a preprocessed (MLD) OSRM dataset in `OSRM_DATA_DIR`, e.g. the
//! Geofabrik southern-zone extract of India. Run with
//! `cargo test --test osrm_integration -- --ignored`.

mod fixtures;

use std::env;
use std::path::Path;
use std::time::{Duration, Instant};

use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::runners::SyncRunner;
use testcontainers::ReuseDirective;
use testcontainers::{Container, GenericImage, ImageExt, TestcontainersError};

use ev_route_planner::haversine::haversine_km;
use ev_route_planner::model::Coordinate;
use ev_route_planner::osrm::{OsrmClient, OsrmConfig};
use ev_route_planner::traits::DirectionsProvider;

use fixtures::kerala_locations::{Location, ERNAKULAM_JUNCTION, KOCHI};

fn osrm_container() -> Result<(Container<GenericImage>, String), TestcontainersError> {
    let data_dir = env::var("OSRM_DATA_DIR").unwrap_or_else(|_| "osrm-data".to_string());
    let dataset = env::var("OSRM_DATASET").unwrap_or_else(|_| "southern-zone-latest.osrm".to_string());
    let data_dir = std::fs::canonicalize(&data_dir)
        .map_err(|err| TestcontainersError::other(format!("OSRM data dir {}: {}", data_dir, err)))?;
    if !data_dir.join(Path::new(&dataset).with_extension("osrm.partition")).exists() {
        return Err(TestcontainersError::other(format!(
            "{} has no MLD-prepared {}",
            data_dir.display(),
            dataset
        )));
    }

    let image = GenericImage::new("osrm/osrm-backend", "latest")
        .with_exposed_port(5000.tcp())
        .with_mount(Mount::bind_mount(data_dir.to_string_lossy().to_string(), "/data"))
        .with_cmd(vec![
            "osrm-routed".to_string(),
            "--algorithm".to_string(),
            "mld".to_string(),
            format!("/data/{}", dataset),
        ])
        .with_container_name("ev-route-planner-osrm")
        .with_startup_timeout(Duration::from_secs(30))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(5000.tcp())?;
    Ok((container, format!("http://127.0.0.1:{}", port)))
}

fn coordinate(location: Location) -> Coordinate {
    Coordinate::new(location.lat, location.lng)
}

#[test]
#[ignore = "requires docker and a prepared OSRM dataset"]
fn osrm_segment_between_kochi_and_ernakulam() {
    let (container, base_url) = osrm_container().expect("start OSRM container");
    let client = OsrmClient::new(OsrmConfig {
        base_url,
        profile: "car".to_string(),
        timeout_secs: 10,
    })
    .expect("build OSRM client");

    // osrm-routed may still be loading the dataset right after start.
    let start = Instant::now();
    let segment = loop {
        match client.segment(coordinate(KOCHI), coordinate(ERNAKULAM_JUNCTION)) {
            Ok(segment) => break segment,
            Err(err) if start.elapsed() < Duration::from_secs(15) => {
                eprintln!("OSRM not ready yet: {}", err);
                std::thread::sleep(Duration::from_millis(500));
            }
            Err(err) => {
                if let Ok(stderr) = container.stderr_to_vec() {
                    eprintln!("OSRM stderr:\n{}", String::from_utf8_lossy(&stderr));
                }
                panic!("OSRM segment lookup failed: {}", err);
            }
        }
    };

    assert!(segment.distance_km > 1.0 && segment.distance_km < 20.0, "{} km", segment.distance_km);
    assert!(segment.duration_minutes > 0.0);
    assert!(segment.polyline.points().len() >= 2);
    // A road route is never shorter than the great-circle distance.
    let straight = haversine_km(KOCHI.coords(), ERNAKULAM_JUNCTION.coords());
    assert!(segment.distance_km >= straight);

    drop(container);
}
