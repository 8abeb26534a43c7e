//! Runs the matrix builder against a live OSRM container.
//!
//! Needs a preprocessed (MLD) extract in `OSRM_DATA_DIR`; the file name
//! defaults to `kanto-latest.osrm` and can be changed with `OSRM_DATASET`.
//! Run with `cargo test -- --ignored`.

mod fixtures;

use std::env;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use testcontainers::ReuseDirective;
use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::runners::SyncRunner;
use testcontainers::{Container, GenericImage, ImageExt, TestcontainersError};

use tsptw_planner::matrix::{CostMatrix, TimeMatrixBuilder};
use tsptw_planner::osrm::{OsrmClient, OsrmConfig};
use tsptw_planner::stop::Stop;
use tsptw_planner::traits::DistanceProvider;
use tsptw_planner::{LocationKey, SolveOptions, SolveRequest, solve};

use fixtures::tokyo_locations::{CLINIC, PATIENTS};
use fixtures::{TestStop, at};

fn dataset() -> Option<(PathBuf, String)> {
    let dir = PathBuf::from(env::var("OSRM_DATA_DIR").ok()?);
    let file = env::var("OSRM_DATASET").unwrap_or_else(|_| "kanto-latest.osrm".to_string());
    Some((dir, file))
}

fn osrm_container(dir: &Path, file: &str) -> Result<(Container<GenericImage>, String), TestcontainersError> {
    let image = GenericImage::new("osrm/osrm-backend", "latest")
        .with_exposed_port(5000.tcp())
        .with_mount(Mount::bind_mount(dir.to_string_lossy().to_string(), "/data"))
        .with_cmd(vec![
            "osrm-routed".to_string(),
            "--algorithm".to_string(),
            "mld".to_string(),
            format!("/data/{}", file),
        ])
        .with_container_name(format!("tsptw-osrm-{}", file.replace('.', "-")))
        .with_startup_timeout(Duration::from_secs(30))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(5000.tcp())?;
    Ok((container, format!("http://127.0.0.1:{}", port)))
}

fn client(base_url: &str) -> OsrmClient {
    OsrmClient::new(OsrmConfig {
        base_url: base_url.to_string(),
        ..OsrmConfig::default()
    })
    .expect("build OSRM client")
}

/// The server may still be loading the extract right after start.
fn wait_until_ready(client: &OsrmClient) {
    let probe = vec![LocationKey::coordinates(CLINIC.lat, CLINIC.lng)];
    let started = Instant::now();
    while started.elapsed() < Duration::from_secs(15) {
        if client.batch_durations(&probe, &probe).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(500));
    }
    panic!("OSRM did not answer within 15 seconds");
}

fn stops() -> Vec<Stop> {
    std::iter::once(&CLINIC)
        .chain(PATIENTS)
        .enumerate()
        .map(|(i, location)| {
            TestStop::new(&format!("n{}", i))
                .named(location.name)
                .at_coordinates(location.lat, location.lng)
                .service(10)
                .window(at(9, 0), at(18, 0))
                .build()
        })
        .collect()
}

fn build(client: &OsrmClient, stops: &[Stop], batch: usize) -> CostMatrix {
    TimeMatrixBuilder::new(client)
        .batch_size(batch)
        .build(stops)
        .expect("OSRM matrix")
}

#[test]
#[ignore]
fn osrm_small_blocks_match_default_blocks() {
    let Some((dir, file)) = dataset() else {
        eprintln!("OSRM_DATA_DIR not set, skipping");
        return;
    };
    let (container, base_url) = osrm_container(&dir, &file).expect("start OSRM container");
    let client = client(&base_url);
    wait_until_ready(&client);

    let stops = stops();
    let whole = build(&client, &stops, client.max_batch_size());
    let chunked = build(&client, &stops, 2);

    assert_eq!(chunked, whole);
    assert!(whole.get(0, 1) > 0);

    drop(container);
}

#[test]
#[ignore]
fn osrm_backed_solve_visits_everyone() {
    let Some((dir, file)) = dataset() else {
        eprintln!("OSRM_DATA_DIR not set, skipping");
        return;
    };
    let (container, base_url) = osrm_container(&dir, &file).expect("start OSRM container");
    let client = client(&base_url);
    wait_until_ready(&client);

    let mut stops = stops();
    let depot = stops.remove(0);
    let count = stops.len();
    let request = SolveRequest::new(depot, stops, at(9, 0));

    let report = solve(&request, &client, &SolveOptions::default()).expect("feasible");
    assert_eq!(report.visits.len(), count + 2);

    drop(container);
}
