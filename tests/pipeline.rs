use std::io::Write;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{json, Value};
use tokio::runtime::Handle;

use pip_bridge::bridge::CompletionState;
use pip_bridge::codec::decode_response;
use pip_bridge::host::{serve_lines, DEFAULT_ENTRY_POINT};
use pip_bridge::{open_database, EntryPoint, Host, PipBridge, Placetype};

fn square(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[
            [min_lon, min_lat],
            [max_lon, min_lat],
            [max_lon, max_lat],
            [min_lon, max_lat],
            [min_lon, min_lat]
        ]]
    })
}

fn fixture() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {
                    "wof:id": 85633793,
                    "wof:name": "United States",
                    "wof:placetype": "country",
                    "wof:country": "US",
                    "mz:is_current": 1
                },
                "geometry": square(-125.0, 24.0, -66.0, 49.0)
            },
            {
                "type": "Feature",
                "properties": {
                    "wof:id": 85688637,
                    "wof:parent_id": 85633793,
                    "wof:name": "California",
                    "wof:placetype": "region",
                    "wof:country": "US",
                    "mz:is_current": 1
                },
                "geometry": square(-124.5, 32.5, -114.0, 42.0)
            },
            {
                "type": "Feature",
                "properties": {
                    "wof:id": 85922583,
                    "wof:parent_id": 102087579,
                    "wof:name": "San Francisco",
                    "wof:placetype": "locality",
                    "wof:country": "US",
                    "mz:is_current": 1,
                    "wof:hierarchy": [{"country_id": 85633793, "region_id": 85688637}]
                },
                "geometry": square(-122.52, 37.70, -122.35, 37.83)
            },
            {
                "type": "Feature",
                "properties": {
                    "wof:id": 85922583,
                    "wof:name": "San Francisco",
                    "wof:placetype": "locality",
                    "src:alt_label": "quattroshapes"
                },
                "geometry": square(-122.6, 37.6, -122.3, 37.9)
            },
            {
                "type": "Feature",
                "properties": {
                    "wof:id": 1108830809,
                    "wof:name": "Old Neighbourhood",
                    "wof:placetype": "neighbourhood",
                    "mz:is_current": 0
                },
                "geometry": square(-122.43, 37.77, -122.41, 37.78)
            },
            {
                "type": "Feature",
                "properties": {
                    "wof:id": 85632793,
                    "wof:name": "Norway",
                    "wof:placetype": "country",
                    "mz:is_current": 1
                },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[4.0, 57.0], [31.0, 57.0], [31.0, 71.0], [4.0, 71.0], [4.0, 57.0]]],
                        [[[10.0, 76.0], [33.0, 76.0], [33.0, 81.0], [10.0, 81.0], [10.0, 76.0]]]
                    ]
                }
            }
        ]
    })
}

struct Fixture {
    _dir: tempfile::TempDir,
    bridge: PipBridge,
}

async fn setup() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("places.geojson");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(fixture().to_string().as_bytes()).unwrap();

    let uri = format!("rtree://{}", path.display());
    let database = open_database(&uri).await.unwrap();

    Fixture {
        _dir: dir,
        bridge: PipBridge::new(database, Handle::current()),
    }
}

fn ids(payload: &str) -> Vec<i64> {
    decode_response(payload)
        .unwrap()
        .iter()
        .map(|place| place.id)
        .collect()
}

#[tokio::test]
async fn test_point_inside_polygon_resolves_with_place() {
    let fx = setup().await;

    let payload = fx
        .bridge
        .submit(r#"{"longitude":-122.4194,"latitude":37.7749}"#)
        .await
        .unwrap();

    let places = decode_response(&payload).unwrap();
    assert!(!places.is_empty());
    assert!(places.iter().any(|p| p.id == 85922583));

    // Coarsest first; alt geometry excluded by default
    assert_eq!(ids(&payload), vec![85633793, 85688637, 85922583, 1108830809]);
    assert!(places.iter().all(|p| !p.is_alt));
}

#[tokio::test]
async fn test_point_outside_every_polygon_resolves_empty() {
    let fx = setup().await;
    let result = fx.bridge.submit(r#"{"longitude":0,"latitude":0}"#).await;
    assert_eq!(result, Ok("[]".to_string()));
}

#[tokio::test]
async fn test_multipolygon_member() {
    let fx = setup().await;
    let payload = fx
        .bridge
        .submit(r#"{"longitude":15.6,"latitude":78.2}"#)
        .await
        .unwrap();
    assert_eq!(ids(&payload), vec![85632793]);
}

#[tokio::test]
async fn test_rejections() {
    let fx = setup().await;

    let decode = fx
        .bridge
        .submit(r#"{"longitude":"abc","latitude":10}"#)
        .await
        .unwrap_err();
    assert!(decode.starts_with("Failed to parse request, "));

    let positional = fx.bridge.submit("[-122.4194, 37.7749]").await.unwrap_err();
    assert!(positional.starts_with("Failed to parse request, "));

    let coord = fx
        .bridge
        .submit(r#"{"longitude":200,"latitude":10}"#)
        .await
        .unwrap_err();
    assert!(coord.contains("longitude 200"));

    let lat = fx
        .bridge
        .submit(r#"{"longitude":0,"latitude":-90.5}"#)
        .await
        .unwrap_err();
    assert!(lat.contains("latitude -90.5"));

    let contradictory = fx
        .bridge
        .submit(r#"{"longitude":0,"latitude":0,"is_alt":true,"geometries":"default"}"#)
        .await
        .unwrap_err();
    assert!(contradictory.contains("contradicts"));
}

#[tokio::test]
async fn test_boundary_coordinates_accepted() {
    let fx = setup().await;
    for (lon, lat) in [(180.0, 0.0), (-180.0, 0.0), (0.0, 90.0), (0.0, -90.0)] {
        let req = json!({"longitude": lon, "latitude": lat}).to_string();
        assert_eq!(fx.bridge.submit(req).await, Ok("[]".to_string()));
    }
}

#[tokio::test]
async fn test_filters_and_projection() {
    let fx = setup().await;

    let payload = fx
        .bridge
        .submit(
            r#"{"longitude":-122.4194,"latitude":37.7749,
                "placetypes":["locality","neighbourhood"],
                "is_current":[1],
                "properties":["wof:hierarchy"]}"#,
        )
        .await
        .unwrap();

    let places = decode_response(&payload).unwrap();
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].placetype, Placetype::Locality);
    assert_eq!(
        places[0].properties.get("wof:hierarchy"),
        Some(&json!([{"country_id": 85633793, "region_id": 85688637}]))
    );
}

#[tokio::test]
async fn test_alternate_geometries() {
    let fx = setup().await;

    let payload = fx
        .bridge
        .submit(r#"{"longitude":-122.55,"latitude":37.65,"is_alt":true}"#)
        .await
        .unwrap();
    let places = decode_response(&payload).unwrap();
    assert_eq!(places.len(), 1);
    assert!(places[0].is_alt);
    assert_eq!(places[0].alt_label.as_deref(), Some("quattroshapes"));

    let labelled = fx
        .bridge
        .submit(
            r#"{"longitude":-122.55,"latitude":37.65,"geometries":"all",
                "alternate_geometries":["naturalearth"]}"#,
        )
        .await
        .unwrap();
    assert_eq!(ids(&labelled), vec![85633793, 85688637]);
}

#[tokio::test]
async fn test_identical_requests_encode_identically() {
    let fx = setup().await;
    let req = r#"{"longitude":-122.4194,"latitude":37.7749,"properties":["wof:*"]}"#;

    let first = fx.bridge.submit(req).await.unwrap();
    let second = fx.bridge.submit(req).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_are_independent() {
    let fx = setup().await;

    let cases: Vec<(String, Result<Vec<i64>, &str>)> = vec![
        (
            r#"{"longitude":-122.4194,"latitude":37.7749,"placetypes":["locality"]}"#.into(),
            Ok(vec![85922583]),
        ),
        (
            r#"{"longitude":-122.4194,"latitude":37.7749,"placetypes":["country"]}"#.into(),
            Ok(vec![85633793]),
        ),
        (r#"{"longitude":-118.24,"latitude":34.05}"#.into(), Ok(vec![85633793, 85688637])),
        (r#"{"longitude":10.75,"latitude":59.91}"#.into(), Ok(vec![85632793])),
        (r#"{"longitude":0,"latitude":0}"#.into(), Ok(vec![])),
        (r#"{"longitude":181,"latitude":0}"#.into(), Err("longitude 181")),
        (r#"{"longitude":true,"latitude":0}"#.into(), Err("Failed to parse request")),
    ];

    let mut handles = Vec::new();
    for round in 0..8 {
        for (i, (req, _)) in cases.iter().enumerate() {
            handles.push((i, round, fx.bridge.submit(req.clone())));
        }
    }

    // Every handle was returned before any await
    assert_eq!(handles.len(), cases.len() * 8);

    let indices: Vec<usize> = handles.iter().map(|(i, _, _)| *i).collect();
    let outcomes = join_all(handles.into_iter().map(|(_, _, handle)| handle)).await;

    for (i, outcome) in indices.into_iter().zip(outcomes) {
        match (&cases[i].1, outcome) {
            (Ok(expected), Ok(payload)) => assert_eq!(&ids(&payload), expected),
            (Err(fragment), Err(message)) => assert!(message.contains(fragment), "{message}"),
            (expected, actual) => panic!("case {i}: expected {expected:?}, got {actual:?}"),
        }
    }
}

#[tokio::test]
async fn test_handle_settles_exactly_once() {
    let fx = setup().await;
    let mut handle = fx.bridge.submit(r#"{"longitude":-122.4194,"latitude":37.7749}"#);

    let mut settled = None;
    for _ in 0..200 {
        match handle.state() {
            CompletionState::Pending => tokio::task::yield_now().await,
            CompletionState::Resolved(payload) => {
                settled = Some(payload.to_string());
                break;
            }
            CompletionState::Rejected(message) => panic!("rejected: {message}"),
        }
    }

    let payload = settled.expect("handle never settled");
    assert_eq!(handle.state(), CompletionState::Resolved(&payload));
    assert_eq!(handle.await, Ok(payload));
}

#[tokio::test]
async fn test_host_lines_end_to_end() {
    let fx = setup().await;
    let mut host = Host::new();
    host.register(DEFAULT_ENTRY_POINT, EntryPoint::new(Arc::new(fx.bridge.clone())))
        .unwrap();

    let input = concat!(
        "{\"longitude\":-122.4194,\"latitude\":37.7749}\n",
        "{\"longitude\":0,\"latitude\":0}\n",
    );
    let mut output = Vec::new();
    let entry = host.entry_point(DEFAULT_ENTRY_POINT).unwrap();
    let served = serve_lines(entry, input.as_bytes(), &mut output).await.unwrap();
    assert_eq!(served, 2);

    let text = String::from_utf8(output).unwrap();
    let mut replies: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    replies.sort_by_key(|r| r["seq"].as_u64());

    assert_eq!(replies[0]["status"], "resolved");
    assert_eq!(
        ids(replies[0]["body"].as_str().unwrap()),
        vec![85633793, 85688637, 85922583, 1108830809]
    );
    assert_eq!(replies[1]["body"], "[]");
}
