//! Full-flow tests over in-memory and filesystem stores.

use std::io::{Read, Write};

use dayclust_cluster::{ClusterError, ClusteringStrategy, DistanceMatrix, Registry};
use dayclust_objstore::{FsStore, MemoryStore, ObjectStore};
use dayclust_pipeline::{CapScope, Config, Outcome, Pipeline, PipelineError};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;

const DAY: &str = "2024-01-01";

fn gzip(text: &str) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(text.as_bytes()).unwrap();
    enc.finish().unwrap()
}

fn triples(rows: &[(i64, i64, f64)]) -> String {
    rows.iter().map(|(a, b, d)| format!("{a},{b},{d}\n")).collect()
}

fn put_partition(store: &dyn ObjectStore, cfg: &Config, name: &str, text: &str) {
    let key = format!("{}{name}", cfg.input_prefix(DAY));
    store.put(&key, &gzip(text)).unwrap();
}

fn read_output(store: &dyn ObjectStore, cfg: &Config) -> String {
    let data = store.get(&cfg.output_key(DAY)).unwrap();
    let mut s = String::new();
    GzDecoder::new(&data[..]).read_to_string(&mut s).unwrap();
    s
}

fn dbscan_config(params: &str) -> Config {
    let mut cfg = Config::default();
    cfg.set("hyper-params", params).unwrap();
    cfg
}

fn run(store: &MemoryStore, cfg: &Config) -> Outcome {
    let p = Pipeline::with_default_registry(cfg.clone(), Box::new(store.clone())).unwrap();
    p.handle(&json!({ "day": DAY })).unwrap()
}

#[test]
fn one_dense_cluster_and_noise() {
    let store = MemoryStore::new();
    let cfg = dbscan_config(r#"{"eps": 0.5, "min_samples": 3}"#);
    put_partition(&store, &cfg, "data.csv.gz", &triples(&[(1, 2, 0.5), (1, 3, 0.5), (4, 5, 0.9)]));

    let outcome = run(&store, &cfg);
    assert_eq!(
        outcome,
        Outcome {
            day: Some(DAY.to_string()),
            success: true,
            clusters: Some(1),
            clustered_keys: Some(3),
        }
    );
    assert_eq!(read_output(&store, &cfg), "cluster,key\n0,1\n0,2\n0,3\n");
}

#[test]
fn no_input_writes_header_only() {
    let store = MemoryStore::new();
    let cfg = Config::default();

    let outcome = run(&store, &cfg);
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({"day": DAY, "success": true, "clusters": 0, "clustered-keys": 0})
    );
    assert_eq!(read_output(&store, &cfg), "cluster,key\n");
}

#[test]
fn empty_partition_skips_clustering() {
    // An unregistered algorithm would fail if it were ever built.
    let store = MemoryStore::new();
    let mut cfg = Config::default();
    cfg.set("algorithm", "NOPE").unwrap();
    put_partition(&store, &cfg, "empty.csv.gz", "");

    let outcome = run(&store, &cfg);
    assert_eq!(outcome.clusters, Some(0));
    assert_eq!(outcome.clustered_keys, Some(0));
}

#[test]
fn cap_stops_inside_first_partition() {
    let store = MemoryStore::new();
    let mut cfg = dbscan_config(r#"{"eps": 0.5, "min_samples": 2}"#);
    cfg.max_records = 2;
    put_partition(
        &store,
        &cfg,
        "part-0.csv.gz",
        &triples(&[(1, 2, 0.1), (3, 4, 0.1), (5, 6, 0.1), (7, 8, 0.1)]),
    );
    // Never read: a malformed line here would abort the run.
    put_partition(&store, &cfg, "part-1.csv.gz", "not,a,distance\n");

    let outcome = run(&store, &cfg);
    assert_eq!(outcome.clusters, Some(2));
    assert_eq!(outcome.clustered_keys, Some(4));
    assert_eq!(read_output(&store, &cfg), "cluster,key\n0,1\n0,2\n1,3\n1,4\n");
}

#[test]
fn total_cap_spans_partitions() {
    let store = MemoryStore::new();
    let mut cfg = dbscan_config(r#"{"eps": 0.5, "min_samples": 2}"#);
    cfg.max_records = 2;
    cfg.record_cap_scope = CapScope::Total;
    put_partition(&store, &cfg, "part-0.csv.gz", &triples(&[(1, 2, 0.1)]));
    put_partition(&store, &cfg, "part-1.csv.gz", &triples(&[(3, 4, 0.1), (5, 6, 0.1)]));

    let outcome = run(&store, &cfg);
    assert_eq!(outcome.clustered_keys, Some(4));
}

#[test]
fn rerun_replaces_output() {
    let store = MemoryStore::new();
    let cfg = dbscan_config(r#"{"eps": 0.4, "min_samples": 2}"#);
    store.put(&cfg.output_key(DAY), &gzip("cluster,key\n9,999\n")).unwrap();
    put_partition(&store, &cfg, "a.csv.gz", &triples(&[(1, 2, 0.3), (3, 4, 0.0)]));

    let first = run(&store, &cfg);
    let first_out = read_output(&store, &cfg);
    let second = run(&store, &cfg);
    let second_out = read_output(&store, &cfg);

    assert_eq!(first, second);
    assert_eq!(first_out, second_out);
    assert_eq!(first_out, "cluster,key\n0,1\n0,2\n1,3\n1,4\n");
    assert!(!first_out.contains("999"));
}

#[test]
fn fully_connected_keys_cluster_only_within_eps() {
    let rows: Vec<(i64, i64, f64)> = (0..5)
        .flat_map(|i| (0..5).map(move |j| (i, j, 0.5)))
        .collect();
    // (params, clusters, clustered keys). Every distance is 0.5.
    let cases = [
        (r#"{"eps": 0.4, "min_samples": 2}"#, 0, 0),
        (r#"{"eps": 0.5, "min_samples": 3}"#, 1, 5),
    ];
    for algorithm in ["DBSCAN", "OPTICS"] {
        for (params, clusters, clustered) in cases {
            let store = MemoryStore::new();
            let mut cfg = dbscan_config(params);
            cfg.set("algorithm", algorithm).unwrap();
            put_partition(&store, &cfg, "data.csv.gz", &triples(&rows));

            let outcome = run(&store, &cfg);
            assert!(outcome.success, "{algorithm} {params}");
            assert_eq!(outcome.clusters, Some(clusters), "{algorithm} {params}");
            assert_eq!(outcome.clustered_keys, Some(clustered), "{algorithm} {params}");
        }
    }
}

#[test]
fn string_keys() {
    let store = MemoryStore::new();
    let mut cfg = dbscan_config(r#"{"eps": 0.5, "min_samples": 2}"#);
    cfg.set("convert-key-to-int", "false").unwrap();
    // Plain-text partition: no .gz suffix.
    let key = format!("{}data.csv", cfg.input_prefix(DAY));
    store.put(&key, b"alice,bob,0.2\ncarol,dave,3.0\n").unwrap();

    let outcome = run(&store, &cfg);
    assert_eq!(outcome.clustered_keys, Some(2));
    assert_eq!(read_output(&store, &cfg), "cluster,key\n0,alice\n0,bob\n");
}

#[test]
fn storage_event_payload() {
    let store = MemoryStore::new();
    let cfg = dbscan_config(r#"{"eps": 0.5, "min_samples": 2}"#);
    put_partition(&store, &cfg, "data.csv.gz", &triples(&[(7, 8, 0.1)]));
    let key = format!("{}data.csv.gz", cfg.input_prefix(DAY)).replace('=', "%3D");

    let p = Pipeline::with_default_registry(cfg.clone(), Box::new(store.clone())).unwrap();
    let outcome = p
        .handle(&json!({"Records": [{"s3": {"object": {"key": key}}}]}))
        .unwrap();
    assert_eq!(outcome.day.as_deref(), Some(DAY));
    assert_eq!(outcome.clusters, Some(1));
}

#[test]
fn unregistered_algorithm_is_fatal() {
    let store = MemoryStore::new();
    let mut cfg = Config::default();
    cfg.set("algorithm", "KMeans").unwrap();
    put_partition(&store, &cfg, "data.csv.gz", &triples(&[(1, 2, 0.1)]));

    let p = Pipeline::with_default_registry(cfg.clone(), Box::new(store.clone())).unwrap();
    let err = p.run_day(DAY).unwrap_err();
    assert!(matches!(err, PipelineError::Cluster(ref m) if m.contains("KMeans")), "{err}");
}

#[test]
fn malformed_input_clears_old_output_and_fails() {
    let store = MemoryStore::new();
    let cfg = Config::default();
    store.put(&cfg.output_key(DAY), &gzip("cluster,key\n0,1\n")).unwrap();
    put_partition(&store, &cfg, "bad.csv.gz", "1,2,0.1\n1;2;0.1\n");

    let p = Pipeline::with_default_registry(cfg.clone(), Box::new(store.clone())).unwrap();
    let err = p.run_day(DAY).unwrap_err();
    assert!(matches!(err, PipelineError::MalformedRecord { line: 2, .. }), "{err}");
    assert!(store.head(&cfg.output_key(DAY)).unwrap_err().is_not_found());
}

struct Singletons;

impl ClusteringStrategy for Singletons {
    fn name(&self) -> &str {
        "SINGLETONS"
    }

    fn fit_predict(&self, matrix: &DistanceMatrix) -> Result<Vec<i32>, ClusterError> {
        if !matrix.is_symmetric() {
            return Err(ClusterError::InvalidMatrix("not symmetric".to_string()));
        }
        // Only (5,6) and (6,7) were recorded; the mirrors come from symmetrize.
        if matrix.get(1, 0) != Some(1.0) || matrix.get(2, 1) != Some(2.0) {
            return Err(ClusterError::InvalidMatrix(format!("unexpected cells: {matrix:?}")));
        }
        Ok((0..matrix.dim() as i32).collect())
    }
}

#[test]
fn custom_strategy_sees_symmetric_matrix() {
    let store = MemoryStore::new();
    let mut cfg = Config::default();
    cfg.set("algorithm", "SINGLETONS").unwrap();
    put_partition(&store, &cfg, "p.csv.gz", &triples(&[(5, 6, 1.0), (6, 7, 2.0)]));

    let mut reg = Registry::new();
    reg.register("SINGLETONS", |_| Ok(Box::new(Singletons)));
    let p = Pipeline::new(cfg.clone(), reg, Box::new(store.clone())).unwrap();

    let outcome = p.run_day(DAY).unwrap();
    assert_eq!(outcome.clusters, Some(3));
    assert_eq!(read_output(&store, &cfg), "cluster,key\n0,5\n1,6\n2,7\n");
}

#[test]
fn filesystem_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::open(dir.path()).unwrap();
    let cfg = dbscan_config(r#"{"eps": 0.5, "min_samples": 3}"#);
    put_partition(&store, &cfg, "data.csv.gz", &triples(&[(1, 2, 0.5), (1, 3, 0.5), (4, 5, 0.9)]));

    let p = Pipeline::with_default_registry(cfg.clone(), Box::new(store)).unwrap();
    let outcome = p.run_day(DAY).unwrap();
    assert_eq!(outcome.clustered_keys, Some(3));

    let reopened = FsStore::open(dir.path()).unwrap();
    assert_eq!(read_output(&reopened, &cfg), "cluster,key\n0,1\n0,2\n0,3\n");
}
