//! Full path: configure → scrape → exposition text.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use perfex_core::config::{CollectorSettings, register_flags};
use perfex_core::provider::{
    CounterInstance, CounterObject, FileProvider, MockProvider, SnapshotData,
};
use perfex_core::{Exporter, OrchestratorConfig, Registry, ScrapeStatus};

fn snapshot_file(data: &SnapshotData) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(data).unwrap().as_bytes())
        .unwrap();
    file
}

fn host() -> SnapshotData {
    SnapshotData::from([
        (
            "Network Interface".to_string(),
            CounterObject::new("Network Interface")
                .with_instance(
                    CounterInstance::new("Ethernet 1").with("Bytes Received/sec", 1000.0),
                )
                .with_instance(CounterInstance::new("Loopback Pseudo-Interface 1")),
        ),
        (
            "MSMQ Queue".to_string(),
            CounterObject::new("MSMQ Queue")
                .with_instance(
                    CounterInstance::new("Computer Queues").with("Messages in Queue", 9.0),
                )
                .with_instance(
                    CounterInstance::new("FS01\\private$\\Orders").with("Messages in Queue", 4.0),
                ),
        ),
    ])
}

#[tokio::test]
async fn test_file_snapshot_to_exposition() {
    let file = snapshot_file(&host());
    let registry = Registry::with_builtin().unwrap();
    let exporter = Exporter::from_settings(
        &registry,
        "[defaults]",
        &HashMap::new(),
        Arc::new(FileProvider::new(file.path())),
        OrchestratorConfig::default(),
    )
    .unwrap();

    let outcome = exporter.scrape(None).await.unwrap();
    assert_eq!(outcome.status, ScrapeStatus::Success);

    let text = Exporter::render(&outcome).unwrap();
    assert!(text.contains("# TYPE windows_net_bytes_received_total counter"));
    assert!(text.contains("windows_net_bytes_received_total{nic=\"Ethernet_1\"} 1000"));
    assert!(text.contains("nic=\"Loopback_Pseudo_Interface_1\""));
    assert!(text.contains("windows_msmq_messages_in_queue{name=\"fs01\\\\private$\\\\orders\"} 4"));
    assert!(!text.contains("computer queues"));
    assert!(text.contains("windows_exporter_collector_success{collector=\"msmq\"} 1"));
    assert!(text.contains("windows_exporter_collector_success{collector=\"net\"} 1"));
    assert!(text.contains("# TYPE windows_exporter_collector_duration_seconds gauge"));
}

#[tokio::test]
async fn test_missing_object_is_partial_failure() {
    let file = snapshot_file(&host());
    let registry = Registry::with_builtin().unwrap();
    let exporter = Exporter::from_settings(
        &registry,
        "net,dfsr",
        &HashMap::new(),
        Arc::new(FileProvider::new(file.path())),
        OrchestratorConfig::default(),
    )
    .unwrap();

    let outcome = exporter.scrape(None).await.unwrap();
    assert_eq!(outcome.status, ScrapeStatus::PartialFailure);

    let text = Exporter::render(&outcome).unwrap();
    assert!(text.contains("windows_exporter_collector_success{collector=\"dfsr\"} 0"));
    assert!(text.contains("windows_exporter_collector_success{collector=\"net\"} 1"));
    assert!(text.contains("windows_net_bytes_received_total"));
}

#[tokio::test]
async fn test_unreadable_snapshot_fails_cycle() {
    let registry = Registry::with_builtin().unwrap();
    let exporter = Exporter::from_settings(
        &registry,
        "net",
        &HashMap::new(),
        Arc::new(FileProvider::new("/nonexistent/perfex/snapshot.json")),
        OrchestratorConfig::default(),
    )
    .unwrap();

    assert!(exporter.scrape(None).await.is_err());
}

#[tokio::test]
async fn test_flag_binding_filters_nics() {
    let registry = Registry::with_builtin().unwrap();
    let cmd = register_flags(clap::Command::new("perfexd"), registry.options());
    let matches = cmd
        .try_get_matches_from(["perfexd", "--collector.net.nic-blacklist", "Loopback.*"])
        .unwrap();

    let exporter = Exporter::configure(
        &registry,
        "net",
        Arc::new(MockProvider::new().with_object(host()["Network Interface"].clone())),
        OrchestratorConfig::default(),
        |options| CollectorSettings::from_matches(options, &matches),
    )
    .unwrap();

    let outcome = exporter.scrape(None).await.unwrap();
    let nics: Vec<&str> = outcome
        .samples
        .iter()
        .filter(|s| s.name == "windows_net_bytes_total")
        .filter_map(|s| s.label_value("nic"))
        .collect();
    assert_eq!(nics, vec!["Ethernet_1"]);
}

#[test]
fn test_map_and_flags_bind_identically() {
    let registry = Registry::with_builtin().unwrap();
    let options = registry.descriptor("net").unwrap().options();

    let map = HashMap::from([(
        "collector.net.nic-whitelist".to_string(),
        "Ethernet.*".to_string(),
    )]);
    let from_map = CollectorSettings::from_map(options, &map);

    let matches = register_flags(clap::Command::new("perfexd"), options)
        .try_get_matches_from(["perfexd", "--collector.net.nic-whitelist", "Ethernet.*"])
        .unwrap();
    let from_flags = CollectorSettings::from_matches(options, &matches);

    assert_eq!(from_map, from_flags);
}
