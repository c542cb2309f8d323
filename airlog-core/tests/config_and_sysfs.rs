//! Loading configuration from disk and reading probes through sysfs

mod common;

use std::fs;
use std::path::Path;
use std::time::Duration;

use airlog_core::config::PipelineConfig;
use airlog_core::hardware::{OneWireBus, W1SysfsBus};
use airlog_core::{CapacityPolicy, ConfigError, PipelineBuilder};

use common::{column, fast_config, read_log};

const SCRATCHPAD_23C: &str =
    "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";
const SCRATCHPAD_BAD_CRC: &str =
    "72 01 4b 46 7f ff 0e 10 57 : crc=12 NO\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";

fn add_probe(devices: &Path, id: &str, scratchpad: &str) {
    let probe = devices.join(id);
    fs::create_dir_all(&probe).unwrap();
    fs::write(probe.join("w1_slave"), scratchpad).unwrap();
}

#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("airlog.json");
    fs::write(
        &path,
        r#"{
            "aggregator": { "tick_interval_ms": 250, "default_humidity_pct": 35.0 },
            "logger": { "output_dir": "/tmp/airlog-runs", "sync_each_row": true },
            "sht30_secondary": { "enabled": true, "i2c_bus": 3 },
            "channel": { "policy": { "drop_oldest": 4 } }
        }"#,
    )
    .unwrap();

    let config = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(config.aggregator.tick_interval(), Duration::from_millis(250));
    assert_eq!(config.aggregator.default_humidity_pct, 35.0);
    assert!(config.logger.sync_each_row);
    assert!(config.sht30_secondary.enabled);
    assert_eq!(config.sht30_secondary.i2c_bus, 3);
    assert_eq!(config.channel.policy, CapacityPolicy::DropOldest(4));
    // Untouched sections keep their defaults
    assert_eq!(config.ms4525.address, 0x28);

    let reloaded = PipelineConfig::from_json_str(&config.to_json_string().unwrap()).unwrap();
    assert_eq!(reloaded, config);
}

#[test]
fn config_file_errors_are_distinguished() {
    let dir = tempfile::tempdir().unwrap();

    let missing = PipelineConfig::from_json_file(dir.path().join("absent.json"));
    assert!(matches!(missing, Err(ConfigError::Read(_))));

    let garbled = dir.path().join("garbled.json");
    fs::write(&garbled, "{ not json").unwrap();
    assert!(matches!(PipelineConfig::from_json_file(&garbled), Err(ConfigError::Parse(_))));

    let invalid = dir.path().join("invalid.json");
    fs::write(&invalid, r#"{ "logger": { "placeholder": "" } }"#).unwrap();
    assert!(matches!(
        PipelineConfig::from_json_file(&invalid),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
fn sysfs_bus_lists_probes_in_id_order() {
    let dir = tempfile::tempdir().unwrap();
    add_probe(dir.path(), "28-0000000000b2", SCRATCHPAD_23C);
    add_probe(dir.path(), "28-0000000000a1", SCRATCHPAD_23C);
    // Bus master entry and other families are ignored
    fs::create_dir_all(dir.path().join("w1_bus_master1")).unwrap();
    fs::create_dir_all(dir.path().join("10-000000000001")).unwrap();

    let mut bus = W1SysfsBus::new(dir.path());
    let probes = bus.read_all().unwrap();
    let ids: Vec<&str> = probes.iter().map(|p| p.device_id.as_str()).collect();
    assert_eq!(ids, ["28-0000000000a1", "28-0000000000b2"]);
    assert!(probes.iter().all(|p| p.raw == 0x0172));
}

#[test]
fn sysfs_bus_without_master_reports_no_probes() {
    let dir = tempfile::tempdir().unwrap();
    let mut bus = W1SysfsBus::new(dir.path().join("not-loaded"));
    assert!(bus.read_all().unwrap().is_empty());
}

#[test]
fn sysfs_crc_failure_fails_the_sweep() {
    let dir = tempfile::tempdir().unwrap();
    add_probe(dir.path(), "28-0000000000a1", SCRATCHPAD_23C);
    add_probe(dir.path(), "28-0000000000b2", SCRATCHPAD_BAD_CRC);

    let mut bus = W1SysfsBus::new(dir.path());
    assert!(bus.read_all().is_err());
}

#[test]
fn sysfs_probes_reach_the_log() {
    let devices = tempfile::tempdir().unwrap();
    add_probe(devices.path(), "28-0000000000a1", SCRATCHPAD_23C);

    let out = tempfile::tempdir().unwrap();
    let mut config = fast_config(out.path());
    config.ds18b20.devices_dir = devices.path().to_path_buf();

    let pipeline = PipelineBuilder::new(config).with_w1_sysfs().build().unwrap();
    let path = pipeline.logger().path().to_path_buf();
    let report = pipeline.run_for(Duration::from_millis(150)).unwrap();
    assert!(report.sensors[0].samples >= 1);

    let (_, rows) = read_log(&path);
    assert!(rows.iter().any(|row| row[column("ds18b20_temps_c")] == "23.12"
        || row[column("ds18b20_temps_c")] == "23.13"));
}

#[test]
fn flow_section_carries_only_counting_settings() {
    let config = PipelineConfig::from_json_str(
        r#"{ "fl808": { "window_s": 4.0, "counts_per_litre": 450.0 } }"#,
    )
    .unwrap();
    assert!(config.fl808.enabled);
    assert_eq!(config.fl808.window_s, 4.0);
    assert_eq!(config.fl808.counts_per_litre, 450.0);

    let json: serde_json::Value = serde_json::from_str(&config.to_json_string().unwrap()).unwrap();
    let mut keys: Vec<&str> = json["fl808"].as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["counts_per_litre", "enabled", "window_s"]);
}
