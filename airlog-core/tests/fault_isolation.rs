//! A permanently broken sensor never stops the others or the aggregator

mod common;

use std::thread;
use std::time::Duration;

use airlog_core::hardware::{
    FaultyBus, Response, Script, SimulatedFlowMeter, SimulatedMs4525, SimulatedSht30,
};
use airlog_core::PipelineBuilder;

use common::{column, fast_config, read_log, wait_until, FAST_TICK};

#[test]
fn faulty_bus_does_not_halt_other_sensors() {
    let dir = tempfile::tempdir().unwrap();
    let broken = FaultyBus::new();
    let broken_calls = broken.calls();

    let pipeline = PipelineBuilder::new(fast_config(dir.path()))
        .with_ms4525(broken)
        .with_sht30_primary(SimulatedSht30::new(0x44, Script::constant((0x6666, 0x8000))))
        .with_fl808(SimulatedFlowMeter::new(Script::constant(10)).with_realtime())
        .build()
        .unwrap();
    let path = pipeline.logger().path().to_path_buf();

    let running = pipeline.start().unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        read_log(&path).1.len() >= 5 && broken_calls.get() >= 3
    }));
    assert!(!running.is_finished());
    let report = running.stop().unwrap();

    let broken_task = report.sensors.iter().find(|s| s.sensor.starts_with("ms4525")).unwrap();
    assert_eq!(broken_task.samples, 0);
    assert!(broken_task.faults >= 3);

    let (_, rows) = read_log(&path);
    assert!(rows.iter().all(|row| row[column("diff_pressure_pa")] == "NA"));
    assert!(rows.iter().any(|row| row[column("sht30_primary_rh_pct")] == "50.00"));
    assert!(rows.iter().any(|row| row[column("flow_lpm")] != "NA"));
}

#[test]
fn intermittent_faults_recover() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script::idle(Response::Value((0, 8192, 1024)))
        .then(Response::Fault)
        .then(Response::Fault)
        .then(Response::Value((3, 0, 0)));
    let sensor = SimulatedMs4525::new(0x28, script);
    let calls = sensor.calls();

    let pipeline = PipelineBuilder::new(fast_config(dir.path()))
        .with_ms4525(sensor)
        .build()
        .unwrap();
    let path = pipeline.logger().path().to_path_buf();

    let running = pipeline.start().unwrap();
    assert!(wait_until(Duration::from_secs(5), || calls.get() >= 6));
    thread::sleep(FAST_TICK * 3);
    let report = running.stop().unwrap();

    let task = &report.sensors[0];
    assert_eq!(task.faults, 3);
    assert!(task.samples >= 1);

    let (_, rows) = read_log(&path);
    // Bridge count 8192 sits half a count above zero pressure
    assert!(rows.iter().any(|row| row[column("diff_pressure_pa")] == "0.53"));
}
