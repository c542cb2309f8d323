//! Simulated Logger Example
//!
//! Runs the full acquisition pipeline against scripted hardware, so it
//! works on any machine: no one-wire bus, I2C adapter or GPIO chip needed.
//!
//! ## What You'll Learn
//!
//! - Wiring sensors into a pipeline, one bus handle per sensor
//! - How a faulty sensor is isolated from the others
//! - Reading the CSV the logger produces
//!
//! ## Simulated Rig
//!
//! | Sensor           | Behaviour                                  |
//! |------------------|--------------------------------------------|
//! | DS18B20 x2       | steady probes, one sweep fails now and then |
//! | SHT30 primary    | ~25 °C, ~50 %RH                            |
//! | SHT30 secondary  | bus always fails (unplugged)               |
//! | MS4525DO         | ~20 m/s airflow, status stale every 3rd read |
//! | FL808            | ~10 L/min                                  |
//!
//! ## Running the Example
//!
//! ```bash
//! RUST_LOG=info cargo run --example simulated_logger -- 5
//! ```
//!
//! The optional argument is the run time in seconds (default 3).

use std::time::Duration;

use airlog_core::config::{AggregatorConfig, LoggerConfig, PipelineConfig};
use airlog_core::hardware::{
    FaultyBus, Response, Script, SimulatedFlowMeter, SimulatedMs4525, SimulatedOneWire,
    SimulatedSht30,
};
use airlog_core::sample::OneWireRaw;
use airlog_core::{PipelineBuilder, PipelineError};

fn probes() -> Script<Vec<OneWireRaw>> {
    let sweep = vec![
        OneWireRaw { device_id: "28-0316a2791aff".into(), raw: 350 },
        OneWireRaw { device_id: "28-0416b1c2d3ee".into(), raw: 362 },
    ];
    let mut script = Script::constant(sweep.clone());
    for i in 0..20 {
        script = if i % 7 == 6 {
            script.then(Response::Fault)
        } else {
            script.then(Response::Value(sweep.clone()))
        };
    }
    script
}

fn airflow() -> Script<(u8, u16, u16)> {
    // ~245 Pa over zero: about 20 m/s at 25 °C
    let (bridge, temp) = (8424, 771);
    let mut script = Script::constant((0, bridge, temp));
    for i in 0..30 {
        let status = if i % 3 == 2 { 2 } else { 0 };
        script = script.then(Response::Value((status, bridge + (i % 5), temp)));
    }
    script
}

fn main() -> Result<(), PipelineError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let seconds: u64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(3);

    println!("airlog Simulated Logger Example");
    println!("===============================\n");

    let output_dir = std::env::temp_dir().join("airlog-demo");
    let mut config = PipelineConfig::default()
        .with_aggregator(AggregatorConfig::default().with_tick_interval(Duration::from_millis(250)))
        .with_logger(LoggerConfig::default().with_output_dir(&output_dir));
    config.sht30_secondary.enabled = true;
    config.fl808.window_s = 0.5;

    let pipeline = PipelineBuilder::new(config)
        .with_ds18b20(SimulatedOneWire::new(probes()).with_latency(Duration::from_millis(50)))
        .with_sht30_primary(SimulatedSht30::new(0x44, Script::constant((0x6666, 0x8000))))
        .with_sht30_secondary(FaultyBus::new())
        .with_ms4525(SimulatedMs4525::new(0x28, airflow()))
        .with_fl808(SimulatedFlowMeter::new(Script::constant(28)).with_realtime())
        .build()?;

    let log_path = pipeline.logger().path().to_path_buf();
    println!("Logging for {seconds} s to {}\n", log_path.display());

    let report = pipeline.run_for(Duration::from_secs(seconds))?;

    println!("Sensor tasks:");
    for sensor in &report.sensors {
        println!(
            "  {:<24} {:>5} reads  {:>5} samples  {:>4} absent  {:>4} faults",
            sensor.sensor, sensor.reads, sensor.samples, sensor.absent, sensor.faults
        );
    }
    println!(
        "\nAggregator: {} ticks, {} samples converted\n",
        report.aggregator.ticks, report.aggregator.samples_converted
    );

    println!("Last rows:");
    match std::fs::read_to_string(&log_path) {
        Ok(contents) => {
            let lines: Vec<&str> = contents.lines().collect();
            if let Some((header, rows)) = lines.split_first() {
                println!("  {header}");
                for line in &rows[rows.len().saturating_sub(3)..] {
                    println!("  {line}");
                }
            }
        }
        Err(error) => println!("  could not read log: {error}"),
    }

    Ok(())
}
