use std::error::Error;

use darwin_telemetry::config::TelemetryConfig;
use darwin_telemetry::logging;
use darwin_telemetry::pipeline::TelemetryPipeline;

const SNAPSHOTS: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init_tracing();

    let config = TelemetryConfig::load()?;
    let pipeline = TelemetryPipeline::from_config(&config)?;

    println!("Sensor Monitor");
    println!("==============");
    println!("Model: {} (macOS {})", pipeline.device().model_identifier, pipeline.device().os_version);
    match pipeline.matched_model() {
        Some(model) => println!("Catalog: {:?}, {} sensors", pipeline.catalog_origin(), model.sensors.len()),
        None => println!("Catalog: {:?}, publishing raw sensors", pipeline.catalog_origin()),
    }
    println!("Interval: {:?}", pipeline.interval());

    let mut snapshots = pipeline.subscribe();
    pipeline.start()?;

    for _ in 0..SNAPSHOTS {
        tokio::select! {
            changed = snapshots.changed() => changed?,
            _ = tokio::signal::ctrl_c() => break,
        }
        let Some(snapshot) = snapshots.borrow_and_update().clone() else {
            continue;
        };

        println!("\nSensors:");
        println!("--------");
        if snapshot.readings.is_empty() {
            println!("No sensors available");
        }
        for (key, value) in &snapshot.readings {
            println!("{:<28} {:>8.1}", pipeline.display_name(key), value);
        }

        if !snapshot.per_core_usage.is_empty() {
            println!("\nPer-Core Load:");
            println!("-------------");
            for (i, usage) in snapshot.per_core_usage.iter().enumerate() {
                println!("Core {}: {:.1}%", i, usage * 100.0);
            }
        }
    }

    pipeline.stop();
    Ok(())
}
