use gestured_core::load_trace;
use gestured_core::sim::Simulator;
use std::path::Path;
use tracing::info;

use super::load_config;

/// Replay `path` and print each trigger, then the final status, as JSON lines.
pub fn run(path: &Path, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let events = load_trace(path)?;
    info!(events = events.len(), path = %path.display(), "replaying trace");

    let sim = Simulator::new(&config);
    for event in &events {
        for trigger in sim.apply(event) {
            println!("{}", serde_json::to_string(&trigger)?);
        }
    }
    println!("{}", serde_json::to_string(&sim.status())?);
    Ok(())
}
