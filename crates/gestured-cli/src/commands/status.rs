use gestured_core::sim::Simulator;
use gestured_core::TraceEvent;
use std::path::Path;

use super::load_config;

pub fn run(config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let sim = Simulator::new(&config);
    sim.apply(&TraceEvent::ScreenOff);
    println!("{}", serde_json::to_string_pretty(&sim.status())?);
    Ok(())
}
