//! `termgate capabilities`

use termgate_capabilities::{Capability, CapabilityRegistry, Direction, Domain};

/// One line per capability: name, domain, direction
pub fn render(registry: &CapabilityRegistry, domain: Option<Domain>) -> Vec<String> {
    registry
        .iter()
        .filter(|capability| domain.map_or(true, |d| capability.domain() == d))
        .map(line)
        .collect()
}

fn line(capability: Capability) -> String {
    let direction = match capability.direction() {
        Direction::ToBackend => "front -> back",
        Direction::ToFrontend => "back -> front",
        Direction::Bidirectional => "both",
    };
    format!("{:<20} {:<8} {}", capability.as_str(), capability.domain(), direction)
}

pub fn run(domain: Option<Domain>) -> anyhow::Result<()> {
    for line in render(CapabilityRegistry::standard(), domain) {
        println!("{line}");
    }
    Ok(())
}
