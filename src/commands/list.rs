//! List commands implementation

use romclient_core::BankSwitch;
use romclient_serial::available_ports;

/// List the serial ports present on this machine
pub fn list_ports() -> Result<(), Box<dyn std::error::Error>> {
    let ports = available_ports()?;

    println!("Available serial ports:");
    println!();
    for port in &ports {
        println!("  {}", port);
    }
    if ports.is_empty() {
        println!("  (none)");
    }

    Ok(())
}

/// List all bankswitching methods
pub fn list_bankswitch() {
    println!("Bankswitching methods:");
    println!();
    println!("{:<6} {:<50} {:>10}", "Name", "Description", "Supported");
    println!("{}", "-".repeat(68));

    for bs in BankSwitch::ALL {
        println!(
            "{:<6} {:<50} {:>10}",
            bs.name(),
            bs.description(),
            if bs.is_supported() { "yes" } else { "no" }
        );
    }
}
