// Basic device discovery and connection example
//
// This example shows how to discover Perytech DSOs, bring one up and read its status registers.

use peryscope_rs::{DeviceSession, PeryConnector, Reg, SessionConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (optional)
    env_logger::init();

    println!("PeryScope Device Discovery Example");
    println!("==================================\n");

    // Step 1: List all attached devices
    println!("1. Discovering Perytech devices...");
    let devices = PeryConnector::available_devices()?;

    if devices.is_empty() {
        println!("No Perytech DSO found. Please connect a device and try again.");
        return Ok(());
    }

    println!("Found {} device(s):", devices.len());
    for (i, device) in devices.iter().enumerate() {
        println!("  {}. {}", i + 1, device);
    }
    println!();

    // Step 2: Open the first device and bring it up (skipped if already linked)
    println!("2. Connecting to first available device...");
    let (session, report) = DeviceSession::connect(SessionConfig::default(), false)?;
    if report.skipped {
        println!("Device was already initialized, bring-up skipped");
    } else {
        println!(
            "Bring-up finished with {} verification mismatch(es)",
            report.mismatches.len()
        );
    }

    // Step 3: Talk to the device
    println!("\n3. Device information:");
    let hello = session.get_register(Reg::Hello)?;
    println!("  HELLO register:  0x{hello:04x}");
    println!("  Status snapshot: {}", session.status_snapshot()?);
    println!("  Session state:   {}", session.state());

    session.close();
    println!("\n4. Connection test completed successfully!");

    Ok(())
}
