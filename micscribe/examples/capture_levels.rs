//! Microphone capture check
//!
//! Lists input devices, then captures three seconds from the default device
//! and draws a level meter from the coalesced blocks.
//!
//! Run: cargo run --example capture_levels

use micscribe_lib::audio::{list_input_devices, CaptureFormat, CpalInput, MicrophoneStream};
use std::io::Write;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    println!("=== Capture check ===\n");

    println!("Input devices:");
    for (i, device) in list_input_devices()?.iter().enumerate() {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("  {}: {}{}", i, device.name, marker);
    }
    println!();

    let format = CaptureFormat::default();
    let mut mic = MicrophoneStream::open(&CpalInput::new(None), format)?;
    let chunks = mic.chunks();

    println!("Capturing for 3 seconds...");
    let meter = std::thread::spawn(move || {
        let mut total = 0usize;
        let mut blocks = 0usize;
        for block in chunks {
            blocks += 1;
            total += block.len();

            let peak = block
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]).unsigned_abs())
                .max()
                .unwrap_or(0);
            let level = (peak as usize * 50) / i16::MAX as usize;
            print!("\rLevel: {:50} ({:5})", "█".repeat(level.min(50)), peak);
            let _ = std::io::stdout().flush();
        }
        (blocks, total)
    });

    std::thread::sleep(Duration::from_secs(3));
    mic.close();

    let (blocks, total) = meter.join().map_err(|_| "meter thread panicked")?;
    println!(
        "\n\nDone: {} bytes in {} blocks ({} chunks captured)",
        total,
        blocks,
        mic.captured_chunks()
    );

    Ok(())
}
