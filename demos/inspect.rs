//! Example: List the chunks of a PNG file
//!
//! Prints every chunk with its offset, property bits and CRC status, then
//! the size of the inflated image data.
//!
//! Run: `cargo run --example inspect -- <file.png>`

use png_glitch::PngContainer;
use std::env;

fn main() -> png_glitch::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <image.png>", args[0]);
        std::process::exit(1);
    }

    let filename = &args[1];
    println!("Parsing: {}", filename);
    let png = PngContainer::load(filename)?;

    println!("\nChunks ({}):", png.chunks().len());
    for chunk in png.chunks() {
        let kind = chunk.chunk_type();
        println!(
            "  @{:<8} {}  [{}{}]  {}",
            chunk.offset(),
            chunk,
            if kind.is_critical() { "critical" } else { "ancillary" },
            if kind.is_safe_to_copy() { ", safe-to-copy" } else { "" },
            if chunk.check_data() { "✓" } else { "✗ CRC mismatch" }
        );
    }

    match png.decompress() {
        Ok(raw) => println!("\n✓ Image data inflates to {} bytes", raw.len()),
        Err(e) => println!("\n✗ Image data unreadable: {}", e),
    }

    Ok(())
}
