//! Example: Write glitched copies of a PNG file
//!
//! Writes `<name>.corrupt.png` for a single copy, or `<name>.<i>.png` for
//! several. Set `RUST_LOG=png_glitch=debug` to watch the session.
//!
//! Run: `cargo run --example glitch -- <file.png> [copies] [amount] [seed]`

use png_glitch::{GlitchOptions, GlitchSession, PngContainer};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> png_glitch::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image.png> [copies] [amount] [seed]", args[0]);
        std::process::exit(1);
    }

    let infile = &args[1];
    let mut options = GlitchOptions::new();
    if let Some(copies) = args.get(2).and_then(|s| s.parse().ok()) {
        options = options.set_copies(copies);
    }
    if let Some(amount) = args.get(3).and_then(|s| s.parse().ok()) {
        options = options.set_amount(amount);
    }
    if let Some(seed) = args.get(4).and_then(|s| s.parse().ok()) {
        options = options.set_seed(seed);
    }
    options.validate()?;

    let stem = Path::new(infile).with_extension("");
    let png = PngContainer::load(infile)?;
    let mut session = GlitchSession::from_options(png, &options)?;

    for (i, copy) in session.glitch_with_options(&options)?.enumerate() {
        let outfile = if options.copies > 1 {
            format!("{}.{}.png", stem.display(), i)
        } else {
            format!("{}.corrupt.png", stem.display())
        };
        copy?.write(&outfile)?;
        println!("✓ Wrote {}", outfile);
    }

    Ok(())
}
