#![no_main]

use libfuzzer_sys::fuzz_target;
use png_glitch::{test_utils::PngBuilder, GlitchSession, PngContainer};

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    // First bytes steer the run, the rest becomes pixel data
    let seed = u64::from_le_bytes([data[0], data[1], data[2], data[3], 0, 0, 0, 0]);
    let amount = data[4] as usize * 4;
    let mean = data[5] as f64;
    let deviation = data[6] as f64 / 4.0;
    let idat_size = data[7] as usize + 1;
    let pixels = data[8..].to_vec();

    let width = (pixels.len() / 3).clamp(1, 64) as u32;
    let bytes = PngBuilder::new(width, 4)
        .idat_size(idat_size)
        .pixels(move |x, y| {
            let i = (x as usize + y as usize * 7) * 3;
            let at = |k: usize| pixels.get(k).copied().unwrap_or(0);
            [at(i), at(i + 1), at(i + 2)]
        })
        .build();

    let png = PngContainer::from_bytes(&bytes).expect("builder output must parse");
    let raw_len = png.decompress().expect("builder output must inflate").len();
    let mut session = GlitchSession::seeded(png, seed).expect("builder output has IDAT");

    for copy in session.glitch_file(amount, mean, deviation, 2).expect("valid options") {
        // Glitching must never break the container
        let copy = copy.expect("random glitches stay in bounds");
        let reparsed = PngContainer::from_bytes(&copy.to_bytes()).expect("output must parse");
        assert_eq!(reparsed.corrupt_chunks().count(), 0);
        assert_eq!(reparsed.decompress().expect("output must inflate").len(), raw_len);
    }
});
