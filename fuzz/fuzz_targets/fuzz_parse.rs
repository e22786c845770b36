#![no_main]

use libfuzzer_sys::fuzz_target;
use png_glitch::PngContainer;

fuzz_target!(|data: &[u8]| {
    // Parsing arbitrary input should NEVER panic, only return errors
    if let Ok(png) = PngContainer::from_bytes(data) {
        // Whatever parsed must serialize and parse again to the same chunks
        let bytes = png.to_bytes();
        let reparsed = PngContainer::from_bytes(&bytes).expect("re-encoded PNG must parse");
        assert_eq!(reparsed.chunks().len(), png.chunks().len());

        let _ = png.corrupt_chunks().count();
        let _ = png.decompress();
    }
});
