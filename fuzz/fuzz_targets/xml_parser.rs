#![no_main]
use libfuzzer_sys::fuzz_target;
use pacsrepair::xml::{to_string, Parser};

fuzz_target!(|data: &[u8]| {
    let mut parser = Parser::new(data);
    if let Ok(doc) = parser.parse() {
        // anything accepted must survive a write and re-read
        let written = to_string(&doc);
        let _ = Parser::new(written.as_bytes()).parse();
    }
});
