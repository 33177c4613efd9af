#![no_main]
use libfuzzer_sys::fuzz_target;
use pacsrepair::{
    build_envelope, parse, repair, AddressMode, EnvelopeConfig, RepairConfig, RepairOptions,
};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(mut doc) = parse(s) {
            let options = RepairOptions::all(AddressMode::Hybrid);
            repair(&mut doc, &options, &RepairConfig::default());
            let body = pacsrepair::xml::to_string(&doc);
            let _ = build_envelope("<AppHdr/>", &body, &EnvelopeConfig::default());
        }
    }
});
