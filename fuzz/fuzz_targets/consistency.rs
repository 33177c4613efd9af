#![no_main]
use libfuzzer_sys::fuzz_target;
use pacsrepair::{ConsistencyChecker, ConsistencyConfig};

const PACS008: &str = "<Document><CdtTrfTxInf><PmtId><UETR>abc-1</UETR></PmtId></CdtTrfTxInf></Document>";

fuzz_target!(|data: &[u8]| {
    if let Ok(legacy) = std::str::from_utf8(data) {
        if let Ok(checker) = ConsistencyChecker::new(ConsistencyConfig::default()) {
            let _ = checker.check(legacy, PACS008);
            let _ = checker.text_block(legacy);
        }
    }
});
