#![no_main]

use driftwatch_core::config::TimeFormat;
use driftwatch_ingest::TimestampParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    for format in [
        TimeFormat::Epoch,
        TimeFormat::EpochMs,
        TimeFormat::Pattern("%Y-%m-%dT%H:%M:%S".to_owned()),
    ] {
        let _ = TimestampParser::new(format).parse(data);
    }
});
