#![no_main]

use driftwatch_core::config::{AnalysisConfig, DataDescription, Detector, TimeFormat};
use driftwatch_ingest::{IngestPolicy, RecordTransformer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let analysis = AnalysisConfig {
        bucket_span: Some(300),
        latency: Some(60),
        detectors: vec![
            Detector::new("metric")
                .with_field("responsetime")
                .by("airline"),
        ],
    };
    let description = DataDescription {
        field_delimiter: ',',
        time_format: TimeFormat::Epoch,
        ..DataDescription::default()
    };
    let transformer = RecordTransformer::new(&analysis, &description, IngestPolicy::default());
    let mut out = Vec::new();
    let _ = transformer.transform("fuzz", data, &mut out);
});
