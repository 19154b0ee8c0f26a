//! 변환기 벤치마크
//!
//! 길이 인코딩 쓰기와 delimited/JSON 변환 경로의 처리량을 측정합니다.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use driftwatch_core::config::{
    AnalysisConfig, DataDescription, DataFormat, Detector, TimeFormat,
};
use driftwatch_ingest::{IngestPolicy, LengthEncodedWriter, RecordTransformer};

fn transformer(format: DataFormat) -> RecordTransformer {
    let analysis = AnalysisConfig {
        bucket_span: Some(300),
        latency: None,
        detectors: vec![
            Detector::new("metric")
                .with_field("responsetime")
                .by("airline"),
        ],
    };
    let data = DataDescription {
        format,
        field_delimiter: ',',
        quote_char: '"',
        time_field: "time".to_owned(),
        time_format: TimeFormat::Epoch,
    };
    RecordTransformer::new(&analysis, &data, IngestPolicy::default())
}

fn delimited_input(rows: u32) -> String {
    let mut input = String::from("time,airline,responsetime,sourcetype\n");
    for i in 0..rows {
        input.push_str(&format!("{},DJA,622,flightcentre\n", 1_350_824_400 + i));
    }
    input
}

fn json_input(docs: u32) -> String {
    let mut input = String::new();
    for i in 0..docs {
        input.push_str(&format!(
            r#"{{"time":{},"airline":"DJA","responsetime":622}}"#,
            1_350_824_400 + i
        ));
    }
    input
}

fn bench_wire_encoding(c: &mut Criterion) {
    let fields = ["1350824400", "DJA", "622", "flightcentre"];

    let mut group = c.benchmark_group("wire_encoding");
    group.throughput(Throughput::Elements(1000));
    group.bench_function("write_1000_records", |b| {
        b.iter(|| {
            let mut writer = LengthEncodedWriter::new(Vec::with_capacity(64 * 1024));
            for _ in 0..1000 {
                writer.write_record(black_box(&fields)).unwrap();
            }
            writer.into_inner()
        })
    });
    group.finish();
}

fn bench_delimited_transform(c: &mut Criterion) {
    let t = transformer(DataFormat::Delimited);
    let input = delimited_input(1000);

    let mut group = c.benchmark_group("delimited_transform");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("rows_1000", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(64 * 1024);
            t.transform("bench", black_box(input.as_bytes()), &mut out)
                .unwrap()
        })
    });
    group.finish();
}

fn bench_json_transform(c: &mut Criterion) {
    let t = transformer(DataFormat::Json);
    let input = json_input(1000);

    let mut group = c.benchmark_group("json_transform");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("documents_1000", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(64 * 1024);
            t.transform("bench", black_box(input.as_bytes()), &mut out)
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_wire_encoding,
    bench_delimited_transform,
    bench_json_transform
);
criterion_main!(benches);
