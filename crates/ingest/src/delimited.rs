//! delimited 변환 경로 — CSV/TSV 류 입력
//!
//! 첫 행은 반드시 필드 이름 헤더입니다. 분석에 필요한 필드가 헤더에
//! 없으면 즉시 치명적 에러로 중단합니다. 헤더보다 짧은 행은 구조적
//! 결함으로 보고 버리며(discarded + missing-field), 헤더보다 긴 행은
//! 초과 필드만 무시합니다.

use std::io::{Read, Write};

use crate::error::IngestError;
use crate::fields::FieldLayout;
use crate::status::StatusReporter;
use crate::transform::RecordEmitter;
use driftwatch_core::config::DataDescription;

pub(crate) fn transform<R: Read, W: Write>(
    data: &DataDescription,
    layout: &FieldLayout,
    emitter: &mut RecordEmitter<'_, W>,
    reporter: &mut StatusReporter,
    input: R,
) -> Result<(), IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(data.field_delimiter)?)
        .quote(delimiter_byte(data.quote_char)?)
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(str::to_owned)
        .collect();

    // 정규 레이아웃의 각 필드가 입력 헤더의 어느 열에 있는지
    let positions: Vec<usize> = layout
        .field_names()
        .iter()
        .map(|name| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| IngestError::MissingField {
                    field: name.clone(),
                    header: header.clone(),
                })
        })
        .collect::<Result<_, _>>()?;

    let mut record = layout.empty_record();
    for row in reader.records() {
        let row = row?;
        reporter.record_read();

        if row.len() < header.len() {
            tracing::debug!(
                row_fields = row.len(),
                header_fields = header.len(),
                "discarding truncated row"
            );
            reporter.record_discarded();
            reporter.missing_field();
            continue;
        }

        for (slot, &pos) in positions.iter().enumerate() {
            let value = row.get(pos).unwrap_or("");
            if value.is_empty() && slot != layout.time_index() {
                reporter.missing_field();
            }
            record[slot].clear();
            record[slot].push_str(value);
        }

        emitter.emit(&mut record, reporter)?;
    }

    Ok(())
}

fn delimiter_byte(c: char) -> Result<u8, IngestError> {
    u8::try_from(u32::from(c)).map_err(|_| IngestError::Malformed {
        format: "delimited".to_owned(),
        reason: format!("delimiter '{c}' is not a single-byte character"),
    })
}
