//! JSON 변환 경로 — 연속된 JSON 문서 스트림
//!
//! 입력은 구분자 없이 이어지는 JSON 객체들입니다. 객체마다 레코드
//! 하나를 만듭니다. 중첩 객체는 점 표기 경로로 평탄화되고, 배열
//! 값은 경고와 함께 무시됩니다. 분석 필드가 문서에 없으면 빈 값으로
//! 채우고 필드 누락으로 집계합니다. 시간 필드가 없으면 빈 시간
//! 토큰이 되어 방출 경로에서 파싱 실패로 처리됩니다.

use std::io::{Read, Write};

use serde_json::{Map, Value};

use crate::error::IngestError;
use crate::fields::FieldLayout;
use crate::status::StatusReporter;
use crate::transform::RecordEmitter;

pub(crate) fn transform<R: Read, W: Write>(
    layout: &FieldLayout,
    emitter: &mut RecordEmitter<'_, W>,
    reporter: &mut StatusReporter,
    input: R,
) -> Result<(), IngestError> {
    let stream = serde_json::Deserializer::from_reader(input).into_iter::<Map<String, Value>>();

    let mut record = layout.empty_record();
    let mut filled = vec![false; layout.len()];

    for document in stream {
        let document = document.map_err(|e| IngestError::Malformed {
            format: "json".to_owned(),
            reason: e.to_string(),
        })?;
        reporter.record_read();

        for value in &mut record {
            value.clear();
        }
        filled.fill(false);
        flatten_into(&document, "", layout, &mut record, &mut filled);

        let missing = filled
            .iter()
            .enumerate()
            .filter(|&(i, &present)| !present && i != layout.time_index())
            .count();
        if missing > 0 {
            reporter.missing_fields(missing as u64);
        }

        emitter.emit(&mut record, reporter)?;
    }

    Ok(())
}

/// 문서를 점 표기 경로로 평탄화하며 레이아웃에 있는 필드만 담습니다.
fn flatten_into(
    object: &Map<String, Value>,
    prefix: &str,
    layout: &FieldLayout,
    record: &mut [String],
    filled: &mut [bool],
) {
    for (key, value) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => flatten_into(nested, &path, layout, record, filled),
            Value::Array(_) => {
                tracing::warn!(field = %path, "ignoring array field in json document");
            }
            scalar => {
                if let Some(index) = layout.index_of(&path) {
                    record[index] = scalar_to_string(scalar);
                    filled[index] = true;
                }
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
