//! 인제스트 에러 타입
//!
//! [`IngestError`]는 변환 호출을 중단시키는 치명적 조건만 표현합니다.
//! 레코드 단위의 비치명적 조건(빈 필드 값, 허용 범위 내 타임스탬프 파싱
//! 실패 등)은 에러가 아니라 [`IngestCounts`](crate::status::IngestCounts)
//! 카운터로만 관찰됩니다.
//!
//! `From<IngestError> for DriftwatchError` 변환이 구현되어 있어 상위
//! 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use driftwatch_core::error::{DataError, DriftwatchError};

/// 인제스트 도메인 에러 — 호출 전체를 중단시키는 조건
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 분석에 필요한 필드가 입력 헤더에 없음 (delimited 전용, 즉시 중단)
    #[error("field configured for analysis '{field}' is not in the header {header:?}")]
    MissingField {
        /// 누락된 필드 이름
        field: String,
        /// 실제 입력 헤더
        header: Vec<String>,
    },

    /// 허용 비율을 초과한 타임스탬프 파싱 실패
    #[error(
        "a high proportion of records have unparseable timestamps: \
         {error_count} of {record_count} records"
    )]
    HighProportionOfBadTimestamps {
        /// 파싱 실패 건수
        error_count: u64,
        /// 읽은 레코드 수
        record_count: u64,
    },

    /// 허용 비율을 초과한 시간 역행 레코드
    #[error(
        "too many records are out of chronological order: \
         {out_of_order_count} of {record_count} records"
    )]
    OutOfOrderRecords {
        /// 역행 레코드 수
        out_of_order_count: u64,
        /// 읽은 레코드 수
        record_count: u64,
    },

    /// 복구 불가능한 입력 형식 오류 (malformed JSON 등)
    #[error("malformed {format} input: {reason}")]
    Malformed {
        /// 입력 형식 (delimited, json)
        format: String,
        /// 실패 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// delimited 리더 에러
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<IngestError> for DriftwatchError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::MissingField { field, .. } => {
                DriftwatchError::Data(DataError::MissingField { field })
            }
            IngestError::HighProportionOfBadTimestamps {
                error_count,
                record_count,
            } => DriftwatchError::Data(DataError::HighProportionOfBadTimestamps {
                error_count,
                record_count,
            }),
            IngestError::OutOfOrderRecords {
                out_of_order_count,
                record_count,
            } => DriftwatchError::Data(DataError::OutOfOrderRecords {
                out_of_order_count,
                record_count,
            }),
            IngestError::Malformed { format, reason } => DriftwatchError::Data(DataError::Malformed {
                reason: format!("{format}: {reason}"),
            }),
            IngestError::Io(e) => DriftwatchError::Io(e),
            IngestError::Csv(e) => DriftwatchError::Data(DataError::Malformed {
                reason: e.to_string(),
            }),
        }
    }
}
