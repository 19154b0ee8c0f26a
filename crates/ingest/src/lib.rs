#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`transform`]: 형식 분기와 레코드 방출 루프 ([`RecordTransformer`])
//! - [`delimited`] / [`json`]: 형식별 파싱 경로 (내부 모듈)
//! - [`fields`]: 정규 필드 순서 파생 (분석 필드 정렬순 + 시간 필드 마지막)
//! - [`time`]: 시간 토큰 → epoch 초 파서
//! - [`wire`]: 길이 인코딩 레코드 프로토콜
//! - [`status`]: 상태/사용량 카운터와 중단 정책
//! - [`error`]: 도메인 에러 타입
//!
//! # 데이터 흐름
//!
//! ```text
//! Read ──> CountingReader ──> delimited/json 파서 ──> RecordEmitter ──> LengthEncodedWriter ──> Write
//!              |                    |                      |
//!          bytes_read          records_read         시간 재작성 + 역행 판정
//! ```

pub mod error;
pub mod fields;
pub mod status;
pub mod time;
pub mod transform;
pub mod wire;

mod delimited;
mod json;

// --- 주요 타입 re-export ---

pub use error::IngestError;
pub use fields::FieldLayout;
pub use status::{IngestCounts, IngestPolicy, UsageCounts};
pub use time::{BadTimestamp, TimestampParser};
pub use transform::{RecordTransformer, TransformOutcome};
pub use wire::{LengthEncodedWriter, WireError, decode_record, encode_record};
