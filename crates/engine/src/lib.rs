#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`manager`]: 잡별 프로세스 레지스트리와 조작 ([`ProcessManager`])
//! - [`handle`]: 프로세스 핸들, 생명주기 상태, 점유 가드
//! - [`spawn`]: 커맨드라인 구성과 필드 설정 파일
//! - [`control`]: 데이터 스트림에 끼워 보내는 제어 레코드
//! - [`output`]: stdout 결과 스트림 리더와 플러시 응답 대기
//! - [`params`]: 적재/플러시 파라미터 검증과 시간 범위 정규화
//! - [`error`]: 도메인 에러 타입
//!
//! # 데이터 흐름
//!
//! ```text
//!             write_data                         flush/close
//!                 |                                  |
//!   Read ──> RecordTransformer(blocking) ──> mpsc ──> child stdin
//!                                                       |
//!   ResultsStore <── spawn_reader <── child stdout <────┘
//!        |               |
//!   persist()      broadcast::Sender<ResultEvent>
//! ```

pub mod control;
pub mod error;
pub mod handle;
pub mod manager;
pub mod output;
pub mod params;
pub mod spawn;

// --- 주요 타입 re-export ---

pub use control::ControlWriter;
pub use error::EngineError;
pub use handle::{InUseGuard, JobHandle, ProcessState};
pub use manager::{ProcessManager, ProcessManagerConfig};
pub use output::FlushAcks;
pub use params::{DataLoadParams, InterimResultsParams, TimeRange, parse_time_param};
