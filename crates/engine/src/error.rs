//! 엔진 에러 타입
//!
//! 잡 생명주기와 네이티브 프로세스 실행에서 발생하는 조건을 표현하고,
//! 코어의 [`DriftwatchError`]로 변환합니다.

use driftwatch_core::error::{DriftwatchError, JobError, ParamError};
use driftwatch_ingest::IngestError;

/// 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 등록되지 않은 잡
    #[error("unknown job '{job_id}'")]
    UnknownJob {
        /// 잡 ID
        job_id: String,
    },

    /// 이미 데이터를 처리 중인 잡 — 호출자는 즉시 실패를 받음
    #[error(
        "job '{job_id}' is already handling data - jobs only accept data \
         from one connection at a time"
    )]
    JobInUse {
        /// 잡 ID
        job_id: String,
    },

    /// 이미 닫힌 잡에 대한 조작
    #[error("job '{job_id}' is closed")]
    JobClosed {
        /// 잡 ID
        job_id: String,
    },

    /// 네이티브 프로세스 실행 에러 (스폰 실패, broken pipe, 비정상 종료)
    #[error("native process run error for job '{job_id}': {reason}")]
    ProcessRun {
        /// 잡 ID
        job_id: String,
        /// 실패 사유 (가능하면 stderr 포함)
        reason: String,
    },

    /// 호출 파라미터 검증 실패
    #[error(transparent)]
    Param(#[from] ParamError),

    /// 데이터 변환 에러
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EngineError> for DriftwatchError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownJob { job_id } => {
                DriftwatchError::Job(JobError::UnknownJob { job_id })
            }
            EngineError::JobInUse { job_id } => DriftwatchError::Job(JobError::InUse { job_id }),
            EngineError::JobClosed { job_id } => DriftwatchError::Job(JobError::Closed { job_id }),
            EngineError::ProcessRun { job_id, reason } => {
                DriftwatchError::Job(JobError::ProcessRun { job_id, reason })
            }
            EngineError::Param(e) => DriftwatchError::Param(e),
            EngineError::Ingest(e) => e.into(),
            EngineError::Io(e) => DriftwatchError::Io(e),
        }
    }
}
