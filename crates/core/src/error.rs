//! 에러 타입 — 도메인별 에러 정의
//!
//! 각 크레이트는 자체 에러 enum을 정의하고, 이 모듈의 카테고리 에러로
//! 변환하여 [`DriftwatchError`]로 전파합니다.

/// Driftwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DriftwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 잡 생명주기/프로세스 에러
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// 입력 데이터 처리 에러
    #[error("data error: {0}")]
    Data(#[from] DataError),

    /// 호출 파라미터 검증 에러
    #[error("parameter error: {0}")]
    Param(#[from] ParamError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 잡 생명주기/네이티브 프로세스 에러
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// 존재하지 않는 잡
    #[error("unknown job '{job_id}'")]
    UnknownJob { job_id: String },

    /// 이미 데이터를 처리 중인 잡
    #[error(
        "job '{job_id}' is already handling data - jobs only accept data \
         from one connection at a time"
    )]
    InUse { job_id: String },

    /// 네이티브 분석 프로세스 실행 에러 (broken pipe, 비정상 종료 등)
    #[error("native process run error for job '{job_id}': {reason}")]
    ProcessRun { job_id: String, reason: String },

    /// 이미 닫힌 잡에 대한 조작
    #[error("job '{job_id}' is closed")]
    Closed { job_id: String },
}

/// 입력 데이터 처리 에러 — 인제스트 호출을 중단시키는 치명적 조건
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// 분석에 필요한 필드가 입력 헤더에 없음
    #[error("field configured for analysis '{field}' is missing from the input")]
    MissingField { field: String },

    /// 허용 비율을 초과한 타임스탬프 파싱 실패
    #[error(
        "a high proportion of records have unparseable timestamps: \
         {error_count} of {record_count} records"
    )]
    HighProportionOfBadTimestamps {
        error_count: u64,
        record_count: u64,
    },

    /// 허용 비율을 초과한 시간 역행 레코드
    #[error("too many records are out of chronological order: {out_of_order_count} of {record_count} records")]
    OutOfOrderRecords {
        out_of_order_count: u64,
        record_count: u64,
    },

    /// 복구 불가능한 입력 형식 오류
    #[error("malformed input: {reason}")]
    Malformed { reason: String },
}

/// 호출 파라미터 검증 에러
#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    /// 파싱할 수 없는 날짜 파라미터
    #[error("query param '{param}' with value '{value}' cannot be parsed as a date or converted to a number (epoch seconds)")]
    UnparseableDate { param: String, value: String },

    /// 종료 시각이 시작 시각보다 앞섬
    #[error("invalid time range: end time '{end}' is earlier than start time '{start}'")]
    EndBeforeStart { start: String, end: String },

    /// 유효하지 않은 파라미터 조합
    #[error("invalid parameters for '{operation}': {reason}")]
    InvalidCombination { operation: String, reason: String },

    /// 범위를 벗어났거나 인식할 수 없는 값
    #[error("invalid value for '{param}': {reason}")]
    InvalidValue { param: String, reason: String },
}
