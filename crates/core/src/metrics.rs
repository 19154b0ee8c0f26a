//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 등의 매크로를
//! 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `driftwatch_`
//! - 모듈명: `ingest_`, `engine_`, `alerts_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 잡 ID 레이블 키
pub const LABEL_JOB_ID: &str = "job_id";

/// 입력 형식 레이블 키 (delimited, json)
pub const LABEL_FORMAT: &str = "format";

// ─── Ingest 메트릭 ─────────────────────────────────────────────────

/// ingest: 엔진에 기록된 레코드 수 (counter)
pub const INGEST_RECORDS_WRITTEN_TOTAL: &str = "driftwatch_ingest_records_written_total";

/// ingest: 버려진 레코드 수 (counter)
pub const INGEST_RECORDS_DISCARDED_TOTAL: &str = "driftwatch_ingest_records_discarded_total";

/// ingest: 필드 누락 건수 (counter)
pub const INGEST_MISSING_FIELD_ERRORS_TOTAL: &str = "driftwatch_ingest_missing_field_errors_total";

/// ingest: 타임스탬프 파싱 실패 건수 (counter)
pub const INGEST_DATE_PARSE_ERRORS_TOTAL: &str = "driftwatch_ingest_date_parse_errors_total";

/// ingest: 시간 역행 레코드 수 (counter)
pub const INGEST_OUT_OF_ORDER_TOTAL: &str = "driftwatch_ingest_out_of_order_total";

/// ingest: 읽은 입력 바이트 수 (counter)
pub const INGEST_BYTES_READ_TOTAL: &str = "driftwatch_ingest_bytes_read_total";

// ─── Engine 메트릭 ─────────────────────────────────────────────────

/// engine: 현재 실행 중인 잡 프로세스 수 (gauge)
pub const ENGINE_RUNNING_PROCESSES: &str = "driftwatch_engine_running_processes";

/// engine: 발행된 결과 이벤트 수 (counter)
pub const ENGINE_RESULTS_TOTAL: &str = "driftwatch_engine_results_total";

/// engine: flush 명령 수 (counter)
pub const ENGINE_FLUSHES_TOTAL: &str = "driftwatch_engine_flushes_total";

// ─── Alerts 메트릭 ─────────────────────────────────────────────────

/// alerts: 현재 대기 중인 롱폴 요청 수 (gauge)
pub const ALERTS_PENDING_REQUESTS: &str = "driftwatch_alerts_pending_requests";

/// alerts: 트리거 매칭으로 완료된 요청 수 (counter)
pub const ALERTS_FIRED_TOTAL: &str = "driftwatch_alerts_fired_total";

/// alerts: 타임아웃으로 완료된 요청 수 (counter)
pub const ALERTS_TIMED_OUT_TOTAL: &str = "driftwatch_alerts_timed_out_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 익스포터 설치 직후 한 번 호출하면 메트릭 목록에 설명이 붙습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        INGEST_RECORDS_WRITTEN_TOTAL,
        "Records transformed and written to the analytics process"
    );
    describe_counter!(
        INGEST_RECORDS_DISCARDED_TOTAL,
        "Records discarded during transformation"
    );
    describe_counter!(
        INGEST_MISSING_FIELD_ERRORS_TOTAL,
        "Missing required field occurrences"
    );
    describe_counter!(
        INGEST_DATE_PARSE_ERRORS_TOTAL,
        "Timestamp tokens that failed to parse"
    );
    describe_counter!(
        INGEST_OUT_OF_ORDER_TOTAL,
        "Records older than the latency window"
    );
    describe_counter!(INGEST_BYTES_READ_TOTAL, "Raw input bytes read");
    describe_gauge!(
        ENGINE_RUNNING_PROCESSES,
        "Analytics subprocesses currently running"
    );
    describe_counter!(ENGINE_RESULTS_TOTAL, "Result documents read from subprocesses");
    describe_counter!(ENGINE_FLUSHES_TOTAL, "Flush commands acknowledged");
    describe_gauge!(ALERTS_PENDING_REQUESTS, "Long-poll alert requests waiting");
    describe_counter!(ALERTS_FIRED_TOTAL, "Alert requests completed by a trigger match");
    describe_counter!(ALERTS_TIMED_OUT_TOTAL, "Alert requests completed by timeout");
}
