//! 인제스트 계측 — 상태 카운터, 사용량 카운터, 중단 정책
//!
//! [`StatusReporter`]는 변환 호출 하나에 귀속되는 카운터를 집계하고,
//! 타임스탬프 파싱 실패/시간 역행 비율이 정책을 넘으면 호출을
//! 중단시킵니다. [`UsageCounts`]는 잡 수명 동안 호출을 넘어 누적되는
//! 계량 상태입니다.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use driftwatch_core::metrics as metric_names;

use crate::error::IngestError;

/// 변환 호출 하나의 상태 카운터 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounts {
    /// 엔진에 기록된 레코드 수
    pub records_written: u64,
    /// 버려진 레코드 수 (구조적으로 잘린 행)
    pub records_discarded: u64,
    /// 필드 누락 건수 (레코드당 누락 필드마다 1)
    pub missing_field_errors: u64,
    /// 타임스탬프 파싱 실패 건수
    pub date_parse_errors: u64,
    /// 시간 역행 레코드 수
    pub out_of_order_records: u64,
}

/// 잡 수명 동안 누적되는 사용량 카운터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounts {
    /// 읽은 원시 입력 바이트 수
    pub bytes_read: u64,
    /// 읽은 입력 레코드 수
    pub records_read: u64,
}

impl UsageCounts {
    /// 호출 하나의 사용량을 누적합니다.
    pub fn add(&mut self, bytes: u64, records: u64) {
        self.bytes_read += bytes;
        self.records_read += records;
    }
}

/// 호출 중단 정책
#[derive(Debug, Clone, Copy)]
pub struct IngestPolicy {
    /// 허용되는 타임스탬프 파싱 실패 비율 (records_read 대비)
    pub max_bad_timestamp_ratio: f64,
    /// 허용되는 시간 역행 레코드 비율 (records_read 대비)
    pub max_out_of_order_ratio: f64,
    /// 비율 검사를 시작하는 최소 레코드 수
    pub min_records_to_enforce: u64,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self {
            max_bad_timestamp_ratio: 0.25,
            max_out_of_order_ratio: 0.25,
            min_records_to_enforce: 100,
        }
    }
}

/// 변환 호출 하나의 카운터 집계와 정책 검사
///
/// 카운터는 호출에 배타적으로 귀속됩니다. 비율 초과는 레코드 보고
/// 시점 또는 [`finish`](Self::finish)에서 치명적 에러로 표면화됩니다.
#[derive(Debug)]
pub struct StatusReporter {
    job_id: String,
    policy: IngestPolicy,
    counts: IngestCounts,
    records_read: u64,
}

impl StatusReporter {
    /// 잡에 대한 새 리포터를 만듭니다.
    pub fn new(job_id: impl Into<String>, policy: IngestPolicy) -> Self {
        Self {
            job_id: job_id.into(),
            policy,
            counts: IngestCounts::default(),
            records_read: 0,
        }
    }

    /// 입력 레코드 하나를 읽었음을 보고합니다.
    pub fn record_read(&mut self) {
        self.records_read += 1;
    }

    /// 레코드 하나가 엔진에 기록되었음을 보고합니다.
    pub fn record_written(&mut self) {
        self.counts.records_written += 1;
    }

    /// 레코드 하나가 버려졌음을 보고합니다.
    pub fn record_discarded(&mut self) {
        self.counts.records_discarded += 1;
    }

    /// 필드 누락 한 건을 보고합니다.
    pub fn missing_field(&mut self) {
        self.counts.missing_field_errors += 1;
    }

    /// 필드 누락 여러 건을 보고합니다.
    pub fn missing_fields(&mut self, count: u64) {
        self.counts.missing_field_errors += count;
    }

    /// 타임스탬프 파싱 실패 한 건을 보고합니다.
    ///
    /// 누적 비율이 정책을 넘으면 치명적 에러를 반환합니다.
    pub fn date_parse_error(&mut self) -> Result<(), IngestError> {
        self.counts.date_parse_errors += 1;
        self.check_bad_timestamp_ratio()
    }

    /// 시간 역행 레코드 한 건을 보고합니다.
    ///
    /// 누적 비율이 정책을 넘으면 치명적 에러를 반환합니다.
    pub fn out_of_order(&mut self) -> Result<(), IngestError> {
        self.counts.out_of_order_records += 1;
        self.check_out_of_order_ratio()
    }

    /// 지금까지 읽은 레코드 수
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// 현재 카운터 스냅샷
    pub fn counts(&self) -> IngestCounts {
        self.counts
    }

    /// 집계를 마감합니다: 최종 비율 검사 후 스냅샷을 반환하고
    /// 메트릭 카운터를 갱신합니다.
    pub fn finish(self) -> Result<IngestCounts, IngestError> {
        self.check_bad_timestamp_ratio()?;
        self.check_out_of_order_ratio()?;

        let job = self.job_id.clone();
        let c = self.counts;
        metrics::counter!(metric_names::INGEST_RECORDS_WRITTEN_TOTAL,
            metric_names::LABEL_JOB_ID => job.clone())
        .increment(c.records_written);
        metrics::counter!(metric_names::INGEST_RECORDS_DISCARDED_TOTAL,
            metric_names::LABEL_JOB_ID => job.clone())
        .increment(c.records_discarded);
        metrics::counter!(metric_names::INGEST_MISSING_FIELD_ERRORS_TOTAL,
            metric_names::LABEL_JOB_ID => job.clone())
        .increment(c.missing_field_errors);
        metrics::counter!(metric_names::INGEST_DATE_PARSE_ERRORS_TOTAL,
            metric_names::LABEL_JOB_ID => job.clone())
        .increment(c.date_parse_errors);
        metrics::counter!(metric_names::INGEST_OUT_OF_ORDER_TOTAL,
            metric_names::LABEL_JOB_ID => job)
        .increment(c.out_of_order_records);

        tracing::debug!(
            job_id = %self.job_id,
            records_read = self.records_read,
            records_written = c.records_written,
            records_discarded = c.records_discarded,
            "finished transforming input"
        );
        Ok(c)
    }

    fn check_bad_timestamp_ratio(&self) -> Result<(), IngestError> {
        if self.ratio_exceeded(self.counts.date_parse_errors, self.policy.max_bad_timestamp_ratio)
        {
            return Err(IngestError::HighProportionOfBadTimestamps {
                error_count: self.counts.date_parse_errors,
                record_count: self.records_read,
            });
        }
        Ok(())
    }

    fn check_out_of_order_ratio(&self) -> Result<(), IngestError> {
        if self.ratio_exceeded(
            self.counts.out_of_order_records,
            self.policy.max_out_of_order_ratio,
        ) {
            return Err(IngestError::OutOfOrderRecords {
                out_of_order_count: self.counts.out_of_order_records,
                record_count: self.records_read,
            });
        }
        Ok(())
    }

    fn ratio_exceeded(&self, errors: u64, max_ratio: f64) -> bool {
        self.records_read >= self.policy.min_records_to_enforce
            && errors as f64 / self.records_read as f64 > max_ratio
    }
}

/// 읽은 바이트 수를 세는 리더 래퍼
///
/// 변환기 입력을 감싸 사용량 계량에 쓰입니다. 카운터는 공유
/// 원자값이므로 리더가 다른 파서에 소유권을 넘긴 뒤에도 읽을 수
/// 있습니다.
pub struct CountingReader<R: Read> {
    inner: R,
    bytes_read: Arc<AtomicU64>,
}

impl<R: Read> CountingReader<R> {
    /// 리더를 감쌉니다. 반환된 핸들로 총 바이트를 조회합니다.
    pub fn new(inner: R) -> (Self, Arc<AtomicU64>) {
        let counter = Arc::new(AtomicU64::new(0));
        (
            Self {
                inner,
                bytes_read: Arc::clone(&counter),
            },
            counter,
        )
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}
