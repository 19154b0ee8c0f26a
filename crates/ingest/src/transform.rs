//! 레코드 변환기 — 원시 입력을 길이 인코딩 스트림으로
//!
//! [`RecordTransformer`]는 잡 설정으로부터 필드 레이아웃과 타임스탬프
//! 파서를 파생하고, 입력 형식에 따라 delimited/JSON 경로로 분기합니다.
//! 두 경로 모두 공통 [`RecordEmitter`]를 통해 레코드를 내보내므로
//! 시간 재작성과 역행 판정은 한 곳에만 존재합니다.
//!
//! 헤더 레코드(필드 이름)는 항상 먼저 쓰이고, 이후 모든 데이터
//! 레코드는 동일한 필드 수를 가집니다.

use std::io::{Read, Write};

use driftwatch_core::config::{AnalysisConfig, DataDescription, DataFormat};
use driftwatch_core::metrics as metric_names;

use crate::error::IngestError;
use crate::fields::FieldLayout;
use crate::status::{CountingReader, IngestCounts, IngestPolicy, StatusReporter, UsageCounts};
use crate::time::TimestampParser;
use crate::wire::LengthEncodedWriter;
use crate::{delimited, json};

/// 변환 호출 하나의 결과
#[derive(Debug, Clone, Copy)]
pub struct TransformOutcome {
    /// 상태 카운터 스냅샷
    pub counts: IngestCounts,
    /// 이번 호출의 사용량 (호출자가 잡 단위로 누적)
    pub usage: UsageCounts,
}

/// 원시 입력을 엔진 와이어 형식으로 변환하는 변환기
pub struct RecordTransformer {
    layout: FieldLayout,
    parser: TimestampParser,
    data: DataDescription,
    latency: i64,
    policy: IngestPolicy,
}

impl RecordTransformer {
    /// 잡 설정으로부터 변환기를 만듭니다.
    pub fn new(
        analysis: &AnalysisConfig,
        data: &DataDescription,
        policy: IngestPolicy,
    ) -> Self {
        Self {
            layout: FieldLayout::new(analysis, data),
            parser: TimestampParser::new(data.time_format.clone()),
            data: data.clone(),
            latency: analysis.latency_secs() as i64,
            policy,
        }
    }

    /// 필드 레이아웃
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// 입력 전체를 변환하여 `output`에 씁니다.
    ///
    /// 비치명적 조건은 반환되는 카운터로만 관찰되고, 치명적 조건은
    /// 즉시 에러로 반환됩니다. 치명적 에러 이후에는 이미 쓰인 부분
    /// 출력도 사용할 수 없는 것으로 간주해야 합니다.
    pub fn transform<R: Read, W: Write>(
        &self,
        job_id: &str,
        input: R,
        output: W,
    ) -> Result<TransformOutcome, IngestError> {
        let (counting, bytes_read) = CountingReader::new(input);
        let mut reporter = StatusReporter::new(job_id, self.policy);
        let mut emitter = RecordEmitter::new(
            LengthEncodedWriter::new(output),
            &self.parser,
            self.latency,
            self.layout.time_index(),
        );

        emitter.write_header(self.layout.field_names())?;

        match self.data.format {
            DataFormat::Delimited => delimited::transform(
                &self.data,
                &self.layout,
                &mut emitter,
                &mut reporter,
                counting,
            )?,
            DataFormat::Json => {
                json::transform(&self.layout, &mut emitter, &mut reporter, counting)?
            }
        }

        emitter.finish()?;

        let records_read = reporter.records_read();
        let counts = reporter.finish()?;
        let bytes = bytes_read.load(std::sync::atomic::Ordering::Relaxed);
        metrics::counter!(metric_names::INGEST_BYTES_READ_TOTAL,
            metric_names::LABEL_JOB_ID => job_id.to_owned())
        .increment(bytes);

        Ok(TransformOutcome {
            counts,
            usage: UsageCounts {
                bytes_read: bytes,
                records_read,
            },
        })
    }
}

/// 형식 공통의 레코드 방출 경로
///
/// 시간 토큰 파싱, 정규 epoch 재작성, 역행 판정, 기록 카운트를
/// 담당합니다. 파싱 실패 시 레코드는 버려지지 않고 마지막으로 관찰된
/// epoch을 대체값으로 하여 기록됩니다.
pub(crate) struct RecordEmitter<'a, W: Write> {
    writer: LengthEncodedWriter<W>,
    parser: &'a TimestampParser,
    latency: i64,
    last_epoch: i64,
    time_index: usize,
}

impl<'a, W: Write> RecordEmitter<'a, W> {
    fn new(
        writer: LengthEncodedWriter<W>,
        parser: &'a TimestampParser,
        latency: i64,
        time_index: usize,
    ) -> Self {
        Self {
            writer,
            parser,
            latency,
            last_epoch: 0,
            time_index,
        }
    }

    /// 필드 이름 헤더 레코드를 씁니다.
    pub(crate) fn write_header(&mut self, names: &[String]) -> Result<(), IngestError> {
        self.writer.write_record(names)?;
        Ok(())
    }

    /// 데이터 레코드 하나를 방출합니다.
    ///
    /// `record[time_index]`의 원시 토큰을 epoch 초로 재작성한 뒤
    /// 씁니다. (최신 epoch − latency)보다 이른 레코드는 역행으로
    /// 집계하고 쓰지 않습니다.
    pub(crate) fn emit(
        &mut self,
        record: &mut [String],
        reporter: &mut StatusReporter,
    ) -> Result<(), IngestError> {
        match self.parser.parse(&record[self.time_index]) {
            Ok(epoch) => {
                if epoch < self.last_epoch - self.latency {
                    reporter.out_of_order()?;
                    return Ok(());
                }
                record[self.time_index] = epoch.to_string();
                self.writer.write_record(record)?;
                reporter.record_written();
                self.last_epoch = self.last_epoch.max(epoch);
            }
            Err(bad) => {
                tracing::debug!(error = %bad, "failed to parse record timestamp");
                reporter.date_parse_error()?;
                // 대체값으로 기록은 유지한다 (필드 수 불변식 보존)
                record[self.time_index] = self.last_epoch.to_string();
                self.writer.write_record(record)?;
                reporter.record_written();
            }
        }
        Ok(())
    }

    /// 남은 출력을 플러시합니다.
    fn finish(mut self) -> Result<(), IngestError> {
        self.writer.flush()?;
        Ok(())
    }
}
