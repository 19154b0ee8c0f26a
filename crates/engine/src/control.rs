//! 제어 프로토콜 — 데이터 스트림에 끼워 보내는 제어 레코드
//!
//! 제어 레코드는 데이터 레코드와 같은 길이 인코딩 형식을 쓰되, 분석
//! 필드 수에 제어 필드 하나를 덧붙인 길이를 가집니다. 제어 필드를
//! 제외한 모든 필드는 빈 문자열이고, 마지막 필드가 제어 메시지입니다.
//!
//! 메시지 형식:
//! - `f<id>`: 플러시. 엔진은 같은 id를 stdout으로 되울립니다.
//! - `i<start> <end>`: 해당 범위의 중간 결과 계산
//! - `t<epoch>`: 엔진 시간을 해당 시각까지 전진
//! - `r<start> <end>`: 해당 범위의 버킷 재설정
//!
//! 입력 종료 신호는 별도 메시지가 아니라 stdin을 닫는 것입니다.

use std::io::Write;

use driftwatch_ingest::LengthEncodedWriter;

use crate::params::TimeRange;

const FLUSH: char = 'f';
const CALC_INTERIM: char = 'i';
const ADVANCE_TIME: char = 't';
const RESET_BUCKETS: char = 'r';

/// 제어 레코드 작성기
///
/// `field_count`는 데이터 레코드의 필드 수입니다. 제어 레코드는 그보다
/// 하나 더 긴 레코드로 쓰입니다.
pub struct ControlWriter<W: Write> {
    writer: LengthEncodedWriter<W>,
    record: Vec<String>,
}

impl<W: Write> ControlWriter<W> {
    /// 싱크와 데이터 레코드 필드 수로 작성기를 만듭니다.
    pub fn new(inner: W, field_count: usize) -> Self {
        Self {
            writer: LengthEncodedWriter::new(inner),
            record: vec![String::new(); field_count + 1],
        }
    }

    /// 플러시 메시지를 씁니다.
    pub fn write_flush(&mut self, flush_id: &str) -> std::io::Result<()> {
        self.write_message(format!("{FLUSH}{flush_id}"))
    }

    /// 중간 결과 계산 메시지를 씁니다.
    pub fn write_calc_interim(&mut self, range: &TimeRange) -> std::io::Result<()> {
        self.write_message(format!("{CALC_INTERIM}{} {}", range.start, range.end))
    }

    /// 시간 전진 메시지를 씁니다.
    pub fn write_advance_time(&mut self, epoch: i64) -> std::io::Result<()> {
        self.write_message(format!("{ADVANCE_TIME}{epoch}"))
    }

    /// 버킷 재설정 메시지를 씁니다.
    pub fn write_reset_range(&mut self, range: &TimeRange) -> std::io::Result<()> {
        self.write_message(format!("{RESET_BUCKETS}{} {}", range.start, range.end))
    }

    /// 싱크를 플러시합니다.
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    /// 내부 싱크를 돌려받습니다.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_message(&mut self, message: String) -> std::io::Result<()> {
        let last = self.record.len() - 1;
        self.record[last] = message;
        self.writer.write_record(&self.record)
    }
}
