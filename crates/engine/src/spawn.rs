//! 프로세스 스폰 — 네이티브 분석 프로세스의 커맨드라인 구성
//!
//! 잡 설정으로부터 분석 프로세스의 인자 목록을 만듭니다. 탐지기가
//! 하나면 분석 절을 인라인 인자로 넘기고, 여럿이면 ini 스타일 필드
//! 설정 임시 파일을 만들어 `--fieldconfig=`로 넘깁니다. 임시 파일은
//! 프로세스가 살아 있는 동안 핸들이 보유합니다.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use std::process::Stdio;

use tempfile::NamedTempFile;
use tokio::process::Command;

use driftwatch_core::config::{AnalysisConfig, DataDescription, Detector};

use crate::error::EngineError;

/// 인라인 분석 절 대신 필드 설정 파일을 쓰기 시작하는 탐지기 수
const MAX_INLINE_DETECTORS: usize = 1;

/// 스폰 준비가 끝난 커맨드와 수명을 같이할 임시 파일들
pub struct PreparedCommand {
    /// 실행할 커맨드 (stdin/stdout/stderr 파이프 설정 완료)
    pub command: Command,
    /// 필드 설정 임시 파일 (프로세스 수명 동안 유지)
    pub field_config: Option<NamedTempFile>,
}

/// 잡 설정으로부터 분석 프로세스 커맨드를 구성합니다.
pub fn build_command(
    program: &Path,
    job_id: &str,
    analysis: &AnalysisConfig,
    data: &DataDescription,
    restore_snapshot: Option<&str>,
) -> Result<PreparedCommand, EngineError> {
    let mut command = Command::new(program);
    command
        .arg("--lengthEncodedInput")
        .arg(format!("--timefield={}", data.time_field))
        .arg(format!("--delimiter={}", data.field_delimiter))
        .arg(format!("--logid={job_id}"));

    if let Some(span) = analysis.bucket_span {
        command.arg(format!("--bucketspan={span}"));
    }
    if analysis.latency_secs() > 0 {
        command.arg(format!("--latency={}", analysis.latency_secs()));
    }
    if let Some(snapshot_id) = restore_snapshot {
        command.arg(format!("--restoreState={snapshot_id}"));
    }

    let field_config = if analysis.detectors.len() <= MAX_INLINE_DETECTORS {
        if let Some(detector) = analysis.detectors.first() {
            command.arg(detector_clause(detector));
        }
        None
    } else {
        let file = write_field_config(analysis).map_err(EngineError::Io)?;
        command.arg(format!("--fieldconfig={}", file.path().display()));
        Some(file)
    };

    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    Ok(PreparedCommand {
        command,
        field_config,
    })
}

/// 탐지기 하나를 분석 절 문자열로 만듭니다.
///
/// `function(field) by X over Y partitionfield=Z` 형태이며, 설정되지
/// 않은 부분은 생략됩니다.
pub fn detector_clause(detector: &Detector) -> String {
    let mut clause = detector.function.clone();
    if let Some(field) = detector.field_name.as_deref().filter(|f| !f.is_empty()) {
        let _ = write!(clause, "({field})");
    }
    if let Some(by) = detector.by_field_name.as_deref().filter(|f| !f.is_empty()) {
        let _ = write!(clause, " by {by}");
    }
    if let Some(over) = detector.over_field_name.as_deref().filter(|f| !f.is_empty()) {
        let _ = write!(clause, " over {over}");
    }
    if let Some(partition) = detector
        .partition_field_name
        .as_deref()
        .filter(|f| !f.is_empty())
    {
        let _ = write!(clause, " partitionfield={partition}");
    }
    clause
}

/// 탐지기 목록을 ini 스타일 필드 설정 임시 파일로 씁니다.
fn write_field_config(analysis: &AnalysisConfig) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    for (index, detector) in analysis.detectors.iter().enumerate() {
        writeln!(
            file,
            "detector.{}.clause = {}",
            index + 1,
            detector_clause(detector)
        )?;
    }
    file.flush()?;
    Ok(file)
}
