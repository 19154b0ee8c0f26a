//! 프로세스 매니저 통합 테스트
//!
//! 실제 분석 프로세스 대신 셸 스크립트 스텁을 스폰하여 생명주기와
//! 점유 직렬화를 검증합니다.

#![cfg(unix)]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use driftwatch_core::config::{AnalysisConfig, DataDescription, Detector, JobConfig};
use driftwatch_core::results::{ModelSnapshot, ResultEvent};
use driftwatch_engine::{
    DataLoadParams, EngineError, InterimResultsParams, ProcessManager, ProcessManagerConfig,
};

/// 주어진 본문의 실행 가능한 스텁 스크립트를 만듭니다.
fn stub_script(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("analyze-stub.sh");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh\n{body}").unwrap();
    drop(file);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn job_config() -> JobConfig {
    JobConfig {
        analysis: AnalysisConfig {
            bucket_span: Some(300),
            latency: Some(60),
            detectors: vec![
                Detector::new("metric")
                    .with_field("responsetime")
                    .by("airline"),
            ],
        },
        data: DataDescription {
            field_delimiter: ',',
            ..DataDescription::default()
        },
    }
}

fn manager_with(program: PathBuf, flush_timeout: Duration) -> ProcessManager {
    ProcessManager::new(
        ProcessManagerConfig {
            program,
            flush_timeout,
        },
        None,
    )
}

#[tokio::test]
async fn write_data_then_close_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    // stdin을 소비하고 종료 시 버킷 결과 하나를 출력
    let program = stub_script(
        &dir,
        r#"cat > /dev/null
echo '{"timestamp":1350824400,"anomaly_score":92.5}'"#,
    );
    let manager = manager_with(program, Duration::from_secs(5));
    manager.register("farequote", job_config()).unwrap();

    let input = "time,airline,responsetime\n1350824400,DJA,622\n".to_owned();
    let outcome = manager
        .write_data(
            "farequote",
            DataLoadParams::default(),
            std::io::Cursor::new(input.into_bytes()),
        )
        .await
        .unwrap();
    assert_eq!(outcome.counts.records_written, 1);

    let mut events = manager.subscribe("farequote").unwrap();
    manager.close("farequote").await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event before timeout")
        .expect("one result event");
    match event {
        ResultEvent::Bucket(bucket) => {
            assert_eq!(bucket.timestamp, 1350824400);
            assert_eq!(bucket.anomaly_score, 92.5);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // 닫힌 잡은 레지스트리에서 제거된다
    assert!(matches!(
        manager.close("farequote").await,
        Err(EngineError::UnknownJob { .. })
    ));
}

#[tokio::test]
async fn unknown_job_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let program = stub_script(&dir, "cat > /dev/null");
    let manager = manager_with(program, Duration::from_secs(5));

    let err = manager
        .write_data(
            "nope",
            DataLoadParams::default(),
            std::io::Cursor::new(Vec::new()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownJob { .. }));
}

#[tokio::test]
async fn concurrent_mutation_fails_fast_with_job_in_use() {
    let dir = tempfile::tempdir().unwrap();
    let program = stub_script(&dir, "cat > /dev/null");
    let manager = Arc::new(manager_with(program, Duration::from_secs(5)));
    manager.register("farequote", job_config()).unwrap();

    let handle = manager.ensure_started("farequote").unwrap();
    let guard = handle.try_acquire().unwrap();

    let err = manager
        .write_data(
            "farequote",
            DataLoadParams::default(),
            std::io::Cursor::new(b"time,airline,responsetime\n".to_vec()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::JobInUse { .. }));

    let err = manager
        .flush("farequote", InterimResultsParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::JobInUse { .. }));

    // 가드 해제 후에는 다시 받아들인다
    drop(guard);
    manager
        .write_data(
            "farequote",
            DataLoadParams::default(),
            std::io::Cursor::new(b"time,airline,responsetime\n1350824400,DJA,622\n".to_vec()),
        )
        .await
        .unwrap();
    manager.close("farequote").await.unwrap();
}

#[tokio::test]
async fn abnormal_exit_reports_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let program = stub_script(
        &dir,
        r#"cat > /dev/null
echo "model state corrupted" >&2
exit 2"#,
    );
    let manager = manager_with(program, Duration::from_secs(5));
    manager.register("farequote", job_config()).unwrap();
    manager.ensure_started("farequote").unwrap();

    let err = manager.close("farequote").await.unwrap_err();
    match err {
        EngineError::ProcessRun { reason, .. } => {
            assert!(reason.contains("model state corrupted"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn flush_times_out_when_process_never_acknowledges() {
    let dir = tempfile::tempdir().unwrap();
    let program = stub_script(&dir, "cat > /dev/null");
    let manager = manager_with(program, Duration::from_millis(200));
    manager.register("farequote", job_config()).unwrap();
    manager.ensure_started("farequote").unwrap();

    let err = manager
        .flush(
            "farequote",
            InterimResultsParams::new(true, "1350824400", "1350828000", "").unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ProcessRun { .. }));
    let _ = manager.close("farequote").await;
}

#[tokio::test]
async fn revert_records_snapshot_for_next_start() {
    let dir = tempfile::tempdir().unwrap();
    let args_file = dir.path().join("seen-args");
    let program = stub_script(
        &dir,
        &format!(
            r#"printf '%s\n' "$@" > {}
cat > /dev/null"#,
            args_file.display()
        ),
    );
    let manager = manager_with(program, Duration::from_secs(5));
    manager.register("farequote", job_config()).unwrap();

    let snapshot = ModelSnapshot {
        snapshot_id: "snap-42".to_owned(),
        timestamp: 1350824400,
        description: "before revert".to_owned(),
    };
    manager.revert("farequote", &snapshot).await.unwrap();
    manager.ensure_started("farequote").unwrap();

    // 스크립트가 인자를 기록할 시간
    tokio::time::sleep(Duration::from_millis(200)).await;
    let args = std::fs::read_to_string(&args_file).unwrap();
    assert!(args.contains("--restoreState=snap-42"), "args: {args}");

    manager.close("farequote").await.unwrap();
}
