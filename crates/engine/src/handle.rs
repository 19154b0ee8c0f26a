//! 잡 핸들 — 실행 중인 분석 프로세스 하나의 상태
//!
//! [`JobHandle`]은 자식 프로세스, stdin, 결과 브로드캐스트 채널, 플러시
//! 대기 집합, 누적 사용량을 보유합니다. 데이터 변경 조작은 잡당 하나만
//! 허용되며, [`InUseGuard`]가 RAII로 점유를 관리해 모든 종료 경로에서
//! 해제를 보장합니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin};
use tokio::sync::broadcast;

use driftwatch_core::results::ResultEvent;
use driftwatch_ingest::UsageCounts;

use crate::error::EngineError;
use crate::output::FlushAcks;

/// 프로세스 생명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// 실행 중 — 데이터와 제어 메시지를 받을 수 있음
    Running,
    /// 종료 중 — stdin이 닫혔고 종료를 기다리는 중
    Closing,
    /// 종료됨
    Closed,
}

/// 실행 중인 분석 프로세스 하나에 대한 핸들
pub struct JobHandle {
    job_id: String,
    in_use: AtomicBool,
    state: std::sync::Mutex<ProcessState>,
    child: tokio::sync::Mutex<Child>,
    stdin: tokio::sync::Mutex<Option<ChildStdin>>,
    stderr: std::sync::Mutex<Option<ChildStderr>>,
    usage: std::sync::Mutex<UsageCounts>,
    pub(crate) acks: Arc<FlushAcks>,
    pub(crate) events: broadcast::Sender<ResultEvent>,
    /// 데이터 레코드의 필드 수 (제어 레코드 구성에 필요)
    pub(crate) field_count: usize,
    /// 프로세스 수명 동안 유지해야 하는 필드 설정 임시 파일
    _field_config: Option<NamedTempFile>,
}

impl JobHandle {
    pub(crate) fn new(
        job_id: String,
        mut child: Child,
        field_count: usize,
        acks: Arc<FlushAcks>,
        events: broadcast::Sender<ResultEvent>,
        field_config: Option<NamedTempFile>,
    ) -> Self {
        let stdin = child.stdin.take();
        let stderr = child.stderr.take();
        Self {
            job_id,
            in_use: AtomicBool::new(false),
            state: std::sync::Mutex::new(ProcessState::Running),
            child: tokio::sync::Mutex::new(child),
            stdin: tokio::sync::Mutex::new(stdin),
            stderr: std::sync::Mutex::new(stderr),
            usage: std::sync::Mutex::new(UsageCounts::default()),
            acks,
            events,
            field_count,
            _field_config: field_config,
        }
    }

    /// 잡 ID
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// 현재 생명주기 상태
    pub fn state(&self) -> ProcessState {
        *self.state.lock().expect("state lock poisoned")
    }

    pub(crate) fn set_state(&self, state: ProcessState) {
        *self.state.lock().expect("state lock poisoned") = state;
    }

    /// 데이터 변경 조작을 위한 점유를 시도합니다.
    ///
    /// 이미 점유 중이면 기다리지 않고 즉시 실패합니다.
    pub fn try_acquire(self: &Arc<Self>) -> Result<InUseGuard, EngineError> {
        if self
            .in_use
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(EngineError::JobInUse {
                job_id: self.job_id.clone(),
            });
        }
        Ok(InUseGuard {
            handle: Arc::clone(self),
        })
    }

    /// 현재 점유 여부
    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    /// 결과 이벤트 스트림을 구독합니다.
    pub fn subscribe(&self) -> broadcast::Receiver<ResultEvent> {
        self.events.subscribe()
    }

    /// 잡 수명 동안 누적된 사용량
    pub fn usage(&self) -> UsageCounts {
        *self.usage.lock().expect("usage lock poisoned")
    }

    pub(crate) fn add_usage(&self, delta: UsageCounts) {
        self.usage
            .lock()
            .expect("usage lock poisoned")
            .add(delta.bytes_read, delta.records_read);
    }

    /// 프로세스가 아직 실행 중인지 확인합니다.
    pub async fn is_running(&self) -> bool {
        let mut child = self.child.lock().await;
        matches!(child.try_wait(), Ok(None))
    }

    /// 프로세스 stdin에 바이트를 씁니다.
    ///
    /// 파이프가 끊겼거나 stdin이 이미 닫혔으면 `ProcessRun` 에러입니다.
    pub(crate) async fn write_stdin(&self, bytes: &[u8]) -> Result<(), EngineError> {
        let mut stdin = self.stdin.lock().await;
        let Some(stdin) = stdin.as_mut() else {
            return Err(EngineError::ProcessRun {
                job_id: self.job_id.clone(),
                reason: "process stdin is closed".to_owned(),
            });
        };
        let result = async {
            stdin.write_all(bytes).await?;
            stdin.flush().await
        }
        .await;
        result.map_err(|e| EngineError::ProcessRun {
            job_id: self.job_id.clone(),
            reason: format!("cannot write to process: {e}"),
        })
    }

    /// stdin을 닫아 입력 종료를 알립니다.
    pub(crate) async fn close_stdin(&self) {
        self.stdin.lock().await.take();
    }

    /// 프로세스 종료를 기다리고, stderr 내용과 함께 상태를 반환합니다.
    pub(crate) async fn wait_exit(&self) -> Result<(std::process::ExitStatus, String), EngineError> {
        let stderr = self.stderr.lock().expect("stderr lock poisoned").take();
        let status = {
            let mut child = self.child.lock().await;
            child.wait().await.map_err(|e| EngineError::ProcessRun {
                job_id: self.job_id.clone(),
                reason: format!("cannot wait for process exit: {e}"),
            })?
        };
        let mut captured = String::new();
        if let Some(mut stderr) = stderr {
            use tokio::io::AsyncReadExt;
            let _ = stderr.read_to_string(&mut captured).await;
        }
        Ok((status, captured.trim().to_owned()))
    }
}

/// 데이터 변경 조작의 점유 가드
///
/// 드롭 시 점유를 해제합니다. 에러 경로를 포함한 모든 경로에서 해제가
/// 일어나도록 호출자는 조작 범위 동안만 가드를 보유합니다.
pub struct InUseGuard {
    handle: Arc<JobHandle>,
}

impl Drop for InUseGuard {
    fn drop(&mut self) {
        self.handle.in_use.store(false, Ordering::Release);
    }
}
