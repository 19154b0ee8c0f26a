//! 프로세스 매니저 — 잡별 분석 프로세스의 레지스트리와 조작
//!
//! 잡 ID 하나에 프로세스 핸들 하나만 존재합니다. 데이터 적재는 변환을
//! 블로킹 태스크에서 수행하고, 인코딩된 바이트를 채널로 받아 프로세스
//! stdin에 비동기로 흘립니다. 플러시는 제어 메시지를 쓴 뒤 출력
//! 리더가 응답을 관찰할 때까지 기다립니다.
//!
//! # 사용 예시
//! ```ignore
//! use driftwatch_engine::{ProcessManager, ProcessManagerConfig};
//!
//! let manager = ProcessManager::new(ProcessManagerConfig::default(), None);
//! manager.register("farequote", config)?;
//! let outcome = manager.write_data("farequote", params, file).await?;
//! ```

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc};

use driftwatch_core::config::JobConfig;
use driftwatch_core::metrics as metric_names;
use driftwatch_core::persistence::ResultsStore;
use driftwatch_core::results::{ModelSnapshot, ResultEvent};
use driftwatch_ingest::fields::FieldLayout;
use driftwatch_ingest::{IngestPolicy, RecordTransformer, UsageCounts};
use driftwatch_ingest::transform::TransformOutcome;

use crate::control::ControlWriter;
use crate::error::EngineError;
use crate::handle::{JobHandle, ProcessState};
use crate::output::{FlushAcks, spawn_reader};
use crate::params::{DataLoadParams, InterimResultsParams};
use crate::spawn::build_command;

/// 결과 이벤트 브로드캐스트 채널 용량
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// stdin으로 흘리는 인코딩 청크 채널 용량
const STDIN_CHANNEL_CAPACITY: usize = 64;

/// 프로세스 매니저 설정
#[derive(Debug, Clone)]
pub struct ProcessManagerConfig {
    /// 분석 프로세스 실행 파일 경로
    pub program: PathBuf,
    /// 플러시 응답 대기 한도
    pub flush_timeout: Duration,
}

impl Default for ProcessManagerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("driftwatch-analyze"),
            flush_timeout: Duration::from_secs(120),
        }
    }
}

/// 잡별 분석 프로세스의 레지스트리
pub struct ProcessManager {
    config: ProcessManagerConfig,
    store: Option<Arc<dyn ResultsStore>>,
    configs: Mutex<HashMap<String, Arc<JobConfig>>>,
    handles: Mutex<HashMap<String, Arc<JobHandle>>>,
    pending_restore: Mutex<HashMap<String, String>>,
}

impl ProcessManager {
    /// 매니저를 만듭니다. 결과 저장소는 선택입니다.
    pub fn new(config: ProcessManagerConfig, store: Option<Arc<dyn ResultsStore>>) -> Self {
        Self {
            config,
            store,
            configs: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            pending_restore: Mutex::new(HashMap::new()),
        }
    }

    /// 잡 설정을 등록합니다. 이후 모든 조작은 이 설정을 따릅니다.
    pub fn register(
        &self,
        job_id: impl Into<String>,
        config: JobConfig,
    ) -> Result<(), EngineError> {
        if let Err(e) = config.validate() {
            return Err(EngineError::Param(
                driftwatch_core::error::ParamError::InvalidValue {
                    param: "job config".to_owned(),
                    reason: e.to_string(),
                },
            ));
        }
        self.configs
            .lock()
            .expect("config registry poisoned")
            .insert(job_id.into(), Arc::new(config));
        Ok(())
    }

    /// 잡의 프로세스가 없으면 시작하고, 핸들을 반환합니다.
    pub fn ensure_started(&self, job_id: &str) -> Result<Arc<JobHandle>, EngineError> {
        let config = self.config_for(job_id)?;
        let mut handles = self.handles.lock().expect("handle registry poisoned");
        if let Some(handle) = handles.get(job_id) {
            return Ok(Arc::clone(handle));
        }

        let restore = self
            .pending_restore
            .lock()
            .expect("restore registry poisoned")
            .remove(job_id);
        let mut prepared = build_command(
            &self.config.program,
            job_id,
            &config.analysis,
            &config.data,
            restore.as_deref(),
        )?;
        let mut child = prepared.command.spawn().map_err(|e| EngineError::ProcessRun {
            job_id: job_id.to_owned(),
            reason: format!("cannot start analysis process: {e}"),
        })?;

        let stdout = child.stdout.take().ok_or_else(|| EngineError::ProcessRun {
            job_id: job_id.to_owned(),
            reason: "process stdout is not piped".to_owned(),
        })?;
        let acks = Arc::new(FlushAcks::new());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        // 리더 태스크는 stdout이 닫히면 스스로 끝난다
        let _ = spawn_reader(
            job_id.to_owned(),
            stdout,
            Arc::clone(&acks),
            events.clone(),
            self.store.clone(),
        );

        let field_count = FieldLayout::new(&config.analysis, &config.data).len();
        let handle = Arc::new(JobHandle::new(
            job_id.to_owned(),
            child,
            field_count,
            acks,
            events,
            prepared.field_config.take(),
        ));
        handles.insert(job_id.to_owned(), Arc::clone(&handle));
        metrics::gauge!(metric_names::ENGINE_RUNNING_PROCESSES).increment(1.0);
        tracing::info!(job_id = %job_id, restored = restore.is_some(), "started analysis process");
        Ok(handle)
    }

    /// 입력 스트림을 변환해 잡의 프로세스로 적재합니다.
    ///
    /// 점유 가드를 잡은 뒤, 재설정 범위가 있으면 제어 메시지를 먼저
    /// 보내고 변환을 시작합니다. 반환되는 결과에는 이번 호출의
    /// 카운터와 사용량이 담깁니다.
    pub async fn write_data<R>(
        &self,
        job_id: &str,
        params: DataLoadParams,
        input: R,
    ) -> Result<TransformOutcome, EngineError>
    where
        R: Read + Send + 'static,
    {
        let config = self.config_for(job_id)?;
        let handle = self.ensure_started(job_id)?;
        let _guard = handle.try_acquire()?;

        if params.persisting {
            // 원본 레코드 보존은 외부 협력자의 몫 — 요청만 남긴다
            tracing::debug!(job_id = %job_id, "raw record persistence requested for this load");
        }
        if let Some(range) = params.reset_range {
            let mut control = ControlWriter::new(Vec::new(), handle.field_count);
            control.write_reset_range(&range)?;
            handle.write_stdin(&control.into_inner()).await?;
        }

        let transformer =
            RecordTransformer::new(&config.analysis, &config.data, IngestPolicy::default());
        let (tx, mut rx) = mpsc::channel::<Bytes>(STDIN_CHANNEL_CAPACITY);
        let job = job_id.to_owned();
        let worker = tokio::task::spawn_blocking(move || {
            transformer.transform(&job, input, ChannelWriter { tx })
        });

        let mut write_error = None;
        while let Some(chunk) = rx.recv().await {
            if let Err(e) = handle.write_stdin(&chunk).await {
                write_error = Some(e);
                break;
            }
        }
        drop(rx);

        let transform_result = worker.await.map_err(|e| EngineError::ProcessRun {
            job_id: job_id.to_owned(),
            reason: format!("transform task failed: {e}"),
        })?;

        // stdin 쪽 실패가 원인이면 그쪽을 보고한다
        if let Some(e) = write_error {
            return Err(e);
        }
        let outcome = transform_result?;
        handle.add_usage(outcome.usage);
        Ok(outcome)
    }

    /// 플러시 — 쌓인 입력을 결과로 반영하고 응답을 기다립니다.
    ///
    /// 중간 결과 범위/시간 전진 메시지를 먼저 쓰고, 새 플러시 id로
    /// 플러시 메시지를 보낸 뒤 출력 리더가 응답을 관찰할 때까지
    /// 기다립니다. 반환값은 사용한 플러시 id입니다.
    pub async fn flush(
        &self,
        job_id: &str,
        params: InterimResultsParams,
    ) -> Result<String, EngineError> {
        let handle = self.handle(job_id)?;
        let _guard = handle.try_acquire()?;

        if !handle.is_running().await {
            return Err(EngineError::ProcessRun {
                job_id: job_id.to_owned(),
                reason: "cannot flush: process has already exited".to_owned(),
            });
        }

        let flush_id = uuid::Uuid::new_v4().simple().to_string();
        let mut control = ControlWriter::new(Vec::new(), handle.field_count);
        if params.calc_interim
            && let Some(range) = params.range
        {
            control.write_calc_interim(&range)?;
        }
        if let Some(advance_time) = params.advance_time {
            control.write_advance_time(advance_time)?;
        }
        control.write_flush(&flush_id)?;
        handle.write_stdin(&control.into_inner()).await?;

        let wait = tokio::time::timeout(self.config.flush_timeout, handle.acks.wait(&flush_id));
        if wait.await.is_err() {
            handle.acks.forget(&flush_id);
            let reason = if handle.is_running().await {
                "timed out waiting for flush acknowledgement".to_owned()
            } else {
                "process exited before acknowledging flush".to_owned()
            };
            return Err(EngineError::ProcessRun {
                job_id: job_id.to_owned(),
                reason,
            });
        }

        metrics::counter!(metric_names::ENGINE_FLUSHES_TOTAL,
            metric_names::LABEL_JOB_ID => job_id.to_owned())
        .increment(1);
        tracing::debug!(job_id = %job_id, flush_id = %flush_id, "flush completed");
        Ok(flush_id)
    }

    /// 잡의 프로세스를 정상 종료합니다.
    ///
    /// stdin을 닫아 입력 종료를 알리고 프로세스가 끝나기를 기다립니다.
    /// 0이 아닌 종료 코드는 stderr 내용과 함께 에러로 보고됩니다.
    pub async fn close(&self, job_id: &str) -> Result<(), EngineError> {
        let handle = self.handle(job_id)?;
        let _guard = handle.try_acquire()?;

        handle.set_state(ProcessState::Closing);
        handle.close_stdin().await;
        let exit = handle.wait_exit().await;

        self.handles
            .lock()
            .expect("handle registry poisoned")
            .remove(job_id);
        handle.set_state(ProcessState::Closed);
        metrics::gauge!(metric_names::ENGINE_RUNNING_PROCESSES).decrement(1.0);

        let (status, stderr) = exit?;
        if !status.success() {
            return Err(EngineError::ProcessRun {
                job_id: job_id.to_owned(),
                reason: format!("process exited abnormally ({status}): {stderr}"),
            });
        }
        tracing::info!(job_id = %job_id, "analysis process closed");
        Ok(())
    }

    /// 모델 스냅샷으로 되돌립니다.
    ///
    /// 실행 중인 프로세스가 있으면 종료한 뒤, 다음 시작 때 스냅샷을
    /// 복원하도록 기록합니다.
    pub async fn revert(
        &self,
        job_id: &str,
        snapshot: &ModelSnapshot,
    ) -> Result<(), EngineError> {
        let running = {
            let handles = self.handles.lock().expect("handle registry poisoned");
            handles.get(job_id).cloned()
        };
        if let Some(handle) = running {
            if handle.is_in_use() {
                return Err(EngineError::JobInUse {
                    job_id: job_id.to_owned(),
                });
            }
            self.close(job_id).await?;
        }
        self.pending_restore
            .lock()
            .expect("restore registry poisoned")
            .insert(job_id.to_owned(), snapshot.snapshot_id.clone());
        tracing::info!(
            job_id = %job_id,
            snapshot_id = %snapshot.snapshot_id,
            "job will restore model snapshot on next start"
        );
        Ok(())
    }

    /// 잡의 결과 이벤트 스트림을 구독합니다.
    pub fn subscribe(&self, job_id: &str) -> Result<broadcast::Receiver<ResultEvent>, EngineError> {
        Ok(self.handle(job_id)?.subscribe())
    }

    /// 잡 수명 동안 누적된 사용량
    pub fn usage(&self, job_id: &str) -> Result<UsageCounts, EngineError> {
        Ok(self.handle(job_id)?.usage())
    }

    /// 잡의 프로세스가 실행 중인지 확인합니다.
    pub async fn is_running(&self, job_id: &str) -> bool {
        match self.handle(job_id) {
            Ok(handle) => handle.is_running().await,
            Err(_) => false,
        }
    }

    fn config_for(&self, job_id: &str) -> Result<Arc<JobConfig>, EngineError> {
        self.configs
            .lock()
            .expect("config registry poisoned")
            .get(job_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownJob {
                job_id: job_id.to_owned(),
            })
    }

    fn handle(&self, job_id: &str) -> Result<Arc<JobHandle>, EngineError> {
        self.handles
            .lock()
            .expect("handle registry poisoned")
            .get(job_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownJob {
                job_id: job_id.to_owned(),
            })
    }
}

/// 블로킹 변환기의 출력을 비동기 stdin 펌프로 넘기는 싱크
struct ChannelWriter {
    tx: mpsc::Sender<Bytes>,
}

impl std::io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tx
            .blocking_send(Bytes::copy_from_slice(buf))
            .map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "process stdin closed")
            })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
