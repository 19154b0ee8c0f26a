//! 출력 리더 — 분석 프로세스 stdout의 결과 스트림 소비
//!
//! 잡마다 백그라운드 태스크 하나가 stdout의 줄 단위 JSON 문서를
//! 읽습니다. 결과 문서는 [`ResultEvent`]로 분류되어 브로드캐스트
//! 채널로 발행되고, 결과 저장소가 있으면 그쪽에도 전달됩니다. 플러시
//! 응답(`{"flush":"<id>"}`)은 대기 중인 플러시 호출을 깨웁니다.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::ChildStdout;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;

use driftwatch_core::metrics as metric_names;
use driftwatch_core::persistence::ResultsStore;
use driftwatch_core::results::{Bucket, BucketInfluencer, Influencer, ModelSnapshot, ResultEvent};

/// 플러시 응답 대기 집합
///
/// 출력 리더가 응답을 적재하고, 플러시 호출자가 자신의 id를 기다립니다.
#[derive(Debug, Default)]
pub struct FlushAcks {
    acked: Mutex<HashSet<String>>,
    notify: Notify,
}

impl FlushAcks {
    /// 빈 대기 집합을 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 플러시 id의 응답을 적재하고 대기자를 깨웁니다.
    pub fn acknowledge(&self, flush_id: &str) {
        self.acked
            .lock()
            .expect("flush ack set poisoned")
            .insert(flush_id.to_owned());
        self.notify.notify_waiters();
    }

    /// 해당 id의 응답이 도착할 때까지 기다립니다.
    ///
    /// 응답은 소비되므로 같은 id를 두 번 기다릴 수 없습니다.
    pub async fn wait(&self, flush_id: &str) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // 집합을 확인하기 전에 대기자로 등록해야 응답을 놓치지 않는다
            notified.as_mut().enable();
            if self.take(flush_id) {
                return;
            }
            notified.await;
        }
    }

    /// 더 이상 기다리지 않는 플러시 id를 집합에서 지웁니다.
    ///
    /// 타임아웃 후 뒤늦게 도착한 응답이 남아 쌓이지 않게 합니다.
    pub fn forget(&self, flush_id: &str) {
        self.take(flush_id);
    }

    fn take(&self, flush_id: &str) -> bool {
        self.acked
            .lock()
            .expect("flush ack set poisoned")
            .remove(flush_id)
    }
}

/// 잡 하나의 출력 리더 태스크를 시작합니다.
pub(crate) fn spawn_reader(
    job_id: String,
    stdout: ChildStdout,
    acks: Arc<FlushAcks>,
    events: broadcast::Sender<ResultEvent>,
    store: Option<Arc<dyn ResultsStore>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    handle_line(&job_id, &line, &acks, &events, store.as_deref());
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "failed to read process output");
                    break;
                }
            }
        }
        tracing::debug!(job_id = %job_id, "process output stream ended");
    })
}

fn handle_line(
    job_id: &str,
    line: &str,
    acks: &FlushAcks,
    events: &broadcast::Sender<ResultEvent>,
    store: Option<&dyn ResultsStore>,
) {
    let document: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "unparseable process output line");
            return;
        }
    };

    if let Some(flush_id) = document.get("flush").and_then(Value::as_str) {
        tracing::debug!(job_id = %job_id, flush_id = %flush_id, "flush acknowledged");
        acks.acknowledge(flush_id);
        return;
    }

    let Some(event) = classify(document) else {
        tracing::debug!(job_id = %job_id, "skipping unrecognized result document");
        return;
    };

    metrics::counter!(metric_names::ENGINE_RESULTS_TOTAL,
        metric_names::LABEL_JOB_ID => job_id.to_owned())
    .increment(1);

    if let Some(store) = store
        && let Err(e) = store.persist(job_id, &event)
    {
        tracing::warn!(job_id = %job_id, error = %e, "failed to persist result");
    }

    // 구독자가 없으면 보내지 않고 버린다
    let _ = events.send(event);
}

/// 결과 문서를 도메인 이벤트로 분류합니다.
fn classify(document: Value) -> Option<ResultEvent> {
    let object = document.as_object()?;
    let event = if object.contains_key("snapshot_id") {
        ResultEvent::ModelSnapshot(serde_json::from_value::<ModelSnapshot>(document.clone()).ok()?)
    } else if object.contains_key("influencer_field_value") {
        ResultEvent::Influencer(serde_json::from_value::<Influencer>(document.clone()).ok()?)
    } else if object.contains_key("influencer_field_name") {
        ResultEvent::BucketInfluencer(
            serde_json::from_value::<BucketInfluencer>(document.clone()).ok()?,
        )
    } else if object.contains_key("timestamp") {
        ResultEvent::Bucket(serde_json::from_value::<Bucket>(document).ok()?)
    } else {
        return None;
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_bucket_document() {
        let doc: Value =
            serde_json::from_str(r#"{"timestamp":1350824400,"anomaly_score":92.5}"#).unwrap();
        match classify(doc) {
            Some(ResultEvent::Bucket(bucket)) => {
                assert_eq!(bucket.timestamp, 1350824400);
                assert_eq!(bucket.anomaly_score, 92.5);
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn classify_influencer_documents() {
        let influencer: Value = serde_json::from_str(
            r#"{"timestamp":1,"influencer_field_name":"airline","influencer_field_value":"DJA","anomaly_score":80.0}"#,
        )
        .unwrap();
        assert!(matches!(
            classify(influencer),
            Some(ResultEvent::Influencer(_))
        ));

        let bucket_influencer: Value = serde_json::from_str(
            r#"{"timestamp":1,"influencer_field_name":"airline","anomaly_score":70.0}"#,
        )
        .unwrap();
        assert!(matches!(
            classify(bucket_influencer),
            Some(ResultEvent::BucketInfluencer(_))
        ));
    }

    #[test]
    fn classify_snapshot_document() {
        let doc: Value = serde_json::from_str(
            r#"{"snapshot_id":"snap-1","timestamp":1350824400,"description":"after backfill"}"#,
        )
        .unwrap();
        assert!(matches!(classify(doc), Some(ResultEvent::ModelSnapshot(s)) if s.snapshot_id == "snap-1"));
    }

    #[test]
    fn unrecognized_document_is_skipped() {
        let doc: Value = serde_json::from_str(r#"{"progress":42}"#).unwrap();
        assert!(classify(doc).is_none());
    }

    #[tokio::test]
    async fn flush_ack_wakes_waiter() {
        let acks = Arc::new(FlushAcks::new());
        let waiter = {
            let acks = Arc::clone(&acks);
            tokio::spawn(async move { acks.wait("42").await })
        };
        // 대기자가 등록될 시간을 준 뒤 응답
        tokio::task::yield_now().await;
        acks.acknowledge("42");
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn ack_before_wait_is_not_lost() {
        let acks = FlushAcks::new();
        acks.acknowledge("7");
        acks.wait("7").await;
    }
}
