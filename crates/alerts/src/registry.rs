//! 알림 레지스트리 — 잡별 롱폴 대기 집합
//!
//! 등록은 oneshot 완료 채널을 즉시 돌려주고 스레드를 점유하지
//! 않습니다. 대기 항목은 결과 발화 또는 타이머 만료 중 정확히 한
//! 번만 제거되고, 제거한 쪽이 완료를 보냅니다. 잡이 다르면 평가는
//! 서로 간섭하지 않습니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};

use driftwatch_core::metrics as metric_names;
use driftwatch_core::results::ResultEvent;

use crate::error::AlertError;
use crate::trigger::AlertTrigger;

/// 롱폴 하나의 최종 응답
#[derive(Debug, Clone)]
pub struct Alert {
    /// 잡 ID
    pub job_id: String,
    /// 발화시킨 결과 (만료 시 None)
    pub event: Option<ResultEvent>,
    /// 타이머 만료로 끝났는지 여부
    pub timed_out: bool,
}

struct PendingAlert {
    trigger: AlertTrigger,
    sender: oneshot::Sender<Alert>,
}

/// 잡별 대기 집합을 관리하는 레지스트리
#[derive(Default)]
pub struct AlertRegistry {
    pending: Mutex<HashMap<String, HashMap<u64, PendingAlert>>>,
    next_id: AtomicU64,
}

impl AlertRegistry {
    /// 빈 레지스트리를 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 롱폴 알림을 등록합니다.
    ///
    /// 검증을 통과하면 완료 수신기를 즉시 반환합니다. `timeout`이
    /// 지나도록 발화가 없으면 빈 응답으로 정확히 한 번 완료됩니다.
    pub fn register(
        self: &Arc<Self>,
        job_id: &str,
        timeout: Duration,
        trigger: AlertTrigger,
    ) -> Result<oneshot::Receiver<Alert>, AlertError> {
        if timeout.is_zero() {
            return Err(AlertError::InvalidTimeout);
        }

        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        {
            let mut pending = self.pending.lock().expect("pending set poisoned");
            pending
                .entry(job_id.to_owned())
                .or_default()
                .insert(request_id, PendingAlert { trigger, sender });
        }
        metrics::gauge!(metric_names::ALERTS_PENDING_REQUESTS).increment(1.0);
        tracing::debug!(job_id = %job_id, request_id, ?timeout, "registered alert long poll");

        let registry = Arc::clone(self);
        let job = job_id.to_owned();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            registry.expire(&job, request_id);
        });

        Ok(receiver)
    }

    /// 결과 이벤트 하나를 잡의 모든 대기 항목에 대해 평가합니다.
    pub fn on_result(&self, job_id: &str, event: &ResultEvent) {
        let fired: Vec<PendingAlert> = {
            let mut pending = self.pending.lock().expect("pending set poisoned");
            let Some(requests) = pending.get_mut(job_id) else {
                return;
            };
            let matching: Vec<u64> = requests
                .iter()
                .filter(|(_, p)| p.trigger.evaluate(event))
                .map(|(&id, _)| id)
                .collect();
            let fired: Vec<PendingAlert> = matching
                .into_iter()
                .filter_map(|id| requests.remove(&id))
                .collect();
            if requests.is_empty() {
                pending.remove(job_id);
            }
            fired
        };

        for pending in fired {
            metrics::gauge!(metric_names::ALERTS_PENDING_REQUESTS).decrement(1.0);
            metrics::counter!(metric_names::ALERTS_FIRED_TOTAL,
                metric_names::LABEL_JOB_ID => job_id.to_owned())
            .increment(1);
            // 수신자가 이미 떠났으면 조용히 버린다
            let _ = pending.sender.send(Alert {
                job_id: job_id.to_owned(),
                event: Some(event.clone()),
                timed_out: false,
            });
        }
    }

    /// 잡의 결과 브로드캐스트 스트림을 소비하는 평가 태스크를 시작합니다.
    pub fn watch(
        self: &Arc<Self>,
        job_id: &str,
        mut events: broadcast::Receiver<ResultEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let job = job_id.to_owned();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => registry.on_result(&job, &event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(job_id = %job, skipped, "alert evaluation lagged behind results");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// 현재 대기 중인 요청 수 (잡 전체)
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .expect("pending set poisoned")
            .values()
            .map(HashMap::len)
            .sum()
    }

    fn expire(&self, job_id: &str, request_id: u64) {
        let expired = {
            let mut pending = self.pending.lock().expect("pending set poisoned");
            let requests = pending.get_mut(job_id);
            let expired = requests.and_then(|r| r.remove(&request_id));
            if let Some(requests) = pending.get(job_id)
                && requests.is_empty()
            {
                pending.remove(job_id);
            }
            expired
        };

        // 이미 발화로 제거됐으면 할 일이 없다
        let Some(pending) = expired else { return };
        metrics::gauge!(metric_names::ALERTS_PENDING_REQUESTS).decrement(1.0);
        metrics::counter!(metric_names::ALERTS_TIMED_OUT_TOTAL,
            metric_names::LABEL_JOB_ID => job_id.to_owned())
        .increment(1);
        tracing::debug!(job_id = %job_id, request_id, "alert long poll expired");
        let _ = pending.sender.send(Alert {
            job_id: job_id.to_owned(),
            event: None,
            timed_out: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::parse_alert_types;
    use driftwatch_core::results::Bucket;

    fn trigger(score: f64, include_interim: bool) -> AlertTrigger {
        AlertTrigger::new(
            parse_alert_types("bucket").unwrap(),
            Some(score),
            None,
            include_interim,
        )
        .unwrap()
    }

    fn bucket_event(score: f64) -> ResultEvent {
        ResultEvent::Bucket(Bucket {
            timestamp: 1350824400,
            anomaly_score: score,
            max_normalized_probability: 0.0,
            is_interim: false,
        })
    }

    #[tokio::test]
    async fn firing_result_completes_long_poll() {
        let registry = Arc::new(AlertRegistry::new());
        let receiver = registry
            .register("farequote", Duration::from_secs(30), trigger(80.0, false))
            .unwrap();

        registry.on_result("farequote", &bucket_event(92.5));
        let alert = receiver.await.unwrap();
        assert!(!alert.timed_out);
        assert!(matches!(alert.event, Some(ResultEvent::Bucket(_))));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn below_threshold_result_leaves_request_pending() {
        let registry = Arc::new(AlertRegistry::new());
        let _receiver = registry
            .register("farequote", Duration::from_secs(30), trigger(80.0, false))
            .unwrap();

        registry.on_result("farequote", &bucket_event(10.0));
        assert_eq!(registry.pending_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_resolves_with_empty_response_exactly_once() {
        let registry = Arc::new(AlertRegistry::new());
        let receiver = registry
            .register("farequote", Duration::from_secs(1), trigger(80.0, false))
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        let alert = receiver.await.unwrap();
        assert!(alert.timed_out);
        assert!(alert.event.is_none());
        assert_eq!(registry.pending_count(), 0);

        // 만료 후의 결과는 아무에게도 가지 않는다
        registry.on_result("farequote", &bucket_event(99.0));
    }

    #[tokio::test]
    async fn zero_timeout_rejected() {
        let registry = Arc::new(AlertRegistry::new());
        let err = registry
            .register("farequote", Duration::ZERO, trigger(80.0, false))
            .unwrap_err();
        assert_eq!(err, AlertError::InvalidTimeout);
    }

    #[tokio::test]
    async fn jobs_are_evaluated_independently() {
        let registry = Arc::new(AlertRegistry::new());
        let first = registry
            .register("job-a", Duration::from_secs(30), trigger(80.0, false))
            .unwrap();
        let _second = registry
            .register("job-b", Duration::from_secs(30), trigger(80.0, false))
            .unwrap();

        registry.on_result("job-a", &bucket_event(95.0));
        let alert = first.await.unwrap();
        assert_eq!(alert.job_id, "job-a");
        // job-b 쪽은 그대로 대기
        assert_eq!(registry.pending_count(), 1);
    }

    #[tokio::test]
    async fn one_result_can_fire_multiple_requests() {
        let registry = Arc::new(AlertRegistry::new());
        let first = registry
            .register("farequote", Duration::from_secs(30), trigger(50.0, false))
            .unwrap();
        let second = registry
            .register("farequote", Duration::from_secs(30), trigger(90.0, false))
            .unwrap();

        registry.on_result("farequote", &bucket_event(95.0));
        assert!(!first.await.unwrap().timed_out);
        assert!(!second.await.unwrap().timed_out);
    }
}
