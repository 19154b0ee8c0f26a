//! 분석 결과 타입 — 엔진 프로세스가 출력하는 결과 문서
//!
//! 분석 엔진은 버킷 단위의 이상 점수, 버킷/전역 인플루언서, 모델
//! 스냅샷 문서를 JSON으로 출력합니다. 이 모듈은 그 문서들의 도메인
//! 표현과, 결과 한 건을 구독자에게 전달하는 [`ResultEvent`]를 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 버킷 — 고정 시간 윈도우 하나의 집계 분석 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bucket {
    /// 버킷 시작 시각 (epoch 초)
    pub timestamp: i64,
    /// 이상 점수 (0~100)
    #[serde(default)]
    pub anomaly_score: f64,
    /// 버킷 내 레코드의 최대 정규화 확률 (0~100)
    #[serde(default)]
    pub max_normalized_probability: f64,
    /// 중간(비확정) 결과 여부
    #[serde(default)]
    pub is_interim: bool,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bucket@{} score={:.2} maxprob={:.2}{}",
            self.timestamp,
            self.anomaly_score,
            self.max_normalized_probability,
            if self.is_interim { " (interim)" } else { "" },
        )
    }
}

/// 버킷 인플루언서 — 버킷 하나에 기여한 필드 수준 점수
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketInfluencer {
    /// 버킷 시작 시각 (epoch 초)
    pub timestamp: i64,
    /// 인플루언서 필드 이름
    pub influencer_field_name: String,
    /// 이상 점수 (0~100)
    #[serde(default)]
    pub anomaly_score: f64,
    /// 중간 결과 여부
    #[serde(default)]
    pub is_interim: bool,
}

/// 인플루언서 — 특정 필드 값 수준의 이상 점수
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Influencer {
    /// 버킷 시작 시각 (epoch 초)
    pub timestamp: i64,
    /// 인플루언서 필드 이름
    pub influencer_field_name: String,
    /// 인플루언서 필드 값
    pub influencer_field_value: String,
    /// 이상 점수 (0~100)
    #[serde(default)]
    pub anomaly_score: f64,
    /// 중간 결과 여부
    #[serde(default)]
    pub is_interim: bool,
}

/// 모델 스냅샷 — 엔진 내부 모델 상태의 복원 가능한 체크포인트
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// 스냅샷 ID
    pub snapshot_id: String,
    /// 스냅샷 생성 시각 (epoch 초)
    pub timestamp: i64,
    /// 사람이 읽을 수 있는 설명
    #[serde(default)]
    pub description: String,
}

/// 결과 이벤트 — 잡 하나의 결과 스트림에서 발행되는 한 건
///
/// 엔진 프로세스의 출력 리더가 발행하며, 알림 레지스트리와 결과
/// 저장소가 소비합니다. 잡 내부에서는 프로세스가 출력한 순서대로
/// 전달됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResultEvent {
    /// 새 버킷 결과
    Bucket(Bucket),
    /// 버킷 인플루언서 결과
    BucketInfluencer(BucketInfluencer),
    /// 인플루언서 결과
    Influencer(Influencer),
    /// 새 모델 스냅샷
    ModelSnapshot(ModelSnapshot),
}

impl ResultEvent {
    /// 이벤트의 중간 결과 여부를 반환합니다.
    pub fn is_interim(&self) -> bool {
        match self {
            ResultEvent::Bucket(b) => b.is_interim,
            ResultEvent::BucketInfluencer(bi) => bi.is_interim,
            ResultEvent::Influencer(i) => i.is_interim,
            ResultEvent::ModelSnapshot(_) => false,
        }
    }

    /// 이벤트의 타임스탬프를 반환합니다 (epoch 초).
    pub fn timestamp(&self) -> i64 {
        match self {
            ResultEvent::Bucket(b) => b.timestamp,
            ResultEvent::BucketInfluencer(bi) => bi.timestamp,
            ResultEvent::Influencer(i) => i.timestamp,
            ResultEvent::ModelSnapshot(s) => s.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_display_marks_interim() {
        let bucket = Bucket {
            timestamp: 1350824400,
            anomaly_score: 75.5,
            max_normalized_probability: 60.0,
            is_interim: true,
        };
        let text = bucket.to_string();
        assert!(text.contains("1350824400"));
        assert!(text.contains("(interim)"));
    }

    #[test]
    fn result_event_timestamp_and_interim() {
        let event = ResultEvent::Influencer(Influencer {
            timestamp: 100,
            influencer_field_name: "airline".to_owned(),
            influencer_field_value: "DJA".to_owned(),
            anomaly_score: 90.0,
            is_interim: false,
        });
        assert_eq!(event.timestamp(), 100);
        assert!(!event.is_interim());
    }

    #[test]
    fn bucket_deserializes_with_missing_optionals() {
        let bucket: Bucket =
            serde_json::from_str(r#"{"timestamp": 1350824400}"#).expect("valid doc");
        assert_eq!(bucket.timestamp, 1350824400);
        assert_eq!(bucket.anomaly_score, 0.0);
        assert!(!bucket.is_interim);
    }
}
