//! 알림 트리거 — 결과 이벤트에 대한 발화 조건
//!
//! 트리거는 관심 결과 타입 집합과 점수/확률 임계값으로 구성됩니다.
//! 임계값은 [0, 100] 범위여야 하고 둘 중 하나는 반드시 주어져야
//! 합니다. 중간(비확정) 결과는 `include_interim`일 때만 평가됩니다.

use std::collections::BTreeSet;
use std::str::FromStr;

use driftwatch_core::results::ResultEvent;

use crate::error::AlertError;

/// 알림 대상 결과 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertType {
    /// 버킷 이상 점수
    Bucket,
    /// 버킷 인플루언서 점수
    BucketInfluencer,
    /// 인플루언서 점수
    Influencer,
}

impl FromStr for AlertType {
    type Err = AlertError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim() {
            "bucket" => Ok(AlertType::Bucket),
            "bucketinfluencer" => Ok(AlertType::BucketInfluencer),
            "influencer" => Ok(AlertType::Influencer),
            other => Err(AlertError::UnknownAlertType {
                token: other.to_owned(),
            }),
        }
    }
}

/// 쉼표로 구분된 토큰 목록을 타입 집합으로 파싱합니다.
///
/// 중복 토큰은 하나로 합쳐지고, 인식할 수 없는 토큰은 전체 등록을
/// 실패시킵니다.
pub fn parse_alert_types(tokens: &str) -> Result<BTreeSet<AlertType>, AlertError> {
    tokens
        .split(',')
        .filter(|t| !t.trim().is_empty())
        .map(AlertType::from_str)
        .collect()
}

/// 알림 하나의 발화 조건
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTrigger {
    /// 평가할 결과 타입 집합
    pub types: BTreeSet<AlertType>,
    /// 이상 점수 임계값 (0~100)
    pub score_threshold: Option<f64>,
    /// 최대 정규화 확률 임계값 (0~100, 버킷 전용)
    pub probability_threshold: Option<f64>,
    /// 중간 결과도 평가할지 여부
    pub include_interim: bool,
}

impl AlertTrigger {
    /// 검증된 트리거를 만듭니다.
    pub fn new(
        types: BTreeSet<AlertType>,
        score_threshold: Option<f64>,
        probability_threshold: Option<f64>,
        include_interim: bool,
    ) -> Result<Self, AlertError> {
        if score_threshold.is_none() && probability_threshold.is_none() {
            return Err(AlertError::MissingThreshold);
        }
        validate_threshold("score", score_threshold)?;
        validate_threshold("probability", probability_threshold)?;
        Ok(Self {
            types,
            score_threshold,
            probability_threshold,
            include_interim,
        })
    }

    /// 결과 이벤트가 이 트리거를 발화시키는지 평가합니다.
    pub fn evaluate(&self, event: &ResultEvent) -> bool {
        if event.is_interim() && !self.include_interim {
            return false;
        }
        match event {
            ResultEvent::Bucket(bucket) => {
                self.types.contains(&AlertType::Bucket)
                    && (exceeds(self.score_threshold, bucket.anomaly_score)
                        || exceeds(
                            self.probability_threshold,
                            bucket.max_normalized_probability,
                        ))
            }
            ResultEvent::BucketInfluencer(bi) => {
                self.types.contains(&AlertType::BucketInfluencer)
                    && exceeds(self.score_threshold, bi.anomaly_score)
            }
            ResultEvent::Influencer(influencer) => {
                self.types.contains(&AlertType::Influencer)
                    && exceeds(self.score_threshold, influencer.anomaly_score)
            }
            ResultEvent::ModelSnapshot(_) => false,
        }
    }
}

fn exceeds(threshold: Option<f64>, value: f64) -> bool {
    threshold.is_some_and(|t| value >= t)
}

fn validate_threshold(param: &str, threshold: Option<f64>) -> Result<(), AlertError> {
    if let Some(value) = threshold
        && !(0.0..=100.0).contains(&value)
    {
        return Err(AlertError::ThresholdOutOfRange {
            param: param.to_owned(),
            value,
        });
    }
    Ok(())
}
