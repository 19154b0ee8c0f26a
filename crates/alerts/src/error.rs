//! 알림 에러 타입

use driftwatch_core::error::{DriftwatchError, ParamError};

/// 알림 등록 검증 에러
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AlertError {
    /// 인식할 수 없는 알림 타입 토큰
    #[error("unknown alert type '{token}'")]
    UnknownAlertType {
        /// 원시 토큰
        token: String,
    },

    /// [0, 100] 범위를 벗어난 임계값
    #[error("threshold '{param}' must be in the range 0 to 100, got {value}")]
    ThresholdOutOfRange {
        /// 파라미터 이름
        param: String,
        /// 주어진 값
        value: f64,
    },

    /// 임계값이 하나도 없음
    #[error("at least one of score or probability thresholds must be specified")]
    MissingThreshold,

    /// 0 이하의 타임아웃
    #[error("alert timeout must be greater than zero")]
    InvalidTimeout,
}

impl From<AlertError> for DriftwatchError {
    fn from(err: AlertError) -> Self {
        let (param, reason) = match &err {
            AlertError::UnknownAlertType { .. } => ("alertTypes", err.to_string()),
            AlertError::ThresholdOutOfRange { .. } => ("threshold", err.to_string()),
            AlertError::MissingThreshold => ("threshold", err.to_string()),
            AlertError::InvalidTimeout => ("timeout", err.to_string()),
        };
        DriftwatchError::Param(ParamError::InvalidValue {
            param: param.to_owned(),
            reason,
        })
    }
}
