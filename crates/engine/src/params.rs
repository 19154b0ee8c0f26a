//! 호출 파라미터 — 데이터 적재/플러시 요청의 검증과 정규화
//!
//! 날짜류 파라미터는 epoch 초 정수 또는 확장 ISO-8601 문자열을
//! 받습니다. 시간 범위는 반개구간 `[start, end)`로 정규화됩니다:
//! 시작만 주어지거나 시작과 끝이 같으면 1초 구간이 되고, 끝이 시작보다
//! 앞서면 검증 에러입니다.

use chrono::{DateTime, NaiveDateTime};
use driftwatch_core::error::ParamError;

/// 반개구간 시간 범위 `[start, end)` (epoch 초)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// 시작 (포함)
    pub start: i64,
    /// 끝 (제외)
    pub end: i64,
}

/// 데이터 적재 호출의 파라미터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataLoadParams {
    /// 원본 레코드를 외부 저장소에도 보존할지 여부
    ///
    /// 보존 자체는 외부 협력자의 몫이고, 여기서는 요청 플래그만
    /// 전달합니다.
    pub persisting: bool,
    /// 적재 전 버킷을 재설정할 시간 범위
    pub reset_range: Option<TimeRange>,
}

impl DataLoadParams {
    /// 원시 쿼리 파라미터로부터 적재 파라미터를 만듭니다.
    ///
    /// 버킷 재설정은 잡의 latency가 0보다 클 때만 지원됩니다.
    pub fn new(
        persisting: bool,
        reset_start: &str,
        reset_end: &str,
        latency_secs: u64,
    ) -> Result<Self, ParamError> {
        let reset_range = normalize_range("data load", "resetStart", reset_start, "resetEnd", reset_end)?;
        if reset_range.is_some() && latency_secs == 0 {
            return Err(ParamError::InvalidCombination {
                operation: "data load".to_owned(),
                reason: "bucket resetting is not supported when latency is zero".to_owned(),
            });
        }
        Ok(Self {
            persisting,
            reset_range,
        })
    }
}

/// 플러시 호출의 파라미터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterimResultsParams {
    /// 중간 결과를 계산할지 여부
    pub calc_interim: bool,
    /// 중간 결과를 계산할 시간 범위 (calc_interim일 때만 유효)
    pub range: Option<TimeRange>,
    /// 플러시 전에 엔진 시간을 이 시각까지 전진
    pub advance_time: Option<i64>,
}

impl InterimResultsParams {
    /// 원시 쿼리 파라미터로부터 플러시 파라미터를 만듭니다.
    pub fn new(
        calc_interim: bool,
        start: &str,
        end: &str,
        advance_time: &str,
    ) -> Result<Self, ParamError> {
        if !calc_interim && (!start.is_empty() || !end.is_empty()) {
            return Err(ParamError::InvalidCombination {
                operation: "flush".to_owned(),
                reason: "a time range may only be specified when calc_interim is true"
                    .to_owned(),
            });
        }
        let range = normalize_range("flush", "start", start, "end", end)?;
        let advance_time = parse_time_param("advanceTime", advance_time)?;
        Ok(Self {
            calc_interim,
            range,
            advance_time,
        })
    }
}

/// 원시 시작/끝 파라미터를 정규화된 시간 범위로 변환합니다.
fn normalize_range(
    operation: &str,
    start_name: &str,
    start: &str,
    end_name: &str,
    end: &str,
) -> Result<Option<TimeRange>, ParamError> {
    if start.is_empty() && end.is_empty() {
        return Ok(None);
    }
    if start.is_empty() {
        return Err(ParamError::InvalidCombination {
            operation: operation.to_owned(),
            reason: format!("'{end_name}' was specified without '{start_name}'"),
        });
    }

    let epoch_start = parse_time_param(start_name, start)?
        .ok_or_else(|| ParamError::UnparseableDate {
            param: start_name.to_owned(),
            value: start.to_owned(),
        })?;
    let epoch_end = match parse_time_param(end_name, end)? {
        // 끝이 없으면 1초 구간
        None => epoch_start + 1,
        Some(e) if e == epoch_start => epoch_start + 1,
        Some(e) if e < epoch_start => {
            return Err(ParamError::EndBeforeStart {
                start: start.to_owned(),
                end: end.to_owned(),
            });
        }
        Some(e) => e,
    };

    Ok(Some(TimeRange {
        start: epoch_start,
        end: epoch_end,
    }))
}

/// 날짜류 파라미터 하나를 epoch 초로 파싱합니다.
///
/// 빈 값은 `None`입니다. epoch 초 정수, 그리고 확장 ISO-8601
/// (소수 초와 콜론 없는 오프셋 포함)을 받습니다.
pub fn parse_time_param(name: &str, value: &str) -> Result<Option<i64>, ParamError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if let Ok(epoch) = value.parse::<i64>() {
        return Ok(Some(epoch));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(dt.timestamp()));
    }
    // 콜론 없는 오프셋 (+0000)
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(Some(dt.timestamp()));
    }
    // 오프셋 없는 값은 UTC로 해석
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Some(naive.and_utc().timestamp()));
    }
    Err(ParamError::UnparseableDate {
        param: name.to_owned(),
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reset_params_mean_no_reset() {
        let params = DataLoadParams::new(false, "", "", 60).unwrap();
        assert_eq!(params.reset_range, None);
    }

    #[test]
    fn reset_start_only_becomes_one_second_window() {
        let params = DataLoadParams::new(false, "1350824400", "", 60).unwrap();
        assert_eq!(
            params.reset_range,
            Some(TimeRange {
                start: 1350824400,
                end: 1350824401
            })
        );
    }

    #[test]
    fn reset_equal_start_end_becomes_one_second_window() {
        let params = DataLoadParams::new(false, "1350824400", "1350824400", 60).unwrap();
        assert_eq!(
            params.reset_range.unwrap(),
            TimeRange {
                start: 1350824400,
                end: 1350824401
            }
        );
    }

    #[test]
    fn reset_end_before_start_rejected() {
        let err = DataLoadParams::new(false, "1350824400", "1350820000", 60).unwrap_err();
        assert!(matches!(err, ParamError::EndBeforeStart { .. }));
    }

    #[test]
    fn reset_end_without_start_rejected() {
        let err = DataLoadParams::new(false, "", "1350824400", 60).unwrap_err();
        assert!(matches!(err, ParamError::InvalidCombination { .. }));
    }

    #[test]
    fn reset_requires_nonzero_latency() {
        let err = DataLoadParams::new(false, "1350824400", "1350824500", 0).unwrap_err();
        assert!(matches!(err, ParamError::InvalidCombination { .. }));
    }

    #[test]
    fn flush_range_requires_calc_interim() {
        let err = InterimResultsParams::new(false, "1350824400", "1350824500", "").unwrap_err();
        assert!(matches!(err, ParamError::InvalidCombination { .. }));
    }

    #[test]
    fn flush_interim_end_without_start_rejected() {
        let err = InterimResultsParams::new(true, "", "1350824500", "").unwrap_err();
        assert!(matches!(err, ParamError::InvalidCombination { .. }));
    }

    #[test]
    fn flush_interim_range_normalizes() {
        let params = InterimResultsParams::new(true, "1350824400", "1350824500", "").unwrap();
        assert!(params.calc_interim);
        assert_eq!(
            params.range.unwrap(),
            TimeRange {
                start: 1350824400,
                end: 1350824500
            }
        );
    }

    #[test]
    fn flush_advance_time_is_independent() {
        let params = InterimResultsParams::new(false, "", "", "1350828000").unwrap();
        assert_eq!(params.advance_time, Some(1350828000));
        assert_eq!(params.range, None);
    }

    #[test]
    fn iso8601_variants_parse() {
        for value in [
            "2012-10-21T14:00:00Z",
            "2012-10-21T14:00:00+00:00",
            "2012-10-21T14:00:00+0000",
            "2012-10-21T14:00:00.123Z",
        ] {
            assert_eq!(
                parse_time_param("start", value).unwrap(),
                Some(1350828000),
                "value: {value}"
            );
        }
    }

    #[test]
    fn iso8601_without_offset_is_utc() {
        assert_eq!(
            parse_time_param("start", "2012-10-21T14:00:00").unwrap(),
            Some(1350828000)
        );
    }

    #[test]
    fn unparseable_date_names_param_and_value() {
        let err = parse_time_param("resetStart", "yesterday").unwrap_err();
        match err {
            ParamError::UnparseableDate { param, value } => {
                assert_eq!(param, "resetStart");
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
