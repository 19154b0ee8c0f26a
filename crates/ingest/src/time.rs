//! 타임스탬프 파싱 — 원시 시간 토큰을 정규 epoch 초로 변환
//!
//! 시간 형식은 세 가지입니다:
//! - epoch: 초 단위 숫자. 소수부는 버림(반올림 아님).
//! - epoch_ms: 밀리초 단위 숫자. 소수부 버림 후 초로 내림 변환.
//! - 패턴: chrono 형식 문자열. 값 끝의 오프셋 토큰(`Z`, `+0000`,
//!   `+00:00`)은 패턴에 오프셋 지시자가 없어도 허용됩니다.
//!
//! 파싱 실패는 레코드 단위의 비치명적 조건이며, 호출자가 카운터로
//! 집계합니다.

use chrono::{DateTime, NaiveDateTime};
use driftwatch_core::config::TimeFormat;

/// 레코드 하나의 시간 토큰 파싱 실패
///
/// 비치명적 조건으로, 변환 루프가 date-parse 카운터로 집계합니다.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cannot parse timestamp '{token}': {reason}")]
pub struct BadTimestamp {
    /// 원시 토큰
    pub token: String,
    /// 실패 사유
    pub reason: String,
}

impl BadTimestamp {
    fn new(token: &str, reason: impl Into<String>) -> Self {
        Self {
            token: token.to_owned(),
            reason: reason.into(),
        }
    }
}

/// 설정된 시간 형식에 따라 토큰을 epoch 초로 변환하는 파서
#[derive(Debug, Clone)]
pub struct TimestampParser {
    format: TimeFormat,
}

impl TimestampParser {
    /// 시간 형식으로부터 파서를 생성합니다.
    pub fn new(format: TimeFormat) -> Self {
        Self { format }
    }

    /// 토큰을 epoch 초로 파싱합니다.
    pub fn parse(&self, token: &str) -> Result<i64, BadTimestamp> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BadTimestamp::new(token, "empty value"));
        }
        match &self.format {
            TimeFormat::Epoch => parse_numeric(token, 1),
            TimeFormat::EpochMs => parse_numeric(token, 1000),
            TimeFormat::Pattern(pattern) => parse_pattern(token, pattern),
        }
    }
}

/// 숫자 토큰을 파싱하고 소수부를 버린 뒤 `divisor`로 초 단위 변환합니다.
fn parse_numeric(token: &str, divisor: i64) -> Result<i64, BadTimestamp> {
    // 정수는 f64 경유 시 정밀도를 잃을 수 있으므로 먼저 직접 파싱
    let integral = match token.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let value: f64 = token
                .parse()
                .map_err(|_| BadTimestamp::new(token, "not a number"))?;
            if !value.is_finite() {
                return Err(BadTimestamp::new(token, "not a finite number"));
            }
            value.trunc() as i64
        }
    };
    Ok(integral / divisor)
}

/// 패턴 토큰을 파싱합니다. 패턴에 오프셋 지시자가 있으면 그대로
/// 사용하고, 없으면 값 끝의 오프셋 토큰을 분리해 적용합니다.
fn parse_pattern(token: &str, pattern: &str) -> Result<i64, BadTimestamp> {
    if pattern_has_offset(pattern) {
        return DateTime::parse_from_str(token, pattern)
            .map(|dt| dt.timestamp())
            .map_err(|e| BadTimestamp::new(token, e.to_string()));
    }

    let (naive_part, offset_secs) = split_offset_suffix(token);
    let naive = NaiveDateTime::parse_from_str(naive_part, pattern)
        .map_err(|e| BadTimestamp::new(token, e.to_string()))?;
    Ok(naive.and_utc().timestamp() - i64::from(offset_secs))
}

fn pattern_has_offset(pattern: &str) -> bool {
    pattern.contains("%z") || pattern.contains("%:z") || pattern.contains("%#z")
}

/// 값 끝의 오프셋 토큰(`Z`, `+hhmm`, `+hh:mm`)을 분리합니다.
///
/// 반환값은 (오프셋을 제외한 앞부분, 오프셋 초)입니다. 오프셋 토큰이
/// 없으면 전체 토큰과 0을 반환합니다.
fn split_offset_suffix(token: &str) -> (&str, i32) {
    if let Some(rest) = token.strip_suffix('Z') {
        return (rest, 0);
    }

    let bytes = token.as_bytes();
    // +hh:mm / -hh:mm
    if token.len() > 6 {
        let tail = &bytes[token.len() - 6..];
        if (tail[0] == b'+' || tail[0] == b'-')
            && tail[1].is_ascii_digit()
            && tail[2].is_ascii_digit()
            && tail[3] == b':'
            && tail[4].is_ascii_digit()
            && tail[5].is_ascii_digit()
        {
            let sign = if tail[0] == b'-' { -1 } else { 1 };
            let hours = i32::from(tail[1] - b'0') * 10 + i32::from(tail[2] - b'0');
            let minutes = i32::from(tail[4] - b'0') * 10 + i32::from(tail[5] - b'0');
            return (&token[..token.len() - 6], sign * (hours * 3600 + minutes * 60));
        }
    }
    // +hhmm / -hhmm
    if token.len() > 5 {
        let tail = &bytes[token.len() - 5..];
        if (tail[0] == b'+' || tail[0] == b'-') && tail[1..].iter().all(u8::is_ascii_digit) {
            let sign = if tail[0] == b'-' { -1 } else { 1 };
            let hours = i32::from(tail[1] - b'0') * 10 + i32::from(tail[2] - b'0');
            let minutes = i32::from(tail[3] - b'0') * 10 + i32::from(tail[4] - b'0');
            return (&token[..token.len() - 5], sign * (hours * 3600 + minutes * 60));
        }
    }

    (token, 0)
}
