//! 잡 설정 모델 — 분석 설정과 입력 데이터 기술
//!
//! [`JobConfig`]는 하나의 분석 잡을 기술하는 최상위 구조체입니다.
//! [`AnalysisConfig`]는 탐지기 목록과 지연(latency) 허용 윈도우를,
//! [`DataDescription`]은 입력 텔레메트리의 형식(구분자/인용 문자/시간 필드)을
//! 담습니다.
//!
//! # 사용 예시
//! ```ignore
//! use driftwatch_core::config::JobConfig;
//!
//! let config = JobConfig::load("farequote.toml").await?;
//! let fields = config.analysis.required_fields();
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DriftwatchError};

/// 단일 탐지기 정의
///
/// `function(field_name) by X over Y partitionfield=Z` 형태의 분석 절
/// 하나에 해당합니다. 생성 시 검증되며 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detector {
    /// 분석 함수 (count, metric, mean 등)
    pub function: String,
    /// 분석 대상 필드
    #[serde(default)]
    pub field_name: Option<String>,
    /// by 필드 (개체별 분할)
    #[serde(default)]
    pub by_field_name: Option<String>,
    /// over 필드 (모집단 분석)
    #[serde(default)]
    pub over_field_name: Option<String>,
    /// partition 필드 (독립 파티션 분할)
    #[serde(default)]
    pub partition_field_name: Option<String>,
}

impl Detector {
    /// count 함수 탐지기를 생성합니다.
    pub fn count() -> Self {
        Self::new("count")
    }

    /// 주어진 함수의 탐지기를 생성합니다.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            field_name: None,
            by_field_name: None,
            over_field_name: None,
            partition_field_name: None,
        }
    }

    /// 분석 대상 필드를 설정합니다.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field_name = Some(field.into());
        self
    }

    /// by 필드를 설정합니다.
    pub fn by(mut self, field: impl Into<String>) -> Self {
        self.by_field_name = Some(field.into());
        self
    }

    /// over 필드를 설정합니다.
    pub fn over(mut self, field: impl Into<String>) -> Self {
        self.over_field_name = Some(field.into());
        self
    }

    /// partition 필드를 설정합니다.
    pub fn partition(mut self, field: impl Into<String>) -> Self {
        self.partition_field_name = Some(field.into());
        self
    }

    /// 이 탐지기가 참조하는 필드 이름을 순서대로 반환합니다.
    ///
    /// 비어 있거나 공백뿐인 이름은 제외됩니다.
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        [
            self.field_name.as_deref(),
            self.by_field_name.as_deref(),
            self.over_field_name.as_deref(),
            self.partition_field_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|name| !name.trim().is_empty())
    }

    /// 탐지기 정의를 검증합니다.
    ///
    /// 함수 이름 또는 필드 이름 중 하나는 비어 있지 않아야 합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.function.trim().is_empty() && self.field_name.as_deref().unwrap_or("").trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "detector".to_owned(),
                reason: "either function or field_name must be set".to_owned(),
            });
        }
        Ok(())
    }
}

/// 분석 설정 — 탐지기 목록과 시간 허용 윈도우
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// 버킷 크기 (초). None이면 엔진 기본값 사용.
    #[serde(default)]
    pub bucket_span: Option<u64>,
    /// 순서 역행/중간 결과 허용 윈도우 (초). 0 또는 None이면 없음.
    #[serde(default)]
    pub latency: Option<u64>,
    /// 탐지기 목록 (순서 유지)
    #[serde(default)]
    pub detectors: Vec<Detector>,
}

impl AnalysisConfig {
    /// 탐지기들이 참조하는 모든 분석 필드를 정렬/중복 제거하여 반환합니다.
    ///
    /// 시간 필드는 포함되지 않습니다. null/공백 이름은 결코 포함되지
    /// 않으며, 결과는 결정적입니다.
    pub fn required_fields(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .detectors
            .iter()
            .flat_map(Detector::referenced_fields)
            .collect();
        set.into_iter().map(str::to_owned).collect()
    }

    /// 설정된 latency를 초 단위로 반환합니다. 없으면 0.
    pub fn latency_secs(&self) -> u64 {
        self.latency.unwrap_or(0)
    }

    /// 분석 설정을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detectors.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "detectors".to_owned(),
                reason: "at least one detector is required".to_owned(),
            });
        }
        for detector in &self.detectors {
            detector.validate()?;
        }
        Ok(())
    }
}

/// 입력 데이터 형식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// 구분자 기반 텍스트 (CSV/TSV)
    #[default]
    Delimited,
    /// 줄 단위 JSON 객체 스트림
    Json,
}

/// 시간 필드 해석 형식
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TimeFormat {
    /// epoch 초 (소수부는 버림)
    Epoch,
    /// epoch 밀리초 (소수부는 버림)
    EpochMs,
    /// chrono 패턴 문자열 (선택적 후행 오프셋 토큰 허용)
    Pattern(String),
}

impl From<String> for TimeFormat {
    fn from(s: String) -> Self {
        match s.as_str() {
            "epoch" => TimeFormat::Epoch,
            "epoch_ms" => TimeFormat::EpochMs,
            _ => TimeFormat::Pattern(s),
        }
    }
}

impl From<TimeFormat> for String {
    fn from(f: TimeFormat) -> Self {
        match f {
            TimeFormat::Epoch => "epoch".to_owned(),
            TimeFormat::EpochMs => "epoch_ms".to_owned(),
            TimeFormat::Pattern(p) => p,
        }
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        TimeFormat::Epoch
    }
}

/// 입력 데이터 기술 — 형식, 구분자, 시간 필드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDescription {
    /// 입력 형식
    #[serde(default)]
    pub format: DataFormat,
    /// 필드 구분자 (delimited 전용)
    #[serde(default = "default_delimiter")]
    pub field_delimiter: char,
    /// 인용 문자 (delimited 전용) — 내장 구분자/개행을 이스케이프
    #[serde(default = "default_quote")]
    pub quote_char: char,
    /// 시간 필드 이름
    #[serde(default = "default_time_field")]
    pub time_field: String,
    /// 시간 형식
    #[serde(default)]
    pub time_format: TimeFormat,
}

fn default_delimiter() -> char {
    '\t'
}

fn default_quote() -> char {
    '"'
}

fn default_time_field() -> String {
    "time".to_owned()
}

impl Default for DataDescription {
    fn default() -> Self {
        Self {
            format: DataFormat::Delimited,
            field_delimiter: default_delimiter(),
            quote_char: default_quote(),
            time_field: default_time_field(),
            time_format: TimeFormat::default(),
        }
    }
}

impl DataDescription {
    /// 데이터 기술을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_field.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "time_field".to_owned(),
                reason: "time field name must not be blank".to_owned(),
            });
        }
        Ok(())
    }
}

/// 잡 설정 — 하나의 분석 잡을 완전히 기술합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobConfig {
    /// 분석 설정
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// 입력 데이터 기술
    #[serde(default)]
    pub data: DataDescription,
}

impl JobConfig {
    /// TOML 파일에서 잡 설정을 로드합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DriftwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DriftwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DriftwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 잡 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DriftwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            DriftwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 설정 전체를 검증합니다.
    pub fn validate(&self) -> Result<(), DriftwatchError> {
        self.analysis.validate()?;
        self.data.validate()?;
        Ok(())
    }
}
