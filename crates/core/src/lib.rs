#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod results;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, DataError, DriftwatchError, JobError, ParamError};

// 설정
pub use config::{AnalysisConfig, DataDescription, DataFormat, Detector, JobConfig, TimeFormat};

// 결과
pub use results::{Bucket, BucketInfluencer, Influencer, ModelSnapshot, ResultEvent};

// 저장소 인터페이스
pub use persistence::{Page, PageParams, ResultsStore, SnapshotSelector};
