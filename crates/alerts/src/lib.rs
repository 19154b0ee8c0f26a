#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`trigger`]: 알림 타입 파싱과 발화 조건 평가 ([`AlertTrigger`])
//! - [`registry`]: 잡별 롱폴 대기 집합 ([`AlertRegistry`])
//! - [`error`]: 도메인 에러 타입
//!
//! # 사용 예시
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use driftwatch_alerts::{AlertRegistry, AlertTrigger, parse_alert_types};
//!
//! let registry = Arc::new(AlertRegistry::new());
//! let trigger = AlertTrigger::new(parse_alert_types("bucket")?, Some(80.0), None, false)?;
//! let receiver = registry.register("farequote", Duration::from_secs(30), trigger)?;
//! let alert = receiver.await?;
//! ```

pub mod error;
pub mod registry;
pub mod trigger;

// --- 주요 타입 re-export ---

pub use error::AlertError;
pub use registry::{Alert, AlertRegistry};
pub use trigger::{AlertTrigger, AlertType, parse_alert_types};
