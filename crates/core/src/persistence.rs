//! 결과 저장소 인터페이스 — 외부 영속 계층과의 좁은 경계
//!
//! 버킷/인플루언서/스냅샷의 실제 영속화와 질의는 이 크레이트 밖의
//! 저장소 구현이 담당합니다. 엔진은 [`ResultsStore`] trait을 통해서만
//! 저장소와 상호작용하며, 질의 결과는 skip/take 기반의 [`Page`]로
//! 반환됩니다.

use serde::{Deserialize, Serialize};

use crate::error::DriftwatchError;
use crate::results::{Bucket, ModelSnapshot, ResultEvent};

/// 페이지 요청 파라미터 (skip/take)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    /// 건너뛸 문서 수
    pub skip: usize,
    /// 가져올 최대 문서 수
    pub take: usize,
}

impl PageParams {
    /// 첫 페이지 파라미터를 생성합니다.
    pub fn first(take: usize) -> Self {
        Self { skip: 0, take }
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            skip: 0,
            take: 100,
        }
    }
}

/// 페이지 질의 결과
///
/// 전체 매칭 건수(`hit_count`)와 현재 페이지의 문서들을 담으며,
/// 현재 파라미터로부터 다음/이전 페이지 기술자를 파생합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// 전체 매칭 문서 수
    pub hit_count: u64,
    /// 현재 페이지 요청 파라미터
    pub params: PageParams,
    /// 현재 페이지 문서
    pub documents: Vec<T>,
}

impl<T> Page<T> {
    /// 다음 페이지 기술자 — 더 가져올 문서가 있을 때만 반환합니다.
    pub fn next_page(&self) -> Option<PageParams> {
        let next_skip = self.params.skip + self.params.take;
        if (next_skip as u64) < self.hit_count {
            Some(PageParams {
                skip: next_skip,
                take: self.params.take,
            })
        } else {
            None
        }
    }

    /// 이전 페이지 기술자 — 첫 페이지가 아닐 때만 반환합니다.
    pub fn previous_page(&self) -> Option<PageParams> {
        if self.params.skip == 0 {
            None
        } else {
            Some(PageParams {
                skip: self.params.skip.saturating_sub(self.params.take),
                take: self.params.take,
            })
        }
    }
}

/// 되돌릴 스냅샷을 고르는 방법
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotSelector {
    /// 스냅샷 ID로 선택
    ById(String),
    /// 주어진 시각(epoch 초) 이전의 가장 최근 스냅샷
    ByTime(i64),
    /// 설명 문자열 일치로 선택
    ByDescription(String),
}

/// 결과 저장소 — 외부 영속 계층의 호출 형태만 규정하는 trait
///
/// 엔진의 출력 리더는 파싱한 결과를 이 trait으로 전달하고,
/// revert 경로는 스냅샷 조회에 이 trait을 사용합니다.
pub trait ResultsStore: Send + Sync {
    /// 결과 한 건을 저장합니다.
    fn persist(&self, job_id: &str, event: &ResultEvent) -> Result<(), DriftwatchError>;

    /// 잡의 버킷을 페이지 단위로 조회합니다.
    fn buckets(&self, job_id: &str, params: PageParams) -> Result<Page<Bucket>, DriftwatchError>;

    /// 선택자에 해당하는 모델 스냅샷을 조회합니다.
    fn find_snapshot(
        &self,
        job_id: &str,
        selector: &SnapshotSelector,
    ) -> Result<Option<ModelSnapshot>, DriftwatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_of(hit_count: u64, skip: usize, take: usize) -> Page<Bucket> {
        Page {
            hit_count,
            params: PageParams { skip, take },
            documents: Vec::new(),
        }
    }

    #[test]
    fn next_page_derived_from_current_params() {
        let page = page_of(250, 0, 100);
        assert_eq!(page.next_page(), Some(PageParams { skip: 100, take: 100 }));
    }

    #[test]
    fn no_next_page_at_end() {
        let page = page_of(250, 200, 100);
        assert_eq!(page.next_page(), None);
    }

    #[test]
    fn no_previous_page_at_start() {
        let page = page_of(250, 0, 100);
        assert_eq!(page.previous_page(), None);
    }

    #[test]
    fn previous_page_clamps_to_zero() {
        let page = page_of(250, 50, 100);
        assert_eq!(
            page.previous_page(),
            Some(PageParams { skip: 0, take: 100 })
        );
    }
}
