//! 필드 레이아웃 — 레코드 스트림의 정규 필드 순서
//!
//! 엔진 프로세스로 보내는 모든 레코드는 동일한 필드 순서를 따릅니다:
//! 정렬된 분석 필드들 뒤에 시간 필드가 마지막으로 옵니다. 이 순서는
//! 설정에서 한 번 파생되며, delimited/JSON 두 변환 경로가 같은
//! [`FieldLayout`]을 공유합니다.
//!
//! 중첩 JSON 객체의 필드는 점 표기 경로(`tags.tag1.key1`)로 평탄화되어
//! 참조됩니다.

use std::collections::HashMap;

use driftwatch_core::config::{AnalysisConfig, DataDescription};

/// 레코드 스트림의 정규 필드 순서와 이름→위치 매핑
#[derive(Debug, Clone)]
pub struct FieldLayout {
    /// 정규 순서의 필드 이름 (분석 필드 정렬순 + 시간 필드 마지막)
    fields: Vec<String>,
    /// 시간 필드의 위치 (항상 마지막)
    time_index: usize,
    /// 필드 이름 → 위치
    index_by_name: HashMap<String, usize>,
}

impl FieldLayout {
    /// 분석 설정과 데이터 기술로부터 레이아웃을 파생합니다.
    ///
    /// 시간 필드가 분석 필드로도 참조되는 경우 중복 없이 마지막
    /// 위치 하나만 차지합니다.
    pub fn new(analysis: &AnalysisConfig, data: &DataDescription) -> Self {
        let mut fields: Vec<String> = analysis
            .required_fields()
            .into_iter()
            .filter(|name| *name != data.time_field)
            .collect();
        fields.push(data.time_field.clone());

        let time_index = fields.len() - 1;
        let index_by_name = fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Self {
            fields,
            time_index,
            index_by_name,
        }
    }

    /// 정규 순서의 필드 이름들
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    /// 레코드의 필드 수 (헤더와 모든 데이터 레코드에서 동일)
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 필드가 없는 레이아웃인지 여부
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 시간 필드의 위치
    pub fn time_index(&self) -> usize {
        self.time_index
    }

    /// 시간 필드를 제외한 분석 필드 수
    pub fn analysis_field_count(&self) -> usize {
        self.fields.len() - 1
    }

    /// 이름으로 필드 위치를 찾습니다.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    /// 값이 모두 빈 문자열인 새 레코드 버퍼를 만듭니다.
    pub fn empty_record(&self) -> Vec<String> {
        vec![String::new(); self.fields.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_core::config::Detector;

    fn layout_for(detectors: Vec<Detector>, time_field: &str) -> FieldLayout {
        let analysis = AnalysisConfig {
            bucket_span: None,
            latency: None,
            detectors,
        };
        let data = DataDescription {
            time_field: time_field.to_owned(),
            ..DataDescription::default()
        };
        FieldLayout::new(&analysis, &data)
    }

    #[test]
    fn time_field_is_last() {
        let layout = layout_for(
            vec![Detector::new("metric").with_field("value").by("host")],
            "_time",
        );
        assert_eq!(layout.field_names(), &["host", "value", "_time"]);
        assert_eq!(layout.time_index(), 2);
        assert_eq!(layout.analysis_field_count(), 2);
    }

    #[test]
    fn analysis_fields_are_sorted() {
        let layout = layout_for(
            vec![
                Detector::new("mean").with_field("zeta").partition("alpha"),
                Detector::count().by("mid"),
            ],
            "time",
        );
        assert_eq!(layout.field_names(), &["alpha", "mid", "zeta", "time"]);
    }

    #[test]
    fn time_field_referenced_by_detector_not_duplicated() {
        let layout = layout_for(vec![Detector::count().by("time").over("user")], "time");
        assert_eq!(layout.field_names(), &["user", "time"]);
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn dotted_paths_preserved() {
        let layout = layout_for(
            vec![Detector::new("metric").with_field("tags.tag1.key1")],
            "time",
        );
        assert_eq!(layout.index_of("tags.tag1.key1"), Some(0));
    }
}
