//! JSON 报告渲染，供脚本消费。

use serde::Serialize;
use zdiff_engine::differ::CompareReport;
use zdiff_engine::orientation::OrientationReport;

use crate::errors::FrontendError;

/// 常规比较结果的 JSON 信封。
#[derive(Debug, Serialize)]
pub struct CompareEnvelope<'a> {
    pub mode: &'static str,
    pub file_a: &'a str,
    pub file_b: &'a str,
    pub total_changes: usize,
    #[serde(flatten)]
    pub report: &'a CompareReport,
}

pub fn render_compare_json(
    report: &CompareReport,
    file_a: &str,
    file_b: &str,
) -> Result<String, FrontendError> {
    let envelope = CompareEnvelope {
        mode: "compare",
        file_a,
        file_b,
        total_changes: report.total_changes(),
        report,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

#[derive(Debug, Serialize)]
pub struct OrientationEnvelope<'a> {
    pub mode: &'static str,
    pub file_a: &'a str,
    pub file_b: &'a str,
    #[serde(flatten)]
    pub report: &'a OrientationReport,
}

pub fn render_orientation_json(
    report: &OrientationReport,
    file_a: &str,
    file_b: &str,
) -> Result<String, FrontendError> {
    let envelope = OrientationEnvelope {
        mode: "orientation",
        file_a,
        file_b,
        report,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

#[cfg(test)]
mod tests {
    use zdiff_core::geometry::Point3;
    use zdiff_core::record::{EntityKind, EntityRecord, PropertyValue};
    use zdiff_engine::config::CompareConfig;
    use zdiff_engine::differ::compare_records;

    use super::*;

    #[test]
    fn compare_envelope_exposes_counts_and_changes() {
        let config = CompareConfig::default();
        let a = vec![
            EntityRecord::new(EntityKind::Circle, "G", Point3::origin())
                .with_property("radius", PropertyValue::Number(5.0)),
        ];
        let b: Vec<EntityRecord> = Vec::new();
        let report = compare_records(&a, &b, &config).expect("合法配置");
        let rendered = render_compare_json(&report, "a.dxf", "b.dxf").expect("序列化成功");
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("合法 JSON");
        assert_eq!(value["mode"], "compare");
        assert_eq!(value["total_changes"], 1);
        assert_eq!(value["removed"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["total_entities_a"], 1);
    }
}
