//! 比较结果的控制台渲染。输出风格与原有 CLI 一致：
//! 中文标签、坐标保留三位小数、过长的文本值截断到 50 字符。

use std::fmt::Write as _;

use zdiff_core::geometry::Point3;
use zdiff_core::record::{EntityRecord, PropertyValue};
use zdiff_engine::differ::{CompareReport, ModifiedEntity};
use zdiff_engine::matcher::MatchTier;
use zdiff_engine::orientation::OrientationReport;

const MAX_TEXT_DISPLAY: usize = 50;

/// 渲染常规比较报告。
pub fn render_compare(report: &CompareReport, label_a: &str, label_b: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "图纸比较：{label_a} -> {label_b}");
    let _ = writeln!(
        out,
        "实体数量：旧版 {}，新版 {}",
        report.total_entities_a, report.total_entities_b
    );

    if !report.has_changes() {
        let _ = writeln!(out, "未检测到差异。");
        return out;
    }

    if !report.added.is_empty() {
        let _ = writeln!(out, "新增实体（{}）：", report.added.len());
        for record in &report.added {
            let _ = writeln!(out, "  + {}", format_entity(record));
        }
    }
    if !report.removed.is_empty() {
        let _ = writeln!(out, "删除实体（{}）：", report.removed.len());
        for record in &report.removed {
            let _ = writeln!(out, "  - {}", format_entity(record));
        }
    }
    if !report.modified.is_empty() {
        let _ = writeln!(out, "修改实体（{}）：", report.modified.len());
        for modified in &report.modified {
            render_modified(&mut out, modified);
        }
    }
    let _ = writeln!(out, "差异总计：{}", report.total_changes());
    out
}

fn render_modified(out: &mut String, modified: &ModifiedEntity) {
    let tier = match modified.tier {
        MatchTier::ExactKey => "精确",
        MatchTier::NearestNeighbor => "邻近",
    };
    let _ = writeln!(
        out,
        "  * {} @ {}, 位置={}（{}匹配）",
        modified.kind.as_str(),
        modified.layer,
        format_point(modified.position),
        tier
    );
    for change in &modified.changes {
        match (&change.old, &change.new) {
            (Some(old), Some(new)) => {
                let _ = writeln!(
                    out,
                    "      {}: {} -> {}",
                    change.attribute,
                    format_value(old),
                    format_value(new)
                );
            }
            (Some(old), None) => {
                let _ = writeln!(out, "      {}: {}", change.attribute, format_value(old));
            }
            (None, Some(new)) => {
                let _ = writeln!(out, "      {}: {}", change.attribute, format_value(new));
            }
            (None, None) => {}
        }
    }
}

/// 渲染文字朝向报告。
pub fn render_orientation(report: &OrientationReport, label_a: &str, label_b: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "文字朝向比较：{label_a} -> {label_b}");
    let _ = writeln!(
        out,
        "文字数量：旧版 {}，新版 {}",
        report.total_texts_a, report.total_texts_b
    );

    if !report.has_changes() {
        let _ = writeln!(out, "未检测到朝向变化。");
        return out;
    }

    for change in &report.changes {
        let _ = writeln!(
            out,
            "  * \"{}\" @ {}, 位置={}：{:.2}° -> {:.2}°（差 {:.2}°）",
            truncate(&change.text),
            change.layer,
            format_point(change.position),
            change.old_rotation_deg,
            change.new_rotation_deg,
            change.delta_deg
        );
    }
    for missing in &report.missing_in_b {
        let _ = writeln!(
            out,
            "  - 新版缺失文字 \"{}\" @ {}, 位置={}",
            truncate(&missing.text),
            missing.layer,
            format_point(missing.position)
        );
    }
    for added in &report.new_in_b {
        let _ = writeln!(
            out,
            "  + 新版新增文字 \"{}\" @ {}, 位置={}",
            truncate(&added.text),
            added.layer,
            format_point(added.position)
        );
    }
    out
}

fn format_entity(record: &EntityRecord) -> String {
    match record.trimmed_text() {
        Some(text) if !text.is_empty() => format!(
            "{} @ {}, 位置={}, 文本=\"{}\"",
            record.kind.as_str(),
            record.layer,
            format_point(record.position),
            truncate(text)
        ),
        _ => format!(
            "{} @ {}, 位置={}",
            record.kind.as_str(),
            record.layer,
            format_point(record.position)
        ),
    }
}

fn format_point(point: Point3) -> String {
    format!("({:.3}, {:.3}, {:.3})", point.x(), point.y(), point.z())
}

fn format_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Number(number) => format!("{number:.3}"),
        PropertyValue::Integer(integer) => integer.to_string(),
        PropertyValue::Text(text) => format!("\"{}\"", truncate(text)),
        PropertyValue::Boolean(flag) => flag.to_string(),
        PropertyValue::Point(point) => format_point(*point),
        PropertyValue::Points(points) => format!("[{} 个顶点]", points.len()),
        PropertyValue::Numbers(numbers) => format!("[{} 个数值]", numbers.len()),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT_DISPLAY {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_TEXT_DISPLAY).collect();
    format!("{head}…")
}

#[cfg(test)]
mod tests {
    use zdiff_core::record::EntityKind;
    use zdiff_engine::config::CompareConfig;
    use zdiff_engine::differ::compare_records;
    use zdiff_core::record::EntityRecord;

    use super::*;

    #[test]
    fn no_changes_renders_clean_message() {
        let config = CompareConfig::default();
        let report = compare_records(&[], &[], &config).expect("合法配置");
        let rendered = render_compare(&report, "a.dxf", "b.dxf");
        assert!(rendered.contains("未检测到差异"));
    }

    #[test]
    fn modified_entity_lists_attribute_transitions() {
        let config = CompareConfig::default();
        let a = vec![
            EntityRecord::new(EntityKind::Circle, "G", Point3::origin())
                .with_property("radius", PropertyValue::Number(5.0)),
        ];
        let b = vec![
            EntityRecord::new(EntityKind::Circle, "G", Point3::origin())
                .with_property("radius", PropertyValue::Number(7.0)),
        ];
        let report = compare_records(&a, &b, &config).expect("合法配置");
        let rendered = render_compare(&report, "a.dxf", "b.dxf");
        assert!(rendered.contains("radius: 5.000 -> 7.000"));
        assert!(rendered.contains("差异总计：1"));
    }

    #[test]
    fn long_text_is_truncated_in_output() {
        let long = "甲".repeat(80);
        let truncated = truncate(&long);
        assert_eq!(truncated.chars().count(), MAX_TEXT_DISPLAY + 1);
        assert!(truncated.ends_with('…'));
    }
}
