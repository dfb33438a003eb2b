//! 匹配键与几何指纹构建。
//!
//! 匹配键用于跨版本的 O(1) 精确匹配：类型、图层与量化后的位置，
//! 文字类实体附带文本内容以区分同一位置的多个标注。
//! 几何指纹是结构化的 `(名称, 值)` 序列而非字符串哈希，
//! 相等性由差异器按容差逐项判定。

use zdiff_core::record::{EntityKind, EntityRecord, PropertyValue};

use crate::config::CompareConfig;

/// 构造实体的匹配键。键相等的两个实体被视为
/// 「跨版本的同一绘制对象」，除非后续容差检查推翻该假设。
pub fn match_key(record: &EntityRecord, config: &CompareConfig) -> String {
    let decimals = config.key_rounding_decimals;
    let pos = record.position;
    let pos_key = format!(
        "{:.decimals$},{:.decimals$},{:.decimals$}",
        pos.x(),
        pos.y(),
        pos.z(),
    );

    if record.kind.is_text_like() {
        let text = record.text.as_deref().unwrap_or("");
        format!("{}|{}|{}|{}", record.kind.as_str(), record.layer, text, pos_key)
    } else {
        format!("{}|{}|{}", record.kind.as_str(), record.layer, pos_key)
    }
}

/// 构造实体的几何指纹：按提取顺序列出形状相关属性，
/// 排除配置指定的属性；线段终点改写为相对起点的偏移，
/// 使指纹与整体平移无关。未识别类型的指纹可能为空，但总是良定义。
pub fn fingerprint(record: &EntityRecord, config: &CompareConfig) -> Vec<(String, PropertyValue)> {
    let mut parts = Vec::with_capacity(record.properties.len());
    for (name, value) in &record.properties {
        if config.is_excluded(name) {
            continue;
        }
        if record.kind == EntityKind::Line {
            match name.as_str() {
                // 起点即主位置锚，不参与形状指纹
                "start" => continue,
                "end" => {
                    if let (Some(PropertyValue::Point(start)), PropertyValue::Point(end)) =
                        (record.property("start"), value)
                    {
                        parts.push((name.clone(), PropertyValue::Point(start.offset_to(*end))));
                        continue;
                    }
                }
                _ => {}
            }
        }
        parts.push((name.clone(), value.clone()));
    }
    parts
}
