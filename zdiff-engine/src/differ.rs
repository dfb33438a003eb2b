//! 差异提取：对匹配好的实体对逐属性比较，汇总为结构化报告。
//!
//! 基础属性（图层、颜色、线型、位置、文本）永远参与比较，
//! 不受排除列表影响；类型相关属性走几何指纹，按提取顺序输出。

use serde::Serialize;
use tracing::debug;
use zdiff_core::geometry::Point3;
use zdiff_core::record::{EntityKind, EntityRecord, PropertyValue};

use crate::config::CompareConfig;
use crate::errors::ConfigError;
use crate::matcher::{self, MatchTier};
use crate::signature::fingerprint;

/// 单个属性的变化。`old`/`new` 任一为 None 表示属性仅存在于一侧，
/// 此时属性名已带 `_removed`/`_added` 后缀。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    pub attribute: String,
    pub old: Option<PropertyValue>,
    pub new: Option<PropertyValue>,
}

impl AttributeChange {
    fn modified(attribute: impl Into<String>, old: PropertyValue, new: PropertyValue) -> Self {
        Self {
            attribute: attribute.into(),
            old: Some(old),
            new: Some(new),
        }
    }
}

/// 跨版本匹配成功但存在属性差异的实体。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifiedEntity {
    pub kind: EntityKind,
    pub layer: String,
    pub position: Point3,
    pub handle_a: String,
    pub handle_b: String,
    pub tier: MatchTier,
    pub changes: Vec<AttributeChange>,
}

/// 一次完整比较的结果。三个列表的顺序均确定：
/// 新增/删除按输入顺序（原样携带实体记录），修改按 A 侧遍历顺序。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompareReport {
    pub added: Vec<EntityRecord>,
    pub removed: Vec<EntityRecord>,
    pub modified: Vec<ModifiedEntity>,
    pub total_entities_a: usize,
    pub total_entities_b: usize,
}

impl CompareReport {
    /// 三类变化的总数，决定进程退出码。
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }
}

/// 比较两组实体记录。配置先行校验，非法参数在任何匹配开始前报错。
pub fn compare_records(
    entities_a: &[EntityRecord],
    entities_b: &[EntityRecord],
    config: &CompareConfig,
) -> Result<CompareReport, ConfigError> {
    config.validate()?;

    let matches = matcher::match_entities(entities_a, entities_b, config);
    let mut report = CompareReport {
        total_entities_a: entities_a.len(),
        total_entities_b: entities_b.len(),
        ..CompareReport::default()
    };

    for pair in &matches.pairs {
        let record_a = &entities_a[pair.index_a];
        let record_b = &entities_b[pair.index_b];
        let changes = diff_pair(record_a, record_b, config);
        if !changes.is_empty() {
            report.modified.push(ModifiedEntity {
                kind: record_a.kind.clone(),
                layer: record_a.layer.clone(),
                position: record_a.position,
                handle_a: record_a.handle.clone(),
                handle_b: record_b.handle.clone(),
                tier: pair.tier,
                changes,
            });
        }
    }
    for &idx in &matches.removed_a {
        report.removed.push(entities_a[idx].clone());
    }
    for &idx in &matches.added_b {
        report.added.push(entities_b[idx].clone());
    }

    debug!(
        added = report.added.len(),
        removed = report.removed.len(),
        modified = report.modified.len(),
        "比较完成"
    );
    Ok(report)
}

/// 比较一对匹配实体的全部属性。
fn diff_pair(
    record_a: &EntityRecord,
    record_b: &EntityRecord,
    config: &CompareConfig,
) -> Vec<AttributeChange> {
    let mut changes = Vec::new();

    if record_a.layer != record_b.layer {
        changes.push(AttributeChange::modified(
            "layer",
            PropertyValue::Text(record_a.layer.clone()),
            PropertyValue::Text(record_b.layer.clone()),
        ));
    }
    if record_a.color != record_b.color {
        changes.push(AttributeChange::modified(
            "color",
            PropertyValue::Integer(record_a.color as i64),
            PropertyValue::Integer(record_b.color as i64),
        ));
    }
    if record_a.linetype != record_b.linetype {
        changes.push(AttributeChange::modified(
            "linetype",
            PropertyValue::Text(record_a.linetype.clone()),
            PropertyValue::Text(record_b.linetype.clone()),
        ));
    }
    if !points_equal(record_a.position, record_b.position, config.position_tolerance) {
        changes.push(AttributeChange::modified(
            "position",
            PropertyValue::Point(record_a.position),
            PropertyValue::Point(record_b.position),
        ));
    }
    let text_a = record_a.trimmed_text().unwrap_or("");
    let text_b = record_b.trimmed_text().unwrap_or("");
    if text_a != text_b {
        changes.push(AttributeChange::modified(
            "text",
            PropertyValue::Text(text_a.to_string()),
            PropertyValue::Text(text_b.to_string()),
        ));
    }

    let parts_a = fingerprint(record_a, config);
    let parts_b = fingerprint(record_b, config);

    for (name, value_a) in &parts_a {
        match parts_b.iter().find(|(other, _)| other == name) {
            Some((_, value_b)) => {
                if !values_equal(value_a, value_b, config) {
                    changes.push(AttributeChange::modified(
                        name.clone(),
                        value_a.clone(),
                        value_b.clone(),
                    ));
                }
            }
            None => changes.push(AttributeChange {
                attribute: format!("{name}_removed"),
                old: Some(value_a.clone()),
                new: None,
            }),
        }
    }
    for (name, value_b) in &parts_b {
        if !parts_a.iter().any(|(other, _)| other == name) {
            changes.push(AttributeChange {
                attribute: format!("{name}_added"),
                old: None,
                new: Some(value_b.clone()),
            });
        }
    }

    changes
}

/// 容差感知的属性值相等判定。类型不同即不等；
/// 数值族（Number/Integer）跨变体按数值比较。
pub fn values_equal(a: &PropertyValue, b: &PropertyValue, config: &CompareConfig) -> bool {
    match (a, b) {
        (PropertyValue::Text(lhs), PropertyValue::Text(rhs)) => lhs == rhs,
        (PropertyValue::Boolean(lhs), PropertyValue::Boolean(rhs)) => lhs == rhs,
        (PropertyValue::Point(lhs), PropertyValue::Point(rhs)) => {
            points_equal(*lhs, *rhs, config.position_tolerance)
        }
        (PropertyValue::Points(lhs), PropertyValue::Points(rhs)) => {
            lhs.len() == rhs.len()
                && lhs
                    .iter()
                    .zip(rhs)
                    .all(|(p, q)| points_equal(*p, *q, config.position_tolerance))
        }
        (PropertyValue::Numbers(lhs), PropertyValue::Numbers(rhs)) => {
            lhs.len() == rhs.len()
                && lhs
                    .iter()
                    .zip(rhs)
                    .all(|(x, y)| (x - y).abs() <= config.numeric_tolerance)
        }
        _ => match (a.as_number(), b.as_number()) {
            (Some(lhs), Some(rhs)) => (lhs - rhs).abs() <= config.numeric_tolerance,
            _ => false,
        },
    }
}

fn points_equal(a: Point3, b: Point3, tolerance: f64) -> bool {
    (a.x() - b.x()).abs() <= tolerance
        && (a.y() - b.y()).abs() <= tolerance
        && (a.z() - b.z()).abs() <= tolerance
}
