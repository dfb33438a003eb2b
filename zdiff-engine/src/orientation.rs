//! 文字朝向比较：只关心标注文字的旋转角是否变化。
//!
//! 匹配策略与通用比较不同：按去空白后的文本内容精确配对，
//! 再用很小的位置容差确认是同一处标注。角度归一化到 [0, 360)
//! 后取环绕差，359° 与 1° 只差 2°。

use serde::Serialize;
use tracing::debug;
use zdiff_core::geometry::Point3;
use zdiff_core::record::EntityRecord;

use crate::errors::ConfigError;

/// 朝向比较的参数。与 `CompareConfig` 独立，容差语义不同。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrientationConfig {
    /// 角度容差（度）。
    pub angular_tolerance_deg: f64,
    /// 配对时允许的位置偏移。
    pub position_tolerance: f64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            angular_tolerance_deg: 0.1,
            position_tolerance: 0.01,
        }
    }
}

impl OrientationConfig {
    /// 在比较开始前校验参数，拒绝负容差。
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("angular_tolerance_deg", self.angular_tolerance_deg),
            ("position_tolerance", self.position_tolerance),
        ] {
            if value < 0.0 {
                return Err(ConfigError::NegativeTolerance { name, value });
            }
        }
        Ok(())
    }
}

/// 单条文字的旋转变化。
#[derive(Debug, Clone, Serialize)]
pub struct OrientationChange {
    pub text: String,
    pub layer: String,
    pub position: Point3,
    pub old_rotation_deg: f64,
    pub new_rotation_deg: f64,
    /// 环绕差，始终位于 [0, 180]。
    pub delta_deg: f64,
    pub handle_a: String,
    pub handle_b: String,
}

/// 仅存在于一侧的文字摘要。
#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedText {
    pub text: String,
    pub layer: String,
    pub position: Point3,
    pub handle: String,
}

/// 朝向比较报告。
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrientationReport {
    pub changes: Vec<OrientationChange>,
    pub missing_in_b: Vec<UnmatchedText>,
    pub new_in_b: Vec<UnmatchedText>,
    pub total_texts_a: usize,
    pub total_texts_b: usize,
}

impl OrientationReport {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty() || !self.missing_in_b.is_empty() || !self.new_in_b.is_empty()
    }
}

/// 归一化到 [0, 360)。负角与超圈角都折回同一圈。
pub fn normalize_rotation(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid(-1e-13, 360.0) 会得到 360.0 本身，折回 0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// 两个角的环绕差（度），位于 [0, 180]。
pub fn wrapped_delta(a_deg: f64, b_deg: f64) -> f64 {
    let diff = (normalize_rotation(a_deg) - normalize_rotation(b_deg)).abs();
    diff.min(360.0 - diff)
}

/// 比较两组实体中的文字朝向。非文字实体与空文本直接忽略。
pub fn compare_orientation(
    entities_a: &[EntityRecord],
    entities_b: &[EntityRecord],
    config: &OrientationConfig,
) -> Result<OrientationReport, ConfigError> {
    config.validate()?;
    let texts_a: Vec<&EntityRecord> = text_records(entities_a);
    let texts_b: Vec<&EntityRecord> = text_records(entities_b);

    let mut report = OrientationReport {
        total_texts_a: texts_a.len(),
        total_texts_b: texts_b.len(),
        ..OrientationReport::default()
    };

    let mut claimed = vec![false; texts_b.len()];
    for record_a in &texts_a {
        let text_a = record_a.trimmed_text().unwrap_or("");
        let found = texts_b.iter().enumerate().find(|(idx, record_b)| {
            !claimed[*idx]
                && record_b.trimmed_text().unwrap_or("") == text_a
                && record_a.position.distance_to(record_b.position) <= config.position_tolerance
        });
        match found {
            Some((idx, record_b)) => {
                claimed[idx] = true;
                let old = normalize_rotation(rotation_of(record_a));
                let new = normalize_rotation(rotation_of(record_b));
                let delta = wrapped_delta(old, new);
                if delta > config.angular_tolerance_deg {
                    report.changes.push(OrientationChange {
                        text: text_a.to_string(),
                        layer: record_a.layer.clone(),
                        position: record_a.position,
                        old_rotation_deg: old,
                        new_rotation_deg: new,
                        delta_deg: delta,
                        handle_a: record_a.handle.clone(),
                        handle_b: record_b.handle.clone(),
                    });
                }
            }
            None => report.missing_in_b.push(digest(record_a)),
        }
    }
    for (idx, record_b) in texts_b.iter().enumerate() {
        if !claimed[idx] {
            report.new_in_b.push(digest(record_b));
        }
    }

    debug!(
        changes = report.changes.len(),
        missing = report.missing_in_b.len(),
        new = report.new_in_b.len(),
        "朝向比较完成"
    );
    Ok(report)
}

fn text_records(entities: &[EntityRecord]) -> Vec<&EntityRecord> {
    entities
        .iter()
        .filter(|record| {
            record.kind.is_text_like() && !record.trimmed_text().unwrap_or("").is_empty()
        })
        .collect()
}

fn rotation_of(record: &EntityRecord) -> f64 {
    record
        .property("rotation")
        .and_then(|value| value.as_number())
        .unwrap_or(0.0)
}

fn digest(record: &EntityRecord) -> UnmatchedText {
    UnmatchedText {
        text: record.trimmed_text().unwrap_or("").to_string(),
        layer: record.layer.clone(),
        position: record.position,
        handle: record.handle.clone(),
    }
}
