//! 两级贪心匹配：先按精确匹配键配对，再对落空的 A 实体
//! 在同类型同图层的未认领 B 实体中做最近邻搜索。
//! 先到先得，不回溯；这是有意为之的近似，而非全局最优二分匹配。

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;
use zdiff_core::record::EntityRecord;

use crate::config::CompareConfig;
use crate::signature::match_key;

/// 配对产生的层级，隐含匹配置信度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// 匹配键完全一致。
    ExactKey,
    /// 半径内的最近邻。
    NearestNeighbor,
}

/// 一对跨版本实体（以各自切片内的下标表示）。
#[derive(Debug, Clone, Copy)]
pub struct MatchedPair {
    pub index_a: usize,
    pub index_b: usize,
    pub tier: MatchTier,
}

/// 匹配结果：配对集合与双方未匹配的下标（按输入顺序）。
#[derive(Debug, Default)]
pub struct MatchSet {
    pub pairs: Vec<MatchedPair>,
    pub removed_a: Vec<usize>,
    pub added_b: Vec<usize>,
}

/// 在两个实体集合之间建立配对。
///
/// 保证：每个 B 实体至多被一个 A 实体认领；
/// 每个 A 实体恰好产生一个结果（配对或 removed）。
/// 任一侧为空不构成错误，另一侧全部计为新增/删除。
pub fn match_entities(
    entities_a: &[EntityRecord],
    entities_b: &[EntityRecord],
    config: &CompareConfig,
) -> MatchSet {
    // 键 -> B 下标桶。重复键保留全部成员，精确层按顺序认领首个空闲者。
    let mut index_b: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, record) in entities_b.iter().enumerate() {
        index_b.entry(match_key(record, config)).or_default().push(idx);
    }

    let mut claimed = vec![false; entities_b.len()];
    let mut result = MatchSet::default();

    for (idx_a, record_a) in entities_a.iter().enumerate() {
        let key = match_key(record_a, config);
        if let Some(bucket) = index_b.get(&key) {
            if let Some(&idx_b) = bucket.iter().find(|&&idx| !claimed[idx]) {
                claimed[idx_b] = true;
                result.pairs.push(MatchedPair {
                    index_a: idx_a,
                    index_b: idx_b,
                    tier: MatchTier::ExactKey,
                });
                continue;
            }
        }

        match nearest_unclaimed(record_a, entities_b, &claimed, config) {
            Some(idx_b) => {
                claimed[idx_b] = true;
                result.pairs.push(MatchedPair {
                    index_a: idx_a,
                    index_b: idx_b,
                    tier: MatchTier::NearestNeighbor,
                });
            }
            None => result.removed_a.push(idx_a),
        }
    }

    for (idx_b, was_claimed) in claimed.iter().enumerate() {
        if !was_claimed {
            result.added_b.push(idx_b);
        }
    }

    debug!(
        pairs = result.pairs.len(),
        removed = result.removed_a.len(),
        added = result.added_b.len(),
        "实体匹配完成"
    );
    result
}

/// 最近邻层：仅考虑同类型同图层的未认领候选；
/// 文字类实体要求双方文本非空（内容是否一致交由差异器判断）。
/// 距离必须严格小于匹配半径；同距并列时先遇到者胜出。
fn nearest_unclaimed(
    target: &EntityRecord,
    entities_b: &[EntityRecord],
    claimed: &[bool],
    config: &CompareConfig,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in entities_b.iter().enumerate() {
        if claimed[idx] || candidate.kind != target.kind || candidate.layer != target.layer {
            continue;
        }
        if target.kind.is_text_like() {
            let both_have_text = !target.trimmed_text().unwrap_or("").is_empty()
                && !candidate.trimmed_text().unwrap_or("").is_empty();
            if !both_have_text {
                continue;
            }
        }
        let distance = target.position.distance_to(candidate.position);
        if distance >= config.match_radius {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((idx, distance)),
        }
    }
    best.map(|(idx, _)| idx)
}
