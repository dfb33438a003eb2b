//! 批量目录比较：按文件名后缀约定（默认 `_old` / `_new`）
//! 在一个目录内发现版本对，逐对比较并汇总。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;
use zdiff_config::BatchSettings;
use zdiff_engine::config::CompareConfig;
use zdiff_engine::differ::CompareReport;

use crate::errors::FrontendError;
use crate::{compare_files, report};

/// 一对待比较的版本文件。`name` 是去掉后缀后的共同主干。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionPair {
    pub name: String,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
}

/// 批量运行的汇总。
#[derive(Debug)]
pub struct BatchSummary {
    pub results: Vec<(RevisionPair, CompareReport)>,
    /// 只有一侧版本存在的主干名。
    pub unpaired: Vec<String>,
}

impl BatchSummary {
    pub fn total_changes(&self) -> usize {
        self.results
            .iter()
            .map(|(_, report)| report.total_changes())
            .sum()
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }
}

/// 扫描目录（不递归）并按后缀约定配对 DXF 文件。
/// 配对按主干名排序，保证批量输出顺序稳定。
pub fn pair_revisions(
    directory: &Path,
    settings: &BatchSettings,
) -> Result<(Vec<RevisionPair>, Vec<String>), FrontendError> {
    let mut olds: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut news: BTreeMap<String, PathBuf> = BTreeMap::new();

    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| FrontendError::DirectoryRead {
            path: directory.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_dxf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("dxf"));
        if !entry.file_type().is_file() || !is_dxf {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if let Some(base) = stem.strip_suffix(settings.old_suffix.as_str()) {
            olds.insert(base.to_string(), path.to_path_buf());
        } else if let Some(base) = stem.strip_suffix(settings.new_suffix.as_str()) {
            news.insert(base.to_string(), path.to_path_buf());
        }
    }

    let mut pairs = Vec::new();
    let mut unpaired = Vec::new();
    for (base, old_path) in &olds {
        match news.remove(base) {
            Some(new_path) => pairs.push(RevisionPair {
                name: base.clone(),
                old_path: old_path.clone(),
                new_path,
            }),
            None => unpaired.push(base.clone()),
        }
    }
    unpaired.extend(news.into_keys());
    Ok((pairs, unpaired))
}

/// 对目录中发现的每个版本对执行比较。
pub fn run_batch(
    directory: &Path,
    settings: &BatchSettings,
    config: &CompareConfig,
    output: Option<&Path>,
) -> Result<BatchSummary, FrontendError> {
    let (pairs, unpaired) = pair_revisions(directory, settings)?;
    for base in &unpaired {
        warn!(name = %base, "仅发现一侧版本，跳过");
    }
    info!(pairs = pairs.len(), "目录扫描完成");

    let mut results = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let report = compare_files(&pair.old_path, &pair.new_path, config)?;
        results.push((pair, report));
    }

    let summary = BatchSummary { results, unpaired };
    if let Some(path) = output {
        let rendered = render_batch(&summary);
        fs::write(path, rendered).map_err(|source| FrontendError::ReportWrite {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(summary)
}

/// 渲染批量比较的文本汇总。
pub fn render_batch(summary: &BatchSummary) -> String {
    let mut out = String::new();
    for (pair, compare_report) in &summary.results {
        out.push_str(&format!("===== {} =====\n", pair.name));
        out.push_str(&report::render_compare(
            compare_report,
            &pair.old_path.display().to_string(),
            &pair.new_path.display().to_string(),
        ));
        out.push('\n');
    }
    for base in &summary.unpaired {
        out.push_str(&format!("===== {base} =====\n仅发现一侧版本，未比较。\n\n"));
    }
    out.push_str(&format!(
        "批量汇总：{} 对文件，差异总计 {}\n",
        summary.results.len(),
        summary.total_changes()
    ));
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "0\nEOF\n").expect("写入测试文件");
    }

    #[test]
    fn pairs_matching_suffixes_and_reports_singletons() {
        let dir = tempfile::tempdir().expect("创建临时目录");
        touch(dir.path(), "plan_old.dxf");
        touch(dir.path(), "plan_new.dxf");
        touch(dir.path(), "site_old.dxf");
        touch(dir.path(), "notes.txt");

        let settings = BatchSettings::default();
        let (pairs, unpaired) = pair_revisions(dir.path(), &settings).expect("扫描成功");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].name, "plan");
        assert_eq!(unpaired, vec!["site".to_string()]);
    }

    #[test]
    fn custom_suffixes_are_honored() {
        let dir = tempfile::tempdir().expect("创建临时目录");
        touch(dir.path(), "plan-rev1.dxf");
        touch(dir.path(), "plan-rev2.dxf");

        let settings = BatchSettings {
            old_suffix: "-rev1".to_string(),
            new_suffix: "-rev2".to_string(),
        };
        let (pairs, unpaired) = pair_revisions(dir.path(), &settings).expect("扫描成功");
        assert_eq!(pairs.len(), 1);
        assert!(unpaired.is_empty());
    }

    #[test]
    fn pairs_come_out_sorted_by_base_name() {
        let dir = tempfile::tempdir().expect("创建临时目录");
        for base in ["zeta", "alpha", "mid"] {
            touch(dir.path(), &format!("{base}_old.dxf"));
            touch(dir.path(), &format!("{base}_new.dxf"));
        }

        let settings = BatchSettings::default();
        let (pairs, _) = pair_revisions(dir.path(), &settings).expect("扫描成功");
        let names: Vec<&str> = pairs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn non_dxf_extensions_are_ignored() {
        let dir = tempfile::tempdir().expect("创建临时目录");
        touch(dir.path(), "plan_old.bak");
        touch(dir.path(), "plan_new.bak");

        let settings = BatchSettings::default();
        let (pairs, unpaired) = pair_revisions(dir.path(), &settings).expect("扫描成功");
        assert!(pairs.is_empty());
        assert!(unpaired.is_empty());
    }
}
