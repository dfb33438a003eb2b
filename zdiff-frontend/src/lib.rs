pub mod batch;
pub mod errors;
pub mod json;
pub mod report;

use std::path::Path;

use tracing::{info, warn};
use zdiff_engine::config::CompareConfig;
use zdiff_engine::differ::{self, CompareReport};
use zdiff_engine::orientation::{self, OrientationConfig, OrientationReport};
use zdiff_io::{DrawingExtractor, DxfExtractor, ExtractedDrawing};

use errors::FrontendError;

/// 读取两个 DXF 文件并执行常规比较。
pub fn compare_files(
    path_a: &Path,
    path_b: &Path,
    config: &CompareConfig,
) -> Result<CompareReport, FrontendError> {
    let drawing_a = extract(path_a)?;
    let drawing_b = extract(path_b)?;
    info!(
        entities_a = drawing_a.entities.len(),
        entities_b = drawing_b.entities.len(),
        "提取完成，开始比较"
    );
    Ok(differ::compare_records(
        &drawing_a.entities,
        &drawing_b.entities,
        config,
    )?)
}

/// 读取两个 DXF 文件并执行文字朝向比较。
pub fn orientation_files(
    path_a: &Path,
    path_b: &Path,
    config: &OrientationConfig,
) -> Result<OrientationReport, FrontendError> {
    let drawing_a = extract(path_a)?;
    let drawing_b = extract(path_b)?;
    Ok(orientation::compare_orientation(
        &drawing_a.entities,
        &drawing_b.entities,
        config,
    )?)
}

fn extract(path: &Path) -> Result<ExtractedDrawing, FrontendError> {
    let drawing = DxfExtractor::new().extract(path)?;
    if !drawing.warnings.is_empty() {
        warn!(
            path = %path.display(),
            skipped = drawing.warnings.len(),
            "提取期间跳过了损坏的实体"
        );
    }
    Ok(drawing)
}
