//! DXF 实体提取。
//!
//! 只遍历 ENTITIES 段，把每个实体压平成 `EntityRecord`；
//! 其余段（HEADER、TABLES、BLOCKS 等）整段跳过。
//! 提取是宽容的：单个实体的字段损坏只产生警告并跳过该实体，
//! 文件级的结构错误（组码行不成对、组码非整数）才整体失败。

use std::f64::consts::TAU;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::warn;
use zdiff_core::{
    geometry::Point3,
    record::{EntityKind, EntityRecord, PropertyValue},
};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

/// 单个实体提取失败时的记录，不中断整体提取。
#[derive(Debug, Clone)]
pub struct ExtractionWarning {
    pub handle: String,
    pub kind: String,
    pub message: String,
}

/// 一次提取的产物：实体按文件出现顺序排列。
#[derive(Debug, Default)]
pub struct ExtractedDrawing {
    pub entities: Vec<EntityRecord>,
    pub warnings: Vec<ExtractionWarning>,
}

pub trait DrawingExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDrawing, IoError>;
}

pub struct DxfExtractor;

impl DxfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DxfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingExtractor for DxfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDrawing, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let drawing = extract_from_str(&data)?;
        for warning in &drawing.warnings {
            warn!(
                kind = %warning.kind,
                handle = %warning.handle,
                "跳过损坏的实体：{}",
                warning.message
            );
        }
        Ok(drawing)
    }
}

/// 从内存中的 DXF 文本提取实体，测试与提取器共用。
pub fn extract_from_str(data: &str) -> Result<ExtractedDrawing, IoError> {
    DxfParser::new(data)
        .parse()
        .map_err(|err| IoError::InvalidDocument(err.message))
}

#[derive(Debug)]
struct DxfError {
    message: String,
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<ExtractedDrawing, DxfError> {
        let mut drawing = ExtractedDrawing::default();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.as_str() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.as_str() {
                        "ENTITIES" => self.parse_entities(&mut drawing)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(drawing)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, drawing: &mut ExtractedDrawing) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.as_str() {
                "ENDSEC" => break,
                "SEQEND" => {
                    self.collect_entity_body()?;
                }
                "POLYLINE" => {
                    let body = self.collect_entity_body()?;
                    let (vertices, bulges) = self.collect_polyline_vertices(drawing)?;
                    push_or_warn(drawing, "POLYLINE", build_polyline(body, vertices, bulges));
                }
                kind => {
                    let body = self.collect_entity_body()?;
                    push_or_warn(drawing, kind, build_record(kind, body));
                }
            }
        }
        Ok(())
    }

    /// 读取 POLYLINE 之后的 VERTEX 序列直到 SEQEND。
    /// 损坏的顶点记为警告并跳过，不终止折线本身。
    fn collect_polyline_vertices(
        &mut self,
        drawing: &mut ExtractedDrawing,
    ) -> Result<(Vec<Point3>, Vec<f64>), DxfError> {
        let mut vertices = Vec::new();
        let mut bulges = Vec::new();
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("POLYLINE 未找到 SEQEND 终止标记")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "POLYLINE 顶点序列遇到组码 {code}（期望 0）"
                )));
            }
            match value.as_str() {
                "SEQEND" => {
                    self.collect_entity_body()?;
                    break;
                }
                "VERTEX" => {
                    let body = self.collect_entity_body()?;
                    match vertex_fields(&body) {
                        Ok((point, bulge)) => {
                            vertices.push(point);
                            bulges.push(bulge);
                        }
                        Err(err) => drawing.warnings.push(ExtractionWarning {
                            handle: find_value(&body, 5).unwrap_or_default(),
                            kind: "VERTEX".to_string(),
                            message: err.message,
                        }),
                    }
                }
                other => {
                    return Err(DxfError::invalid(format!(
                        "POLYLINE 顶点序列遇到意外实体 {other}"
                    )));
                }
            }
        }
        Ok((vertices, bulges))
    }

    /// 收集当前实体的全部组码对，直到下一个 0 组码（回退）或文件结束。
    fn collect_entity_body(&mut self) -> Result<Vec<(i32, String)>, DxfError> {
        let mut body = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(pair) => body.push(pair),
                None => break,
            }
        }
        Ok(body)
    }
}

fn push_or_warn(
    drawing: &mut ExtractedDrawing,
    kind: &str,
    result: Result<EntityRecord, BuildError>,
) {
    match result {
        Ok(record) => drawing.entities.push(record),
        Err(err) => drawing.warnings.push(ExtractionWarning {
            handle: err.handle,
            kind: kind.to_string(),
            message: err.message,
        }),
    }
}

/// 实体级失败：携带句柄以便警告可定位。
#[derive(Debug)]
struct BuildError {
    handle: String,
    message: String,
}

/// 所有实体共有的显示字段，从实体体中剥离后剩余对交给类型分支。
struct CommonFields {
    handle: String,
    layer: String,
    color: i32,
    linetype: String,
}

fn split_common(body: Vec<(i32, String)>) -> Result<(CommonFields, Vec<(i32, String)>), BuildError> {
    let mut common = CommonFields {
        handle: String::new(),
        layer: "0".to_string(),
        color: 256,
        linetype: "BYLAYER".to_string(),
    };
    let mut rest = Vec::with_capacity(body.len());
    for (code, value) in body {
        match code {
            5 => common.handle = value.trim().to_string(),
            8 => common.layer = value.trim().to_string(),
            6 => common.linetype = value.trim().to_string(),
            62 => {
                common.color = value.trim().parse::<i32>().map_err(|_| BuildError {
                    handle: common.handle.clone(),
                    message: format!("颜色号解析失败（值：\"{value}\"）"),
                })?;
            }
            _ => rest.push((code, value)),
        }
    }
    Ok((common, rest))
}

fn build_record(kind: &str, body: Vec<(i32, String)>) -> Result<EntityRecord, BuildError> {
    let (common, rest) = split_common(body)?;
    let entity_kind = EntityKind::from_dxf_name(kind);
    let fields = Fields::new(&common, rest)?;

    let record = match entity_kind {
        EntityKind::Line => build_line(&common, &fields),
        EntityKind::Circle => build_circle(&common, &fields),
        EntityKind::Arc => build_arc(&common, &fields),
        EntityKind::Ellipse => build_ellipse(&common, &fields),
        EntityKind::Text => build_text(EntityKind::Text, &common, &fields),
        EntityKind::MText => build_mtext(&common, &fields),
        EntityKind::LwPolyline => build_lwpolyline(&common, &fields),
        EntityKind::Spline => build_spline(&common, &fields),
        EntityKind::Insert => build_insert(&common, &fields),
        EntityKind::Dimension => build_dimension(&common, &fields),
        EntityKind::Polyline => {
            // POLYLINE 由上层携带 VERTEX 序列单独构建
            return Err(BuildError {
                handle: common.handle.clone(),
                message: "POLYLINE 必须经由顶点序列路径构建".to_string(),
            });
        }
        EntityKind::Other(_) => build_generic(entity_kind.clone(), &common, &fields),
    };
    let mut record = record
        .with_handle(common.handle.clone())
        .with_color(common.color);
    record.linetype = common.linetype.clone();
    Ok(record)
}

/// 按组码索引的字段视图。标量取首个出现值，重复组码保留全部。
struct Fields {
    pairs: Vec<(i32, f64)>,
    texts: Vec<(i32, String)>,
    handle: String,
}

impl Fields {
    fn new(common: &CommonFields, rest: Vec<(i32, String)>) -> Result<Self, BuildError> {
        let mut pairs = Vec::new();
        let mut texts = Vec::new();
        for (code, value) in rest {
            // 字符串组码按 DXF 规范是 0-9、100、102 与 1000 段；
            // 其余一律应为数值，解析失败视为实体损坏。
            if is_text_code(code) {
                texts.push((code, value.trim_end_matches('\r').to_string()));
            } else {
                let number = value.trim().parse::<f64>().map_err(|_| BuildError {
                    handle: common.handle.clone(),
                    message: format!("组码 {code} 的值解析失败（值：\"{value}\"）"),
                })?;
                pairs.push((code, number));
            }
        }
        Ok(Self {
            pairs,
            texts,
            handle: common.handle.clone(),
        })
    }

    fn number(&self, code: i32) -> Option<f64> {
        self.pairs
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, v)| *v)
    }

    fn numbers(&self, code: i32) -> Vec<f64> {
        self.pairs
            .iter()
            .filter(|(c, _)| *c == code)
            .map(|(_, v)| *v)
            .collect()
    }

    fn text(&self, code: i32) -> Option<&str> {
        self.texts
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, v)| v.as_str())
    }

    fn point(&self, x_code: i32) -> Option<Point3> {
        let x = self.number(x_code)?;
        let y = self.number(x_code + 10).unwrap_or(0.0);
        let z = self.number(x_code + 20).unwrap_or(0.0);
        Some(Point3::new(x, y, z))
    }

    /// 重复出现的坐标组（LWPOLYLINE 顶点、SPLINE 控制点）。
    /// X 与 Y 按出现顺序配对，数量不齐视为损坏。
    fn point_series(&self, x_code: i32) -> Result<Vec<Point3>, BuildError> {
        let xs = self.numbers(x_code);
        let ys = self.numbers(x_code + 10);
        let zs = self.numbers(x_code + 20);
        if xs.len() != ys.len() {
            return Err(BuildError {
                handle: self.handle.clone(),
                message: format!(
                    "坐标序列不完整：{} 个 X（组码 {x_code}）对 {} 个 Y",
                    xs.len(),
                    ys.len()
                ),
            });
        }
        Ok(xs
            .into_iter()
            .zip(ys)
            .enumerate()
            .map(|(idx, (x, y))| Point3::new(x, y, zs.get(idx).copied().unwrap_or(0.0)))
            .collect())
    }
}

fn is_text_code(code: i32) -> bool {
    (0..=9).contains(&code) || code == 100 || code == 102 || (1000..=1009).contains(&code)
}

fn find_value(body: &[(i32, String)], code: i32) -> Option<String> {
    body.iter()
        .find(|(c, _)| *c == code)
        .map(|(_, v)| v.trim().to_string())
}

fn build_line(common: &CommonFields, fields: &Fields) -> EntityRecord {
    let start = fields.point(10).unwrap_or(Point3::origin());
    let end = fields.point(11).unwrap_or(Point3::origin());
    let mut record = EntityRecord::new(EntityKind::Line, common.layer.clone(), start)
        .with_property("start", PropertyValue::Point(start))
        .with_property("end", PropertyValue::Point(end));
    if let Some(thickness) = fields.number(39) {
        record.push_property("thickness", PropertyValue::Number(thickness));
    }
    record
}

fn build_circle(common: &CommonFields, fields: &Fields) -> EntityRecord {
    // 圆心即主位置锚，不重复存入属性表
    let center = fields.point(10).unwrap_or(Point3::origin());
    let mut record = EntityRecord::new(EntityKind::Circle, common.layer.clone(), center)
        .with_property("radius", PropertyValue::Number(fields.number(40).unwrap_or(0.0)));
    if let Some(thickness) = fields.number(39) {
        record.push_property("thickness", PropertyValue::Number(thickness));
    }
    record
}

fn build_arc(common: &CommonFields, fields: &Fields) -> EntityRecord {
    let center = fields.point(10).unwrap_or(Point3::origin());
    // 角度保持 DXF 原生的度数，不转弧度
    EntityRecord::new(EntityKind::Arc, common.layer.clone(), center)
        .with_property("radius", PropertyValue::Number(fields.number(40).unwrap_or(0.0)))
        .with_property(
            "start_angle",
            PropertyValue::Number(fields.number(50).unwrap_or(0.0)),
        )
        .with_property(
            "end_angle",
            PropertyValue::Number(fields.number(51).unwrap_or(0.0)),
        )
}

fn build_ellipse(common: &CommonFields, fields: &Fields) -> EntityRecord {
    let center = fields.point(10).unwrap_or(Point3::origin());
    // 主轴端点在 DXF 中本就是相对圆心的向量
    let major_axis = fields.point(11).unwrap_or(Point3::origin());
    EntityRecord::new(EntityKind::Ellipse, common.layer.clone(), center)
        .with_property("major_axis", PropertyValue::Point(major_axis))
        .with_property("ratio", PropertyValue::Number(fields.number(40).unwrap_or(1.0)))
        .with_property(
            "start_param",
            PropertyValue::Number(fields.number(41).unwrap_or(0.0)),
        )
        .with_property(
            "end_param",
            PropertyValue::Number(fields.number(42).unwrap_or(TAU)),
        )
}

fn build_text(kind: EntityKind, common: &CommonFields, fields: &Fields) -> EntityRecord {
    let insert = fields.point(10).unwrap_or(Point3::origin());
    let content = fields.text(1).unwrap_or("").to_string();
    let mut record = EntityRecord::new(kind, common.layer.clone(), insert)
        .with_text(content)
        .with_property("height", PropertyValue::Number(fields.number(40).unwrap_or(0.0)))
        .with_property(
            "rotation",
            PropertyValue::Number(fields.number(50).unwrap_or(0.0)),
        );
    if let Some(style) = fields.text(7) {
        record.push_property("style", PropertyValue::Text(style.to_string()));
    }
    record
}

fn build_mtext(common: &CommonFields, fields: &Fields) -> EntityRecord {
    let insert = fields.point(10).unwrap_or(Point3::origin());
    // 内容可能拆分在若干组码 3 片段之后接一个组码 1
    let mut content = String::new();
    for (code, value) in &fields.texts {
        if *code == 3 || *code == 1 {
            content.push_str(&decode_mtext_content(value));
        }
    }
    let mut record = EntityRecord::new(EntityKind::MText, common.layer.clone(), insert)
        .with_text(content)
        .with_property("height", PropertyValue::Number(fields.number(40).unwrap_or(0.0)))
        .with_property(
            "rotation",
            PropertyValue::Number(fields.number(50).unwrap_or(0.0)),
        );
    if let Some(style) = fields.text(7) {
        record.push_property("style", PropertyValue::Text(style.to_string()));
    }
    record
}

fn build_lwpolyline(common: &CommonFields, fields: &Fields) -> EntityRecord {
    let elevation = fields.number(38).unwrap_or(0.0);
    let vertices: Vec<Point3> = fields
        .numbers(10)
        .into_iter()
        .zip(fields.numbers(20))
        .map(|(x, y)| Point3::new(x, y, elevation))
        .collect();
    let closed = (fields.number(70).unwrap_or(0.0) as i64) & 1 == 1;
    let position = vertices.first().copied().unwrap_or(Point3::origin());
    let mut record = EntityRecord::new(EntityKind::LwPolyline, common.layer.clone(), position)
        .with_property("vertices", PropertyValue::Points(vertices))
        .with_property("closed", PropertyValue::Boolean(closed));
    let bulges = fields.numbers(42);
    if bulges.iter().any(|b| b.abs() > f64::EPSILON) {
        record.push_property("bulges", PropertyValue::Numbers(bulges));
    }
    if elevation.abs() > f64::EPSILON {
        record.push_property("elevation", PropertyValue::Number(elevation));
    }
    record
}

fn build_polyline(
    body: Vec<(i32, String)>,
    vertices: Vec<Point3>,
    bulges: Vec<f64>,
) -> Result<EntityRecord, BuildError> {
    let (common, rest) = split_common(body)?;
    let fields = Fields::new(&common, rest)?;
    let closed = (fields.number(70).unwrap_or(0.0) as i64) & 1 == 1;
    let position = vertices.first().copied().unwrap_or(Point3::origin());
    let mut record = EntityRecord::new(EntityKind::Polyline, common.layer.clone(), position)
        .with_property("vertices", PropertyValue::Points(vertices))
        .with_property("closed", PropertyValue::Boolean(closed))
        .with_handle(common.handle.clone())
        .with_color(common.color);
    if bulges.iter().any(|b| b.abs() > f64::EPSILON) {
        record.push_property("bulges", PropertyValue::Numbers(bulges));
    }
    record.linetype = common.linetype.clone();
    Ok(record)
}

fn vertex_fields(body: &[(i32, String)]) -> Result<(Point3, f64), DxfError> {
    let number = |code: i32| -> Result<f64, DxfError> {
        match find_value(body, code) {
            Some(raw) => raw.parse::<f64>().map_err(|_| {
                DxfError::invalid(format!("VERTEX 组码 {code} 解析失败（值：\"{raw}\"）"))
            }),
            None => Ok(0.0),
        }
    };
    Ok((Point3::new(number(10)?, number(20)?, number(30)?), number(42)?))
}

fn build_spline(common: &CommonFields, fields: &Fields) -> EntityRecord {
    let control_points = fields.point_series(10).unwrap_or_default();
    let position = control_points.first().copied().unwrap_or(Point3::origin());
    let mut record = EntityRecord::new(EntityKind::Spline, common.layer.clone(), position)
        .with_property(
            "degree",
            PropertyValue::Integer(fields.number(71).unwrap_or(3.0) as i64),
        )
        .with_property("control_points", PropertyValue::Points(control_points));
    let knots = fields.numbers(40);
    if !knots.is_empty() {
        record.push_property("knots", PropertyValue::Numbers(knots));
    }
    let weights = fields.numbers(41);
    if !weights.is_empty() {
        record.push_property("weights", PropertyValue::Numbers(weights));
    }
    record
}

fn build_insert(common: &CommonFields, fields: &Fields) -> EntityRecord {
    let insert = fields.point(10).unwrap_or(Point3::origin());
    EntityRecord::new(EntityKind::Insert, common.layer.clone(), insert)
        .with_property(
            "name",
            PropertyValue::Text(fields.text(2).unwrap_or("").to_string()),
        )
        .with_property("xscale", PropertyValue::Number(fields.number(41).unwrap_or(1.0)))
        .with_property("yscale", PropertyValue::Number(fields.number(42).unwrap_or(1.0)))
        .with_property("zscale", PropertyValue::Number(fields.number(43).unwrap_or(1.0)))
        .with_property(
            "rotation",
            PropertyValue::Number(fields.number(50).unwrap_or(0.0)),
        )
}

fn build_dimension(common: &CommonFields, fields: &Fields) -> EntityRecord {
    let defpoint = fields.point(10).unwrap_or(Point3::origin());
    let mut record = EntityRecord::new(EntityKind::Dimension, common.layer.clone(), defpoint);
    if let Some(style) = fields.text(3) {
        record.push_property("dimstyle", PropertyValue::Text(style.to_string()));
    }
    if let Some(text) = fields.text(1) {
        if !text.trim().is_empty() {
            record.push_property("text_override", PropertyValue::Text(text.trim().to_string()));
        }
    }
    if let Some(measurement) = fields.number(42) {
        record.push_property("measurement", PropertyValue::Number(measurement));
    }
    record
}

/// 未识别的实体类型：位置取首个坐标组，其余数值字段
/// 按 `code_<组码>` 原样保留，让差异器仍可逐项比较。
fn build_generic(kind: EntityKind, common: &CommonFields, fields: &Fields) -> EntityRecord {
    let position = fields.point(10).unwrap_or(Point3::origin());
    let mut record = EntityRecord::new(kind, common.layer.clone(), position);
    for (code, value) in &fields.pairs {
        if matches!(code, 10 | 20 | 30) {
            continue;
        }
        record.push_property(format!("code_{code}"), PropertyValue::Number(*value));
    }
    for (code, value) in &fields.texts {
        if matches!(code, 100 | 102) {
            continue;
        }
        record.push_property(format!("code_{code}"), PropertyValue::Text(value.clone()));
    }
    record
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => return Ok(None),
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "尝试多次回退 DXF pair");
        self.buffer = Some(pair);
    }
}

fn decode_mtext_content(raw: &str) -> String {
    let mut result = String::new();
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('P') | Some('p') => result.push('\n'),
                Some('~') => result.push(' '),
                Some('\\') => result.push('\\'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    result
}
