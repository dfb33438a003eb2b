use std::path::PathBuf;

use zdiff_core::record::{EntityKind, PropertyValue};
use zdiff_io::{DrawingExtractor, DxfExtractor, IoError};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn extracts_all_entities_in_file_order() {
    let extractor = DxfExtractor::new();
    let drawing = extractor
        .extract(&fixture("revision_a.dxf"))
        .expect("读取 DXF 失败");

    assert!(drawing.warnings.is_empty());
    let kinds: Vec<&EntityKind> = drawing.entities.iter().map(|r| &r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            &EntityKind::Line,
            &EntityKind::Circle,
            &EntityKind::Text,
            &EntityKind::Arc
        ]
    );

    let circle = &drawing.entities[1];
    assert_eq!(circle.handle, "A2");
    assert_eq!(circle.layer, "GEOM");
    assert_eq!(circle.color, 3);
    assert_eq!(circle.property("radius"), Some(&PropertyValue::Number(10.0)));

    let text = &drawing.entities[2];
    assert_eq!(text.trimmed_text(), Some("ROOM-101"));
    assert_eq!(text.property("rotation"), Some(&PropertyValue::Number(0.0)));
}

#[test]
fn arc_angles_stay_in_degrees() {
    let extractor = DxfExtractor::new();
    let drawing = extractor
        .extract(&fixture("revision_a.dxf"))
        .expect("读取 DXF 失败");
    let arc = &drawing.entities[3];
    assert_eq!(arc.kind, EntityKind::Arc);
    assert_eq!(arc.property("start_angle"), Some(&PropertyValue::Number(0.0)));
    assert_eq!(arc.property("end_angle"), Some(&PropertyValue::Number(90.0)));
}

#[test]
fn missing_file_is_a_read_error() {
    let extractor = DxfExtractor::new();
    let err = extractor
        .extract(&fixture("does_not_exist.dxf"))
        .unwrap_err();
    assert!(matches!(err, IoError::ReadError { .. }));
}

#[test]
fn closed_lwpolyline_round_trips_closed_flag() {
    let extractor = DxfExtractor::new();
    let drawing = extractor
        .extract(&fixture("revision_b.dxf"))
        .expect("读取 DXF 失败");
    let polyline = drawing
        .entities
        .iter()
        .find(|r| r.kind == EntityKind::LwPolyline)
        .expect("未找到 LWPOLYLINE 实体");
    assert_eq!(polyline.property("closed"), Some(&PropertyValue::Boolean(true)));
    match polyline.property("vertices") {
        Some(PropertyValue::Points(points)) => assert_eq!(points.len(), 3),
        other => panic!("意外的顶点属性：{other:?}"),
    }
}
