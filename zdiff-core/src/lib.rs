pub mod geometry {
    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    /// 三维点，内部以 `glam::DVec3` 表示，所有坐标为双精度。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        /// 原点，作为无自然锚点实体的默认位置。
        #[inline]
        pub fn origin() -> Self {
            Self(DVec3::ZERO)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        /// 与另一点的欧氏距离。
        #[inline]
        pub fn distance_to(self, other: Point3) -> f64 {
            self.0.distance(other.0)
        }

        /// 相对偏移（other - self），用于构造与位置无关的几何指纹。
        #[inline]
        pub fn offset_to(self, other: Point3) -> Point3 {
            Self(other.0 - self.0)
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

}

pub mod record {
    use serde::{Deserialize, Serialize};

    use crate::geometry::Point3;

    /// 实体类别，覆盖比较器关心的封闭集合；
    /// 未识别的类型落入 `Other` 并保留原始类型名。
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum EntityKind {
        Line,
        Circle,
        Arc,
        Ellipse,
        Text,
        MText,
        LwPolyline,
        Polyline,
        Spline,
        Insert,
        Dimension,
        Other(String),
    }

    impl EntityKind {
        /// 从 DXF 实体名解析类别。
        pub fn from_dxf_name(name: &str) -> Self {
            match name {
                "LINE" => EntityKind::Line,
                "CIRCLE" => EntityKind::Circle,
                "ARC" => EntityKind::Arc,
                "ELLIPSE" => EntityKind::Ellipse,
                "TEXT" => EntityKind::Text,
                "MTEXT" => EntityKind::MText,
                "LWPOLYLINE" => EntityKind::LwPolyline,
                "POLYLINE" => EntityKind::Polyline,
                "SPLINE" => EntityKind::Spline,
                "INSERT" => EntityKind::Insert,
                "DIMENSION" => EntityKind::Dimension,
                other => EntityKind::Other(other.to_string()),
            }
        }

        /// 类别名称，用于匹配键与报告输出。
        pub fn as_str(&self) -> &str {
            match self {
                EntityKind::Line => "LINE",
                EntityKind::Circle => "CIRCLE",
                EntityKind::Arc => "ARC",
                EntityKind::Ellipse => "ELLIPSE",
                EntityKind::Text => "TEXT",
                EntityKind::MText => "MTEXT",
                EntityKind::LwPolyline => "LWPOLYLINE",
                EntityKind::Polyline => "POLYLINE",
                EntityKind::Spline => "SPLINE",
                EntityKind::Insert => "INSERT",
                EntityKind::Dimension => "DIMENSION",
                EntityKind::Other(name) => name,
            }
        }

        /// 文字类实体在匹配键中附带文本内容，
        /// 最近邻匹配也要求双方文本非空。
        #[inline]
        pub fn is_text_like(&self) -> bool {
            matches!(self, EntityKind::Text | EntityKind::MText)
        }
    }

    /// 属性值的封闭变体集合。提取器保证不出现其他形态。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum PropertyValue {
        Number(f64),
        Integer(i64),
        Text(String),
        Boolean(bool),
        Point(Point3),
        Points(Vec<Point3>),
        Numbers(Vec<f64>),
    }

    impl PropertyValue {
        pub fn as_number(&self) -> Option<f64> {
            match self {
                PropertyValue::Number(value) => Some(*value),
                PropertyValue::Integer(value) => Some(*value as f64),
                _ => None,
            }
        }

        pub fn as_text(&self) -> Option<&str> {
            match self {
                PropertyValue::Text(value) => Some(value),
                _ => None,
            }
        }
    }

    /// 提取器输出的标准化实体记录。
    ///
    /// `handle` 仅在单次提取内稳定，跨版本匹配永远不依赖它；
    /// `properties` 保持提取顺序，差异报告按此顺序输出。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct EntityRecord {
        pub handle: String,
        pub kind: EntityKind,
        pub layer: String,
        pub color: i32,
        pub linetype: String,
        pub position: Point3,
        pub properties: Vec<(String, PropertyValue)>,
        pub text: Option<String>,
    }

    impl EntityRecord {
        /// 构造一个带默认显示属性的记录，测试与提取器共用。
        pub fn new(kind: EntityKind, layer: impl Into<String>, position: Point3) -> Self {
            Self {
                handle: String::new(),
                kind,
                layer: layer.into(),
                color: 256,
                linetype: "BYLAYER".to_string(),
                position,
                properties: Vec::new(),
                text: None,
            }
        }

        pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
            self.handle = handle.into();
            self
        }

        pub fn with_color(mut self, color: i32) -> Self {
            self.color = color;
            self
        }

        pub fn with_text(mut self, text: impl Into<String>) -> Self {
            self.text = Some(text.into());
            self
        }

        pub fn push_property(&mut self, name: impl Into<String>, value: PropertyValue) {
            self.properties.push((name.into(), value));
        }

        pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
            self.push_property(name, value);
            self
        }

        /// 按名称查找类型相关属性。
        pub fn property(&self, name: &str) -> Option<&PropertyValue> {
            self.properties
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value)
        }

        /// 文本内容（去除首尾空白），仅文字类实体返回非 None。
        pub fn trimmed_text(&self) -> Option<&str> {
            self.text.as_deref().map(str::trim)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn kind_round_trips_dxf_names() {
            assert_eq!(EntityKind::from_dxf_name("LINE"), EntityKind::Line);
            assert_eq!(EntityKind::from_dxf_name("MTEXT"), EntityKind::MText);
            let other = EntityKind::from_dxf_name("POINT");
            assert_eq!(other, EntityKind::Other("POINT".to_string()));
            assert_eq!(other.as_str(), "POINT");
        }

        #[test]
        fn properties_preserve_insertion_order() {
            let mut record =
                EntityRecord::new(EntityKind::Circle, "GEOM", Point3::new(1.0, 2.0, 0.0));
            record.push_property("center", PropertyValue::Point(Point3::new(1.0, 2.0, 0.0)));
            record.push_property("radius", PropertyValue::Number(5.0));
            let names: Vec<&str> = record
                .properties
                .iter()
                .map(|(name, _)| name.as_str())
                .collect();
            assert_eq!(names, ["center", "radius"]);
            assert!(matches!(
                record.property("radius"),
                Some(PropertyValue::Number(value)) if (*value - 5.0).abs() < 1e-12
            ));
        }

        #[test]
        fn text_like_kinds_are_flagged() {
            assert!(EntityKind::Text.is_text_like());
            assert!(EntityKind::MText.is_text_like());
            assert!(!EntityKind::Insert.is_text_like());
        }
    }
}
