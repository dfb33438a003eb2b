pub mod differ;
pub mod matcher;
pub mod orientation;
pub mod signature;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ConfigError {
        #[error("tolerance `{name}` must not be negative (got {value})")]
        NegativeTolerance { name: &'static str, value: f64 },
        #[error("excluded attribute name must not be empty")]
        EmptyExcludedAttribute,
    }
}

pub mod config {
    use std::collections::BTreeSet;

    use serde::{Deserialize, Serialize};

    use crate::errors::ConfigError;

    /// 一次比较运行的全部可调参数。不可变，按值传入每次调用，
    /// 使比较成为纯函数，可安全并行处理多对文件。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CompareConfig {
        /// 位置类属性的逐坐标容差。
        pub position_tolerance: f64,
        /// 普通数值属性的容差。
        pub numeric_tolerance: f64,
        /// 最近邻匹配的空间半径（图纸单位）。
        pub match_radius: f64,
        /// 匹配键中坐标量化的小数位数。
        pub key_rounding_decimals: usize,
        /// 按名称全局排除的类型相关属性（基础属性不受影响）。
        pub excluded_attributes: BTreeSet<String>,
    }

    impl Default for CompareConfig {
        fn default() -> Self {
            Self {
                position_tolerance: 0.001,
                numeric_tolerance: 1e-6,
                match_radius: 10.0,
                key_rounding_decimals: 1,
                excluded_attributes: BTreeSet::new(),
            }
        }
    }

    impl CompareConfig {
        /// 忽略方向模式：排除 `rotation`，文字/块参照的旋转变化不再上报。
        pub fn orientation_blind() -> Self {
            let mut config = Self::default();
            config.excluded_attributes.insert("rotation".to_string());
            config
        }

        /// 判定某个类型相关属性是否被排除。
        #[inline]
        pub fn is_excluded(&self, attribute: &str) -> bool {
            self.excluded_attributes.contains(attribute)
        }

        /// 在任何提取工作开始前校验参数，拒绝负容差与空排除名。
        pub fn validate(&self) -> Result<(), ConfigError> {
            for (name, value) in [
                ("position_tolerance", self.position_tolerance),
                ("numeric_tolerance", self.numeric_tolerance),
                ("match_radius", self.match_radius),
            ] {
                if value < 0.0 {
                    return Err(ConfigError::NegativeTolerance { name, value });
                }
            }
            if self.excluded_attributes.iter().any(|name| name.is_empty()) {
                return Err(ConfigError::EmptyExcludedAttribute);
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn defaults_match_documented_values() {
            let config = CompareConfig::default();
            assert!((config.position_tolerance - 0.001).abs() < 1e-15);
            assert!((config.numeric_tolerance - 1e-6).abs() < 1e-15);
            assert!((config.match_radius - 10.0).abs() < 1e-15);
            assert_eq!(config.key_rounding_decimals, 1);
            assert!(config.excluded_attributes.is_empty());
        }

        #[test]
        fn orientation_blind_excludes_rotation() {
            let config = CompareConfig::orientation_blind();
            assert!(config.is_excluded("rotation"));
            assert!(!config.is_excluded("radius"));
        }

        #[test]
        fn negative_tolerance_is_rejected_eagerly() {
            let config = CompareConfig {
                numeric_tolerance: -1e-6,
                ..CompareConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(matches!(
                err,
                crate::errors::ConfigError::NegativeTolerance {
                    name: "numeric_tolerance",
                    ..
                }
            ));
        }

        #[test]
        fn empty_exclusion_name_is_rejected() {
            let mut config = CompareConfig::default();
            config.excluded_attributes.insert(String::new());
            assert!(config.validate().is_err());
        }
    }
}
