use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use zdiff_engine::config::CompareConfig;
use zdiff_engine::orientation::OrientationConfig;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub compare: CompareSettings,
    #[serde(default)]
    pub orientation: OrientationSettings,
    #[serde(default)]
    pub batch: BatchSettings,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `ZDIFF_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("ZDIFF_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 比较参数的可序列化形式，默认值与引擎一致。
#[derive(Debug, Clone, Deserialize)]
pub struct CompareSettings {
    #[serde(default = "CompareSettings::default_position_tolerance")]
    pub position_tolerance: f64,
    #[serde(default = "CompareSettings::default_numeric_tolerance")]
    pub numeric_tolerance: f64,
    #[serde(default = "CompareSettings::default_match_radius")]
    pub match_radius: f64,
    #[serde(default = "CompareSettings::default_key_rounding_decimals")]
    pub key_rounding_decimals: usize,
    #[serde(default)]
    pub excluded_attributes: Vec<String>,
}

impl CompareSettings {
    fn default_position_tolerance() -> f64 {
        0.001
    }

    fn default_numeric_tolerance() -> f64 {
        1e-6
    }

    fn default_match_radius() -> f64 {
        10.0
    }

    fn default_key_rounding_decimals() -> usize {
        1
    }

    /// 转换为引擎使用的不可变配置。合法性由引擎在比较入口校验。
    pub fn to_compare_config(&self) -> CompareConfig {
        CompareConfig {
            position_tolerance: self.position_tolerance,
            numeric_tolerance: self.numeric_tolerance,
            match_radius: self.match_radius,
            key_rounding_decimals: self.key_rounding_decimals,
            excluded_attributes: self
                .excluded_attributes
                .iter()
                .cloned()
                .collect::<BTreeSet<String>>(),
        }
    }
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self {
            position_tolerance: Self::default_position_tolerance(),
            numeric_tolerance: Self::default_numeric_tolerance(),
            match_radius: Self::default_match_radius(),
            key_rounding_decimals: Self::default_key_rounding_decimals(),
            excluded_attributes: Vec::new(),
        }
    }
}

/// 朝向比较参数。
#[derive(Debug, Clone, Deserialize)]
pub struct OrientationSettings {
    #[serde(default = "OrientationSettings::default_angular_tolerance_deg")]
    pub angular_tolerance_deg: f64,
    #[serde(default = "OrientationSettings::default_position_tolerance")]
    pub position_tolerance: f64,
}

impl OrientationSettings {
    fn default_angular_tolerance_deg() -> f64 {
        0.1
    }

    fn default_position_tolerance() -> f64 {
        0.01
    }

    pub fn to_orientation_config(&self) -> OrientationConfig {
        OrientationConfig {
            angular_tolerance_deg: self.angular_tolerance_deg,
            position_tolerance: self.position_tolerance,
        }
    }
}

impl Default for OrientationSettings {
    fn default() -> Self {
        Self {
            angular_tolerance_deg: Self::default_angular_tolerance_deg(),
            position_tolerance: Self::default_position_tolerance(),
        }
    }
}

/// 批量模式参数。
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettings {
    /// 旧版本文件名的识别后缀（不含扩展名）。
    #[serde(default = "BatchSettings::default_old_suffix")]
    pub old_suffix: String,
    /// 新版本文件名的识别后缀（不含扩展名）。
    #[serde(default = "BatchSettings::default_new_suffix")]
    pub new_suffix: String,
}

impl BatchSettings {
    fn default_old_suffix() -> String {
        "_old".to_string()
    }

    fn default_new_suffix() -> String {
        "_new".to_string()
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            old_suffix: Self::default_old_suffix(),
            new_suffix: Self::default_new_suffix(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_engine_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        let compare = cfg.compare.to_compare_config();
        assert_eq!(compare, CompareConfig::default());
        assert_eq!(cfg.batch.old_suffix, "_old");
        assert_eq!(cfg.batch.new_suffix, "_new");
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [compare]
            match_radius = 25.0
            excluded_attributes = ["rotation", "style"]

            [orientation]
            angular_tolerance_deg = 0.5

            [batch]
            old_suffix = "-rev1"
            new_suffix = "-rev2"
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        let compare = cfg.compare.to_compare_config();
        assert!((compare.match_radius - 25.0).abs() < 1e-9);
        assert!(compare.is_excluded("rotation"));
        assert!(compare.is_excluded("style"));
        // 未显式设置的字段落回默认
        assert!((compare.position_tolerance - 0.001).abs() < 1e-12);
        assert!((cfg.orientation.angular_tolerance_deg - 0.5).abs() < 1e-9);
        assert_eq!(cfg.batch.old_suffix, "-rev1");
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[compare\nmatch_radius = ").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
