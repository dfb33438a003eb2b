use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use zdiff_config::{AppConfig, ConfigError};
use zdiff_engine::config::CompareConfig;
use zdiff_frontend::errors::FrontendError;
use zdiff_frontend::{batch, json, report};

/// DXF 图纸版本比较工具。
#[derive(Debug, Parser)]
#[command(name = "zdiff", version, about = "比较两个版本的 DXF 图纸并报告差异")]
struct Cli {
    /// 配置文件路径（缺省时自动发现）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 比较两个 DXF 文件
    Compare {
        /// 旧版本文件
        file_a: PathBuf,
        /// 新版本文件
        file_b: PathBuf,
        /// 位置类属性的逐坐标容差
        #[arg(long)]
        position_tolerance: Option<f64>,
        /// 普通数值属性的容差
        #[arg(long)]
        numeric_tolerance: Option<f64>,
        /// 最近邻匹配的空间半径
        #[arg(long)]
        match_radius: Option<f64>,
        /// 追加排除的属性名，可重复
        #[arg(long = "exclude", value_name = "ATTR")]
        excluded: Vec<String>,
        /// 忽略文字与块参照的旋转属性
        #[arg(long)]
        ignore_rotation: bool,
        /// 以 JSON 输出报告
        #[arg(long)]
        json: bool,
    },
    /// 按后缀约定批量比较目录中的版本对
    Batch {
        /// 待扫描的目录
        directory: PathBuf,
        /// 将文本汇总另存到文件
        #[arg(long)]
        output: Option<PathBuf>,
        /// 最近邻匹配的空间半径
        #[arg(long)]
        match_radius: Option<f64>,
        /// 忽略文字与块参照的旋转属性
        #[arg(long)]
        ignore_rotation: bool,
    },
    /// 仅比较文字实体的旋转朝向
    Orientation {
        /// 旧版本文件
        file_a: PathBuf,
        /// 新版本文件
        file_b: PathBuf,
        /// 角度容差（度）
        #[arg(long)]
        angular_tolerance: Option<f64>,
        /// 以 JSON 输出报告
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = load_configuration(cli.config.clone());
    init_logging(&config);
    info!("启动 zdiff");

    match run(&cli, &config) {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(err) => {
            error!(error = %err, "运行失败");
            eprintln!("错误：{err}");
            ExitCode::from(2)
        }
    }
}

/// 执行子命令，返回是否发现差异。
fn run(cli: &Cli, config: &AppConfig) -> Result<bool, FrontendError> {
    match &cli.command {
        Command::Compare {
            file_a,
            file_b,
            position_tolerance,
            numeric_tolerance,
            match_radius,
            excluded,
            ignore_rotation,
            json: as_json,
        } => {
            let mut compare = config.compare.to_compare_config();
            apply_overrides(
                &mut compare,
                *position_tolerance,
                *numeric_tolerance,
                *match_radius,
                excluded,
                *ignore_rotation,
            );
            let report = zdiff_frontend::compare_files(file_a, file_b, &compare)?;
            let label_a = file_a.display().to_string();
            let label_b = file_b.display().to_string();
            if *as_json {
                println!("{}", json::render_compare_json(&report, &label_a, &label_b)?);
            } else {
                print!("{}", report::render_compare(&report, &label_a, &label_b));
            }
            Ok(report.has_changes())
        }
        Command::Batch {
            directory,
            output,
            match_radius,
            ignore_rotation,
        } => {
            let mut compare = config.compare.to_compare_config();
            apply_overrides(&mut compare, None, None, *match_radius, &[], *ignore_rotation);
            let summary =
                batch::run_batch(directory, &config.batch, &compare, output.as_deref())?;
            print!("{}", batch::render_batch(&summary));
            Ok(summary.has_changes())
        }
        Command::Orientation {
            file_a,
            file_b,
            angular_tolerance,
            json: as_json,
        } => {
            let mut orientation = config.orientation.to_orientation_config();
            if let Some(tolerance) = angular_tolerance {
                orientation.angular_tolerance_deg = *tolerance;
            }
            let report = zdiff_frontend::orientation_files(file_a, file_b, &orientation)?;
            let label_a = file_a.display().to_string();
            let label_b = file_b.display().to_string();
            if *as_json {
                println!(
                    "{}",
                    json::render_orientation_json(&report, &label_a, &label_b)?
                );
            } else {
                print!("{}", report::render_orientation(&report, &label_a, &label_b));
            }
            Ok(report.has_changes())
        }
    }
}

fn apply_overrides(
    compare: &mut CompareConfig,
    position_tolerance: Option<f64>,
    numeric_tolerance: Option<f64>,
    match_radius: Option<f64>,
    excluded: &[String],
    ignore_rotation: bool,
) {
    if let Some(tolerance) = position_tolerance {
        compare.position_tolerance = tolerance;
    }
    if let Some(tolerance) = numeric_tolerance {
        compare.numeric_tolerance = tolerance;
    }
    if let Some(radius) = match_radius {
        compare.match_radius = radius;
    }
    for attribute in excluded {
        compare.excluded_attributes.insert(attribute.clone());
    }
    if ignore_rotation {
        compare.excluded_attributes.insert("rotation".to_string());
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 日志走 stderr，stdout 留给报告本身（含 --json 输出）
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
