use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use dxf2vec_config::{AppConfig, ConfigError, EpsilonKind};
use dxf2vec_frontend::{BatchConverter, ConversionRequest};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 将 DXF 图纸转换为按加工顺序排列的 `.vec` 折线文件。
#[derive(Debug, Parser)]
#[command(name = "dxf2vec", version)]
struct Cli {
    /// 待转换的 DXF 文件，非 `.dxf` 文件会被跳过。
    #[arg(value_name = "DXF_FILES", required = true)]
    dxf_files: Vec<PathBuf>,

    /// 输出文件；多个输入时合并写入该文件。
    #[arg(short = 'o', long = "outfile", value_name = "FILE")]
    outfile: Option<PathBuf>,

    /// 输出目录，不存在时自动创建。
    #[arg(short = 't', long = "directory", value_name = "DIR")]
    directory: Option<PathBuf>,

    /// 离散化与化简容差，绝对模式下单位为毫米。
    #[arg(short = 'e', long = "epsilon", value_name = "VALUE")]
    epsilon: Option<f64>,

    /// 容差按图纸最大尺寸的百分比解释。
    #[arg(long)]
    relative: bool,

    /// 路径排序起点，格式为 `x,y,z`。
    #[arg(long = "start", value_name = "X,Y,Z", value_parser = parse_point)]
    start: Option<[f64; 3]>,

    #[arg(long = "paper-scale", value_name = "SCALE")]
    paper_scale: Option<f64>,

    /// 显式指定配置文件。
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("错误: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let (mut config, fallback) = load_configuration(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    init_logging(&config);
    if let Some(err) = fallback {
        report_fallback(&err);
    }
    config.validate().context("命令行参数无效")?;
    info!(inputs = cli.dxf_files.len(), "启动 dxf2vec");

    let mut request = ConversionRequest::from_config(&config, cli.dxf_files);
    request.out_file = cli.outfile;
    if cli.directory.is_some() {
        request.out_dir = cli.directory;
    }

    let report = BatchConverter::dxf().run(&request)?;
    for failure in &report.failures {
        eprintln!("{}: {}", failure.path.display(), failure.error);
    }
    for converted in &report.converted {
        info!(
            output = %converted.output.display(),
            records = converted.records,
            points = converted.points,
            "已写出"
        );
    }
    Ok(report.is_success())
}

/// 显式指定的配置文件必须可用；自动发现失败时退回默认配置，并把错误交给调用方在日志就绪后输出。
fn load_configuration(
    explicit: Option<&std::path::Path>,
) -> Result<(AppConfig, Option<ConfigError>)> {
    if let Some(path) = explicit {
        let config = AppConfig::from_file(path)
            .with_context(|| format!("加载配置文件 {} 失败", path.display()))?;
        return Ok((config, None));
    }
    match AppConfig::discover() {
        Ok(config) => Ok((config, None)),
        Err(err) => Ok((AppConfig::default(), Some(err))),
    }
}

fn report_fallback(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
        }
        ConfigError::Invalid(_) | ConfigError::Context { .. } => {
            warn!(error = %err, "加载默认配置失败，使用内建默认值");
        }
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    let conversion = &mut config.conversion;
    if let Some(epsilon) = cli.epsilon {
        conversion.epsilon = epsilon;
    }
    if cli.relative {
        conversion.epsilon_mode = EpsilonKind::Relative;
    }
    if let Some(start) = cli.start {
        conversion.anchor = Some(start);
    }
    if let Some(scale) = cli.paper_scale {
        conversion.paper_scale = scale;
    }
}

fn parse_point(value: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("需要 3 个以逗号分隔的坐标，实际为 {}", parts.len()));
    };
    let coordinate = |text: &str| {
        text.parse::<f64>()
            .map_err(|err| format!("无效坐标 `{text}`: {err}"))
    };
    Ok([coordinate(*x)?, coordinate(*y)?, coordinate(*z)?])
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
