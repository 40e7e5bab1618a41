use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "DXF2VEC_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// 从 TOML 文本解析并校验。
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `DXF2VEC_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let current = env::current_dir().map_err(|source| ConfigError::Context {
            message: "获取当前工作目录失败".to_string(),
            source,
        })?;
        Self::discover_in(&current)
    }

    /// 在指定目录下查找 `config/default.toml`。
    pub fn discover_in(root: &Path) -> Result<Self, ConfigError> {
        let default_path = root.join("config").join("default.toml");
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let conversion = &self.conversion;
        // 绝对容差过小时由转换流程钳制到下限，这里只拒绝非有限值。
        if !conversion.epsilon.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "conversion.epsilon 必须为有限数值，当前为 {}",
                conversion.epsilon
            )));
        }
        if conversion.epsilon_mode == EpsilonKind::Relative && conversion.epsilon <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "相对模式下 conversion.epsilon 必须为正数，当前为 {}",
                conversion.epsilon
            )));
        }
        if !conversion.paper_scale.is_finite() || conversion.paper_scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "conversion.paper_scale 必须为正数，当前为 {}",
                conversion.paper_scale
            )));
        }
        if conversion.max_block_depth == 0 {
            return Err(ConfigError::Invalid(
                "conversion.max_block_depth 不能为 0".to_string(),
            ));
        }
        Ok(())
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpsilonKind {
    #[default]
    Absolute,
    Relative,
}

/// 转换参数。`epsilon` 在绝对模式下单位为毫米，相对模式下为图纸最大尺寸的百分比。
#[derive(Debug, Clone, Deserialize)]
pub struct ConversionConfig {
    #[serde(default = "ConversionConfig::default_epsilon")]
    pub epsilon: f64,
    #[serde(default)]
    pub epsilon_mode: EpsilonKind,
    #[serde(default = "ConversionConfig::default_paper_scale")]
    pub paper_scale: f64,
    #[serde(default)]
    pub anchor: Option<[f64; 3]>,
    #[serde(default = "ConversionConfig::default_max_block_depth")]
    pub max_block_depth: usize,
}

impl ConversionConfig {
    fn default_epsilon() -> f64 {
        0.1
    }

    fn default_paper_scale() -> f64 {
        1.0
    }

    fn default_max_block_depth() -> usize {
        64
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            epsilon: Self::default_epsilon(),
            epsilon_mode: EpsilonKind::default(),
            paper_scale: Self::default_paper_scale(),
            anchor: None,
            max_block_depth: Self::default_max_block_depth(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// 默认输出目录；未设置时输出到输入文件所在目录。
    #[serde(default)]
    pub directory: Option<PathBuf>,
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
    #[error("配置无效: {0}")]
    Invalid(String),
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
    fn defaults_are_returned_when_file_missing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let cfg = AppConfig::discover_in(dir.path()).expect("discover should succeed");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.conversion.epsilon_mode, EpsilonKind::Absolute);
        assert!((cfg.conversion.epsilon - 0.1).abs() < f64::EPSILON);
        assert!((cfg.conversion.paper_scale - 1.0).abs() < f64::EPSILON);
        assert!(cfg.conversion.anchor.is_none());
        assert_eq!(cfg.conversion.max_block_depth, 64);
        assert!(cfg.output.directory.is_none());
    }

    #[test]
    fn discover_in_reads_default_toml() {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::create_dir(dir.path().join("config")).unwrap();
        fs::write(
            dir.path().join("config").join("default.toml"),
            "[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();
        let cfg = AppConfig::discover_in(dir.path()).expect("discover");
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [conversion]
            epsilon = 0.5
            epsilon_mode = "relative"
            paper_scale = 0.25
            anchor = [10.0, 20.0, 0.0]
            max_block_depth = 8

            [output]
            directory = "../out"
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.conversion.epsilon_mode, EpsilonKind::Relative);
        assert!((cfg.conversion.epsilon - 0.5).abs() < f64::EPSILON);
        assert!((cfg.conversion.paper_scale - 0.25).abs() < f64::EPSILON);
        assert_eq!(cfg.conversion.anchor, Some([10.0, 20.0, 0.0]));
        assert_eq!(cfg.conversion.max_block_depth, 8);
        assert_eq!(cfg.output.directory, Some(PathBuf::from("../out")));
    }

    #[test]
    fn parse_error_carries_path() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[conversion]\nepsilon = \"fine\"").unwrap();
        match AppConfig::from_file(file.path()) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_values_are_rejected() {
        assert!(matches!(
            AppConfig::from_toml("[conversion]\nepsilon = 0.0\nepsilon_mode = \"relative\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_toml("[conversion]\nepsilon = nan"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_toml("[conversion]\npaper_scale = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_toml("[conversion]\nmax_block_depth = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn small_absolute_epsilon_is_accepted() {
        for value in ["0.0", "-0.5", "0.0005"] {
            let cfg = AppConfig::from_toml(&format!("[conversion]\nepsilon = {value}"))
                .expect("绝对容差交由转换流程钳制");
            assert_eq!(cfg.conversion.epsilon_mode, EpsilonKind::Absolute);
        }
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        assert!(matches!(
            AppConfig::from_toml("[conversion]\nepsilon_mode = \"fuzzy\""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_explicit_file_is_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = AppConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
