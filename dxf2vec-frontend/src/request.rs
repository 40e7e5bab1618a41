use std::path::PathBuf;

use glam::Vec3;
use dxf2vec_config::{AppConfig, EpsilonKind};
use dxf2vec_engine::flatten::DEFAULT_MAX_BLOCK_DEPTH;
use dxf2vec_engine::{Epsilon, EpsilonMode, PipelineOptions};

/// 一次批量转换的全部参数。
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub inputs: Vec<PathBuf>,
    /// 指定输出文件；多个输入时合并写入该文件。
    pub out_file: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub epsilon: Epsilon,
    pub anchor: Option<Vec3>,
    pub paper_scale: f64,
    pub max_block_depth: usize,
}

impl ConversionRequest {
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self {
            inputs,
            out_file: None,
            out_dir: None,
            epsilon: Epsilon::default(),
            anchor: None,
            paper_scale: 1.0,
            max_block_depth: DEFAULT_MAX_BLOCK_DEPTH,
        }
    }

    /// 以配置文件中的转换参数为基础构建请求，命令行参数随后覆盖。
    pub fn from_config(config: &AppConfig, inputs: Vec<PathBuf>) -> Self {
        let conversion = &config.conversion;
        let mode = match conversion.epsilon_mode {
            EpsilonKind::Absolute => EpsilonMode::Absolute,
            EpsilonKind::Relative => EpsilonMode::Relative,
        };
        Self {
            inputs,
            out_file: None,
            out_dir: config.output.directory.clone(),
            epsilon: Epsilon::new(conversion.epsilon, mode),
            anchor: conversion
                .anchor
                .map(|[x, y, z]| Vec3::new(x as f32, y as f32, z as f32)),
            paper_scale: conversion.paper_scale,
            max_block_depth: conversion.max_block_depth,
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            epsilon: self.epsilon,
            anchor: self.anchor,
            max_block_depth: self.max_block_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_defaults() {
        let request = ConversionRequest::new(vec![PathBuf::from("a.dxf")]);
        assert_eq!(request.pipeline_options(), PipelineOptions::default());
        assert_eq!(request.paper_scale, 1.0);
        assert!(request.out_file.is_none());
    }

    #[test]
    fn config_values_are_carried_over() {
        let config = AppConfig::from_toml(
            r#"
            [conversion]
            epsilon = 2.5
            epsilon_mode = "relative"
            paper_scale = 0.5
            anchor = [1.0, 2.0, 3.0]
            max_block_depth = 4

            [output]
            directory = "out"
            "#,
        )
        .expect("解析配置");
        let request = ConversionRequest::from_config(&config, vec![PathBuf::from("a.dxf")]);
        assert_eq!(request.epsilon, Epsilon::Relative(2.5));
        assert_eq!(request.anchor, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(request.paper_scale, 0.5);
        assert_eq!(request.out_dir, Some(PathBuf::from("out")));
        assert_eq!(request.pipeline_options().max_block_depth, 4);
    }
}
