use glam::Vec3;
use tracing::{debug, info};
use dxf2vec_core::document::Document;
use dxf2vec_core::record::PolylineRecord;

use crate::epsilon::Epsilon;
use crate::errors::EngineError;
use crate::flatten::{DEFAULT_MAX_BLOCK_DEPTH, FlattenOptions, Flattener};
use crate::reorder::reorder;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub epsilon: Epsilon,
    /// 排序起点；缺省为原点。
    pub anchor: Option<Vec3>,
    pub max_block_depth: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            epsilon: Epsilon::default(),
            anchor: None,
            max_block_depth: DEFAULT_MAX_BLOCK_DEPTH,
        }
    }
}

/// 单个图纸的转换结果。
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutput {
    pub records: Vec<PolylineRecord>,
    pub unit_code: u32,
    /// 实际使用的容差（毫米）。
    pub epsilon: f64,
}

/// 展平 → 离散化 → 化简 → 排序。每次调用都从新的记录集开始。
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn run(&self, document: &Document) -> Result<ConversionOutput, EngineError> {
        let mut output = self.flatten(document)?;
        output.records = self.reorder(output.records);
        Ok(output)
    }

    /// 只做展平，不排序；多个图纸合并输出时由调用方统一排序。
    pub fn flatten(&self, document: &Document) -> Result<ConversionOutput, EngineError> {
        if document.is_empty() {
            return Err(EngineError::NoDrawableContent);
        }
        let epsilon = self
            .options
            .epsilon
            .resolve(document, self.options.max_block_depth)?;
        let flattener = Flattener::new(
            document,
            FlattenOptions {
                epsilon,
                max_block_depth: self.options.max_block_depth,
            },
        );
        let records = flattener.flatten();
        if records.is_empty() {
            return Err(EngineError::NoDrawableContent);
        }

        let points: usize = records.iter().map(|record| record.points.len()).sum();
        info!(
            records = records.len(),
            points,
            epsilon,
            unit = document.unit().name(),
            "图纸展平完成"
        );
        Ok(ConversionOutput {
            records,
            unit_code: document.unit().code(),
            epsilon,
        })
    }

    pub fn reorder(&self, records: Vec<PolylineRecord>) -> Vec<PolylineRecord> {
        let ordered = reorder(records, self.options.anchor);
        debug!(records = ordered.len(), anchor = ?self.options.anchor, "路径排序完成");
        ordered
    }
}
