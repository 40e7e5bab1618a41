use tracing::debug;
use dxf2vec_core::document::Document;

use crate::errors::EngineError;
use crate::extents::drawing_extents;

/// 容差下限（毫米）。
pub const MIN_EPSILON: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpsilonMode {
    #[default]
    Absolute,
    /// 以图纸最大尺寸的百分比表示。
    Relative,
}

/// 离散化与化简共用的距离容差。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Epsilon {
    Absolute(f64),
    Relative(f64),
}

impl Epsilon {
    pub fn new(value: f64, mode: EpsilonMode) -> Self {
        match mode {
            EpsilonMode::Absolute => Epsilon::Absolute(value),
            EpsilonMode::Relative => Epsilon::Relative(value),
        }
    }

    pub fn mode(&self) -> EpsilonMode {
        match self {
            Epsilon::Absolute(_) => EpsilonMode::Absolute,
            Epsilon::Relative(_) => EpsilonMode::Relative,
        }
    }

    /// 计算实际使用的容差（毫米），结果不小于 [`MIN_EPSILON`]。
    pub fn resolve(self, document: &Document, max_block_depth: usize) -> Result<f64, EngineError> {
        match self {
            Epsilon::Absolute(value) => {
                if value.is_nan() || value == f64::INFINITY {
                    return Err(EngineError::InvalidEpsilon(value));
                }
                Ok(value.max(MIN_EPSILON))
            }
            Epsilon::Relative(percent) => {
                if !percent.is_finite() || percent <= 0.0 {
                    return Err(EngineError::InvalidEpsilon(percent));
                }
                let extents = drawing_extents(document, max_block_depth);
                let size = extents.max_dimension();
                let epsilon = (size * percent / 100.0).max(MIN_EPSILON);
                debug!(size, percent, epsilon, "按图纸尺寸计算相对容差");
                Ok(epsilon)
            }
        }
    }
}

impl Default for Epsilon {
    fn default() -> Self {
        Epsilon::Absolute(0.1)
    }
}
