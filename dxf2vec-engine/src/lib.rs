pub mod epsilon;
pub mod extents;
pub mod flatten;
pub mod pipeline;
pub mod reorder;
pub mod simplify;
pub mod tessellate;
pub mod transform;

pub use epsilon::{Epsilon, EpsilonMode, MIN_EPSILON};
pub use pipeline::{ConversionOutput, Pipeline, PipelineOptions};

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("drawing contains no drawable content")]
        NoDrawableContent,
        #[error("invalid epsilon value {0}")]
        InvalidEpsilon(f64),
    }
}
