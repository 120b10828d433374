pub mod error;
pub mod logging;

pub use error::{
    ApiError, ApiResult, AuthError, ExecutionError, PipelineError, RejectedQuery,
    TranslationError,
};
pub use logging::{init_logging, with_startup_logging};
