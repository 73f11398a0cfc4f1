//! Concrete report stages wired together by `pipeline`

mod analyze;
mod assemble;
mod load;
mod plan;
mod save;
mod summary;
mod write;

pub use analyze::{Analyze, OUTLINE_SUPPLIED};
pub use assemble::AssembleReport;
pub use load::LoadMaterials;
pub use plan::Plan;
pub use save::SaveOutline;
pub use summary::Summarize;
pub use write::{SectionJob, WriteSections};

use crate::engine::Attempt;
use crate::error::ExecutionError;
use crate::provider::{Inference, InferenceRequest, Inferred};

/// One inference call classified for the retry loop
pub(crate) async fn infer_attempt(
    inference: &dyn Inference,
    request: &InferenceRequest,
) -> Attempt<Inferred> {
    inference
        .infer(request)
        .await
        .map_err(ExecutionError::from)
        .into()
}
