use crate::engine::batch::ItemFailure;
use crate::materials::Materials;
use crate::outline::Outline;
use std::collections::HashMap;
use std::path::PathBuf;

/// What the caller asked for
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    pub topic: String,
    pub materials_dir: PathBuf,
    pub outline_path: Option<PathBuf>,
}

/// Per-section writing results keyed by section index
#[derive(Debug, Clone, Default)]
pub struct WritingResults {
    pub results: HashMap<String, String>,
    pub failures: Vec<ItemFailure>,
}

/// Final document and where it was written
#[derive(Debug, Clone)]
pub struct OutputRecord {
    pub document: String,
    pub path: PathBuf,
}

/// Shared state for one flow run
///
/// Each field is owned by the stage that fills it. Stages read it through
/// `prepare(&Context)` and write only in `finalize(&mut Context, ..)`, which
/// the flow calls one stage at a time.
#[derive(Debug, Default)]
pub struct Context {
    pub input: RunInput,
    pub materials: Option<Materials>,
    pub analysis: Option<String>,
    pub outline: Option<Outline>,
    pub writing: WritingResults,
    pub output: Option<OutputRecord>,
    pub artifacts: Vec<PathBuf>,
    pub summary: Option<String>,
}

impl Context {
    pub fn new(input: RunInput) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }
}
