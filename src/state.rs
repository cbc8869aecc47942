use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    /// Whether the keys for the selected providers were present at startup.
    pub api_key_configured: bool,
}

impl AppState {
    pub fn new(pipeline: Pipeline, api_key_configured: bool) -> Self {
        AppState {
            pipeline,
            api_key_configured,
        }
    }
}
