use async_trait::async_trait;
use servestatic_core::contract::CustomResourceResponse;

use crate::error::CallbackError;

/// Delivers the terminal custom resource response to the orchestrator.
#[async_trait]
pub trait OutcomeReporter: Send + Sync {
    async fn report(
        &self,
        response_url: &str,
        response: &CustomResourceResponse,
    ) -> Result<(), CallbackError>;
}
