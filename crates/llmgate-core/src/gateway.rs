//! Gateway trait definition

use crate::{
    Result,
    chat::{CanonicalChatRequest, CanonicalChatResponse},
};
use tokio_util::sync::CancellationToken;

/// Runs one canonical request against the provider it names
///
/// Implementations must stop promptly once `cancel` fires and report
/// [`crate::Error::Cancelled`] rather than a partial result.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    async fn generate(
        &self,
        request: CanonicalChatRequest,
        cancel: CancellationToken,
    ) -> Result<CanonicalChatResponse>;
}
