use async_trait::async_trait;
use cvx_types::{ArtifactFormat, EndpointKind, RequestId, RequestParams, ResultRef, UserId};

use crate::error::GateError;

/// Everything the extraction pipeline needs to materialize one artifact.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionJob {
    pub user: UserId,
    pub request_id: RequestId,
    pub endpoint: EndpointKind,
    pub params: RequestParams,
    pub format: ArtifactFormat,
    /// Where the artifact must be written.
    pub result_ref: ResultRef,
}

/// Seam to the external extraction/rendering pipeline.
///
/// The gateway never inspects the artifact; it only needs to know whether
/// the hand-off (or, under `AwaitArtifact`, the production itself) succeeded.
#[async_trait]
pub trait ArtifactProducer: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    async fn produce(&self, job: &ExtractionJob) -> Result<(), GateError>;
}

/// Producer that only records the hand-off.
///
/// Stands in for the external pipeline when none is wired up; the artifact
/// is expected to be materialized by whatever watches the result location.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeferredProducer;

#[async_trait]
impl ArtifactProducer for DeferredProducer {
    fn name(&self) -> &str {
        "deferred"
    }

    async fn produce(&self, job: &ExtractionJob) -> Result<(), GateError> {
        tracing::debug!(
            user = %job.user,
            request_id = %job.request_id,
            endpoint = %job.endpoint,
            result = %job.result_ref,
            "extraction job handed off"
        );
        Ok(())
    }
}
