use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use cvx_ledger::{EntitlementStore, LedgerWriter};
use cvx_types::{
    ArtifactFormat, EndpointKind, Entitlement, RequestEntry, RequestId, RequestParams,
    RequestRecord, ResultRef, TicketMinter, UserId, UuidMinter,
};

use crate::config::{GateConfig, ProductionPolicy};
use crate::error::GateError;
use crate::producer::{ArtifactProducer, DeferredProducer, ExtractionJob};

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

pub const CONFIRMATION_MESSAGE: &str = "Your data is ready for download.";

/// Receipt handed back to the caller for an accepted request.
#[derive(Clone, Debug, PartialEq)]
pub struct Confirmation {
    pub request_id: RequestId,
    pub result_ref: ResultRef,
    /// The record exactly as it was appended to the ledger.
    pub record: RequestRecord,
    /// Whether the artifact exists yet or is only promised.
    pub production: ProductionPolicy,
    /// Wall-clock time spent in the gateway.
    pub elapsed: Duration,
}

impl Confirmation {
    /// Human-facing message returned with the download URL.
    ///
    /// The same under both policies; under `Deferred` the URL is a promise.
    pub fn message(&self) -> &'static str {
        CONFIRMATION_MESSAGE
    }
}

/// Outcome of one submission.
#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
    /// Accepted and recorded.
    Confirmed(Confirmation),
    /// The caller is not entitled. Nothing was recorded.
    Denied { entitlement: Entitlement },
}

impl Submission {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        match self {
            Self::Confirmed(c) => Some(c),
            Self::Denied { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ExtractionGateway
// ---------------------------------------------------------------------------

/// Runs one extraction request end to end.
///
/// The gateway is the only path into the ledger for extraction requests:
/// entitlement check, ticket, result reference, optional production, then
/// append. An unentitled caller never reaches the ledger.
pub struct ExtractionGateway {
    config: GateConfig,
    entitlements: Arc<dyn EntitlementStore>,
    ledger: Arc<dyn LedgerWriter>,
    producer: Arc<dyn ArtifactProducer>,
    minter: Arc<dyn TicketMinter>,
}

impl ExtractionGateway {
    /// Create a gateway reading entitlements from and appending to `store`.
    ///
    /// Uses [`DeferredProducer`] and [`UuidMinter`]; override with
    /// [`Self::with_producer`] and [`Self::with_minter`].
    pub fn new<S>(config: GateConfig, store: Arc<S>) -> Self
    where
        S: EntitlementStore + LedgerWriter + 'static,
    {
        Self {
            config,
            entitlements: store.clone(),
            ledger: store,
            producer: Arc::new(DeferredProducer),
            minter: Arc::new(UuidMinter),
        }
    }

    pub fn with_producer(mut self, producer: Arc<dyn ArtifactProducer>) -> Self {
        self.producer = producer;
        self
    }

    pub fn with_minter(mut self, minter: Arc<dyn TicketMinter>) -> Self {
        self.minter = minter;
        self
    }

    /// The current configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Pick the artifact format for a parameter payload.
    pub fn artifact_format(&self, params: &RequestParams) -> ArtifactFormat {
        ArtifactFormat::for_data_type(params.data_type(), &self.config.vector_data_types)
    }

    /// Submit an extraction request on behalf of `user`.
    ///
    /// Returns `Denied` without side effects when the user is not `Paid`.
    /// On success exactly one record has been appended to the user's history
    /// before this returns.
    pub async fn submit(
        &self,
        user: &UserId,
        endpoint: EndpointKind,
        params: RequestParams,
    ) -> Result<Submission, GateError> {
        let started = Instant::now();

        let entitlement = self.entitlements.entitlement(user).await?;
        if !entitlement.is_paid() {
            tracing::warn!(user = %user, endpoint = %endpoint, %entitlement, "submission denied");
            return Ok(Submission::Denied { entitlement });
        }

        let format = self.artifact_format(&params);
        let request_id = self.minter.mint();
        let result_ref =
            ResultRef::build(&self.config.result_base_url, user, &request_id, format);

        let job = ExtractionJob {
            user: user.clone(),
            request_id: request_id.clone(),
            endpoint,
            params: params.clone(),
            format,
            result_ref: result_ref.clone(),
        };

        if self.config.production == ProductionPolicy::AwaitArtifact {
            self.producer.produce(&job).await?;
        }

        let entry = RequestEntry {
            request_id: request_id.clone(),
            endpoint,
            params,
            result_ref: result_ref.clone(),
            submitted_at: Utc::now(),
        };
        // A failure here after an awaited production leaves an orphaned
        // artifact; nothing is rolled back.
        let record = self.ledger.append_request(user, entry).await?;

        if self.config.production == ProductionPolicy::Deferred {
            self.spawn_production(job);
        }

        tracing::info!(
            user = %user,
            request_id = %request_id,
            endpoint = %endpoint,
            format = format.extension(),
            "submission confirmed"
        );

        Ok(Submission::Confirmed(Confirmation {
            request_id,
            result_ref,
            record,
            production: self.config.production,
            elapsed: started.elapsed(),
        }))
    }

    fn spawn_production(&self, job: ExtractionJob) {
        let producer = Arc::clone(&self.producer);
        tokio::spawn(async move {
            if let Err(e) = producer.produce(&job).await {
                tracing::warn!(
                    producer = producer.name(),
                    user = %job.user,
                    request_id = %job.request_id,
                    error = %e,
                    "deferred production failed"
                );
            }
        });
    }
}

impl std::fmt::Debug for ExtractionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionGateway")
            .field("config", &self.config)
            .field("producer", &self.producer.name())
            .finish_non_exhaustive()
    }
}
