//! Entitlement-gated extraction gateway for Civilytix.
//!
//! Every extraction request passes through the gateway before anything is
//! recorded. The gateway reads the caller's entitlement, mints a ticket,
//! derives the result location, optionally waits for the artifact producer,
//! and appends an immutable record to the caller's history.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cvx_gate::{ExtractionGateway, GateConfig};
//! use cvx_ledger::InMemoryLedger;
//! use cvx_types::{EndpointKind, RequestParams, UserId};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = ExtractionGateway::new(GateConfig::default(), Arc::new(InMemoryLedger::new()));
//! let user = UserId::new("u1")?;
//! let params = RequestParams::new(serde_json::json!({"dataType": "potholes"}));
//! let outcome = gateway.submit(&user, EndpointKind::Region, params).await?;
//! assert!(!outcome.is_confirmed()); // u1 has not paid
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod producer;

// Re-exports for convenience.
pub use config::{GateConfig, ProductionPolicy};
pub use error::GateError;
pub use gateway::{Confirmation, ExtractionGateway, Submission, CONFIRMATION_MESSAGE};
pub use producer::{ArtifactProducer, DeferredProducer, ExtractionJob};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use cvx_ledger::{AccountRegistry, InMemoryLedger, LedgerError, LedgerReader, LedgerStore};
    use cvx_types::{
        ArtifactFormat, EndpointKind, Entitlement, RequestId, RequestParams, TicketMinter, UserId,
    };
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;

    /// Helper: a ledger with `user` provisioned at `entitlement`.
    async fn ledger_with(user: &UserId, entitlement: Entitlement) -> Arc<InMemoryLedger> {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger
            .provision_user(user.clone(), Some(format!("{user}@example.com")), entitlement)
            .await
            .unwrap();
        ledger
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn region_params(data_type: &str) -> RequestParams {
        RequestParams::new(json!({"center": [1, 2], "radius_km": 5, "dataType": data_type}))
    }

    fn path_params(data_type: &str) -> RequestParams {
        RequestParams::new(json!({
            "start_coords": [0.0, 0.0],
            "end_coords": [1.0, 1.0],
            "buffer_meters": 25,
            "dataType": data_type
        }))
    }

    struct RecordingProducer {
        seen: Mutex<Vec<RequestId>>,
    }

    #[async_trait]
    impl ArtifactProducer for RecordingProducer {
        fn name(&self) -> &str {
            "recording"
        }
        async fn produce(&self, job: &ExtractionJob) -> Result<(), GateError> {
            self.seen.lock().unwrap().push(job.request_id.clone());
            Ok(())
        }
    }

    struct FailingProducer;

    #[async_trait]
    impl ArtifactProducer for FailingProducer {
        fn name(&self) -> &str {
            "failing"
        }
        async fn produce(&self, _job: &ExtractionJob) -> Result<(), GateError> {
            Err(GateError::production("failing", "renderer offline"))
        }
    }

    struct ChannelProducer(mpsc::UnboundedSender<ExtractionJob>);

    #[async_trait]
    impl ArtifactProducer for ChannelProducer {
        fn name(&self) -> &str {
            "channel"
        }
        async fn produce(&self, job: &ExtractionJob) -> Result<(), GateError> {
            self.0
                .send(job.clone())
                .map_err(|e| GateError::production("channel", e.to_string()))
        }
    }

    struct FixedMinter(RequestId);

    impl TicketMinter for FixedMinter {
        fn mint(&self) -> RequestId {
            self.0.clone()
        }
    }

    // -----------------------------------------------------------------------
    // 1. Entitled user gets a confirmation and exactly one record
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn paid_user_is_confirmed_and_recorded() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let gateway = ExtractionGateway::new(GateConfig::default(), ledger.clone());

        let outcome = gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap();

        let confirmation = outcome.confirmation().unwrap();
        assert!(confirmation.request_id.as_str().starts_with("req_"));
        assert_eq!(ledger.history_len(&u).await.unwrap(), 1);
        assert_eq!(confirmation.record.endpoint, EndpointKind::Region);
        assert_eq!(confirmation.record.params, region_params("potholes"));
        assert_eq!(confirmation.production, ProductionPolicy::Deferred);
        assert_eq!(confirmation.message(), CONFIRMATION_MESSAGE);
    }

    // -----------------------------------------------------------------------
    // 2. Unpaid user is denied and nothing is logged
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn unpaid_user_is_denied_without_side_effects() {
        let u = user("u2");
        let ledger = ledger_with(&u, Entitlement::Unpaid).await;
        let gateway = ExtractionGateway::new(GateConfig::default(), ledger.clone());

        let before = ledger.history_len(&u).await.unwrap();
        let outcome = gateway
            .submit(&u, EndpointKind::Path, path_params("roads"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Submission::Denied {
                entitlement: Entitlement::Unpaid
            }
        );
        assert_eq!(ledger.history_len(&u).await.unwrap(), before);
    }

    // -----------------------------------------------------------------------
    // 3. Unknown user is denied and not implicitly created
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn unknown_user_is_denied_and_not_created() {
        let ledger = Arc::new(InMemoryLedger::new());
        let gateway = ExtractionGateway::new(GateConfig::default(), ledger.clone());

        let outcome = gateway
            .submit(&user("stranger"), EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap();

        assert!(!outcome.is_confirmed());
        assert_eq!(ledger.account_count().unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // 4. Result reference layout and extension mapping
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn result_reference_follows_data_type() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let gateway = ExtractionGateway::new(GateConfig::default(), ledger);

        let vector = gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap();
        let c = vector.confirmation().unwrap();
        assert_eq!(
            c.result_ref.as_str(),
            format!("https://storage.cloud.com/results/u1/{}.geojson", c.request_id)
        );

        let raster = gateway
            .submit(&u, EndpointKind::Path, path_params("imagery"))
            .await
            .unwrap();
        assert!(raster.confirmation().unwrap().result_ref.as_str().ends_with(".tif"));
    }

    // -----------------------------------------------------------------------
    // 5. Missing or non-string dataType falls back to raster
    // -----------------------------------------------------------------------
    #[test]
    fn artifact_format_is_total() {
        let gateway =
            ExtractionGateway::new(GateConfig::default(), Arc::new(InMemoryLedger::new()));
        assert_eq!(
            gateway.artifact_format(&RequestParams::new(json!({}))),
            ArtifactFormat::GeoTiff
        );
        assert_eq!(
            gateway.artifact_format(&RequestParams::new(json!({"dataType": null}))),
            ArtifactFormat::GeoTiff
        );
        assert_eq!(
            gateway.artifact_format(&RequestParams::new(json!("not an object"))),
            ArtifactFormat::GeoTiff
        );
        assert_eq!(
            gateway.artifact_format(&region_params("potholes")),
            ArtifactFormat::GeoJson
        );
    }

    // -----------------------------------------------------------------------
    // 6. readOne returns the reference submit promised
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn read_one_matches_confirmation() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let gateway = ExtractionGateway::new(GateConfig::default(), ledger.clone());

        let outcome = gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap();
        let c = outcome.confirmation().unwrap();

        let stored = ledger.read_one(&u, &c.request_id).await.unwrap();
        assert_eq!(stored.result_ref, c.result_ref);
        assert_eq!(stored, c.record);
    }

    // -----------------------------------------------------------------------
    // 7. Paid -> unpaid transition (end-to-end scenario)
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn entitlement_revocation_stops_new_records() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let gateway = ExtractionGateway::new(GateConfig::default(), ledger.clone());

        let first = gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap();
        assert!(first
            .confirmation()
            .unwrap()
            .result_ref
            .as_str()
            .ends_with(".geojson"));
        assert_eq!(ledger.read_all(&u).await.unwrap().len(), 1);

        ledger
            .set_entitlement(&u, Entitlement::Unpaid)
            .await
            .unwrap();

        let second = gateway
            .submit(&u, EndpointKind::Path, path_params("potholes"))
            .await
            .unwrap();
        assert!(matches!(second, Submission::Denied { .. }));
        assert_eq!(ledger.read_all(&u).await.unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // 8. 50 concurrent submissions: distinct tickets, none lost
    // -----------------------------------------------------------------------
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_are_all_recorded() {
        let u = user("busy");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let gateway = Arc::new(ExtractionGateway::new(GateConfig::default(), ledger.clone()));

        let mut handles = Vec::new();
        for i in 0..50 {
            let gateway = Arc::clone(&gateway);
            let u = u.clone();
            handles.push(tokio::spawn(async move {
                let kind = if i % 2 == 0 {
                    EndpointKind::Region
                } else {
                    EndpointKind::Path
                };
                let outcome = gateway
                    .submit(&u, kind, region_params("potholes"))
                    .await
                    .unwrap();
                let id = outcome.confirmation().unwrap().request_id.clone();
                id
            }));
        }

        let mut minted = HashSet::new();
        for h in handles {
            assert!(minted.insert(h.await.unwrap()));
        }

        let history = ledger.read_all(&u).await.unwrap();
        assert_eq!(history.len(), 50);
        let stored: HashSet<_> = history.iter().map(|r| r.request_id.clone()).collect();
        assert_eq!(stored, minted);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    // -----------------------------------------------------------------------
    // 9. AwaitArtifact runs the producer before replying
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn await_policy_runs_producer_inline() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let producer = Arc::new(RecordingProducer {
            seen: Mutex::new(Vec::new()),
        });
        let config = GateConfig {
            production: ProductionPolicy::AwaitArtifact,
            ..Default::default()
        };
        let gateway = ExtractionGateway::new(config, ledger).with_producer(producer.clone());

        let outcome = gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap();
        let c = outcome.confirmation().unwrap();

        assert_eq!(*producer.seen.lock().unwrap(), vec![c.request_id.clone()]);
        assert_eq!(c.message(), "Your data is ready for download.");
    }

    // -----------------------------------------------------------------------
    // 10. AwaitArtifact producer failure leaves no record
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn await_policy_failure_is_system_error() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let config = GateConfig {
            production: ProductionPolicy::AwaitArtifact,
            ..Default::default()
        };
        let gateway =
            ExtractionGateway::new(config, ledger.clone()).with_producer(Arc::new(FailingProducer));

        let err = gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap_err();

        assert_eq!(err, GateError::production("failing", "renderer offline"));
        assert_eq!(ledger.history_len(&u).await.unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // 11. Deferred policy replies first, produces in the background
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn deferred_policy_hands_off_after_recording() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gateway = ExtractionGateway::new(GateConfig::default(), ledger.clone())
            .with_producer(Arc::new(ChannelProducer(tx)));

        let outcome = gateway
            .submit(&u, EndpointKind::Path, path_params("imagery"))
            .await
            .unwrap();
        let c = outcome.confirmation().unwrap();
        assert_eq!(c.production, ProductionPolicy::Deferred);

        let job = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.request_id, c.request_id);
        assert_eq!(job.result_ref, c.result_ref);
        assert_eq!(job.format, ArtifactFormat::GeoTiff);
    }

    // -----------------------------------------------------------------------
    // 12. Deferred producer failure does not affect the caller
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn deferred_policy_swallows_producer_failure() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let gateway = ExtractionGateway::new(GateConfig::default(), ledger.clone())
            .with_producer(Arc::new(FailingProducer));

        let outcome = gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap();
        assert!(outcome.is_confirmed());
        assert_eq!(ledger.history_len(&u).await.unwrap(), 1);
    }

    // -----------------------------------------------------------------------
    // 13. A repeated ticket surfaces as a system error, never an overwrite
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn repeated_ticket_is_rejected_by_ledger() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let gateway = ExtractionGateway::new(GateConfig::default(), ledger.clone())
            .with_minter(Arc::new(FixedMinter(RequestId::mint())));

        gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap();
        let err = gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GateError::Ledger(LedgerError::DuplicateRequest(_))
        ));
        assert_eq!(ledger.history_len(&u).await.unwrap(), 1);
    }

    // -----------------------------------------------------------------------
    // 14. Storage fault on the entitlement read is a system error
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn closed_store_is_system_error() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let gateway = ExtractionGateway::new(GateConfig::default(), ledger.clone());
        ledger.close().await.unwrap();

        let err = gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap_err();
        assert_eq!(err, GateError::Ledger(LedgerError::Closed));
    }

    // -----------------------------------------------------------------------
    // 15. Custom base URL and vector set
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn custom_config_shapes_reference() {
        let u = user("u1");
        let ledger = ledger_with(&u, Entitlement::Paid).await;
        let config = GateConfig {
            result_base_url: "s3://bucket/out/".into(),
            vector_data_types: vec!["cracks".into()],
            ..Default::default()
        };
        let gateway = ExtractionGateway::new(config, ledger);

        let outcome = gateway
            .submit(&u, EndpointKind::Region, region_params("cracks"))
            .await
            .unwrap();
        let c = outcome.confirmation().unwrap();
        assert_eq!(
            c.result_ref.as_str(),
            format!("s3://bucket/out/u1/{}.geojson", c.request_id)
        );

        let potholes = gateway
            .submit(&u, EndpointKind::Region, region_params("potholes"))
            .await
            .unwrap();
        assert!(potholes
            .confirmation()
            .unwrap()
            .result_ref
            .as_str()
            .ends_with(".tif"));
    }
}
