//! # Inbound Ports
//!
//! API traits defining what the publisher can do.

use crate::domain::{
    AccountAddress, CancellationSignal, CertifyOutcome, FlowFailure, FlowRequest,
    PublicationSession, PublisherError, RetrievalResult, SourceObject, TxDigest,
};
use async_trait::async_trait;
use std::path::PathBuf;

/// Publication API - inbound port.
///
/// Every phase operation works on a caller-owned session, so two operations
/// on the same session can never overlap.
#[async_trait]
pub trait PublicationApi: Send + Sync {
    /// Create a session for `source` and encode it.
    ///
    /// Precondition failures carry no session; an encode backend failure
    /// returns the session in `Failed` so it can be retried.
    async fn encode(&self, source: SourceObject) -> Result<PublicationSession, FlowFailure>;

    /// Encode (or re-encode after failure) an existing session.
    async fn encode_session(&self, session: &mut PublicationSession)
        -> Result<(), PublisherError>;

    /// Fund-check, build, sign and submit the register transaction.
    async fn register(
        &self,
        session: &mut PublicationSession,
        retention_epochs: u32,
        owner: &AccountAddress,
    ) -> Result<TxDigest, PublisherError>;

    /// Stream shards to storage nodes.
    ///
    /// `digest` overrides the session's own digest for a resumed flow.
    async fn upload(
        &self,
        session: &mut PublicationSession,
        digest: Option<&TxDigest>,
        cancel: &CancellationSignal,
    ) -> Result<(), PublisherError>;

    /// Fund-check, submit the certify transaction and list published files.
    async fn certify(
        &self,
        session: &mut PublicationSession,
    ) -> Result<CertifyOutcome, PublisherError>;

    /// Run encode, register, upload and certify in order.
    async fn run_full_flow(&self, request: FlowRequest) -> Result<CertifyOutcome, FlowFailure>;

    /// Whether a full flow is currently running.
    fn is_flow_running(&self) -> bool;
}

/// Retrieval API - inbound port.
#[async_trait]
pub trait RetrievalApi: Send + Sync {
    /// Resolve a content identifier to a locally held resource.
    async fn fetch_by_identifier(&self, raw_id: &str) -> Result<RetrievalResult, PublisherError>;

    /// Release the held resource if `result` still owns it.
    fn release(&self, result: &RetrievalResult);

    /// Persist the held resource to disk.
    async fn download_as(
        &self,
        result: &RetrievalResult,
        file_name: Option<&str>,
    ) -> Result<PathBuf, PublisherError>;

    /// Currently held result.
    fn active(&self) -> Option<RetrievalResult>;
}
