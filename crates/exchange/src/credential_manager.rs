//! Issue-credential 1.0: both the issuer and the holder side.
//!
//! Every step loads or receives a [`CredentialExchangeRecord`], checks the
//! transition against the record's state before any side effect, talks to
//! the ledger, issuer or holder, then persists the record and returns the
//! message to send next.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use aries_messages::{
    CredentialAck, CredentialIssue, CredentialOffer, CredentialPreview, CredentialProposal,
    CredentialRequest, MessageHeader, ProblemReport,
};
use aries_storage::AgentStorage;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::cache::{get_or_create, Cache};
use crate::collaborators::{Holder, Issuer, IssuerError, Ledger, StoreCredential};
use crate::config::AgentSettings;
use crate::error::ExchangeError;
use crate::lookup::LedgerLookup;
use crate::models::credential_exchange::CredentialRole;
use crate::models::CredentialExchangeState as State;
use crate::models::{
    tag_filter, CredDefSentRecord, CredentialExchangeRecord, Initiator, RecordRepository,
};
use crate::revocation::RevocationCoordinator;
use crate::util::trace_event;

/// Per-exchange policy flags. Unset flags fall back to [`AgentSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeOptions {
    pub auto_offer: Option<bool>,
    pub auto_issue: Option<bool>,
    pub auto_remove: Option<bool>,
    pub trace: Option<bool>,
}

pub struct CredentialManager {
    settings: Arc<AgentSettings>,
    exchanges: RecordRepository<CredentialExchangeRecord>,
    cred_defs: RecordRepository<CredDefSentRecord>,
    lookup: LedgerLookup,
    issuer: Arc<dyn Issuer>,
    holder: Arc<dyn Holder>,
    cache: Arc<dyn Cache>,
    revocation: Arc<RevocationCoordinator>,
}

impl CredentialManager {
    pub fn new(
        settings: Arc<AgentSettings>,
        storage: Arc<dyn AgentStorage>,
        ledger: Arc<dyn Ledger>,
        issuer: Arc<dyn Issuer>,
        holder: Arc<dyn Holder>,
        cache: Arc<dyn Cache>,
        revocation: Arc<RevocationCoordinator>,
    ) -> Self {
        CredentialManager {
            settings,
            exchanges: RecordRepository::new(storage.clone()),
            cred_defs: RecordRepository::new(storage),
            lookup: LedgerLookup::new(ledger, cache.clone()),
            issuer,
            holder,
            cache,
            revocation,
        }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn exchanges(&self) -> &RecordRepository<CredentialExchangeRecord> {
        &self.exchanges
    }

    fn apply_options(&self, record: &mut CredentialExchangeRecord, options: ExchangeOptions) {
        if let Some(v) = options.auto_offer {
            record.auto_offer = v;
        }
        if let Some(v) = options.auto_issue {
            record.auto_issue = v;
        }
        record.auto_remove = options
            .auto_remove
            .unwrap_or_else(|| self.settings.default_auto_remove());
        record.trace = options.trace.unwrap_or(self.settings.trace);
    }

    /// Thread an outbound message onto the exchange.
    fn thread(record: &CredentialExchangeRecord, header: &mut MessageHeader) {
        if let Some(thid) = &record.thread_id {
            header.assign_thread_id(thid, record.parent_thread_id.as_deref());
        }
        header.assign_trace(record.trace);
    }

    fn traced(record: &CredentialExchangeRecord, outcome: &str) {
        trace_event(
            record.trace,
            &record.credential_exchange_id,
            record.thread_id.as_deref(),
            outcome,
        );
    }

    /// The exchange a peer message belongs to. A free exchange (no
    /// connection yet) with the same thread is bound to `connection_id`.
    pub async fn find_by_thread(
        &self,
        connection_id: &str,
        thread_id: &str,
    ) -> Result<CredentialExchangeRecord, ExchangeError> {
        match self
            .exchanges
            .retrieve_by_connection_and_thread(connection_id, thread_id)
            .await
        {
            Err(e) if e.is_not_found() => {
                let mut free: Vec<CredentialExchangeRecord> = self
                    .exchanges
                    .query(&tag_filter([("thread_id", thread_id)]))
                    .await?
                    .into_iter()
                    .filter(|r| r.connection_id.is_none())
                    .collect();
                match free.len() {
                    1 => {
                        let mut record = free.remove(0);
                        record.connection_id = Some(connection_id.to_string());
                        Ok(record)
                    }
                    _ => Err(e),
                }
            }
            other => other,
        }
    }

    // ── Proposal ───────────────────────────────────

    /// Holder: propose a credential. The preview and cred def id may be
    /// left unset; they are checked when the issuer makes its offer.
    pub async fn create_proposal(
        &self,
        connection_id: &str,
        mut proposal: CredentialProposal,
        options: ExchangeOptions,
    ) -> Result<(CredentialExchangeRecord, CredentialProposal), ExchangeError> {
        let mut record = CredentialExchangeRecord::new(
            CredentialRole::Holder,
            Initiator::Local,
            Some(connection_id.to_string()),
            Some(State::ProposalSent),
        );
        self.apply_options(&mut record, options);
        record.thread_id = Some(proposal.header.thread_id().to_string());
        record.parent_thread_id = proposal.header.parent_thread_id().map(str::to_string);
        record.credential_definition_id = proposal.cred_def_id.clone();
        record.schema_id = proposal.schema_id.clone();
        proposal.header.assign_trace(record.trace);
        record.credential_proposal_dict = Some(proposal.clone());

        self.exchanges.create(&mut record).await?;
        Self::traced(&record, "credential_exchange.proposal_sent");
        Ok((record, proposal))
    }

    /// Issuer: record a proposal from `connection_id`.
    pub async fn receive_proposal(
        &self,
        proposal: &CredentialProposal,
        connection_id: &str,
    ) -> Result<CredentialExchangeRecord, ExchangeError> {
        let mut record = CredentialExchangeRecord::new(
            CredentialRole::Issuer,
            Initiator::External,
            Some(connection_id.to_string()),
            Some(State::ProposalReceived),
        );
        self.apply_options(
            &mut record,
            ExchangeOptions {
                auto_offer: Some(self.settings.auto_respond_credential_proposal),
                auto_issue: Some(self.settings.auto_respond_credential_request),
                auto_remove: None,
                trace: Some(proposal.header.trace.is_some() || self.settings.trace),
            },
        );
        record.thread_id = Some(proposal.header.thread_id().to_string());
        record.parent_thread_id = proposal.header.parent_thread_id().map(str::to_string);
        record.credential_definition_id = proposal.cred_def_id.clone();
        record.schema_id = proposal.schema_id.clone();
        record.credential_proposal_dict = Some(proposal.clone());

        self.exchanges.create(&mut record).await?;
        info!(exchange_id = %record.credential_exchange_id, connection_id, "credential proposal received");
        Self::traced(&record, "credential_exchange.proposal_received");
        Ok(record)
    }

    // ── Offer ──────────────────────────────────────

    /// Issuer: offer a credential to `connection_id` without a prior
    /// proposal from the peer. The exchange issues automatically once
    /// the request arrives.
    pub async fn prepare_send(
        &self,
        connection_id: &str,
        proposal: CredentialProposal,
        options: ExchangeOptions,
    ) -> Result<(CredentialExchangeRecord, CredentialOffer), ExchangeError> {
        let mut record = CredentialExchangeRecord::new(
            CredentialRole::Issuer,
            Initiator::Local,
            Some(connection_id.to_string()),
            None,
        );
        self.apply_options(
            &mut record,
            ExchangeOptions {
                auto_issue: Some(true),
                ..options
            },
        );
        record.credential_proposal_dict = Some(proposal);
        let offer = self.create_offer(&mut record, None).await?;
        Ok((record, offer))
    }

    /// Issuer: offer a credential on `cred_def_id`, optionally before any
    /// connection exists. A connectionless exchange is bound to the
    /// connection the holder's request arrives on.
    pub async fn create_free_offer(
        &self,
        connection_id: Option<&str>,
        cred_def_id: &str,
        preview: CredentialPreview,
        comment: Option<String>,
        options: ExchangeOptions,
    ) -> Result<(CredentialExchangeRecord, CredentialOffer), ExchangeError> {
        let mut proposal = CredentialProposal::new(comment.clone(), Some(preview));
        proposal.cred_def_id = Some(cred_def_id.to_string());

        let mut record = CredentialExchangeRecord::new(
            CredentialRole::Issuer,
            Initiator::Local,
            connection_id.map(str::to_string),
            None,
        );
        self.apply_options(
            &mut record,
            ExchangeOptions {
                auto_issue: options
                    .auto_issue
                    .or(Some(self.settings.auto_respond_credential_request)),
                ..options
            },
        );
        record.credential_definition_id = Some(cred_def_id.to_string());
        record.credential_proposal_dict = Some(proposal);
        let offer = self.create_offer(&mut record, comment).await?;
        info!(
            exchange_id = %record.credential_exchange_id,
            connection_id = connection_id.unwrap_or("none"),
            "free credential offer created"
        );
        Ok((record, offer))
    }

    /// Most recently sent cred def matching the proposal's identifiers.
    async fn match_sent_cred_def_id(
        &self,
        proposal: &CredentialProposal,
    ) -> Result<String, ExchangeError> {
        let filter = proposal.cred_def_filter();
        let found = self.cred_defs.query(&filter).await?;
        found
            .into_iter()
            .max_by_key(|r| r.epoch)
            .map(|r| r.cred_def_id)
            .ok_or_else(|| {
                ExchangeError::manager(format!(
                    "Issuer has no operable cred def for proposal spec {:?}",
                    filter
                ))
            })
    }

    /// Issuer: create (or return the already created) offer.
    pub async fn create_offer(
        &self,
        record: &mut CredentialExchangeRecord,
        comment: Option<String>,
    ) -> Result<CredentialOffer, ExchangeError> {
        let proposal = record.credential_proposal_dict.clone().ok_or_else(|| {
            ExchangeError::manager(format!(
                "credential exchange {} has no proposal to offer against",
                record.credential_exchange_id
            ))
        })?;
        let preview = proposal.credential_proposal.clone().ok_or_else(|| {
            ExchangeError::manager("credential proposal carries no credential preview")
        })?;

        if record.state == Some(State::OfferSent) {
            if let Some(existing) = &record.credential_offer {
                warn!(
                    exchange_id = %record.credential_exchange_id,
                    "offer already created, returning it"
                );
                let mut message = CredentialOffer::new(comment, preview, existing);
                Self::thread(record, &mut message.header);
                return Ok(message);
            }
        }
        record.ensure_transition(State::OfferSent, "create offer")?;

        let cred_def_id = self.match_sent_cred_def_id(&proposal).await?;
        let schema_id = self.lookup.schema_id_for_cred_def(&cred_def_id).await?;
        let schema = self.lookup.schema(&schema_id).await?;
        check_preview_against_schema(&preview, &schema)?;

        let key = format!("credential_offer::{}", cred_def_id);
        let offer = get_or_create(
            self.cache.as_ref(),
            &key,
            Some(self.settings.offer_cache_ttl()),
            || async {
                Ok::<_, ExchangeError>(self.issuer.create_credential_offer(&cred_def_id).await?)
            },
        )
        .await?;

        let mut message = CredentialOffer::new(comment, preview, &offer);
        let thid = record
            .thread_id
            .clone()
            .unwrap_or_else(|| proposal.header.thread_id().to_string());
        record.thread_id = Some(thid);
        Self::thread(record, &mut message.header);

        record.schema_id = offer
            .get("schema_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(Some(schema_id));
        record.credential_definition_id = offer
            .get("cred_def_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(Some(cred_def_id));
        record.credential_offer = Some(offer);
        record.advance(State::OfferSent, "create offer")?;
        self.exchanges.save(record).await?;
        Self::traced(record, "credential_exchange.offer_sent");
        Ok(message)
    }

    /// Holder: record an offer, starting a new exchange for an
    /// unsolicited one.
    pub async fn receive_offer(
        &self,
        offer: &CredentialOffer,
        connection_id: &str,
    ) -> Result<CredentialExchangeRecord, ExchangeError> {
        let indy_offer = offer.indy_offer(0)?;
        let thread_id = offer.header.thread_id();
        let mut record = match self.find_by_thread(connection_id, thread_id).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                let mut record = CredentialExchangeRecord::new(
                    CredentialRole::Holder,
                    Initiator::External,
                    Some(connection_id.to_string()),
                    None,
                );
                self.apply_options(
                    &mut record,
                    ExchangeOptions {
                        trace: Some(offer.header.trace.is_some() || self.settings.trace),
                        ..ExchangeOptions::default()
                    },
                );
                record.thread_id = Some(thread_id.to_string());
                record.parent_thread_id = offer.header.parent_thread_id().map(str::to_string);
                record
            }
            Err(e) => return Err(e),
        };
        record.ensure_transition(State::OfferReceived, "receive offer")?;

        let schema_id = indy_offer.get("schema_id").and_then(Value::as_str);
        let cred_def_id = indy_offer.get("cred_def_id").and_then(Value::as_str);
        let mut proposal =
            CredentialProposal::new(offer.comment.clone(), Some(offer.credential_preview.clone()));
        proposal.schema_id = schema_id.map(str::to_string);
        proposal.cred_def_id = cred_def_id.map(str::to_string);

        record.credential_proposal_dict = Some(proposal);
        record.schema_id = schema_id.map(str::to_string);
        record.credential_definition_id = cred_def_id.map(str::to_string);
        record.credential_offer = Some(indy_offer);
        record.advance(State::OfferReceived, "receive offer")?;
        self.exchanges.save(&mut record).await?;
        Self::traced(&record, "credential_exchange.offer_received");
        Ok(record)
    }

    // ── Request ────────────────────────────────────

    /// Holder: request the offered credential.
    pub async fn create_request(
        &self,
        record: &mut CredentialExchangeRecord,
        holder_did: &str,
    ) -> Result<CredentialRequest, ExchangeError> {
        if let Some(existing) = &record.credential_request {
            if record.state == Some(State::RequestSent) {
                warn!(
                    exchange_id = %record.credential_exchange_id,
                    "request already created, returning it"
                );
                let mut message = CredentialRequest::new(None, existing);
                Self::thread(record, &mut message.header);
                return Ok(message);
            }
        }
        record.ensure_transition(State::RequestSent, "create request")?;

        let offer = record.credential_offer.clone().ok_or_else(|| {
            ExchangeError::manager("credential exchange has no credential offer")
        })?;
        let nonce = offer
            .get("nonce")
            .and_then(Value::as_str)
            .ok_or_else(|| ExchangeError::manager("Missing nonce in credential offer"))?
            .to_string();
        let cred_def_id = record.credential_definition_id.clone().ok_or_else(|| {
            ExchangeError::manager("credential exchange has no credential definition id")
        })?;

        let (request, metadata) = match (
            record.credential_request.clone(),
            record.credential_request_metadata.clone(),
        ) {
            (Some(request), Some(metadata)) => {
                warn!(
                    exchange_id = %record.credential_exchange_id,
                    "reusing credential request already on record"
                );
                (request, metadata)
            }
            _ => {
                let cred_def = self.lookup.credential_definition(&cred_def_id).await?;
                let key = format!(
                    "credential_request::{}::{}::{}",
                    cred_def_id, holder_did, nonce
                );
                let cached = get_or_create(
                    self.cache.as_ref(),
                    &key,
                    Some(self.settings.request_cache_ttl()),
                    || async {
                        let created = self
                            .holder
                            .create_credential_request(&offer, &cred_def, holder_did)
                            .await?;
                        Ok::<_, ExchangeError>(json!({
                            "request": created.request,
                            "metadata": created.metadata,
                        }))
                    },
                )
                .await?;
                (cached["request"].clone(), cached["metadata"].clone())
            }
        };

        let mut message = CredentialRequest::new(None, &request);
        Self::thread(record, &mut message.header);
        record.credential_request = Some(request);
        record.credential_request_metadata = Some(metadata);
        record.advance(State::RequestSent, "create request")?;
        self.exchanges.save(record).await?;
        Self::traced(record, "credential_exchange.request_sent");
        Ok(message)
    }

    /// Issuer: record the holder's request.
    pub async fn receive_request(
        &self,
        request: &CredentialRequest,
        connection_id: &str,
    ) -> Result<CredentialExchangeRecord, ExchangeError> {
        let mut record = self
            .find_by_thread(connection_id, request.header.thread_id())
            .await?;
        record.ensure_transition(State::RequestReceived, "receive request")?;
        record.credential_request = Some(request.indy_cred_req(0)?);
        record.advance(State::RequestReceived, "receive request")?;
        self.exchanges.save(&mut record).await?;
        Self::traced(&record, "credential_exchange.request_received");
        Ok(record)
    }

    // ── Issue ──────────────────────────────────────

    /// Issuer: issue the requested credential with `credential_values`.
    ///
    /// Revocable credentials go into the cred def's active registry. When
    /// the issuer reports the registry full it is marked full and the
    /// error returned; the caller has to provide a new registry.
    pub async fn issue_credential(
        &self,
        record: &mut CredentialExchangeRecord,
        comment: Option<String>,
        credential_values: &BTreeMap<String, String>,
    ) -> Result<CredentialIssue, ExchangeError> {
        if let Some(existing) = &record.credential {
            if record.state == Some(State::Issued) {
                warn!(
                    exchange_id = %record.credential_exchange_id,
                    "credential already issued, returning it"
                );
                let mut message = CredentialIssue::new(comment, existing);
                Self::thread(record, &mut message.header);
                return Ok(message);
            }
        }
        record.ensure_transition(State::Issued, "issue credential")?;

        let (credential, revocation_id, revoc_reg_id) = match record.credential.clone() {
            Some(credential) => {
                warn!(
                    exchange_id = %record.credential_exchange_id,
                    "reusing credential already on record"
                );
                (
                    credential,
                    record.revocation_id.clone(),
                    record.revoc_reg_id.clone(),
                )
            }
            None => self.create_credential(record, credential_values).await?,
        };

        let mut message = CredentialIssue::new(comment, &credential);
        Self::thread(record, &mut message.header);
        record.credential = Some(credential);
        record.revocation_id = revocation_id;
        record.revoc_reg_id = revoc_reg_id;
        record.advance(State::Issued, "issue credential")?;
        self.exchanges.save(record).await?;
        Self::traced(record, "credential_exchange.issued");
        Ok(message)
    }

    async fn create_credential(
        &self,
        record: &CredentialExchangeRecord,
        credential_values: &BTreeMap<String, String>,
    ) -> Result<(Value, Option<String>, Option<String>), ExchangeError> {
        let missing =
            |what: &str| ExchangeError::manager(format!("credential exchange has no {}", what));
        let schema_id = record.schema_id.as_deref().ok_or_else(|| missing("schema id"))?;
        let cred_def_id = record
            .credential_definition_id
            .as_deref()
            .ok_or_else(|| missing("credential definition id"))?;
        let offer = record.credential_offer.as_ref().ok_or_else(|| missing("credential offer"))?;
        let request = record
            .credential_request
            .as_ref()
            .ok_or_else(|| missing("credential request"))?;

        let schema = self.lookup.schema(schema_id).await?;
        let cred_def = self.lookup.credential_definition(cred_def_id).await?;
        let revocable = cred_def
            .get("value")
            .and_then(|v| v.get("revocation"))
            .is_some_and(|r| !r.is_null());

        let mut registry = if revocable {
            match self
                .revocation
                .get_active_issuer_rev_reg_record(cred_def_id)
                .await
            {
                Ok(registry) => Some(registry),
                Err(e) if e.is_not_found() => {
                    return Err(ExchangeError::manager(format!(
                        "Cred def id {} has no active revocation registry",
                        cred_def_id
                    )))
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let registry_id = registry.as_ref().and_then(|r| r.revoc_reg_id.clone());
        let tails_path = registry.as_ref().and_then(|r| r.tails_local_path.clone());
        let issued = match self
            .issuer
            .create_credential(
                &schema,
                offer,
                request,
                credential_values,
                registry_id.as_deref(),
                tails_path.as_deref(),
            )
            .await
        {
            Ok(issued) => issued,
            Err(IssuerError::RegistryFull { registry_id: full }) => {
                if let Some(registry) = registry.as_mut() {
                    if let Err(e) = self.revocation.mark_full(registry).await {
                        warn!(error = %e, registry_id = %full, "could not mark registry full");
                    }
                }
                return Err(ExchangeError::RegistryFull { registry_id: full });
            }
            Err(e) => return Err(e.into()),
        };

        if let (Some(registry), Some(index)) = (registry.as_mut(), issued.revocation_id.as_deref()) {
            if index.parse::<u32>().ok() == Some(registry.max_cred_num) {
                // the credential is already issued; a failed mark is retried
                // when the issuer reports the registry full
                if let Err(e) = self.revocation.mark_full(registry).await {
                    warn!(error = %e, record_id = %registry.record_id, "could not mark registry full");
                }
            }
        }
        Ok((issued.credential, issued.revocation_id, registry_id))
    }

    /// Holder: record the issued credential.
    pub async fn receive_credential(
        &self,
        issue: &CredentialIssue,
        connection_id: &str,
    ) -> Result<CredentialExchangeRecord, ExchangeError> {
        let mut record = self
            .find_by_thread(connection_id, issue.header.thread_id())
            .await?;
        record.ensure_transition(State::CredentialReceived, "receive credential")?;
        record.raw_credential = Some(issue.indy_credential(0)?);
        record.advance(State::CredentialReceived, "receive credential")?;
        self.exchanges.save(&mut record).await?;
        Self::traced(&record, "credential_exchange.credential_received");
        Ok(record)
    }

    // ── Store and ack ──────────────────────────────

    /// Holder: store the received credential in the wallet and ack it.
    /// The record is deleted afterwards when `auto_remove` is set.
    pub async fn store_credential(
        &self,
        record: &mut CredentialExchangeRecord,
        credential_id: Option<&str>,
    ) -> Result<CredentialAck, ExchangeError> {
        record.ensure_transition(State::Acked, "store credential")?;
        let raw = record.raw_credential.clone().ok_or_else(|| {
            ExchangeError::manager("credential exchange has no received credential")
        })?;
        let metadata = record.credential_request_metadata.clone().ok_or_else(|| {
            ExchangeError::manager("credential exchange has no credential request metadata")
        })?;
        let cred_def_id = raw
            .get("cred_def_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ExchangeError::manager("received credential names no cred_def_id"))?;
        let cred_def = self.lookup.credential_definition(cred_def_id).await?;

        let rev_reg_def = match raw.get("rev_reg_id").and_then(Value::as_str) {
            Some(rev_reg_id) => {
                let mut registry = self.revocation.get_ledger_registry(rev_reg_id).await?;
                registry
                    .ensure_tails(
                        self.revocation.tails_fetcher(),
                        self.revocation.tails_dir(),
                    )
                    .await?;
                Some(self.lookup.revoc_reg_def(rev_reg_id).await?)
            }
            None => None,
        };

        let mime_types = record
            .credential_proposal_dict
            .as_ref()
            .and_then(|p| p.credential_proposal.as_ref())
            .and_then(CredentialPreview::mime_types);

        let stored_id = self
            .holder
            .store_credential(StoreCredential {
                cred_def: &cred_def,
                credential: &raw,
                metadata: &metadata,
                mime_types: mime_types.as_ref(),
                credential_id,
                rev_reg_def: rev_reg_def.as_ref(),
            })
            .await?;
        let credential = self.holder.get_credential(&stored_id).await?;

        record.revoc_reg_id = credential
            .get("rev_reg_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        record.revocation_id = credential
            .get("cred_rev_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        record.credential_id = Some(stored_id);
        record.credential = Some(credential);
        record.advance(State::Acked, "store credential")?;
        self.exchanges.save(record).await?;
        Self::traced(record, "credential_exchange.acked");

        let mut ack = CredentialAck::new();
        Self::thread(record, &mut ack.header);
        if record.auto_remove {
            self.exchanges.delete(record).await?;
        }
        Ok(ack)
    }

    /// Issuer: the holder acked; the exchange is done and its record
    /// is removed.
    pub async fn receive_credential_ack(
        &self,
        ack: &CredentialAck,
        connection_id: &str,
    ) -> Result<CredentialExchangeRecord, ExchangeError> {
        let mut record = self
            .find_by_thread(connection_id, ack.header.thread_id())
            .await?;
        record.advance(State::Acked, "receive credential ack")?;
        Self::traced(&record, "credential_exchange.acked");
        self.exchanges.delete(&record).await?;
        Ok(record)
    }

    // ── Problem reports ────────────────────────────

    /// Record a peer's problem report. The state is left alone.
    pub async fn receive_problem_report(
        &self,
        report: &ProblemReport,
        connection_id: &str,
    ) -> Result<CredentialExchangeRecord, ExchangeError> {
        let mut record = self
            .find_by_thread(connection_id, report.header.thread_id())
            .await?;
        record.error_state = Some(report.text().unwrap_or("problem report").to_string());
        self.exchanges.save(&mut record).await?;
        warn!(
            exchange_id = %record.credential_exchange_id,
            error = record.error_state.as_deref().unwrap_or_default(),
            "problem report received"
        );
        Ok(record)
    }

    pub async fn create_problem_report(
        &self,
        record: &mut CredentialExchangeRecord,
        description: &str,
    ) -> Result<ProblemReport, ExchangeError> {
        let mut report = ProblemReport::new("issuance-abandoned", description);
        Self::thread(record, &mut report.header);
        record.error_state = Some(description.to_string());
        self.exchanges.save(record).await?;
        Ok(report)
    }

    // ── Revocation ─────────────────────────────────

    /// Revoke one credential, now or at the next
    /// [`publish_pending_revocations`](Self::publish_pending_revocations).
    pub async fn revoke_credential(
        &self,
        revoc_reg_id: &str,
        cred_rev_id: &str,
        publish: bool,
    ) -> Result<(), ExchangeError> {
        let mut registry = match self
            .revocation
            .get_issuer_rev_reg_record(revoc_reg_id)
            .await
        {
            Ok(registry) => registry,
            Err(e) if e.is_not_found() => {
                return Err(ExchangeError::manager(format!(
                    "No revocation registry record found for id {}",
                    revoc_reg_id
                )))
            }
            Err(e) => return Err(e),
        };

        if publish {
            self.revocation
                .revoke_in_registry(&mut registry, &[cred_rev_id.to_string()])
                .await?;
            self.revocation.publish_registry_entry(&mut registry).await?;
            info!(revoc_reg_id, cred_rev_id, "credential revoked and published");
        } else {
            self.revocation.mark_pending(&mut registry, cred_rev_id).await?;
            info!(revoc_reg_id, cred_rev_id, "credential revocation pending");
        }
        Ok(())
    }

    /// Publish every pending revocation, one ledger write per registry.
    /// A registry that fails keeps its pending indices and does not stop
    /// the others.
    pub async fn publish_pending_revocations(
        &self,
    ) -> Result<BTreeMap<String, Vec<String>>, ExchangeError> {
        let mut published = BTreeMap::new();
        for mut registry in self.revocation.pending_registries().await? {
            let indices = registry.pending_pub.clone();
            let outcome = async {
                self.revocation
                    .revoke_in_registry(&mut registry, &indices)
                    .await?;
                self.revocation.publish_registry_entry(&mut registry).await?;
                self.revocation
                    .clear_pending(&mut registry, Some(&indices))
                    .await
            }
            .await;
            let registry_id = registry
                .revoc_reg_id
                .clone()
                .unwrap_or_else(|| registry.record_id.clone());
            match outcome {
                Ok(()) => {
                    info!(%registry_id, count = indices.len(), "pending revocations published");
                    published.insert(registry_id, indices);
                }
                Err(e) => warn!(%registry_id, error = %e, "publishing pending revocations failed"),
            }
        }
        Ok(published)
    }
}

/// Preview attribute names must equal the schema's `attrNames`.
fn check_preview_against_schema(
    preview: &CredentialPreview,
    schema: &Value,
) -> Result<(), ExchangeError> {
    let schema_attrs: BTreeSet<String> = schema
        .get("attrNames")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let preview_attrs = preview.attr_names();
    if preview_attrs != schema_attrs {
        return Err(ExchangeError::manager(format!(
            "Preview attributes {:?} mismatch corresponding schema attributes {:?}",
            preview_attrs, schema_attrs
        )));
    }
    Ok(())
}
