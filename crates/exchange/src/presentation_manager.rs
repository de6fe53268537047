//! Present-proof 1.0: the prover and the verifier side.

use std::collections::BTreeMap;
use std::sync::Arc;

use aries_messages::{
    IndyProofRequest, MessageHeader, Presentation, PresentationAck, PresentationProposal,
    PresentationRequest, ProblemReport,
};
use aries_storage::AgentStorage;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::collaborators::{Holder, Ledger, PresentationInputs, VerificationInputs, Verifier};
use crate::config::AgentSettings;
use crate::error::ExchangeError;
use crate::lookup::LedgerLookup;
use crate::models::presentation_exchange::PresentationRole;
use crate::models::PresentationExchangeState as State;
use crate::models::{tag_filter, Initiator, PresentationExchangeRecord, RecordRepository};
use crate::revocation::RevocationCoordinator;
use crate::util::{epoch_now, random_nonce, trace_event};

pub const DEFAULT_PROOF_REQUEST_NAME: &str = "Proof request";
pub const DEFAULT_PROOF_REQUEST_VERSION: &str = "1.0";

/// Per-exchange policy flags. Unset flags fall back to [`AgentSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentationOptions {
    pub auto_present: Option<bool>,
    pub auto_remove: Option<bool>,
    pub trace: Option<bool>,
}

pub struct PresentationManager {
    settings: Arc<AgentSettings>,
    exchanges: RecordRepository<PresentationExchangeRecord>,
    lookup: LedgerLookup,
    holder: Arc<dyn Holder>,
    verifier: Arc<dyn Verifier>,
    revocation: Arc<RevocationCoordinator>,
}

impl PresentationManager {
    pub fn new(
        settings: Arc<AgentSettings>,
        storage: Arc<dyn AgentStorage>,
        ledger: Arc<dyn Ledger>,
        holder: Arc<dyn Holder>,
        verifier: Arc<dyn Verifier>,
        cache: Arc<dyn Cache>,
        revocation: Arc<RevocationCoordinator>,
    ) -> Self {
        PresentationManager {
            settings,
            exchanges: RecordRepository::new(storage),
            lookup: LedgerLookup::new(ledger, cache),
            holder,
            verifier,
            revocation,
        }
    }

    pub fn exchanges(&self) -> &RecordRepository<PresentationExchangeRecord> {
        &self.exchanges
    }

    fn apply_options(&self, record: &mut PresentationExchangeRecord, options: PresentationOptions) {
        record.auto_present = options.auto_present.unwrap_or(false);
        record.auto_remove = options
            .auto_remove
            .unwrap_or_else(|| self.settings.default_auto_remove());
        record.trace = options.trace.unwrap_or(self.settings.trace);
    }

    fn thread(record: &PresentationExchangeRecord, header: &mut MessageHeader) {
        if let Some(thid) = &record.thread_id {
            header.assign_thread_id(thid, None);
        }
        header.assign_trace(record.trace);
    }

    fn traced(record: &PresentationExchangeRecord, outcome: &str) {
        trace_event(
            record.trace,
            &record.presentation_exchange_id,
            record.thread_id.as_deref(),
            outcome,
        );
    }

    /// The exchange a peer message belongs to. A request sent without a
    /// connection is bound to the first connection that answers it.
    pub async fn find_by_thread(
        &self,
        connection_id: &str,
        thread_id: &str,
    ) -> Result<PresentationExchangeRecord, ExchangeError> {
        match self
            .exchanges
            .retrieve_by_connection_and_thread(connection_id, thread_id)
            .await
        {
            Err(e) if e.is_not_found() => {
                let mut free: Vec<PresentationExchangeRecord> = self
                    .exchanges
                    .query(&tag_filter([("thread_id", thread_id)]))
                    .await?
                    .into_iter()
                    .filter(|r| r.connection_id.is_none())
                    .collect();
                if free.len() == 1 {
                    let mut record = free.remove(0);
                    record.connection_id = Some(connection_id.to_string());
                    Ok(record)
                } else {
                    Err(e)
                }
            }
            other => other,
        }
    }

    // ── Proposal ───────────────────────────────────

    /// Prover: propose a presentation.
    pub async fn create_exchange_for_proposal(
        &self,
        connection_id: &str,
        mut proposal: PresentationProposal,
        options: PresentationOptions,
    ) -> Result<(PresentationExchangeRecord, PresentationProposal), ExchangeError> {
        let mut record = PresentationExchangeRecord::new(
            PresentationRole::Prover,
            Initiator::Local,
            Some(connection_id.to_string()),
            Some(State::ProposalSent),
        );
        self.apply_options(&mut record, options);
        record.thread_id = Some(proposal.header.thread_id().to_string());
        proposal.header.assign_trace(record.trace);
        record.presentation_proposal_dict = Some(proposal.clone());
        self.exchanges.create(&mut record).await?;
        Self::traced(&record, "presentation_exchange.proposal_sent");
        Ok((record, proposal))
    }

    /// Verifier: record a prover's proposal.
    pub async fn receive_proposal(
        &self,
        proposal: &PresentationProposal,
        connection_id: &str,
    ) -> Result<PresentationExchangeRecord, ExchangeError> {
        let mut record = PresentationExchangeRecord::new(
            PresentationRole::Verifier,
            Initiator::External,
            Some(connection_id.to_string()),
            Some(State::ProposalReceived),
        );
        self.apply_options(
            &mut record,
            PresentationOptions {
                trace: Some(proposal.header.trace.is_some() || self.settings.trace),
                ..PresentationOptions::default()
            },
        );
        record.thread_id = Some(proposal.header.thread_id().to_string());
        record.presentation_proposal_dict = Some(proposal.clone());
        self.exchanges.create(&mut record).await?;
        info!(exchange_id = %record.presentation_exchange_id, connection_id, "presentation proposal received");
        Self::traced(&record, "presentation_exchange.proposal_received");
        Ok(record)
    }

    // ── Request ────────────────────────────────────

    /// Verifier: answer a received proposal with a proof request built
    /// from its preview.
    pub async fn create_bound_request(
        &self,
        record: &mut PresentationExchangeRecord,
        name: Option<&str>,
        version: Option<&str>,
        nonce: Option<String>,
        comment: Option<String>,
    ) -> Result<PresentationRequest, ExchangeError> {
        record.ensure_transition(State::RequestSent, "create bound request")?;
        let proposal = record.presentation_proposal_dict.as_ref().ok_or_else(|| {
            ExchangeError::manager("presentation exchange has no proposal to answer")
        })?;
        let proof_request = proposal.presentation_proposal.indy_proof_request(
            name.unwrap_or(DEFAULT_PROOF_REQUEST_NAME),
            version.unwrap_or(DEFAULT_PROOF_REQUEST_VERSION),
            &nonce.unwrap_or_else(random_nonce),
        );
        proof_request.validate()?;

        let mut message = PresentationRequest::new(comment, &proof_request)?;
        Self::thread(record, &mut message.header);
        record.presentation_request = Some(proof_request);
        record.advance(State::RequestSent, "create bound request")?;
        self.exchanges.save(record).await?;
        Self::traced(record, "presentation_exchange.request_sent");
        Ok(message)
    }

    /// Verifier: request a presentation without a prior proposal. With no
    /// connection the request is free and bound to whoever answers.
    pub async fn create_exchange_for_request(
        &self,
        connection_id: Option<&str>,
        mut proof_request: IndyProofRequest,
        comment: Option<String>,
        options: PresentationOptions,
    ) -> Result<(PresentationExchangeRecord, PresentationRequest), ExchangeError> {
        if proof_request.nonce.is_none() {
            proof_request.nonce = Some(random_nonce());
        }
        proof_request.validate()?;

        let mut record = PresentationExchangeRecord::new(
            PresentationRole::Verifier,
            Initiator::Local,
            connection_id.map(str::to_string),
            None,
        );
        self.apply_options(&mut record, options);
        let mut message = PresentationRequest::new(comment, &proof_request)?;
        record.thread_id = Some(message.header.thread_id().to_string());
        Self::thread(&record, &mut message.header);
        record.presentation_request = Some(proof_request);
        record.advance(State::RequestSent, "create request")?;
        self.exchanges.create(&mut record).await?;
        Self::traced(&record, "presentation_exchange.request_sent");
        Ok((record, message))
    }

    /// Prover: record a proof request, starting a new exchange when it
    /// answers nothing we sent.
    pub async fn receive_request(
        &self,
        request: &PresentationRequest,
        connection_id: &str,
    ) -> Result<PresentationExchangeRecord, ExchangeError> {
        let proof_request = request.indy_proof_request(0)?;
        proof_request.validate()?;

        let thread_id = request.header.thread_id();
        let mut record = match self.find_by_thread(connection_id, thread_id).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                let mut record = PresentationExchangeRecord::new(
                    PresentationRole::Prover,
                    Initiator::External,
                    Some(connection_id.to_string()),
                    None,
                );
                self.apply_options(
                    &mut record,
                    PresentationOptions {
                        trace: Some(request.header.trace.is_some() || self.settings.trace),
                        ..PresentationOptions::default()
                    },
                );
                record.thread_id = Some(thread_id.to_string());
                record
            }
            Err(e) => return Err(e),
        };
        record.ensure_transition(State::RequestReceived, "receive request")?;
        record.presentation_request = Some(proof_request);
        record.advance(State::RequestReceived, "receive request")?;
        self.exchanges.save(&mut record).await?;
        Self::traced(&record, "presentation_exchange.request_received");
        Ok(record)
    }

    // ── Presentation ───────────────────────────────

    /// Prover: build the presentation for the stored request.
    ///
    /// `requested_credentials` has `self_attested_attributes`,
    /// `requested_attributes` (`cred_id`, `revealed`, optional `timestamp`)
    /// and `requested_predicates` (`cred_id`, optional `timestamp`).
    /// Revocable credentials asked for under a non-revocation interval get
    /// a revocation state as of the interval's end.
    pub async fn create_presentation(
        &self,
        record: &mut PresentationExchangeRecord,
        requested_credentials: &Value,
        comment: Option<String>,
    ) -> Result<Presentation, ExchangeError> {
        record.ensure_transition(State::PresentationSent, "create presentation")?;
        let proof_request = record.presentation_request.clone().ok_or_else(|| {
            ExchangeError::manager("presentation exchange has no proof request")
        })?;
        let mut requested = requested_credentials.clone();

        let mut credentials: BTreeMap<String, Value> = BTreeMap::new();
        for (_, _, cred_id) in referents(&requested) {
            if !credentials.contains_key(&cred_id) {
                let credential = self.holder.get_credential(&cred_id).await?;
                credentials.insert(cred_id, credential);
            }
        }

        let mut inputs = PresentationInputs::default();
        for credential in credentials.values() {
            if let Some(schema_id) = credential.get("schema_id").and_then(Value::as_str) {
                if !inputs.schemas.contains_key(schema_id) {
                    let schema = self.lookup.schema(schema_id).await?;
                    inputs.schemas.insert(schema_id.to_string(), schema);
                }
            }
            if let Some(cred_def_id) = credential.get("cred_def_id").and_then(Value::as_str) {
                if !inputs.cred_defs.contains_key(cred_def_id) {
                    let cred_def = self.lookup.credential_definition(cred_def_id).await?;
                    inputs.cred_defs.insert(cred_def_id.to_string(), cred_def);
                }
            }
        }

        // (registry id, requested "to") -> ledger timestamp of the state built
        let mut built: BTreeMap<(String, u64), u64> = BTreeMap::new();
        for (section, referent, cred_id) in referents(&requested) {
            let Some(credential) = credentials.get(&cred_id) else {
                continue;
            };
            let (Some(rev_reg_id), Some(cred_rev_id)) = (
                credential.get("rev_reg_id").and_then(Value::as_str),
                credential.get("cred_rev_id").and_then(Value::as_str),
            ) else {
                continue;
            };
            let given = requested[section][&referent]
                .get("timestamp")
                .and_then(Value::as_u64);
            let interval = proof_request.interval_for(&referent);
            if interval.is_none() && given.is_none() {
                continue;
            }
            let to = interval
                .and_then(|i| i.to)
                .or(given)
                .unwrap_or_else(epoch_now);
            let from = interval.and_then(|i| i.from);

            let key = (rev_reg_id.to_string(), to);
            let timestamp = match built.get(&key) {
                Some(ts) => *ts,
                None => {
                    let ts = self
                        .build_revocation_state(rev_reg_id, cred_rev_id, from, to, &mut inputs)
                        .await?;
                    built.insert(key, ts);
                    ts
                }
            };
            requested[section][&referent]["timestamp"] = Value::from(timestamp);
        }

        let request_json = serde_json::to_value(&proof_request)?;
        let proof = self
            .holder
            .create_presentation(&request_json, &requested, &inputs)
            .await?;

        let mut message = Presentation::new(comment, &proof);
        Self::thread(record, &mut message.header);
        record.presentation = Some(proof);
        record.advance(State::PresentationSent, "create presentation")?;
        self.exchanges.save(record).await?;
        Self::traced(record, "presentation_exchange.presentation_sent");
        Ok(message)
    }

    async fn build_revocation_state(
        &self,
        rev_reg_id: &str,
        cred_rev_id: &str,
        from: Option<u64>,
        to: u64,
        inputs: &mut PresentationInputs,
    ) -> Result<u64, ExchangeError> {
        let (delta, timestamp) = {
            let session = self.lookup.ledger().open_session().await?;
            session.get_revoc_reg_delta(rev_reg_id, from, to).await?
        };
        let mut registry = self.revocation.get_ledger_registry(rev_reg_id).await?;
        let tails_path = registry
            .ensure_tails(self.revocation.tails_fetcher(), self.revocation.tails_dir())
            .await?;
        let rev_reg_def = self.lookup.revoc_reg_def(rev_reg_id).await?;
        let state = self
            .holder
            .create_revocation_state(
                cred_rev_id,
                &rev_reg_def,
                &delta,
                timestamp,
                &tails_path.to_string_lossy(),
            )
            .await?;
        debug!(rev_reg_id, timestamp, "revocation state built");
        inputs
            .rev_states
            .entry(rev_reg_id.to_string())
            .or_default()
            .insert(timestamp, state);
        Ok(timestamp)
    }

    /// Verifier: record the prover's presentation. It must arrive on the
    /// connection the request went to.
    pub async fn receive_presentation(
        &self,
        presentation: &Presentation,
        connection_id: &str,
    ) -> Result<PresentationExchangeRecord, ExchangeError> {
        let thread_id = presentation.header.thread_id();
        let mut record: PresentationExchangeRecord = self
            .exchanges
            .retrieve_by_tag_filter(&tag_filter([
                ("thread_id", thread_id),
                ("role", PresentationRole::Verifier.as_str()),
            ]))
            .await?;
        match record.connection_id.as_deref() {
            Some(bound) if bound != connection_id => {
                return Err(ExchangeError::manager(format!(
                    "presentation on thread {} arrived over connection {} instead of {}",
                    thread_id, connection_id, bound
                )))
            }
            Some(_) => {}
            None => record.connection_id = Some(connection_id.to_string()),
        }
        record.ensure_transition(State::PresentationReceived, "receive presentation")?;
        record.presentation = Some(presentation.indy_proof(0)?);
        record.advance(State::PresentationReceived, "receive presentation")?;
        self.exchanges.save(&mut record).await?;
        Self::traced(&record, "presentation_exchange.presentation_received");
        Ok(record)
    }

    /// Verifier: check the presentation against the ledger material it
    /// names, record the verdict and ack. The record is deleted afterwards
    /// when `auto_remove` is set.
    pub async fn verify_presentation(
        &self,
        record: &mut PresentationExchangeRecord,
    ) -> Result<PresentationAck, ExchangeError> {
        record.ensure_transition(State::Verified, "verify presentation")?;
        let proof_request = record.presentation_request.as_ref().ok_or_else(|| {
            ExchangeError::manager("presentation exchange has no proof request")
        })?;
        let presentation = record.presentation.as_ref().ok_or_else(|| {
            ExchangeError::manager("presentation exchange has no presentation")
        })?;

        let mut inputs = VerificationInputs::default();
        let identifiers = presentation
            .get("identifiers")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for identifier in &identifiers {
            let field = |name: &str| identifier.get(name).and_then(Value::as_str);
            if let Some(schema_id) = field("schema_id") {
                if !inputs.schemas.contains_key(schema_id) {
                    let schema = self.lookup.schema(schema_id).await?;
                    inputs.schemas.insert(schema_id.to_string(), schema);
                }
            }
            if let Some(cred_def_id) = field("cred_def_id") {
                if !inputs.cred_defs.contains_key(cred_def_id) {
                    let cred_def = self.lookup.credential_definition(cred_def_id).await?;
                    inputs.cred_defs.insert(cred_def_id.to_string(), cred_def);
                }
            }
            if let Some(rev_reg_id) = field("rev_reg_id") {
                if !inputs.rev_reg_defs.contains_key(rev_reg_id) {
                    let def = self.lookup.revoc_reg_def(rev_reg_id).await?;
                    inputs.rev_reg_defs.insert(rev_reg_id.to_string(), def);
                }
                if let Some(timestamp) = identifier.get("timestamp").and_then(Value::as_u64) {
                    let session = self.lookup.ledger().open_session().await?;
                    let (entry, found_at) =
                        session.get_revoc_reg_entry(rev_reg_id, timestamp).await?;
                    inputs
                        .rev_reg_entries
                        .entry(rev_reg_id.to_string())
                        .or_default()
                        .insert(found_at, entry);
                }
            }
        }

        let request_json = serde_json::to_value(proof_request)?;
        let verified = self
            .verifier
            .verify_presentation(&request_json, presentation, &inputs)
            .await?;

        record.verified = Some(verified.to_string());
        record.advance(State::Verified, "verify presentation")?;
        self.exchanges.save(record).await?;
        info!(
            exchange_id = %record.presentation_exchange_id,
            verified,
            "presentation verified"
        );
        Self::traced(record, "presentation_exchange.verified");

        let mut ack = PresentationAck::new();
        Self::thread(record, &mut ack.header);
        if record.auto_remove {
            self.exchanges.delete(record).await?;
        }
        Ok(ack)
    }

    /// Prover: the verifier acked.
    pub async fn receive_presentation_ack(
        &self,
        ack: &PresentationAck,
        connection_id: &str,
    ) -> Result<PresentationExchangeRecord, ExchangeError> {
        let mut record = self
            .find_by_thread(connection_id, ack.header.thread_id())
            .await?;
        record.advance(State::PresentationAcked, "receive presentation ack")?;
        Self::traced(&record, "presentation_exchange.presentation_acked");
        if record.auto_remove {
            self.exchanges.delete(&record).await?;
        } else {
            self.exchanges.save(&mut record).await?;
        }
        Ok(record)
    }

    /// Record a peer's problem report. The state is left alone.
    pub async fn receive_problem_report(
        &self,
        report: &ProblemReport,
        connection_id: &str,
    ) -> Result<PresentationExchangeRecord, ExchangeError> {
        let mut record = self
            .find_by_thread(connection_id, report.header.thread_id())
            .await?;
        record.error_state = Some(report.text().unwrap_or("problem report").to_string());
        self.exchanges.save(&mut record).await?;
        warn!(
            exchange_id = %record.presentation_exchange_id,
            error = record.error_state.as_deref().unwrap_or_default(),
            "problem report received"
        );
        Ok(record)
    }
}

/// `(section, referent, cred_id)` for every requested attribute and
/// predicate that names a credential.
fn referents(requested: &Value) -> Vec<(&'static str, String, String)> {
    let mut out = Vec::new();
    for section in ["requested_attributes", "requested_predicates"] {
        if let Some(entries) = requested.get(section).and_then(Value::as_object) {
            for (referent, spec) in entries {
                if let Some(cred_id) = spec.get("cred_id").and_then(Value::as_str) {
                    out.push((section, referent.clone(), cred_id.to_string()));
                }
            }
        }
    }
    out
}
