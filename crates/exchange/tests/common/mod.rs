//! Shared fixtures for the exchange integration tests.
//!
//! Every collaborator is an in-process fake that records how often each
//! call was made, so tests can assert on side effects as well as state.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use aries_exchange::collaborators::{
    CreatedRegistry, CredentialRequestResult, Holder, HolderError, IssuedCredential, Issuer,
    IssuerError, Ledger, LedgerError, LedgerSession, OutboundTarget, OutboundTransport,
    PresentationInputs, RegistrySpec, StoreCredential, TailsError, TailsFetcher, TransportError,
    VerificationInputs, Verifier, VerifierError,
};
use aries_exchange::models::RecordModel;
use aries_exchange::{
    AgentSettings, ConnectionRecord, ConnectionState, CredDefSentRecord, CredentialManager,
    Dispatcher, InMemoryCache, PresentationManager, RecordRepository, RevocationCoordinator,
};
use aries_messages::Message;
use aries_storage::{AgentStorage, InMemoryStorage};

// ──────────────────────────────────────────────
// Constants
// ──────────────────────────────────────────────

pub const TEST_DID: &str = "LjgpST2rjsoxYegQDRm7EL";
pub const SCHEMA_ID: &str = "LjgpST2rjsoxYegQDRm7EL:2:bc-reg:1.0";
pub const CRED_DEF_ID: &str = "LjgpST2rjsoxYegQDRm7EL:3:CL:12:tag1";
pub const REVOCABLE_CRED_DEF_ID: &str = "LjgpST2rjsoxYegQDRm7EL:3:CL:12:revocable";
pub const HOLDER_DID: &str = "55GkHamhTU1ZbTbV2ab9DE";
pub const TAILS_URI_BASE: &str = "https://tails.example.org/tails";
pub const ATTR_NAMES: [&str; 3] = ["legalName", "jurisdictionId", "incorporationDate"];

/// Show exchange logs with `RUST_LOG=aries_exchange=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn tails_bytes() -> Vec<u8> {
    b"00ff00ff-tails-file-contents".to_vec()
}

pub fn tails_hash(bytes: &[u8]) -> String {
    bs58::encode(Sha256::digest(bytes)).into_string()
}

pub fn rev_reg_id(cred_def_id: &str, tag: &str) -> String {
    format!("{}:4:{}:CL_ACCUM:{}", TEST_DID, cred_def_id, tag)
}

// ──────────────────────────────────────────────
// Call log
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<BTreeMap<&'static str, usize>>,
}

impl CallLog {
    pub fn record(&self, name: &'static str) {
        *self.calls.lock().unwrap().entry(name).or_default() += 1;
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

// ──────────────────────────────────────────────
// Ledger
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LedgerState {
    pub calls: CallLog,
    pub schemas: Mutex<BTreeMap<String, Value>>,
    pub cred_defs: Mutex<BTreeMap<String, Value>>,
    pub rev_reg_defs: Mutex<BTreeMap<String, Value>>,
    pub rev_reg_entries: Mutex<Vec<(String, Value)>>,
    /// Registries whose entry writes the ledger rejects.
    pub rejected_entries: Mutex<Vec<String>>,
}

/// A ledger preloaded with the test schema and two credential
/// definitions, one of them revocable.
#[derive(Debug, Clone)]
pub struct MockLedger {
    pub state: Arc<LedgerState>,
}

impl MockLedger {
    pub fn new() -> Self {
        let state = LedgerState::default();
        state.schemas.lock().unwrap().insert(
            SCHEMA_ID.to_string(),
            json!({
                "ver": "1.0",
                "id": SCHEMA_ID,
                "name": "bc-reg",
                "version": "1.0",
                "attrNames": ATTR_NAMES,
                "seqNo": 12
            }),
        );
        state
            .cred_defs
            .lock()
            .unwrap()
            .insert(CRED_DEF_ID.to_string(), cred_def(CRED_DEF_ID, false));
        state.cred_defs.lock().unwrap().insert(
            REVOCABLE_CRED_DEF_ID.to_string(),
            cred_def(REVOCABLE_CRED_DEF_ID, true),
        );
        MockLedger {
            state: Arc::new(state),
        }
    }

    pub fn calls(&self, name: &str) -> usize {
        self.state.calls.count(name)
    }

    pub fn reject_entries_for(&self, revoc_reg_id: &str) {
        self.state
            .rejected_entries
            .lock()
            .unwrap()
            .push(revoc_reg_id.to_string());
    }

    /// Put a registry definition on the ledger with a downloadable tails
    /// file, the way another issuer would have published it.
    pub fn publish_foreign_registry(&self, cred_def_id: &str, tag: &str) -> String {
        let id = rev_reg_id(cred_def_id, tag);
        self.state.rev_reg_defs.lock().unwrap().insert(
            id.clone(),
            json!({
                "ver": "1.0",
                "id": id,
                "revocDefType": "CL_ACCUM",
                "tag": tag,
                "credDefId": cred_def_id,
                "value": {
                    "issuanceType": "ISSUANCE_BY_DEFAULT",
                    "maxCredNum": 10,
                    "tailsHash": tails_hash(&tails_bytes()),
                    "tailsLocation": format!("{}/{}", TAILS_URI_BASE, tag)
                }
            }),
        );
        id
    }
}

fn cred_def(id: &str, revocable: bool) -> Value {
    let mut value = json!({"primary": {"n": "1", "s": "2"}});
    if revocable {
        value["revocation"] = json!({"g": "1 1F14F&ECB578F 2"});
    }
    json!({
        "ver": "1.0",
        "id": id,
        "schemaId": "12",
        "type": "CL",
        "tag": id.rsplit(':').next().unwrap_or_default(),
        "value": value
    })
}

struct MockSession {
    state: Arc<LedgerState>,
}

#[async_trait]
impl Ledger for MockLedger {
    async fn open_session(&self) -> Result<Box<dyn LedgerSession>, LedgerError> {
        self.state.calls.record("open_session");
        Ok(Box::new(MockSession {
            state: self.state.clone(),
        }))
    }
}

fn lookup(map: &Mutex<BTreeMap<String, Value>>, id: &str) -> Result<Value, LedgerError> {
    map.lock()
        .unwrap()
        .get(id)
        .cloned()
        .ok_or_else(|| LedgerError::NotFound(id.to_string()))
}

#[async_trait]
impl LedgerSession for MockSession {
    async fn get_schema(&self, schema_id: &str) -> Result<Value, LedgerError> {
        self.state.calls.record("get_schema");
        lookup(&self.state.schemas, schema_id)
    }

    async fn get_credential_definition(&self, cred_def_id: &str) -> Result<Value, LedgerError> {
        self.state.calls.record("get_credential_definition");
        lookup(&self.state.cred_defs, cred_def_id)
    }

    async fn credential_definition_id2schema_id(
        &self,
        cred_def_id: &str,
    ) -> Result<String, LedgerError> {
        self.state.calls.record("credential_definition_id2schema_id");
        lookup(&self.state.cred_defs, cred_def_id)?;
        Ok(SCHEMA_ID.to_string())
    }

    async fn get_revoc_reg_def(&self, revoc_reg_id: &str) -> Result<Value, LedgerError> {
        self.state.calls.record("get_revoc_reg_def");
        lookup(&self.state.rev_reg_defs, revoc_reg_id)
    }

    async fn get_revoc_reg_entry(
        &self,
        revoc_reg_id: &str,
        timestamp: u64,
    ) -> Result<(Value, u64), LedgerError> {
        self.state.calls.record("get_revoc_reg_entry");
        Ok((
            json!({"ver": "1.0", "revocRegDefId": revoc_reg_id, "value": {"accum": "21 11"}}),
            timestamp,
        ))
    }

    async fn get_revoc_reg_delta(
        &self,
        revoc_reg_id: &str,
        _from: Option<u64>,
        to: u64,
    ) -> Result<(Value, u64), LedgerError> {
        self.state.calls.record("get_revoc_reg_delta");
        Ok((
            json!({"ver": "1.0", "revocRegDefId": revoc_reg_id, "value": {"revoked": []}}),
            to,
        ))
    }

    async fn send_revoc_reg_def(
        &self,
        revoc_reg_def: &Value,
        _issuer_did: &str,
    ) -> Result<(), LedgerError> {
        self.state.calls.record("send_revoc_reg_def");
        let id = revoc_reg_def
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::Rejected("definition has no id".to_string()))?;
        self.state
            .rev_reg_defs
            .lock()
            .unwrap()
            .insert(id.to_string(), revoc_reg_def.clone());
        Ok(())
    }

    async fn send_revoc_reg_entry(
        &self,
        revoc_reg_id: &str,
        _revoc_def_type: &str,
        revoc_reg_entry: &Value,
        _issuer_did: &str,
    ) -> Result<(), LedgerError> {
        self.state.calls.record("send_revoc_reg_entry");
        if self
            .state
            .rejected_entries
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == revoc_reg_id)
        {
            return Err(LedgerError::Rejected(format!("entry for {revoc_reg_id}")));
        }
        self.state
            .rev_reg_entries
            .lock()
            .unwrap()
            .push((revoc_reg_id.to_string(), revoc_reg_entry.clone()));
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Issuer
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockIssuer {
    pub calls: CallLog,
    /// Report every registry full on issuance.
    pub registry_full: AtomicBool,
    next_index: AtomicU32,
}

#[async_trait]
impl Issuer for MockIssuer {
    async fn create_credential_offer(&self, cred_def_id: &str) -> Result<Value, IssuerError> {
        self.calls.record("create_credential_offer");
        Ok(json!({
            "schema_id": SCHEMA_ID,
            "cred_def_id": cred_def_id,
            "nonce": "1234567890",
            "key_correctness_proof": {"c": "1"}
        }))
    }

    async fn create_credential(
        &self,
        _schema: &Value,
        offer: &Value,
        _request: &Value,
        values: &BTreeMap<String, String>,
        registry_id: Option<&str>,
        _tails_path: Option<&str>,
    ) -> Result<IssuedCredential, IssuerError> {
        self.calls.record("create_credential");
        if let Some(id) = registry_id {
            if self.registry_full.load(Ordering::SeqCst) {
                return Err(IssuerError::RegistryFull {
                    registry_id: id.to_string(),
                });
            }
        }
        let revocation_id = registry_id
            .map(|_| (self.next_index.fetch_add(1, Ordering::SeqCst) + 1).to_string());
        Ok(IssuedCredential {
            credential: json!({
                "schema_id": offer["schema_id"],
                "cred_def_id": offer["cred_def_id"],
                "rev_reg_id": registry_id,
                "values": values,
                "signature": {"p_credential": {}},
            }),
            revocation_id,
        })
    }

    async fn revoke_credentials(
        &self,
        registry_id: &str,
        _tails_path: Option<&str>,
        cred_rev_ids: &[String],
    ) -> Result<Value, IssuerError> {
        self.calls.record("revoke_credentials");
        Ok(json!({"revocRegDefId": registry_id, "value": {"revoked": cred_rev_ids}}))
    }

    async fn merge_revocation_registry_deltas(
        &self,
        earlier: &Value,
        later: &Value,
    ) -> Result<Value, IssuerError> {
        self.calls.record("merge_revocation_registry_deltas");
        Ok(json!({"value": {"prev": earlier["value"], "revoked": later["value"]["revoked"]}}))
    }

    async fn create_and_store_revocation_registry(
        &self,
        spec: RegistrySpec<'_>,
    ) -> Result<CreatedRegistry, IssuerError> {
        self.calls.record("create_and_store_revocation_registry");
        let id = rev_reg_id(spec.cred_def_id, spec.tag);
        let hash = tails_hash(&tails_bytes());
        Ok(CreatedRegistry {
            revoc_reg_def: json!({
                "ver": "1.0",
                "id": id,
                "revocDefType": spec.revoc_def_type,
                "tag": spec.tag,
                "credDefId": spec.cred_def_id,
                "value": {
                    "issuanceType": spec.issuance_type,
                    "maxCredNum": spec.max_cred_num,
                    "tailsHash": hash,
                    "tailsLocation": format!("{}/{}", spec.tails_dir, hash)
                }
            }),
            revoc_reg_entry: json!({"ver": "1.0", "value": {"accum": "21 10"}}),
            revoc_reg_id: id,
        })
    }
}

// ──────────────────────────────────────────────
// Holder
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockHolder {
    pub calls: CallLog,
    pub wallet: Mutex<BTreeMap<String, Value>>,
    pub last_inputs: Mutex<Option<PresentationInputs>>,
    pub last_requested: Mutex<Option<Value>>,
}

impl MockHolder {
    /// Put a credential straight into the wallet, in the shape the wallet
    /// returns it.
    pub fn insert_credential(
        &self,
        credential_id: &str,
        cred_def_id: &str,
        rev_reg_id: Option<&str>,
        cred_rev_id: Option<&str>,
    ) {
        self.wallet.lock().unwrap().insert(
            credential_id.to_string(),
            json!({
                "referent": credential_id,
                "schema_id": SCHEMA_ID,
                "cred_def_id": cred_def_id,
                "rev_reg_id": rev_reg_id,
                "cred_rev_id": cred_rev_id,
                "attrs": {"legalName": "Acme Ltd", "jurisdictionId": "1"}
            }),
        );
    }
}

#[async_trait]
impl Holder for MockHolder {
    async fn create_credential_request(
        &self,
        offer: &Value,
        _cred_def: &Value,
        holder_did: &str,
    ) -> Result<CredentialRequestResult, HolderError> {
        self.calls.record("create_credential_request");
        Ok(CredentialRequestResult {
            request: json!({
                "prover_did": holder_did,
                "cred_def_id": offer["cred_def_id"],
                "nonce": "987654321"
            }),
            metadata: json!({"master_secret_blinding_data": {"v_prime": "1"}}),
        })
    }

    async fn store_credential(&self, args: StoreCredential<'_>) -> Result<String, HolderError> {
        self.calls.record("store_credential");
        let mut wallet = self.wallet.lock().unwrap();
        let id = args
            .credential_id
            .map(str::to_string)
            .unwrap_or_else(|| format!("cred-{}", wallet.len() + 1));
        let rev_reg_id = args.credential.get("rev_reg_id").cloned().unwrap_or(Value::Null);
        let cred_rev_id = if rev_reg_id.is_null() {
            Value::Null
        } else {
            json!("1")
        };
        wallet.insert(
            id.clone(),
            json!({
                "referent": id,
                "schema_id": args.credential["schema_id"],
                "cred_def_id": args.credential["cred_def_id"],
                "rev_reg_id": rev_reg_id,
                "cred_rev_id": cred_rev_id,
                "attrs": args.credential["values"],
                "mime_types": args.mime_types,
            }),
        );
        Ok(id)
    }

    async fn get_credential(&self, credential_id: &str) -> Result<Value, HolderError> {
        self.calls.record("get_credential");
        self.wallet
            .lock()
            .unwrap()
            .get(credential_id)
            .cloned()
            .ok_or_else(|| HolderError::CredentialNotFound(credential_id.to_string()))
    }

    async fn create_revocation_state(
        &self,
        cred_rev_id: &str,
        _rev_reg_def: &Value,
        _rev_reg_delta: &Value,
        timestamp: u64,
        tails_path: &str,
    ) -> Result<Value, HolderError> {
        self.calls.record("create_revocation_state");
        Ok(json!({
            "cred_rev_id": cred_rev_id,
            "timestamp": timestamp,
            "tails": tails_path,
            "witness": {"omega": "21 12"}
        }))
    }

    async fn create_presentation(
        &self,
        _proof_request: &Value,
        requested_credentials: &Value,
        inputs: &PresentationInputs,
    ) -> Result<Value, HolderError> {
        self.calls.record("create_presentation");
        let wallet = self.wallet.lock().unwrap();
        let mut identifiers = Vec::new();
        for section in ["requested_attributes", "requested_predicates"] {
            let Some(entries) = requested_credentials.get(section).and_then(Value::as_object)
            else {
                continue;
            };
            for spec in entries.values() {
                let Some(cred) = spec
                    .get("cred_id")
                    .and_then(Value::as_str)
                    .and_then(|id| wallet.get(id))
                else {
                    continue;
                };
                identifiers.push(json!({
                    "schema_id": cred["schema_id"],
                    "cred_def_id": cred["cred_def_id"],
                    "rev_reg_id": cred["rev_reg_id"],
                    "timestamp": spec.get("timestamp").cloned().unwrap_or(Value::Null),
                }));
            }
        }
        *self.last_inputs.lock().unwrap() = Some(inputs.clone());
        *self.last_requested.lock().unwrap() = Some(requested_credentials.clone());
        Ok(json!({
            "proof": {"proofs": [], "aggregated_proof": {}},
            "requested_proof": {"revealed_attrs": {}},
            "identifiers": identifiers
        }))
    }
}

// ──────────────────────────────────────────────
// Verifier, transport, tails
// ──────────────────────────────────────────────

#[derive(Debug)]
pub struct MockVerifier {
    pub calls: CallLog,
    pub verdict: AtomicBool,
    pub last_inputs: Mutex<Option<VerificationInputs>>,
}

impl Default for MockVerifier {
    fn default() -> Self {
        MockVerifier {
            calls: CallLog::default(),
            verdict: AtomicBool::new(true),
            last_inputs: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Verifier for MockVerifier {
    async fn verify_presentation(
        &self,
        _proof_request: &Value,
        _presentation: &Value,
        inputs: &VerificationInputs,
    ) -> Result<bool, VerifierError> {
        self.calls.record("verify_presentation");
        *self.last_inputs.lock().unwrap() = Some(inputs.clone());
        Ok(self.verdict.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Default)]
pub struct MockTransport {
    pub sent: Mutex<Vec<(Message, OutboundTarget)>>,
}

impl MockTransport {
    pub fn take(&self) -> Vec<(Message, OutboundTarget)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl OutboundTransport for MockTransport {
    async fn send(&self, message: &Message, target: OutboundTarget) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((message.clone(), target));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockTails {
    pub calls: CallLog,
}

#[async_trait]
impl TailsFetcher for MockTails {
    async fn fetch(&self, public_uri: &str) -> Result<Vec<u8>, TailsError> {
        self.calls.record("fetch");
        if !public_uri.starts_with(TAILS_URI_BASE) {
            return Err(TailsError::Fetch {
                uri: public_uri.to_string(),
                message: "404".to_string(),
            });
        }
        Ok(tails_bytes())
    }
}

// ──────────────────────────────────────────────
// Agent harness
// ──────────────────────────────────────────────

/// One agent: its own storage, wallet and managers over a shared ledger.
pub struct Agent {
    pub settings: Arc<AgentSettings>,
    pub storage: Arc<InMemoryStorage>,
    pub ledger: MockLedger,
    pub issuer: Arc<MockIssuer>,
    pub holder: Arc<MockHolder>,
    pub verifier: Arc<MockVerifier>,
    pub transport: Arc<MockTransport>,
    pub tails: Arc<MockTails>,
    pub revocation: Arc<RevocationCoordinator>,
    pub credentials: Arc<CredentialManager>,
    pub presentations: Arc<PresentationManager>,
    pub dispatcher: Dispatcher,
    _tails_dir: tempfile::TempDir,
}

impl Agent {
    pub fn new(settings: AgentSettings) -> Self {
        Self::with_ledger(settings, MockLedger::new())
    }

    pub fn with_ledger(mut settings: AgentSettings, ledger: MockLedger) -> Self {
        let tails_dir = tempfile::tempdir().unwrap();
        settings.tails_dir = tails_dir.path().to_path_buf();
        let settings = Arc::new(settings);

        let storage = Arc::new(InMemoryStorage::new());
        let dyn_storage: Arc<dyn AgentStorage> = storage.clone();
        let issuer = Arc::new(MockIssuer::default());
        let holder = Arc::new(MockHolder::default());
        let verifier = Arc::new(MockVerifier::default());
        let transport = Arc::new(MockTransport::default());
        let tails = Arc::new(MockTails::default());
        let cache = Arc::new(InMemoryCache::new());
        let ledger_handle: Arc<dyn Ledger> = Arc::new(ledger.clone());

        let revocation = Arc::new(RevocationCoordinator::new(
            issuer.clone(),
            ledger_handle.clone(),
            tails.clone(),
            dyn_storage.clone(),
            settings.tails_dir.clone(),
        ));
        let credentials = Arc::new(CredentialManager::new(
            settings.clone(),
            dyn_storage.clone(),
            ledger_handle.clone(),
            issuer.clone(),
            holder.clone(),
            cache.clone(),
            revocation.clone(),
        ));
        let presentations = Arc::new(PresentationManager::new(
            settings.clone(),
            dyn_storage.clone(),
            ledger_handle,
            holder.clone(),
            verifier.clone(),
            cache,
            revocation.clone(),
        ));
        let dispatcher = Dispatcher::new(
            settings.clone(),
            dyn_storage,
            credentials.clone(),
            presentations.clone(),
            transport.clone(),
        );

        Agent {
            settings,
            storage,
            ledger,
            issuer,
            holder,
            verifier,
            transport,
            tails,
            revocation,
            credentials,
            presentations,
            dispatcher,
            _tails_dir: tails_dir,
        }
    }

    pub fn repo<T: RecordModel>(&self) -> RecordRepository<T> {
        RecordRepository::new(self.storage.clone())
    }

    /// Note that this agent published `cred_def_id` on the test schema.
    pub async fn sent_cred_def(&self, cred_def_id: &str) -> CredDefSentRecord {
        let mut record = CredDefSentRecord::new(SCHEMA_ID, TEST_DID, cred_def_id);
        self.repo::<CredDefSentRecord>()
            .create(&mut record)
            .await
            .unwrap();
        record
    }

    pub async fn connection(&self, state: ConnectionState) -> ConnectionRecord {
        let mut record = ConnectionRecord::new(state);
        self.repo::<ConnectionRecord>()
            .create(&mut record)
            .await
            .unwrap();
        record
    }

    /// Create an active connection with a fixed id.
    pub async fn connection_with_id(&self, id: &str) -> ConnectionRecord {
        let mut record = ConnectionRecord::new(ConnectionState::Active);
        record.connection_id = id.to_string();
        self.repo::<ConnectionRecord>()
            .create(&mut record)
            .await
            .unwrap();
        record
    }

    /// Take a revocation registry for `cred_def_id` all the way to active.
    pub async fn active_registry(
        &self,
        cred_def_id: &str,
        max_cred_num: Option<u32>,
    ) -> aries_exchange::IssuerRevRegRecord {
        let mut record = self
            .revocation
            .init_issuer_registry(cred_def_id, TEST_DID, true, max_cred_num, None, None)
            .await
            .unwrap();
        self.revocation.generate_registry(&mut record).await.unwrap();
        let uri = format!("{}/{}", TAILS_URI_BASE, record.record_id);
        self.revocation
            .set_tails_file_public_uri(&mut record, &uri)
            .await
            .unwrap();
        self.revocation
            .publish_registry_definition(&mut record)
            .await
            .unwrap();
        self.revocation
            .publish_registry_entry(&mut record)
            .await
            .unwrap();
        record
    }
}

pub fn preview() -> aries_messages::CredentialPreview {
    aries_messages::CredentialPreview::new(vec![
        aries_messages::CredAttrSpec::new("legalName", "Acme Ltd"),
        aries_messages::CredAttrSpec::new("jurisdictionId", "1"),
        aries_messages::CredAttrSpec::new("incorporationDate", "2019-03-01"),
    ])
}

pub fn proposal_for(cred_def_id: &str) -> aries_messages::CredentialProposal {
    let mut proposal = aries_messages::CredentialProposal::new(None, Some(preview()));
    proposal.cred_def_id = Some(cred_def_id.to_string());
    proposal
}

pub fn preserving() -> AgentSettings {
    AgentSettings {
        preserve_exchange_records: true,
        ..AgentSettings::default()
    }
}
