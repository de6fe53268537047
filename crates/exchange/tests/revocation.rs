//! Revocation registry life-cycle, issuance into registries and pending
//! revocation publication.

mod common;

use std::sync::atomic::Ordering;

use aries_exchange::{
    CredentialExchangeRecord, CredentialExchangeState as State, ExchangeError, ExchangeOptions,
    IssuerRevRegRecord, RevRegState,
};
use aries_messages::CredentialRequest;
use serde_json::json;

use common::*;

async fn requested_exchange(issuer: &Agent, connection_id: &str) -> CredentialExchangeRecord {
    let mut record = issuer
        .credentials
        .receive_proposal(&proposal_for(REVOCABLE_CRED_DEF_ID), connection_id)
        .await
        .unwrap();
    issuer.credentials.create_offer(&mut record, None).await.unwrap();
    let mut request = CredentialRequest::new(None, &json!({"prover_did": HOLDER_DID}));
    request
        .header
        .assign_thread_id(record.thread_id.as_deref().unwrap(), None);
    issuer
        .credentials
        .receive_request(&request, connection_id)
        .await
        .unwrap()
}

async fn stored_registry(agent: &Agent, record: &IssuerRevRegRecord) -> IssuerRevRegRecord {
    agent
        .repo::<IssuerRevRegRecord>()
        .retrieve_by_id(&record.record_id)
        .await
        .unwrap()
}

// ──────────────────────────────────────────────
// Life-cycle
// ──────────────────────────────────────────────

#[tokio::test]
async fn registry_goes_from_init_to_active() {
    let agent = Agent::new(preserving());
    let revocation = &agent.revocation;

    let mut record = revocation
        .init_issuer_registry(REVOCABLE_CRED_DEF_ID, TEST_DID, true, Some(5), None, None)
        .await
        .unwrap();
    assert_eq!(record.state, RevRegState::Init);
    assert_eq!(record.max_cred_num, 5);
    assert_eq!(record.revoc_def_type, "CL_ACCUM");

    revocation.generate_registry(&mut record).await.unwrap();
    assert_eq!(record.state, RevRegState::Generated);
    assert_eq!(
        record.revoc_reg_id.as_deref(),
        Some(rev_reg_id(REVOCABLE_CRED_DEF_ID, &record.record_id).as_str())
    );
    assert_eq!(record.tails_hash, Some(tails_hash(&tails_bytes())));
    let local = record.tails_local_path.clone().unwrap();
    assert!(local.starts_with(agent.settings.tails_dir.to_str().unwrap()));

    // no public tails location yet
    let err = revocation
        .publish_registry_definition(&mut record)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::Revocation(_)), "{err:?}");
    assert_eq!(agent.ledger.calls("send_revoc_reg_def"), 0);

    let uri = format!("{}/{}", TAILS_URI_BASE, record.record_id);
    revocation
        .set_tails_file_public_uri(&mut record, &uri)
        .await
        .unwrap();
    assert_eq!(record.tails_public_uri.as_deref(), Some(uri.as_str()));
    assert_eq!(
        record.revoc_reg_def.as_ref().unwrap()["value"]["tailsLocation"],
        uri.as_str()
    );

    revocation
        .publish_registry_definition(&mut record)
        .await
        .unwrap();
    assert_eq!(record.state, RevRegState::Published);
    assert_eq!(agent.ledger.calls("send_revoc_reg_def"), 1);
    let err = revocation
        .get_active_issuer_rev_reg_record(REVOCABLE_CRED_DEF_ID)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    revocation.publish_registry_entry(&mut record).await.unwrap();
    assert_eq!(record.state, RevRegState::Active);
    assert_eq!(agent.ledger.calls("send_revoc_reg_entry"), 1);

    let active = revocation
        .get_active_issuer_rev_reg_record(REVOCABLE_CRED_DEF_ID)
        .await
        .unwrap();
    assert_eq!(active, record);
    assert_eq!(stored_registry(&agent, &record).await, record);

    let err = revocation.generate_registry(&mut record).await.unwrap_err();
    assert!(matches!(err, ExchangeError::Revocation(_)));
    assert_eq!(
        agent.issuer.calls.count("create_and_store_revocation_registry"),
        1
    );
}

#[tokio::test]
async fn registry_needs_a_revocable_cred_def() {
    let agent = Agent::new(preserving());
    for cred_def_id in [CRED_DEF_ID, "LjgpST2rjsoxYegQDRm7EL:3:CL:99:missing"] {
        let err = agent
            .revocation
            .init_issuer_registry(cred_def_id, TEST_DID, true, None, None, None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ExchangeError::RevocationNotSupported(_)),
            "{cred_def_id}: {err:?}"
        );
    }
    assert!(agent
        .revocation
        .list_issuer_registries()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn tails_uri_must_be_a_full_url() {
    let agent = Agent::new(preserving());
    let mut record = agent
        .revocation
        .init_issuer_registry(REVOCABLE_CRED_DEF_ID, TEST_DID, true, None, None, Some("t1"))
        .await
        .unwrap();

    // nothing generated yet, so there is no definition to point anywhere
    let err = agent
        .revocation
        .set_tails_file_public_uri(&mut record, "https://tails.example.org/t1")
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::Revocation(_)));

    agent.revocation.generate_registry(&mut record).await.unwrap();
    assert_eq!(record.tag.as_deref(), Some("t1"));
    for bad in ["not a url", "https://tails.example.org", "https://tails.example.org/"] {
        let err = agent
            .revocation
            .set_tails_file_public_uri(&mut record, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Revocation(_)), "{bad}");
    }
    assert_eq!(record.tails_public_uri, None);
}

// ──────────────────────────────────────────────
// Issuance
// ──────────────────────────────────────────────

#[tokio::test]
async fn revocable_issue_needs_an_active_registry() {
    let issuer = Agent::new(preserving());
    issuer.sent_cred_def(REVOCABLE_CRED_DEF_ID).await;
    let mut record = requested_exchange(&issuer, "c1").await;

    let err = issuer
        .credentials
        .issue_credential(&mut record, None, &preview().attr_dict())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Cred def id {} has no active revocation registry",
            REVOCABLE_CRED_DEF_ID
        )
    );
    assert_eq!(issuer.issuer.calls.count("create_credential"), 0);
}

#[tokio::test]
async fn revocable_issue_takes_a_registry_index() {
    let issuer = Agent::new(preserving());
    issuer.sent_cred_def(REVOCABLE_CRED_DEF_ID).await;
    let registry = issuer.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let mut record = requested_exchange(&issuer, "c1").await;

    issuer
        .credentials
        .issue_credential(&mut record, None, &preview().attr_dict())
        .await
        .unwrap();
    assert_eq!(record.state, Some(State::Issued));
    assert_eq!(record.revocation_id.as_deref(), Some("1"));
    assert_eq!(record.revoc_reg_id, registry.revoc_reg_id);
    assert_eq!(
        stored_registry(&issuer, &registry).await.state,
        RevRegState::Active
    );
}

#[tokio::test]
async fn full_registry_is_marked_and_reported() {
    let issuer = Agent::new(preserving());
    issuer.sent_cred_def(REVOCABLE_CRED_DEF_ID).await;
    let registry = issuer.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let mut record = requested_exchange(&issuer, "c1").await;
    issuer.issuer.registry_full.store(true, Ordering::SeqCst);

    let err = issuer
        .credentials
        .issue_credential(&mut record, None, &preview().attr_dict())
        .await
        .unwrap_err();
    match err {
        ExchangeError::RegistryFull { registry_id } => {
            assert_eq!(Some(registry_id), registry.revoc_reg_id)
        }
        other => panic!("expected RegistryFull, got {other:?}"),
    }
    assert_eq!(stored_registry(&issuer, &registry).await.state, RevRegState::Full);

    let exchange = issuer
        .credentials
        .exchanges()
        .retrieve_by_id(&record.credential_exchange_id)
        .await
        .unwrap();
    assert_eq!(exchange.state, Some(State::RequestReceived));
    assert!(issuer
        .revocation
        .get_active_issuer_rev_reg_record(REVOCABLE_CRED_DEF_ID)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn last_index_fills_the_registry() {
    let issuer = Agent::new(preserving());
    issuer.sent_cred_def(REVOCABLE_CRED_DEF_ID).await;
    let registry = issuer.active_registry(REVOCABLE_CRED_DEF_ID, Some(1)).await;

    let mut first = requested_exchange(&issuer, "c1").await;
    issuer
        .credentials
        .issue_credential(&mut first, None, &preview().attr_dict())
        .await
        .unwrap();
    assert_eq!(first.revocation_id.as_deref(), Some("1"));
    assert_eq!(stored_registry(&issuer, &registry).await.state, RevRegState::Full);

    let mut second = requested_exchange(&issuer, "c2").await;
    let err = issuer
        .credentials
        .issue_credential(&mut second, None, &preview().attr_dict())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("has no active revocation registry"));
}

#[tokio::test]
async fn marking_full_survives_a_concurrent_revocation() {
    let issuer = Agent::new(preserving());
    let registry = issuer.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let id = registry.revoc_reg_id.clone().unwrap();

    // loaded before the issuer call; a revocation lands in between
    let mut loaded = stored_registry(&issuer, &registry).await;
    issuer.credentials.revoke_credential(&id, "1", false).await.unwrap();

    issuer.revocation.mark_full(&mut loaded).await.unwrap();

    let stored = stored_registry(&issuer, &registry).await;
    assert_eq!(stored.state, RevRegState::Full);
    assert_eq!(stored.pending_pub, vec!["1"]);
    assert_eq!(loaded.state, RevRegState::Full);
    assert!(issuer
        .revocation
        .get_active_issuer_rev_reg_record(REVOCABLE_CRED_DEF_ID)
        .await
        .unwrap_err()
        .is_not_found());

    // marking again is a no-op
    issuer.revocation.mark_full(&mut loaded).await.unwrap();
}

#[tokio::test]
async fn oldest_active_registry_takes_new_credentials() {
    let agent = Agent::new(preserving());
    let first = agent.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let second = agent.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    assert_eq!(stored_registry(&agent, &second).await.state, RevRegState::Active);

    for _ in 0..3 {
        let active = agent
            .revocation
            .get_active_issuer_rev_reg_record(REVOCABLE_CRED_DEF_ID)
            .await
            .unwrap();
        assert_eq!(active.record_id, first.record_id);
    }

    let mut first = stored_registry(&agent, &first).await;
    agent.revocation.mark_full(&mut first).await.unwrap();
    let active = agent
        .revocation
        .get_active_issuer_rev_reg_record(REVOCABLE_CRED_DEF_ID)
        .await
        .unwrap();
    assert_eq!(active.record_id, second.record_id);
}

#[tokio::test]
async fn holder_downloads_tails_once() {
    let ledger = MockLedger::new();
    let issuer = Agent::with_ledger(preserving(), ledger.clone());
    let holder = Agent::with_ledger(preserving(), ledger);
    issuer.sent_cred_def(REVOCABLE_CRED_DEF_ID).await;
    let registry = issuer.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let registry_id = registry.revoc_reg_id.clone().unwrap();

    for round in 0..2 {
        let proposal = proposal_for(REVOCABLE_CRED_DEF_ID);
        let (_, offer) = issuer
            .credentials
            .prepare_send("to-holder", proposal, ExchangeOptions::default())
            .await
            .unwrap();
        let mut holder_rec = holder
            .credentials
            .receive_offer(&offer, "to-issuer")
            .await
            .unwrap();
        let request = holder
            .credentials
            .create_request(&mut holder_rec, HOLDER_DID)
            .await
            .unwrap();
        let mut issuer_rec = issuer
            .credentials
            .receive_request(&request, "to-holder")
            .await
            .unwrap();
        let issue = issuer
            .credentials
            .issue_credential(&mut issuer_rec, None, &preview().attr_dict())
            .await
            .unwrap();
        let mut holder_rec = holder
            .credentials
            .receive_credential(&issue, "to-issuer")
            .await
            .unwrap();
        holder
            .credentials
            .store_credential(&mut holder_rec, None)
            .await
            .unwrap();
        assert_eq!(
            holder_rec.revoc_reg_id.as_deref(),
            Some(registry_id.as_str()),
            "round {round}"
        );
    }

    assert_eq!(holder.tails.calls.count("fetch"), 1);
    let path = holder
        .settings
        .tails_dir
        .join(&registry_id)
        .join(tails_hash(&tails_bytes()));
    assert_eq!(std::fs::read(path).unwrap(), tails_bytes());
    assert_eq!(holder.revocation.registry_cache().len(), 1);
}

// ──────────────────────────────────────────────
// Revoking
// ──────────────────────────────────────────────

#[tokio::test]
async fn pending_revocations_publish_per_registry() {
    let agent = Agent::new(preserving());
    let a = agent.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let b = agent.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let a_id = a.revoc_reg_id.clone().unwrap();
    let b_id = b.revoc_reg_id.clone().unwrap();
    assert_ne!(a_id, b_id);

    for id in [&a_id, &b_id] {
        for index in ["3", "1", "2", "1"] {
            agent
                .credentials
                .revoke_credential(id, index, false)
                .await
                .unwrap();
        }
    }
    assert_eq!(stored_registry(&agent, &a).await.pending_pub, vec!["1", "2", "3"]);
    assert_eq!(agent.revocation.pending_registries().await.unwrap().len(), 2);
    assert_eq!(agent.issuer.calls.count("revoke_credentials"), 0);
    let entries_before = agent.ledger.calls("send_revoc_reg_entry");

    let published = agent.credentials.publish_pending_revocations().await.unwrap();
    let expected: Vec<String> = vec!["1".into(), "2".into(), "3".into()];
    assert_eq!(published.len(), 2);
    assert_eq!(published[&a_id], expected);
    assert_eq!(published[&b_id], expected);

    assert_eq!(agent.issuer.calls.count("revoke_credentials"), 2);
    assert_eq!(agent.ledger.calls("send_revoc_reg_entry"), entries_before + 2);
    assert!(agent.revocation.pending_registries().await.unwrap().is_empty());
    let a_after = stored_registry(&agent, &a).await;
    assert_eq!(a_after.revoc_reg_entry.unwrap()["value"]["revoked"], json!(expected));

    // nothing left to do
    assert!(agent
        .credentials
        .publish_pending_revocations()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn failed_registry_keeps_its_pending_revocations() {
    let agent = Agent::new(preserving());
    let a = agent.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let b = agent.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let a_id = a.revoc_reg_id.clone().unwrap();
    let b_id = b.revoc_reg_id.clone().unwrap();
    for id in [&a_id, &b_id] {
        for index in ["1", "2", "3"] {
            agent
                .credentials
                .revoke_credential(id, index, false)
                .await
                .unwrap();
        }
    }
    agent.ledger.reject_entries_for(&b_id);

    let published = agent.credentials.publish_pending_revocations().await.unwrap();

    assert_eq!(published.len(), 1);
    assert_eq!(published[&a_id], vec!["1", "2", "3"]);
    assert!(stored_registry(&agent, &a).await.pending_pub.is_empty());
    assert_eq!(stored_registry(&agent, &b).await.pending_pub, vec!["1", "2", "3"]);
    let pending = agent.revocation.pending_registries().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].revoc_reg_id.as_deref(), Some(b_id.as_str()));
}

#[tokio::test]
async fn immediate_revocation_goes_to_the_ledger() {
    let agent = Agent::new(preserving());
    let registry = agent.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let id = registry.revoc_reg_id.clone().unwrap();
    let entries_before = agent.ledger.calls("send_revoc_reg_entry");

    agent.credentials.revoke_credential(&id, "4", true).await.unwrap();

    assert_eq!(agent.issuer.calls.count("revoke_credentials"), 1);
    assert_eq!(agent.issuer.calls.count("merge_revocation_registry_deltas"), 1);
    assert_eq!(agent.ledger.calls("send_revoc_reg_entry"), entries_before + 1);
    let stored = stored_registry(&agent, &registry).await;
    assert!(stored.pending_pub.is_empty());
    assert_eq!(stored.state, RevRegState::Active);
    let published = agent.ledger.state.rev_reg_entries.lock().unwrap().clone();
    let (last_id, last_entry) = published.last().unwrap();
    assert_eq!(last_id, &id);
    assert_eq!(last_entry["value"]["revoked"], json!(["4"]));
}

#[tokio::test]
async fn revoking_in_unknown_registry_fails() {
    let agent = Agent::new(preserving());
    let err = agent
        .credentials
        .revoke_credential("no-such-registry", "1", false)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "No revocation registry record found for id no-such-registry"
    );
}

#[tokio::test]
async fn clearing_keeps_indices_added_meanwhile() {
    let agent = Agent::new(preserving());
    let registry = agent.active_registry(REVOCABLE_CRED_DEF_ID, None).await;
    let id = registry.revoc_reg_id.clone().unwrap();
    for index in ["1", "2"] {
        agent.credentials.revoke_credential(&id, index, false).await.unwrap();
    }

    let mut stale = stored_registry(&agent, &registry).await;
    agent.credentials.revoke_credential(&id, "5", false).await.unwrap();

    let published = stale.pending_pub.clone();
    agent
        .revocation
        .clear_pending(&mut stale, Some(&published))
        .await
        .unwrap();
    assert_eq!(stale.pending_pub, vec!["5"]);
    assert_eq!(stored_registry(&agent, &registry).await.pending_pub, vec!["5"]);
}
