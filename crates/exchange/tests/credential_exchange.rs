//! Issue-credential exchanges between two in-process agents.

mod common;

use aries_exchange::{CredentialExchangeState as State, ExchangeError, ExchangeOptions, Initiator};
use aries_messages::{CredAttrSpec, CredentialOffer, CredentialPreview, CredentialProposal, CredentialRequest};
use serde_json::json;

use common::*;

const TO_ISSUER: &str = "conn-issuer";
const TO_HOLDER: &str = "conn-holder";

// ──────────────────────────────────────────────
// Full exchange
// ──────────────────────────────────────────────

#[tokio::test]
async fn proposal_to_ack_on_both_sides() {
    init_tracing();
    let ledger = MockLedger::new();
    let issuer = Agent::with_ledger(preserving(), ledger.clone());
    let holder = Agent::with_ledger(preserving(), ledger.clone());
    issuer.sent_cred_def(CRED_DEF_ID).await;

    let (proposed, proposal) = holder
        .credentials
        .create_proposal(TO_ISSUER, proposal_for(CRED_DEF_ID), ExchangeOptions::default())
        .await
        .unwrap();
    assert_eq!(proposed.state, Some(State::ProposalSent));

    let mut issuer_rec = issuer
        .credentials
        .receive_proposal(&proposal, TO_HOLDER)
        .await
        .unwrap();
    assert_eq!(issuer_rec.thread_id, proposed.thread_id);
    let offer = issuer
        .credentials
        .create_offer(&mut issuer_rec, None)
        .await
        .unwrap();
    assert_eq!(offer.header.thread_id(), proposal.header.thread_id());
    assert_eq!(issuer_rec.state, Some(State::OfferSent));
    assert_eq!(issuer_rec.schema_id.as_deref(), Some(SCHEMA_ID));

    let mut holder_rec = holder
        .credentials
        .receive_offer(&offer, TO_ISSUER)
        .await
        .unwrap();
    assert_eq!(holder_rec.credential_exchange_id, proposed.credential_exchange_id);
    assert_eq!(holder_rec.state, Some(State::OfferReceived));
    let request = holder
        .credentials
        .create_request(&mut holder_rec, HOLDER_DID)
        .await
        .unwrap();
    assert_eq!(request.indy_cred_req(0).unwrap()["prover_did"], HOLDER_DID);

    let mut issuer_rec = issuer
        .credentials
        .receive_request(&request, TO_HOLDER)
        .await
        .unwrap();
    assert_eq!(issuer_rec.state, Some(State::RequestReceived));
    let issue = issuer
        .credentials
        .issue_credential(&mut issuer_rec, None, &preview().attr_dict())
        .await
        .unwrap();
    assert_eq!(issuer_rec.state, Some(State::Issued));
    assert_eq!(issuer_rec.revocation_id, None);

    let mut holder_rec = holder
        .credentials
        .receive_credential(&issue, TO_ISSUER)
        .await
        .unwrap();
    let ack = holder
        .credentials
        .store_credential(&mut holder_rec, None)
        .await
        .unwrap();
    assert_eq!(holder_rec.state, Some(State::Acked));
    assert_eq!(holder_rec.credential_id.as_deref(), Some("cred-1"));
    assert_eq!(holder.holder.calls.count("store_credential"), 1);

    let stored = holder
        .credentials
        .exchanges()
        .retrieve_by_id(&holder_rec.credential_exchange_id)
        .await
        .unwrap();
    assert_eq!(stored, holder_rec);

    let done = issuer
        .credentials
        .receive_credential_ack(&ack, TO_HOLDER)
        .await
        .unwrap();
    assert_eq!(done.state, Some(State::Acked));
    let gone = issuer
        .credentials
        .exchanges()
        .retrieve_by_id(&done.credential_exchange_id)
        .await
        .unwrap_err();
    assert!(gone.is_not_found());
}

#[tokio::test]
async fn store_removes_record_unless_preserved() {
    let ledger = MockLedger::new();
    let issuer = Agent::with_ledger(preserving(), ledger.clone());
    let holder = Agent::with_ledger(Default::default(), ledger);
    issuer.sent_cred_def(CRED_DEF_ID).await;

    let (mut issuer_rec, offer) = issuer
        .credentials
        .prepare_send(TO_HOLDER, proposal_for(CRED_DEF_ID), ExchangeOptions::default())
        .await
        .unwrap();
    assert!(issuer_rec.auto_issue);
    assert_eq!(issuer_rec.thread_id.as_deref(), Some(offer.header.thread_id()));

    let mut holder_rec = holder
        .credentials
        .receive_offer(&offer, TO_ISSUER)
        .await
        .unwrap();
    assert!(holder_rec.auto_remove);
    let request = holder
        .credentials
        .create_request(&mut holder_rec, HOLDER_DID)
        .await
        .unwrap();
    issuer_rec = issuer
        .credentials
        .receive_request(&request, TO_HOLDER)
        .await
        .unwrap();
    let issue = issuer
        .credentials
        .issue_credential(&mut issuer_rec, None, &preview().attr_dict())
        .await
        .unwrap();
    let mut holder_rec = holder
        .credentials
        .receive_credential(&issue, TO_ISSUER)
        .await
        .unwrap();
    let ack = holder
        .credentials
        .store_credential(&mut holder_rec, Some("my-cred"))
        .await
        .unwrap();

    assert_eq!(ack.header.thread_id(), offer.header.thread_id());
    assert_eq!(holder_rec.credential_id.as_deref(), Some("my-cred"));
    let err = holder
        .credentials
        .exchanges()
        .retrieve_by_id(&holder_rec.credential_exchange_id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ──────────────────────────────────────────────
// Offers
// ──────────────────────────────────────────────

#[tokio::test]
async fn repeated_offer_reuses_the_first() {
    let issuer = Agent::new(preserving());
    issuer.sent_cred_def(CRED_DEF_ID).await;

    let mut record = issuer
        .credentials
        .receive_proposal(&proposal_for(CRED_DEF_ID), "c1")
        .await
        .unwrap();
    let first = issuer.credentials.create_offer(&mut record, None).await.unwrap();
    let second = issuer.credentials.create_offer(&mut record, None).await.unwrap();
    assert_eq!(first.indy_offer(0).unwrap(), second.indy_offer(0).unwrap());
    assert_eq!(first.header.thread_id(), second.header.thread_id());
    assert_eq!(issuer.issuer.calls.count("create_credential_offer"), 1);

    // another exchange on the same cred def is served from the offer cache
    let mut other = issuer
        .credentials
        .receive_proposal(&proposal_for(CRED_DEF_ID), "c2")
        .await
        .unwrap();
    issuer.credentials.create_offer(&mut other, None).await.unwrap();
    assert_eq!(issuer.issuer.calls.count("create_credential_offer"), 1);
}

#[tokio::test]
async fn free_offer_is_bound_by_the_request() {
    let ledger = MockLedger::new();
    let issuer = Agent::with_ledger(preserving(), ledger.clone());
    let holder = Agent::with_ledger(preserving(), ledger);
    issuer.sent_cred_def(CRED_DEF_ID).await;

    let (free, offer) = issuer
        .credentials
        .create_free_offer(
            None,
            CRED_DEF_ID,
            preview(),
            Some("welcome".to_string()),
            ExchangeOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(free.connection_id, None);
    assert_eq!(free.initiator, Initiator::Local);
    assert_eq!(free.state, Some(State::OfferSent));
    assert_eq!(free.credential_definition_id.as_deref(), Some(CRED_DEF_ID));
    assert_eq!(free.schema_id.as_deref(), Some(SCHEMA_ID));
    assert_eq!(offer.comment.as_deref(), Some("welcome"));
    assert_eq!(free.thread_id.as_deref(), Some(offer.header.thread_id()));

    let mut holder_rec = holder
        .credentials
        .receive_offer(&offer, TO_ISSUER)
        .await
        .unwrap();
    let request = holder
        .credentials
        .create_request(&mut holder_rec, HOLDER_DID)
        .await
        .unwrap();

    let bound = issuer
        .credentials
        .receive_request(&request, TO_HOLDER)
        .await
        .unwrap();
    assert_eq!(bound.credential_exchange_id, free.credential_exchange_id);
    assert_eq!(bound.connection_id.as_deref(), Some(TO_HOLDER));
    assert_eq!(bound.state, Some(State::RequestReceived));
    let stored = issuer
        .credentials
        .exchanges()
        .retrieve_by_id(&free.credential_exchange_id)
        .await
        .unwrap();
    assert_eq!(stored.connection_id.as_deref(), Some(TO_HOLDER));

    // the schema id behind the cred def is looked up once and cached
    issuer
        .credentials
        .create_free_offer(None, CRED_DEF_ID, preview(), None, ExchangeOptions::default())
        .await
        .unwrap();
    assert_eq!(issuer.ledger.calls("credential_definition_id2schema_id"), 1);
}

#[tokio::test]
async fn preview_not_matching_schema_is_rejected_before_offer() {
    let issuer = Agent::new(preserving());
    issuer.sent_cred_def(CRED_DEF_ID).await;

    let mut proposal = CredentialProposal::new(
        None,
        Some(CredentialPreview::new(vec![
            CredAttrSpec::new("legal name", "Acme Ltd"),
            CredAttrSpec::new("jurisdictionId", "1"),
            CredAttrSpec::new("incorporationDate", "2019-03-01"),
        ])),
    );
    proposal.cred_def_id = Some(CRED_DEF_ID.to_string());
    let mut record = issuer
        .credentials
        .receive_proposal(&proposal, "c1")
        .await
        .unwrap();

    let err = issuer
        .credentials
        .create_offer(&mut record, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("mismatch"), "{err}");
    assert_eq!(issuer.issuer.calls.count("create_credential_offer"), 0);
    assert_eq!(record.state, Some(State::ProposalReceived));
}

#[tokio::test]
async fn offer_needs_a_sent_cred_def() {
    let issuer = Agent::new(preserving());
    let mut record = issuer
        .credentials
        .receive_proposal(&proposal_for(CRED_DEF_ID), "c1")
        .await
        .unwrap();
    let err = issuer
        .credentials
        .create_offer(&mut record, None)
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("Issuer has no operable cred def"),
        "{err}"
    );
}

#[tokio::test]
async fn newest_matching_cred_def_wins() {
    let issuer = Agent::new(preserving());
    let mut older = issuer.sent_cred_def(CRED_DEF_ID).await;
    older.epoch -= 100;
    issuer.repo().update(&mut older).await.unwrap();
    issuer.sent_cred_def(REVOCABLE_CRED_DEF_ID).await;

    // proposal names only the schema, so both cred defs match
    let mut proposal = CredentialProposal::new(None, Some(preview()));
    proposal.schema_id = Some(SCHEMA_ID.to_string());
    let mut record = issuer
        .credentials
        .receive_proposal(&proposal, "c1")
        .await
        .unwrap();
    issuer.credentials.create_offer(&mut record, None).await.unwrap();
    assert_eq!(
        record.credential_definition_id.as_deref(),
        Some(REVOCABLE_CRED_DEF_ID)
    );
}

// ──────────────────────────────────────────────
// Requests
// ──────────────────────────────────────────────

#[tokio::test]
async fn offer_without_nonce_never_reaches_the_holder() {
    let holder = Agent::new(preserving());
    let offer = CredentialOffer::new(
        None,
        preview(),
        &json!({"schema_id": SCHEMA_ID, "cred_def_id": CRED_DEF_ID}),
    );
    let mut record = holder
        .credentials
        .receive_offer(&offer, TO_ISSUER)
        .await
        .unwrap();

    let err = holder
        .credentials
        .create_request(&mut record, HOLDER_DID)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing nonce in credential offer");
    assert_eq!(holder.holder.calls.count("create_credential_request"), 0);
    assert_eq!(holder.ledger.calls("get_credential_definition"), 0);
}

#[tokio::test]
async fn same_offer_nonce_reuses_the_request() {
    let holder = Agent::new(preserving());
    let indy_offer = json!({
        "schema_id": SCHEMA_ID,
        "cred_def_id": CRED_DEF_ID,
        "nonce": "1234567890"
    });

    let mut first = holder
        .credentials
        .receive_offer(&CredentialOffer::new(None, preview(), &indy_offer), "c1")
        .await
        .unwrap();
    let mut second = holder
        .credentials
        .receive_offer(&CredentialOffer::new(None, preview(), &indy_offer), "c2")
        .await
        .unwrap();
    assert_ne!(first.thread_id, second.thread_id);

    let a = holder
        .credentials
        .create_request(&mut first, HOLDER_DID)
        .await
        .unwrap();
    let b = holder
        .credentials
        .create_request(&mut second, HOLDER_DID)
        .await
        .unwrap();
    assert_eq!(a.indy_cred_req(0).unwrap(), b.indy_cred_req(0).unwrap());
    assert_eq!(holder.holder.calls.count("create_credential_request"), 1);
    assert_eq!(second.state, Some(State::RequestSent));
}

#[tokio::test]
async fn request_out_of_order_is_rejected() {
    let issuer = Agent::new(preserving());
    let record = issuer
        .credentials
        .receive_proposal(&proposal_for(CRED_DEF_ID), TO_HOLDER)
        .await
        .unwrap();

    let mut request = CredentialRequest::new(None, &json!({"prover_did": HOLDER_DID}));
    request
        .header
        .assign_thread_id(record.thread_id.as_deref().unwrap(), None);
    let err = issuer
        .credentials
        .receive_request(&request, TO_HOLDER)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidState { .. }), "{err:?}");

    let stored = issuer
        .credentials
        .exchanges()
        .retrieve_by_id(&record.credential_exchange_id)
        .await
        .unwrap();
    assert_eq!(stored.state, Some(State::ProposalReceived));
    assert_eq!(stored.credential_request, None);
}

#[tokio::test]
async fn message_on_another_connection_is_not_matched() {
    let issuer = Agent::new(preserving());
    let record = issuer
        .credentials
        .receive_proposal(&proposal_for(CRED_DEF_ID), TO_HOLDER)
        .await
        .unwrap();

    let mut request = CredentialRequest::new(None, &json!({}));
    request
        .header
        .assign_thread_id(record.thread_id.as_deref().unwrap(), None);
    let err = issuer
        .credentials
        .receive_request(&request, "someone-else")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ──────────────────────────────────────────────
// Problem reports
// ──────────────────────────────────────────────

#[tokio::test]
async fn problem_report_marks_the_peer_exchange() {
    let ledger = MockLedger::new();
    let issuer = Agent::with_ledger(preserving(), ledger.clone());
    let holder = Agent::with_ledger(preserving(), ledger);

    let (proposed, proposal) = holder
        .credentials
        .create_proposal(TO_ISSUER, proposal_for(CRED_DEF_ID), ExchangeOptions::default())
        .await
        .unwrap();
    let mut issuer_rec = issuer
        .credentials
        .receive_proposal(&proposal, TO_HOLDER)
        .await
        .unwrap();
    let report = issuer
        .credentials
        .create_problem_report(&mut issuer_rec, "cannot issue that")
        .await
        .unwrap();
    assert_eq!(issuer_rec.error_state.as_deref(), Some("cannot issue that"));

    let holder_rec = holder
        .credentials
        .receive_problem_report(&report, TO_ISSUER)
        .await
        .unwrap();
    assert_eq!(holder_rec.credential_exchange_id, proposed.credential_exchange_id);
    assert_eq!(holder_rec.error_state.as_deref(), Some("cannot issue that"));
    assert_eq!(holder_rec.state, Some(State::ProposalSent));
}
