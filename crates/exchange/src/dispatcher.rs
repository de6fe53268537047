//! Inbound message routing.
//!
//! The dispatcher parses a raw message, checks the connection it arrived
//! on, hands it to the owning manager and sends whatever the automation
//! flags produce in reply. Failures are answered with a problem report.

use std::sync::Arc;

use aries_messages::protocol::{ISSUE_CREDENTIAL, PRESENT_PROOF};
use aries_messages::{Message, ProblemReport, ProtocolRegistry};
use aries_storage::AgentStorage;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::collaborators::{OutboundTarget, OutboundTransport};
use crate::config::AgentSettings;
use crate::credential_manager::CredentialManager;
use crate::error::ExchangeError;
use crate::models::{ConnectionRecord, RecordRepository};
use crate::presentation_manager::PresentationManager;

/// Transport-level facts about an inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageReceipt {
    /// Connection the message was unpacked for, if any.
    pub connection_id: Option<String>,
    /// Where to reply when there is no connection.
    pub sender_endpoint: Option<String>,
}

impl MessageReceipt {
    pub fn for_connection(connection_id: &str) -> Self {
        MessageReceipt {
            connection_id: Some(connection_id.to_string()),
            sender_endpoint: None,
        }
    }

    fn reply_target(&self) -> Option<OutboundTarget> {
        match (&self.connection_id, &self.sender_endpoint) {
            (Some(id), _) => Some(OutboundTarget::Connection(id.clone())),
            (None, Some(endpoint)) => Some(OutboundTarget::Endpoints(vec![endpoint.clone()])),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The message was handled. `response` is what went back to the sender.
    Completed {
        exchange_id: Option<String>,
        response: Option<Message>,
    },
    /// Handling failed and the sender was told so.
    Reported(ProblemReport),
}

struct Handled {
    exchange_id: Option<String>,
    response: Option<Message>,
}

impl Handled {
    fn new(exchange_id: &str, response: Option<Message>) -> Self {
        Handled {
            exchange_id: Some(exchange_id.to_string()),
            response,
        }
    }
}

pub struct Dispatcher {
    settings: Arc<AgentSettings>,
    protocols: ProtocolRegistry,
    connections: RecordRepository<ConnectionRecord>,
    credentials: Arc<CredentialManager>,
    presentations: Arc<PresentationManager>,
    transport: Arc<dyn OutboundTransport>,
}

impl Dispatcher {
    pub fn new(
        settings: Arc<AgentSettings>,
        storage: Arc<dyn AgentStorage>,
        credentials: Arc<CredentialManager>,
        presentations: Arc<PresentationManager>,
        transport: Arc<dyn OutboundTransport>,
    ) -> Self {
        Dispatcher {
            settings,
            protocols: ProtocolRegistry::with_defaults(),
            connections: RecordRepository::new(storage),
            credentials,
            presentations,
            transport,
        }
    }

    /// Replace the default protocol families.
    pub fn with_protocols(mut self, protocols: ProtocolRegistry) -> Self {
        self.protocols = protocols;
        self
    }

    pub async fn dispatch(&self, raw: &Value, receipt: &MessageReceipt) -> DispatchOutcome {
        let inbound_is_report = raw
            .get("@type")
            .and_then(Value::as_str)
            .is_some_and(|t| t.ends_with("/problem-report"));

        match self.handle(raw, receipt).await {
            Ok(handled) => {
                if let Some(response) = &handled.response {
                    self.send(response, receipt).await;
                }
                DispatchOutcome::Completed {
                    exchange_id: handled.exchange_id,
                    response: handled.response,
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    connection_id = receipt.connection_id.as_deref().unwrap_or_default(),
                    "inbound message failed"
                );
                let mut report = ProblemReport::new(e.problem_code(), &e.to_string());
                if let Some(thid) = inbound_thread_id(raw) {
                    report.header.assign_thread_id(thid, None);
                }
                // never answer a problem report with another one
                if !inbound_is_report {
                    let reply: Message = report.clone().into();
                    self.send(&reply, receipt).await;
                }
                DispatchOutcome::Reported(report)
            }
        }
    }

    async fn send(&self, message: &Message, receipt: &MessageReceipt) {
        let Some(target) = receipt.reply_target() else {
            warn!(msg_type = %message.message_type().uri(), "no route for reply");
            return;
        };
        if let Err(e) = self.transport.send(message, target).await {
            warn!(error = %e, msg_type = %message.message_type().uri(), "reply not delivered");
        }
    }

    async fn ready_connection(&self, receipt: &MessageReceipt) -> Result<String, ExchangeError> {
        let connection_id = receipt.connection_id.as_deref().ok_or_else(|| {
            ExchangeError::ConnectionNotReady("message arrived without a connection".to_string())
        })?;
        let connection = match self.connections.retrieve_by_id(connection_id).await {
            Ok(connection) => connection,
            Err(e) if e.is_not_found() => {
                return Err(ExchangeError::ConnectionNotReady(format!(
                    "unknown connection {}",
                    connection_id
                )))
            }
            Err(e) => return Err(e),
        };
        if !connection.is_ready() {
            return Err(ExchangeError::ConnectionNotReady(format!(
                "connection {} is in state {}",
                connection_id,
                connection.state.as_str()
            )));
        }
        Ok(connection.connection_id)
    }

    async fn handle(
        &self,
        raw: &Value,
        receipt: &MessageReceipt,
    ) -> Result<Handled, ExchangeError> {
        let message = self.protocols.parse_message(raw)?;
        debug!(msg_type = %message.message_type().uri(), thread_id = message.thread_id(), "dispatching");

        let message = match message {
            Message::ProblemReport(report) => {
                return self.handle_problem_report(&report, receipt).await
            }
            other => other,
        };
        let conn = self.ready_connection(receipt).await?;

        let handled = match message {
            // ── issue-credential ───────────────────────
            Message::CredentialProposal(proposal) => {
                let mut record = self.credentials.receive_proposal(&proposal, &conn).await?;
                let response = if record.auto_offer {
                    let offer = self.credentials.create_offer(&mut record, None).await?;
                    Some(offer.into())
                } else {
                    None
                };
                Handled::new(&record.credential_exchange_id, response)
            }
            Message::CredentialOffer(offer) => {
                let mut record = self.credentials.receive_offer(&offer, &conn).await?;
                let response = match (
                    self.settings.auto_respond_credential_offer,
                    self.settings.holder_did.as_deref(),
                ) {
                    (true, Some(did)) => {
                        Some(self.credentials.create_request(&mut record, did).await?.into())
                    }
                    (true, None) => {
                        warn!(
                            exchange_id = %record.credential_exchange_id,
                            "auto request skipped: no holder DID configured"
                        );
                        None
                    }
                    (false, _) => None,
                };
                Handled::new(&record.credential_exchange_id, response)
            }
            Message::CredentialRequest(request) => {
                let mut record = self.credentials.receive_request(&request, &conn).await?;
                let values = record
                    .credential_proposal_dict
                    .as_ref()
                    .and_then(|p| p.credential_proposal.as_ref())
                    .map(|preview| preview.attr_dict());
                let response = match values {
                    Some(values) if record.auto_issue => Some(
                        self.credentials
                            .issue_credential(&mut record, None, &values)
                            .await?
                            .into(),
                    ),
                    None if record.auto_issue => {
                        debug!(
                            exchange_id = %record.credential_exchange_id,
                            "auto issue skipped: no credential preview"
                        );
                        None
                    }
                    _ => None,
                };
                Handled::new(&record.credential_exchange_id, response)
            }
            Message::CredentialIssue(issue) => {
                let mut record = self.credentials.receive_credential(&issue, &conn).await?;
                let response = if self.settings.auto_store_credential {
                    Some(self.credentials.store_credential(&mut record, None).await?.into())
                } else {
                    None
                };
                Handled::new(&record.credential_exchange_id, response)
            }
            Message::CredentialAck(ack) => {
                let record = self.credentials.receive_credential_ack(&ack, &conn).await?;
                Handled::new(&record.credential_exchange_id, None)
            }

            // ── present-proof ──────────────────────────
            Message::PresentationProposal(proposal) => {
                let mut record = self.presentations.receive_proposal(&proposal, &conn).await?;
                let response = if self.settings.auto_respond_presentation_proposal {
                    let request = self
                        .presentations
                        .create_bound_request(&mut record, None, None, None, None)
                        .await?;
                    Some(request.into())
                } else {
                    None
                };
                Handled::new(&record.presentation_exchange_id, response)
            }
            Message::PresentationRequest(request) => {
                let record = self.presentations.receive_request(&request, &conn).await?;
                Handled::new(&record.presentation_exchange_id, None)
            }
            Message::Presentation(presentation) => {
                let mut record = self
                    .presentations
                    .receive_presentation(&presentation, &conn)
                    .await?;
                let response = if self.settings.auto_verify_presentation {
                    Some(self.presentations.verify_presentation(&mut record).await?.into())
                } else {
                    None
                };
                Handled::new(&record.presentation_exchange_id, response)
            }
            Message::PresentationAck(ack) => {
                let record = self
                    .presentations
                    .receive_presentation_ack(&ack, &conn)
                    .await?;
                Handled::new(&record.presentation_exchange_id, None)
            }
            Message::ProblemReport(report) => {
                return self.handle_problem_report(&report, receipt).await
            }
        };
        info!(
            exchange_id = handled.exchange_id.as_deref().unwrap_or_default(),
            replied = handled.response.is_some(),
            "message handled"
        );
        Ok(handled)
    }

    /// Problem reports go to the family named in their type. Notification
    /// reports are matched against credential exchanges first.
    async fn handle_problem_report(
        &self,
        report: &ProblemReport,
        receipt: &MessageReceipt,
    ) -> Result<Handled, ExchangeError> {
        let Some(conn) = receipt.connection_id.as_deref() else {
            warn!(text = report.text().unwrap_or_default(), "problem report without connection");
            return Ok(Handled {
                exchange_id: None,
                response: None,
            });
        };
        let family = report.header.msg_type.family.as_str();
        if family == PRESENT_PROOF.family {
            let record = self.presentations.receive_problem_report(report, conn).await?;
            return Ok(Handled::new(&record.presentation_exchange_id, None));
        }
        match self.credentials.receive_problem_report(report, conn).await {
            Ok(record) => Ok(Handled::new(&record.credential_exchange_id, None)),
            Err(e) if e.is_not_found() && family != ISSUE_CREDENTIAL.family => {
                let record = self.presentations.receive_problem_report(report, conn).await?;
                Ok(Handled::new(&record.presentation_exchange_id, None))
            }
            Err(e) => Err(e),
        }
    }
}

fn inbound_thread_id(raw: &Value) -> Option<&str> {
    raw.get("~thread")
        .and_then(|t| t.get("thid"))
        .and_then(Value::as_str)
        .or_else(|| raw.get("@id").and_then(Value::as_str))
}
