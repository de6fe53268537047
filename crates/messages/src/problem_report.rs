use serde::{Deserialize, Serialize};

use crate::decorators::MessageHeader;
use crate::protocol::NOTIFICATION;

pub const PROBLEM_REPORT: &str = "problem-report";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDescription {
    pub en: String,
    pub code: String,
}

/// notification/1.0 problem report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemReport {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<ProblemDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain_ltxt: Option<String>,
}

impl ProblemReport {
    pub fn new(code: &str, text: &str) -> Self {
        ProblemReport {
            header: MessageHeader::new(NOTIFICATION.message_type(PROBLEM_REPORT)),
            description: Some(ProblemDescription {
                en: text.to_string(),
                code: code.to_string(),
            }),
            explain_ltxt: None,
        }
    }

    /// Human-readable text, whichever field carries it.
    pub fn text(&self) -> Option<&str> {
        self.description
            .as_ref()
            .map(|d| d.en.as_str())
            .or(self.explain_ltxt.as_deref())
    }
}
