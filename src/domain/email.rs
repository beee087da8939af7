use std::fmt;

use async_trait::async_trait;

use crate::model::DatabaseResult;

/// Templated sends; the engine never builds raw mail bodies.
pub enum EmailTemplate {
    EnrollmentConfirmation {
        program_title: String,
    },
    ScholarshipAward {
        program_title: String,
        code: String,
    },
    StatusChange {
        program_title: String,
        new_status: String,
    },
    Completion {
        program_title: String,
    },
    TemporaryCredential {
        password: String,
    },
}

// Hand-written so the temporary credential never reaches the logs.
impl fmt::Debug for EmailTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnrollmentConfirmation { program_title } => f
                .debug_struct("EnrollmentConfirmation")
                .field("program_title", program_title)
                .finish(),
            Self::ScholarshipAward {
                program_title,
                code,
            } => f
                .debug_struct("ScholarshipAward")
                .field("program_title", program_title)
                .field("code", code)
                .finish(),
            Self::StatusChange {
                program_title,
                new_status,
            } => f
                .debug_struct("StatusChange")
                .field("program_title", program_title)
                .field("new_status", new_status)
                .finish(),
            Self::Completion { program_title } => f
                .debug_struct("Completion")
                .field("program_title", program_title)
                .finish(),
            Self::TemporaryCredential { .. } => f
                .debug_struct("TemporaryCredential")
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug)]
pub struct EmailMessage {
    pub to: String,
    pub template: EmailTemplate,
}

/// Delivery mechanics live outside the engine; this seam only hands the
/// message over. Failures are logged by the caller and swallowed.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, msg: EmailMessage) -> DatabaseResult<()>;
}

/// Default gateway: log the send and move on.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl EmailGateway for LogMailer {
    async fn send(&self, msg: EmailMessage) -> DatabaseResult<()> {
        tracing::info!(to = %msg.to, template = ?msg.template, "email handed off");
        Ok(())
    }
}
