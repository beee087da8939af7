//! The enrollment lifecycle engine: scholarship resolution, enrollment
//! management, progress tracking, completion evaluation and certificate
//! issuance. Everything takes an explicit [`EngineContext`]; there is no
//! ambient state, and no cache is consulted for correctness decisions.

use std::sync::Arc;

use uuid::Uuid;

mod error;
pub use error::{CoreError, CoreResult, PricingBreakdown};

pub mod certificate;
pub mod completion;
pub mod email;
pub mod enrollment;
pub mod notify;
pub mod progress;
pub mod scholarship;

use crate::error::log_error;
use crate::model::{ModelManager, ResourceType, entity::Program};
use crate::web::AuthenticatedUser;
use email::{EmailGateway, EmailMessage};
use notify::{NotificationGateway, NotificationRequest};

#[derive(Clone)]
pub struct EngineContext {
    mm: ModelManager,
    notifier: Arc<dyn NotificationGateway>,
    mailer: Arc<dyn EmailGateway>,
}

impl EngineContext {
    pub fn new(
        mm: ModelManager,
        notifier: Arc<dyn NotificationGateway>,
        mailer: Arc<dyn EmailGateway>,
    ) -> Self {
        Self {
            mm,
            notifier,
            mailer,
        }
    }

    pub fn mm(&self) -> &ModelManager {
        &self.mm
    }

    /// Best-effort. The mutation already happened; a dead inbox is logged,
    /// never propagated.
    pub async fn notify(&self, req: NotificationRequest) {
        if let Err(e) = self.notifier.notify(req).await {
            log_error(&e);
        }
    }

    pub async fn send_email(&self, msg: EmailMessage) {
        if let Err(e) = self.mailer.send(msg).await {
            log_error(&e);
        }
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext").finish_non_exhaustive()
    }
}

/// A reference that is either still an id or an already-loaded entity.
/// Call sites must say which they have; there is no implicit populated /
/// unpopulated branching.
#[derive(Debug)]
pub enum Ref<T> {
    Id(Uuid),
    Resolved(T),
}

impl Ref<Program> {
    pub async fn resolve(self, mm: &ModelManager, actor: &AuthenticatedUser) -> CoreResult<Program> {
        match self {
            Self::Resolved(p) => Ok(p),
            Self::Id(id) => Program::find_by_id(mm, actor, id)
                .await?
                .ok_or(CoreError::NotFound(ResourceType::Program)),
        }
    }
}
