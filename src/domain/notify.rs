use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{
    DatabaseResult, ModelManager, ResourceType,
    entity::{Notification, NotificationCreate},
};

#[derive(Debug, Clone, Copy)]
pub enum NotificationCategory {
    Enrollment,
    Progress,
    Certificate,
    Scholarship,
    Account,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enrollment => "enrollment",
            Self::Progress => "progress",
            Self::Certificate => "certificate",
            Self::Scholarship => "scholarship",
            Self::Account => "account",
        }
    }
}

#[derive(Debug)]
pub struct NotificationRequest {
    pub target_user_id: Uuid,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub related_entity_id: Option<Uuid>,
    pub related_entity_type: Option<ResourceType>,
}

impl NotificationRequest {
    pub fn new<T: Into<String>, M: Into<String>>(
        target_user_id: Uuid,
        category: NotificationCategory,
        title: T,
        message: M,
    ) -> Self {
        Self {
            target_user_id,
            category,
            title: title.into(),
            message: message.into(),
            related_entity_id: None,
            related_entity_type: None,
        }
    }

    pub fn about(mut self, id: Uuid, r#type: ResourceType) -> Self {
        self.related_entity_id = Some(id);
        self.related_entity_type = Some(r#type);
        self
    }
}

/// Fire-and-forget seam. Callers go through `EngineContext::notify`, which
/// swallows and logs failures; a broken inbox never fails an enrollment.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify(&self, req: NotificationRequest) -> DatabaseResult<()>;
}

/// Production gateway: append a durable inbox row. Real-time push reads the
/// same table from the delivery side.
#[derive(Debug, Clone)]
pub struct InboxNotifier {
    mm: ModelManager,
}

impl InboxNotifier {
    pub fn new(mm: ModelManager) -> Self {
        Self { mm }
    }
}

#[async_trait]
impl NotificationGateway for InboxNotifier {
    async fn notify(&self, req: NotificationRequest) -> DatabaseResult<()> {
        Notification::insert(
            &self.mm,
            NotificationCreate {
                target_user_id: req.target_user_id,
                category: req.category.as_str().to_string(),
                title: req.title,
                message: req.message,
                related_entity_id: req.related_entity_id,
                related_entity_type: req.related_entity_type.map(|t| format!("{t:?}").to_lowercase()),
            },
        )
        .await?;
        Ok(())
    }
}
