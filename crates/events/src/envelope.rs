use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockroom_core::TenantId;

use crate::event::ChangeTopic;

/// A post-commit notification about one changed entity.
///
/// Notes:
/// - **Multi-tenancy**: every event is addressed to exactly one tenant.
/// - `payload` mirrors the entity as it was committed.
/// - `message` is a short human-readable summary for UI toasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    event_id: Uuid,
    tenant_id: TenantId,
    topic: ChangeTopic,
    message: String,
    occurred_at: DateTime<Utc>,
    payload: JsonValue,
}

impl ChangeEvent {
    pub fn new(
        tenant_id: TenantId,
        topic: ChangeTopic,
        message: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            tenant_id,
            topic,
            message: message.into(),
            occurred_at: Utc::now(),
            payload,
        }
    }

    /// Build an event whose payload is the serialized entity.
    ///
    /// Serialization failures degrade to a `null` payload; a notification is
    /// never worth failing a committed write over.
    pub fn for_entity<T: Serialize>(
        tenant_id: TenantId,
        topic: ChangeTopic,
        message: impl Into<String>,
        entity: &T,
    ) -> Self {
        let payload = serde_json::to_value(entity).unwrap_or(JsonValue::Null);
        Self::new(tenant_id, topic, message, payload)
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn topic(&self) -> ChangeTopic {
        self.topic
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }

    pub fn into_payload(self) -> JsonValue {
        self.payload
    }
}
