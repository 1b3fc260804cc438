use uuid::Uuid;

pub struct NewAuditEntry {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub actor: String,
    pub detail: serde_json::Value,
}

impl NewAuditEntry {
    pub fn order(order_id: &str, action: &str, actor: &str, detail: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            entity_type: "order".to_string(),
            entity_id: order_id.to_string(),
            action: action.to_string(),
            actor: actor.to_string(),
            detail,
        }
    }
}
