use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;

/// 通知ID
/// 由协作服务分配，可能是字符串或整数，只做相等比较
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationId {
    Int(i64),
    Str(String),
}

impl NotificationId {
    /// 为没有服务端ID的推送事件生成本地ID
    pub fn local() -> Self {
        NotificationId::Str(format!("local-{}", uuid::Uuid::new_v4()))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, NotificationId::Str(s) if s.starts_with("local-"))
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationId::Int(id) => write!(f, "{}", id),
            NotificationId::Str(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for NotificationId {
    fn from(id: &str) -> Self {
        NotificationId::Str(id.to_string())
    }
}

impl From<String> for NotificationId {
    fn from(id: String) -> Self {
        NotificationId::Str(id)
    }
}

impl From<i64> for NotificationId {
    fn from(id: i64) -> Self {
        NotificationId::Int(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    DocumentUpdate,
    DocumentDeleted,
    DocumentApproved,
    DocumentRejected,
    #[default]
    #[serde(other)]
    Unknown,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::DocumentUpdate => "DOCUMENT_UPDATE",
            NotificationType::DocumentDeleted => "DOCUMENT_DELETED",
            NotificationType::DocumentApproved => "DOCUMENT_APPROVED",
            NotificationType::DocumentRejected => "DOCUMENT_REJECTED",
            NotificationType::Unknown => "UNKNOWN",
        }
    }

    /// 宽松解析，无法识别的类型归为 Unknown
    pub fn parse(value: &str) -> Self {
        match value {
            "DOCUMENT_UPDATE" => NotificationType::DocumentUpdate,
            "DOCUMENT_DELETED" => NotificationType::DocumentDeleted,
            "DOCUMENT_APPROVED" => NotificationType::DocumentApproved,
            "DOCUMENT_REJECTED" => NotificationType::DocumentRejected,
            _ => NotificationType::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type", default)]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// 实时推送的 `new-notification` 事件负载
/// 所有字段都是可选的，由通知仓库补齐默认值；类型不符的字段按缺失处理
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<NotificationId>,
    #[serde(rename = "type", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

pub const DEFAULT_PUSH_TITLE: &str = "New notification";
pub const DEFAULT_PUSH_MESSAGE: &str = "";

impl PushPayload {
    /// 将推送负载转换为通知记录
    pub fn into_notification(self, received_at: DateTime<Utc>) -> Notification {
        Notification {
            id: self.id.unwrap_or_else(NotificationId::local),
            notification_type: self
                .notification_type
                .as_deref()
                .map(NotificationType::parse)
                .unwrap_or_default(),
            title: self.title.unwrap_or_else(|| DEFAULT_PUSH_TITLE.to_string()),
            message: self.message.unwrap_or_else(|| DEFAULT_PUSH_MESSAGE.to_string()),
            is_read: false,
            created_at: self.created_at.unwrap_or(received_at),
        }
    }
}

/// `GET /notifications/unread-count` 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// `GET /notifications` 响应
/// 分页接口返回 `{ data: [...] }`，旧接口直接返回数组
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationListResponse {
    Page { data: Vec<Notification> },
    Legacy(Vec<Notification>),
}

impl NotificationListResponse {
    pub fn into_items(self) -> Vec<Notification> {
        match self {
            NotificationListResponse::Page { data } => data,
            NotificationListResponse::Legacy(items) => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_id_is_opaque() {
        let by_int: NotificationId = serde_json::from_value(json!(42)).unwrap();
        let by_str: NotificationId = serde_json::from_value(json!("42")).unwrap();

        assert_eq!(by_int, NotificationId::Int(42));
        assert_eq!(by_str, NotificationId::Str("42".to_string()));
        // 不同类型的ID不做隐式转换
        assert_ne!(by_int, by_str);
        assert_eq!(by_int.to_string(), "42");
    }

    #[test]
    fn test_unknown_type_falls_back() {
        let parsed: NotificationType = serde_json::from_value(json!("COMMENT_ADDED")).unwrap();
        assert_eq!(parsed, NotificationType::Unknown);
        assert_eq!(NotificationType::parse("DOCUMENT_APPROVED"), NotificationType::DocumentApproved);
    }

    #[test]
    fn test_notification_wire_format() {
        let value = json!({
            "id": "n1",
            "type": "DOCUMENT_DELETED",
            "title": "Deleted",
            "message": "report.pdf was deleted",
            "isRead": true,
            "createdAt": "2024-05-01T10:00:00Z"
        });

        let notification: Notification = serde_json::from_value(value).unwrap();
        assert_eq!(notification.id, NotificationId::from("n1"));
        assert_eq!(notification.notification_type, NotificationType::DocumentDeleted);
        assert!(notification.is_read);
        assert_eq!(notification.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_push_payload_defaults() {
        let received_at = Utc::now();
        let notification = PushPayload::default().into_notification(received_at);

        assert!(notification.id.is_local());
        assert_eq!(notification.notification_type, NotificationType::Unknown);
        assert_eq!(notification.title, DEFAULT_PUSH_TITLE);
        assert_eq!(notification.message, DEFAULT_PUSH_MESSAGE);
        assert!(!notification.is_read);
        assert_eq!(notification.created_at, received_at);
    }

    #[test]
    fn test_push_payload_keeps_server_id() {
        let payload: PushPayload = serde_json::from_value(json!({
            "id": 7,
            "type": "DOCUMENT_UPDATE",
            "message": "x"
        }))
        .unwrap();

        let notification = payload.into_notification(Utc::now());
        assert_eq!(notification.id, NotificationId::Int(7));
        assert!(!notification.id.is_local());
        assert_eq!(notification.notification_type, NotificationType::DocumentUpdate);
        assert_eq!(notification.message, "x");
    }

    #[test]
    fn test_push_payload_tolerates_bad_fields() {
        let payload: PushPayload = serde_json::from_value(json!({
            "id": 1.5,
            "type": 3,
            "title": ["not", "a", "string"],
            "message": "still here",
            "createdAt": "yesterday"
        }))
        .unwrap();

        assert_eq!(payload.id, None);
        assert_eq!(payload.notification_type, None);
        assert_eq!(payload.title, None);
        assert_eq!(payload.message.as_deref(), Some("still here"));
        assert_eq!(payload.created_at, None);

        let received_at = Utc::now();
        let notification = payload.into_notification(received_at);
        assert_eq!(notification.notification_type, NotificationType::Unknown);
        assert_eq!(notification.title, DEFAULT_PUSH_TITLE);
        assert_eq!(notification.created_at, received_at);
    }

    #[test]
    fn test_list_response_shapes() {
        let page: NotificationListResponse = serde_json::from_value(json!({
            "data": [{ "id": 1, "type": "DOCUMENT_UPDATE", "createdAt": "2024-05-01T10:00:00Z" }]
        }))
        .unwrap();
        assert_eq!(page.into_items().len(), 1);

        let legacy: NotificationListResponse = serde_json::from_value(json!([
            { "id": 1, "createdAt": "2024-05-01T10:00:00Z" },
            { "id": 2, "createdAt": "2024-05-01T11:00:00Z" }
        ]))
        .unwrap();
        assert_eq!(legacy.into_items().len(), 2);
    }
}
