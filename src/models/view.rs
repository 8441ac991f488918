use serde::Serialize;

use crate::models::notification::{NotificationId, NotificationType};

/// 通知图标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationIcon {
    DocumentEdit,
    DocumentRemove,
    DocumentApproved,
    DocumentRejected,
    Document,
}

impl NotificationIcon {
    pub fn for_type(notification_type: NotificationType) -> Self {
        match notification_type {
            NotificationType::DocumentUpdate => NotificationIcon::DocumentEdit,
            NotificationType::DocumentDeleted => NotificationIcon::DocumentRemove,
            NotificationType::DocumentApproved => NotificationIcon::DocumentApproved,
            NotificationType::DocumentRejected => NotificationIcon::DocumentRejected,
            NotificationType::Unknown => NotificationIcon::Document,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NotificationIcon::DocumentEdit => "document-edit",
            NotificationIcon::DocumentRemove => "document-remove",
            NotificationIcon::DocumentApproved => "document-approved",
            NotificationIcon::DocumentRejected => "document-rejected",
            NotificationIcon::Document => "document",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStyle {
    Unread,
    Read,
}

/// 单条通知的渲染模型
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationView {
    pub id: NotificationId,
    pub icon: NotificationIcon,
    pub title: String,
    pub message: String,
    pub time_ago: String,
    pub style: ReadStyle,
}

/// 未读徽标
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeView {
    pub count: u64,
    pub label: Option<String>,
}

impl BadgeView {
    pub const MAX_DISPLAY: u64 = 99;

    pub fn new(count: u64) -> Self {
        let label = match count {
            0 => None,
            n if n > Self::MAX_DISPLAY => Some(format!("{}+", Self::MAX_DISPLAY)),
            n => Some(n.to_string()),
        };
        Self { count, label }
    }

    pub fn is_visible(&self) -> bool {
        self.label.is_some()
    }
}

/// 通知面板快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub open: bool,
    pub loading: bool,
    pub badge: BadgeView,
    pub items: Vec<NotificationView>,
}

impl PanelView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
