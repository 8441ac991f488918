use crate::{
    error::Result,
    models::{
        notification::{Notification, NotificationId},
        view::{BadgeView, NotificationIcon, NotificationView, PanelView, ReadStyle},
    },
    services::notification::NotificationStore,
    utils::time::time_ago,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// 通知面板
/// 把仓库状态映射为渲染模型，并把用户操作转发给仓库
pub struct NotificationPanel {
    store: Arc<NotificationStore>,
    open: Mutex<bool>,
}

impl NotificationPanel {
    pub fn new(store: Arc<NotificationStore>) -> Self {
        Self {
            store,
            open: Mutex::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// 设置面板开关状态
    /// 只有从关闭变为打开时才拉取最近通知
    pub async fn set_open(&self, open: bool) -> Result<()> {
        let opening = {
            let mut current = self.open.lock();
            let opening = open && !*current;
            *current = open;
            opening
        };

        if opening {
            debug!("Notification panel opened, refreshing window");
            self.store.load_recent(self.store.window_size()).await?;
        }
        Ok(())
    }

    pub async fn toggle(&self) -> Result<()> {
        let open = !self.is_open();
        self.set_open(open).await
    }

    /// 用户点击某条通知
    pub async fn click(&self, id: &NotificationId) -> Result<bool> {
        self.store.mark_read(id).await
    }

    /// 用户点击"全部已读"
    pub async fn mark_all_read(&self) -> Result<()> {
        self.store.mark_all_read().await
    }

    pub fn badge(&self) -> BadgeView {
        BadgeView::new(self.store.unread_count())
    }

    pub fn render(&self) -> PanelView {
        self.render_at(Utc::now())
    }

    pub fn render_at(&self, now: DateTime<Utc>) -> PanelView {
        let state = self.store.snapshot();

        PanelView {
            open: self.is_open(),
            loading: self.store.is_loading(),
            badge: BadgeView::new(state.unread_count()),
            items: state.items().iter().map(|n| present(n, now)).collect(),
        }
    }
}

/// 单条通知的渲染模型
pub fn present(notification: &Notification, now: DateTime<Utc>) -> NotificationView {
    NotificationView {
        id: notification.id.clone(),
        icon: NotificationIcon::for_type(notification.notification_type),
        title: notification.title.clone(),
        message: notification.message.clone(),
        time_ago: time_ago(notification.created_at, now),
        style: if notification.is_read {
            ReadStyle::Read
        } else {
            ReadStyle::Unread
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::notification::NotificationType,
        services::{
            api::MockNotificationApi,
            notification::{StoreEvent, DEFAULT_WINDOW_SIZE},
        },
    };
    use chrono::Duration;

    fn item(id: i64, kind: NotificationType, is_read: bool, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::Int(id),
            notification_type: kind,
            title: format!("n{}", id),
            message: String::new(),
            is_read,
            created_at,
        }
    }

    #[tokio::test]
    async fn test_open_transition_fetches_once() {
        let mut api = MockNotificationApi::new();
        api.expect_recent()
            .withf(|limit| *limit == DEFAULT_WINDOW_SIZE)
            .times(2)
            .returning(|_| Ok(Vec::new()));

        let store = Arc::new(NotificationStore::new(Arc::new(api), DEFAULT_WINDOW_SIZE));
        let panel = NotificationPanel::new(store);

        panel.set_open(true).await.unwrap();
        // 已经打开，不再拉取
        panel.set_open(true).await.unwrap();
        panel.set_open(false).await.unwrap();
        panel.toggle().await.unwrap();

        assert!(panel.is_open());
    }

    #[tokio::test]
    async fn test_render_maps_icons_and_styles() {
        let now = Utc::now();
        let store = Arc::new(NotificationStore::new(
            Arc::new(MockNotificationApi::new()),
            DEFAULT_WINDOW_SIZE,
        ));
        store.dispatch(StoreEvent::RecentLoaded(vec![
            item(1, NotificationType::DocumentApproved, false, now - Duration::minutes(5)),
            item(2, NotificationType::Unknown, true, now - Duration::hours(3)),
        ]));
        store.dispatch(StoreEvent::UnreadCountLoaded(1));

        let panel = NotificationPanel::new(store);
        let view = panel.render_at(now);

        assert!(!view.open);
        assert!(!view.loading);
        assert_eq!(view.badge.label.as_deref(), Some("1"));
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[0].icon, NotificationIcon::DocumentApproved);
        assert_eq!(view.items[0].time_ago, "5m ago");
        assert_eq!(view.items[0].style, ReadStyle::Unread);
        assert_eq!(view.items[1].icon, NotificationIcon::Document);
        assert_eq!(view.items[1].time_ago, "3h ago");
        assert_eq!(view.items[1].style, ReadStyle::Read);
    }

    #[tokio::test]
    async fn test_click_marks_read() {
        let mut api = MockNotificationApi::new();
        api.expect_mark_read().times(1).returning(|_| Ok(()));

        let store = Arc::new(NotificationStore::new(Arc::new(api), DEFAULT_WINDOW_SIZE));
        store.dispatch(StoreEvent::RecentLoaded(vec![item(
            1,
            NotificationType::DocumentUpdate,
            false,
            Utc::now(),
        )]));
        store.dispatch(StoreEvent::UnreadCountLoaded(1));

        let panel = NotificationPanel::new(store);
        assert!(panel.click(&NotificationId::Int(1)).await.unwrap());
        assert!(!panel.badge().is_visible());
        assert_eq!(panel.render().items[0].style, ReadStyle::Read);
    }

    #[tokio::test]
    async fn test_failed_open_keeps_panel_open() {
        let mut api = MockNotificationApi::new();
        api.expect_recent()
            .returning(|_| Err(crate::error::AppError::connection("offline")));

        let store = Arc::new(NotificationStore::new(Arc::new(api), DEFAULT_WINDOW_SIZE));
        let panel = NotificationPanel::new(store);

        assert!(panel.set_open(true).await.is_err());
        assert!(panel.is_open());
        assert!(panel.render().is_empty());
    }
}
