use crate::{
    error::{AppError, Result},
    models::notification::{Notification, NotificationId, PushPayload},
    services::api::NotificationApi,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// 通知仓库的状态变更事件
/// 所有写操作都转换为事件，由 `FeedState::apply` 统一处理
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    UnreadCountLoaded(u64),
    RecentLoaded(Vec<Notification>),
    Pushed {
        payload: PushPayload,
        received_at: DateTime<Utc>,
    },
    MarkedRead(NotificationId),
    AllMarkedRead,
    Reset,
}

/// 通知窗口与未读计数
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    items: Vec<Notification>,
    unread: u64,
    window_size: usize,
}

impl FeedState {
    pub fn new(window_size: usize) -> Self {
        Self {
            items: Vec::new(),
            unread: 0,
            window_size: window_size.max(1),
        }
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> u64 {
        self.unread
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.items.iter().find(|n| &n.id == id)
    }

    /// 应用事件，返回状态是否发生变化
    pub fn apply(&mut self, event: StoreEvent) -> bool {
        match event {
            StoreEvent::UnreadCountLoaded(count) => {
                let changed = self.unread != count;
                self.unread = count;
                changed
            }
            StoreEvent::RecentLoaded(mut items) => {
                // 整体替换，不与旧窗口合并
                items.truncate(self.window_size);
                self.items = items;
                true
            }
            StoreEvent::Pushed { payload, received_at } => {
                let notification = payload.into_notification(received_at);
                if !notification.id.is_local() && self.get(&notification.id).is_some() {
                    debug!("Ignoring duplicate push for notification {}", notification.id);
                    return false;
                }

                self.items.insert(0, notification);
                self.items.truncate(self.window_size);
                self.unread = self.unread.saturating_add(1);
                true
            }
            StoreEvent::MarkedRead(id) => {
                match self.items.iter_mut().find(|n| n.id == id) {
                    Some(item) if !item.is_read => {
                        item.is_read = true;
                        self.unread = self.unread.saturating_sub(1);
                        true
                    }
                    _ => false,
                }
            }
            StoreEvent::AllMarkedRead => {
                for item in self.items.iter_mut() {
                    item.is_read = true;
                }
                self.unread = 0;
                true
            }
            StoreEvent::Reset => {
                let changed = !self.items.is_empty() || self.unread != 0;
                self.items.clear();
                self.unread = 0;
                changed
            }
        }
    }
}

struct Inner {
    feed: FeedState,
    // reset后递增，用于丢弃过期的响应
    generation: u64,
    pending_fetches: usize,
}

/// 通知仓库
/// 维护通知窗口和未读计数，合并REST拉取结果与实时推送
pub struct NotificationStore {
    api: Arc<dyn NotificationApi>,
    inner: Mutex<Inner>,
    revision_tx: watch::Sender<u64>,
}

impl NotificationStore {
    pub fn new(api: Arc<dyn NotificationApi>, window_size: usize) -> Self {
        let (revision_tx, _) = watch::channel(0);

        Self {
            api,
            inner: Mutex::new(Inner {
                feed: FeedState::new(window_size),
                generation: 0,
                pending_fetches: 0,
            }),
            revision_tx,
        }
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> FeedState {
        self.inner.lock().feed.clone()
    }

    pub fn unread_count(&self) -> u64 {
        self.inner.lock().feed.unread
    }

    pub fn items(&self) -> Vec<Notification> {
        self.inner.lock().feed.items.clone()
    }

    pub fn window_size(&self) -> usize {
        self.inner.lock().feed.window_size
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().pending_fetches > 0
    }

    /// 订阅变更通知 (版本号)
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    /// 直接应用一个事件
    pub fn dispatch(&self, event: StoreEvent) -> bool {
        let changed = self.inner.lock().feed.apply(event);
        if changed {
            self.bump_revision();
        }
        changed
    }

    /// 拉取未读数并替换本地计数
    /// 失败时保留原值
    pub async fn load_unread_count(&self) -> Result<u64> {
        let generation = self.begin_fetch();
        let result = self.api.unread_count().await;
        self.end_fetch(generation);

        match result {
            Ok(count) => {
                self.apply_if_current(generation, StoreEvent::UnreadCountLoaded(count));
                Ok(count)
            }
            Err(e) => {
                warn!("Failed to load unread count: {}", e);
                Err(e)
            }
        }
    }

    /// 拉取最近的通知并整体替换窗口
    /// 多个请求重叠时以最后返回的为准
    pub async fn load_recent(&self, limit: usize) -> Result<usize> {
        let generation = self.begin_fetch();
        let result = match self.api.recent(limit).await {
            // 旧版服务端没有分页接口
            Err(AppError::NotFound(_)) => {
                debug!("Paginated notifications endpoint missing, using legacy list");
                self.api.list_all().await
            }
            other => other,
        };
        self.end_fetch(generation);

        match result {
            Ok(items) => {
                let count = items.len();
                self.apply_if_current(generation, StoreEvent::RecentLoaded(items));
                Ok(count)
            }
            Err(e) => {
                warn!("Failed to load recent notifications: {}", e);
                Err(e)
            }
        }
    }

    /// 合并一条实时推送的通知
    pub fn ingest_push(&self, payload: PushPayload) -> bool {
        self.ingest_push_at(payload, Utc::now())
    }

    pub fn ingest_push_at(&self, payload: PushPayload, received_at: DateTime<Utc>) -> bool {
        debug!("Ingesting pushed notification: {:?}", payload.notification_type);
        self.dispatch(StoreEvent::Pushed { payload, received_at })
    }

    /// 标记单条已读
    /// 服务端确认后才修改本地状态；本地不存在或已读时只调用接口
    pub async fn mark_read(&self, id: &NotificationId) -> Result<bool> {
        let generation = self.generation();

        if let Err(e) = self.api.mark_read(id).await {
            warn!("Failed to mark notification {} as read: {}", id, e);
            return Err(e);
        }

        Ok(self.apply_if_current(generation, StoreEvent::MarkedRead(id.clone())))
    }

    /// 全部标记为已读
    pub async fn mark_all_read(&self) -> Result<()> {
        let generation = self.generation();

        if let Err(e) = self.api.mark_all_read().await {
            warn!("Failed to mark all notifications as read: {}", e);
            return Err(e);
        }

        self.apply_if_current(generation, StoreEvent::AllMarkedRead);
        info!("All notifications marked as read");
        Ok(())
    }

    /// 清空状态 (卸载或登出)
    /// 之后返回的旧请求结果会被丢弃
    pub fn reset(&self) {
        let changed = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.pending_fetches = 0;
            inner.feed.apply(StoreEvent::Reset)
        };
        if changed {
            self.bump_revision();
        }
    }

    fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    fn begin_fetch(&self) -> u64 {
        let generation = {
            let mut inner = self.inner.lock();
            inner.pending_fetches += 1;
            inner.generation
        };
        self.bump_revision();
        generation
    }

    // reset之前发出的请求已经不计入进行中数量
    fn end_fetch(&self, generation: u64) {
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            inner.pending_fetches = inner.pending_fetches.saturating_sub(1);
        }
        self.bump_revision();
    }

    fn apply_if_current(&self, generation: u64, event: StoreEvent) -> bool {
        let changed = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                debug!("Discarding stale response from generation {}", generation);
                return false;
            }
            inner.feed.apply(event)
        };
        if changed {
            self.bump_revision();
        }
        changed
    }

    fn bump_revision(&self) {
        self.revision_tx.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}
