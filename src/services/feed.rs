use crate::{
    config::Config,
    error::Result,
    models::websocket::{ConnectionEvent, PushFrame},
    services::{
        connection::ConnectionManager,
        notification::NotificationStore,
        session::SessionStore,
    },
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

/// 挂载结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// 实时推送 + 断线时轮询
    Live,
    /// 没有会话令牌，只能通过REST轮询
    PollOnly,
}

/// 通知流运行时
/// 把连接管理器、通知仓库和轮询组装在一起：推送优先，连接不可用时轮询未读数
pub struct NotificationFeed {
    manager: Arc<ConnectionManager>,
    store: Arc<NotificationStore>,
    session: Arc<dyn SessionStore>,
    poll_interval: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationFeed {
    pub fn new(
        manager: Arc<ConnectionManager>,
        store: Arc<NotificationStore>,
        session: Arc<dyn SessionStore>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            manager,
            store,
            session,
            poll_interval,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(
        config: &Config,
        manager: Arc<ConnectionManager>,
        store: Arc<NotificationStore>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        Self::new(manager, store, session, config.unread_poll_interval())
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// 挂载: 拉取未读数，建立推送连接，启动后台任务
    /// 重复挂载会先停止旧任务
    pub async fn mount(&self) -> FeedMode {
        self.stop_tasks();

        if let Err(e) = self.store.load_unread_count().await {
            warn!("Initial unread count unavailable: {}", e);
        }

        // 先订阅生命周期信号，避免错过首次连接成功的事件
        let events = self.manager.events();
        let handle = self.manager.get_connection();
        let mode = match &handle {
            Some(_) => FeedMode::Live,
            None => FeedMode::PollOnly,
        };

        let mut tasks = Vec::new();
        if let Some(handle) = handle {
            tasks.push(tokio::spawn(push_loop(
                handle.subscribe(),
                events,
                self.store.clone(),
            )));
        }
        tasks.push(tokio::spawn(poll_loop(
            self.manager.clone(),
            self.store.clone(),
            self.poll_interval,
        )));
        *self.tasks.lock() = tasks;

        info!("Notification feed mounted in {:?} mode", mode);
        mode
    }

    /// 卸载: 停止后台任务并丢弃状态，迟到的响应不再生效
    pub fn unmount(&self) {
        self.stop_tasks();
        self.store.reset();
        debug!("Notification feed unmounted");
    }

    /// 登录后重新建立连接
    pub async fn login(&self, token: &str) -> Result<FeedMode> {
        self.session.set_token(token)?;
        Ok(self.mount().await)
    }

    /// 登出: 断开连接并清除会话，避免旧令牌的连接泄漏
    pub fn logout(&self) -> Result<()> {
        self.unmount();
        self.manager.disconnect();
        self.session.clear()?;
        info!("Session cleared, notification feed stopped");
        Ok(())
    }

    fn stop_tasks(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for NotificationFeed {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// 处理推送帧; 断线重连后同步一次未读数
async fn push_loop(
    mut frames: broadcast::Receiver<PushFrame>,
    mut events: broadcast::Receiver<ConnectionEvent>,
    store: Arc<NotificationStore>,
) {
    // 首次连接前的未读数已在挂载时拉取
    let mut connected_before = false;

    loop {
        tokio::select! {
            biased;

            event = events.recv() => match event {
                Ok(ConnectionEvent::Connected { connection_id, .. }) => {
                    if connected_before {
                        debug!("Connection {} restored, syncing unread count", connection_id);
                        let _ = store.load_unread_count().await;
                    }
                    connected_before = true;
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
            frame = frames.recv() => match frame {
                Ok(frame) => handle_frame(&store, frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Push receiver lagged, {} frames skipped", skipped);
                    let _ = store.load_unread_count().await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    debug!("Push loop finished");
}

fn handle_frame(store: &NotificationStore, frame: PushFrame) {
    if !frame.is_notification() {
        debug!("Ignoring push event {}", frame.event);
        return;
    }

    match frame.payload() {
        Ok(payload) => {
            store.ingest_push(payload);
        }
        Err(e) => warn!("Malformed notification payload: {}", e),
    }
}

/// 连接不可用时按固定间隔轮询未读数
async fn poll_loop(manager: Arc<ConnectionManager>, store: Arc<NotificationStore>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // 第一次tick立即返回，挂载时已经拉取过
    interval.tick().await;

    loop {
        interval.tick().await;

        let live = manager
            .current()
            .map(|handle| handle.is_connected())
            .unwrap_or(false);
        if live {
            continue;
        }

        debug!("Push connection unavailable, polling unread count");
        let _ = store.load_unread_count().await;
    }
}
