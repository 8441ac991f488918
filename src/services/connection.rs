use crate::{
    config::Config,
    models::websocket::{ConnectionEvent, ConnectionState, PushFrame},
    services::{session::SessionStore, websocket::PushConnector},
};
use chrono::Utc;
use futures::StreamExt;
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn, error};
use url::Url;

/// 重连策略: 固定间隔，有限次数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            delay: config.reconnect_delay(),
            max_attempts: config.reconnect_attempts,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

/// 推送连接句柄
/// 持有建立连接时的令牌，令牌变化需要重新连接
pub struct ConnectionHandle {
    id: String,
    token: String,
    state_rx: watch::Receiver<ConnectionState>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    frames_tx: broadcast::Sender<PushFrame>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// 订阅连接状态变化
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// 订阅推送帧
    pub fn subscribe(&self) -> broadcast::Receiver<PushFrame> {
        self.frames_tx.subscribe()
    }

    fn close(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.state_tx.send_replace(ConnectionState::Closed);
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

/// 连接管理器
/// 进程内唯一的推送连接由它创建和销毁
pub struct ConnectionManager {
    endpoint: Url,
    policy: ReconnectPolicy,
    session: Arc<dyn SessionStore>,
    connector: Arc<dyn PushConnector>,
    current: Mutex<Option<Arc<ConnectionHandle>>>,
    events_tx: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionManager {
    pub fn new(
        endpoint: Url,
        policy: ReconnectPolicy,
        session: Arc<dyn SessionStore>,
        connector: Arc<dyn PushConnector>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(64);

        Self {
            endpoint,
            policy,
            session,
            connector,
            current: Mutex::new(None),
            events_tx,
        }
    }

    pub fn from_config(
        config: &Config,
        session: Arc<dyn SessionStore>,
        connector: Arc<dyn PushConnector>,
    ) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.push_endpoint()?,
            ReconnectPolicy::from_config(config),
            session,
            connector,
        ))
    }

    /// 订阅连接生命周期信号
    pub fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events_tx.subscribe()
    }

    /// 当前句柄 (不创建新连接)
    pub fn current(&self) -> Option<Arc<ConnectionHandle>> {
        self.current.lock().clone()
    }

    /// 获取推送连接
    /// 已有可用句柄时直接返回；没有会话令牌时返回 None，表示推送不可用
    /// 必须在tokio运行时内调用
    pub fn get_connection(&self) -> Option<Arc<ConnectionHandle>> {
        let token = self.session.token();
        let mut current = self.current.lock();

        let token = match token {
            Some(token) => token,
            None => {
                if let Some(stale) = current.take() {
                    info!("Session token removed, closing connection {}", stale.id);
                    stale.close();
                }
                debug!("No session token, notifications unavailable");
                return None;
            }
        };

        if let Some(handle) = current.as_ref() {
            if handle.token == token && !handle.state().is_terminal() {
                return Some(handle.clone());
            }
            if handle.token != token {
                info!("Session token changed, reconnecting {}", handle.id);
            }
            handle.close();
        }

        let handle = self.spawn_connection(token);
        *current = Some(handle.clone());
        Some(handle)
    }

    /// 断开并清除共享句柄，可重复调用
    pub fn disconnect(&self) {
        let handle = self.current.lock().take();

        if let Some(handle) = handle {
            handle.close();
            info!("Disconnected notification connection {}", handle.id);
            let _ = self.events_tx.send(ConnectionEvent::Disconnected {
                connection_id: handle.id.clone(),
                reason: "client disconnect".to_string(),
            });
        }
    }

    fn spawn_connection(&self, token: String) -> Arc<ConnectionHandle> {
        let id = format!("conn_{}", uuid::Uuid::new_v4());
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let state_tx = Arc::new(state_tx);
        let (frames_tx, _) = broadcast::channel(256);

        let supervisor = Supervisor {
            id: id.clone(),
            token: token.clone(),
            endpoint: self.endpoint.clone(),
            policy: self.policy,
            connector: self.connector.clone(),
            state_tx: state_tx.clone(),
            frames_tx: frames_tx.clone(),
            events_tx: self.events_tx.clone(),
        };
        let task = tokio::spawn(supervisor.run());

        info!("Opening notification connection {} to {}", id, self.endpoint);

        Arc::new(ConnectionHandle {
            id,
            token,
            state_rx,
            state_tx,
            frames_tx,
            task: Mutex::new(Some(task)),
        })
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.current.get_mut().take() {
            handle.close();
        }
    }
}

/// 单个连接的后台任务: 连接、转发推送帧、按策略重连
struct Supervisor {
    id: String,
    token: String,
    endpoint: Url,
    policy: ReconnectPolicy,
    connector: Arc<dyn PushConnector>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    frames_tx: broadcast::Sender<PushFrame>,
    events_tx: broadcast::Sender<ConnectionEvent>,
}

impl Supervisor {
    async fn run(self) {
        let mut failures: u32 = 0;

        loop {
            match self.connector.connect(&self.endpoint, &self.token).await {
                Ok(mut stream) => {
                    failures = 0;
                    if !self.transition(ConnectionState::Connected) {
                        debug!("Connection {} closed during handshake", self.id);
                        return;
                    }
                    info!("Notification connection {} established", self.id);
                    self.emit(ConnectionEvent::Connected {
                        connection_id: self.id.clone(),
                        at: Utc::now(),
                    });

                    let reason = loop {
                        match stream.next().await {
                            Some(Ok(frame)) => {
                                debug!("Connection {} received event {}", self.id, frame.event);
                                // 没有订阅者时丢弃
                                let _ = self.frames_tx.send(frame);
                            }
                            Some(Err(e)) => break e.to_string(),
                            None => break "transport close".to_string(),
                        }
                    };

                    warn!("Notification connection {} lost: {}", self.id, reason);
                    self.emit(ConnectionEvent::Disconnected {
                        connection_id: self.id.clone(),
                        reason,
                    });
                }
                Err(e) => {
                    failures += 1;
                    error!(
                        "Notification connection {} failed (attempt {}/{}): {}",
                        self.id, failures, self.policy.max_attempts, e
                    );
                    self.emit(ConnectionEvent::ConnectError {
                        connection_id: self.id.clone(),
                        message: e.to_string(),
                    });

                    if e.is_auth_failure() {
                        warn!("Handshake rejected for connection {}, not retrying", self.id);
                        self.give_up(failures);
                        return;
                    }
                }
            }

            if failures >= self.policy.max_attempts {
                self.give_up(failures);
                return;
            }

            if !self.transition(ConnectionState::Reconnecting { attempt: failures + 1 }) {
                return;
            }
            tokio::time::sleep(self.policy.delay).await;
        }
    }

    fn give_up(&self, attempts: u32) {
        if !self.transition(ConnectionState::GaveUp) {
            return;
        }
        warn!(
            "Giving up on notification connection {} after {} attempts, falling back to polling",
            self.id, attempts
        );
        self.emit(ConnectionEvent::ReconnectExhausted {
            connection_id: self.id.clone(),
            attempts,
        });
    }

    /// 句柄关闭后状态不再变化，返回 false 表示任务应当退出
    fn transition(&self, next: ConnectionState) -> bool {
        let mut closed = false;
        self.state_tx.send_if_modified(|state| {
            if *state == ConnectionState::Closed {
                closed = true;
                return false;
            }
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
        !closed
    }

    fn emit(&self, event: ConnectionEvent) {
        let _ = self.events_tx.send(event);
    }
}
