use crate::{
    config::Config,
    services::{
        api::{NotificationApi, RestNotificationApi},
        connection::ConnectionManager,
        feed::NotificationFeed,
        notification::NotificationStore,
        panel::NotificationPanel,
        session::{FileSessionStore, SessionStore},
        websocket::{PushConnector, WebSocketConnector},
    },
};
use std::sync::Arc;

/// 客户端共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 客户端配置
    pub config: Config,

    /// 会话存储
    pub session: Arc<dyn SessionStore>,

    /// 通知REST接口
    pub api: Arc<dyn NotificationApi>,

    /// 推送连接管理器
    pub connection_manager: Arc<ConnectionManager>,

    /// 通知仓库
    pub store: Arc<NotificationStore>,

    /// 通知面板
    pub panel: Arc<NotificationPanel>,

    /// 通知流运行时
    pub feed: Arc<NotificationFeed>,
}

impl AppState {
    /// 使用文件会话和WebSocket连接器组装
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let session: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&config.session_file));
        Self::with_parts(config, session, Arc::new(WebSocketConnector::new()))
    }

    /// 允许替换会话存储和推送连接器 (测试时使用)
    pub fn with_parts(
        config: Config,
        session: Arc<dyn SessionStore>,
        connector: Arc<dyn PushConnector>,
    ) -> anyhow::Result<Self> {
        let api: Arc<dyn NotificationApi> = Arc::new(RestNotificationApi::new(&config, session.clone())?);
        Self::with_api(config, session, connector, api)
    }

    pub fn with_api(
        config: Config,
        session: Arc<dyn SessionStore>,
        connector: Arc<dyn PushConnector>,
        api: Arc<dyn NotificationApi>,
    ) -> anyhow::Result<Self> {
        let connection_manager = Arc::new(ConnectionManager::from_config(&config, session.clone(), connector)?);
        let store = Arc::new(NotificationStore::new(api.clone(), config.notification_window_size));
        let panel = Arc::new(NotificationPanel::new(store.clone()));
        let feed = Arc::new(NotificationFeed::from_config(
            &config,
            connection_manager.clone(),
            store.clone(),
            session.clone(),
        ));

        Ok(Self {
            config,
            session,
            api,
            connection_manager,
            store,
            panel,
            feed,
        })
    }

    /// 检查是否为生产环境
    pub fn is_production(&self) -> bool {
        self.config.is_production()
    }

    /// 检查是否为开发环境
    pub fn is_development(&self) -> bool {
        self.config.is_development()
    }
}
