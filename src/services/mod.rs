pub mod api;
pub mod connection;
pub mod feed;
pub mod notification;
pub mod panel;
pub mod session;
pub mod websocket;

// 重新导出常用类型
pub use api::{NotificationApi, RestNotificationApi};
pub use connection::{ConnectionHandle, ConnectionManager, ReconnectPolicy};
pub use feed::{FeedMode, NotificationFeed};
pub use notification::{FeedState, NotificationStore, StoreEvent};
pub use panel::NotificationPanel;
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use websocket::{PushConnector, PushStream, WebSocketConnector};
