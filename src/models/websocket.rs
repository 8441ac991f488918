use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::notification::PushPayload;

/// 新通知推送事件名
pub const NEW_NOTIFICATION_EVENT: &str = "new-notification";

/// 推送通道上的一帧消息
/// 格式: `{ "event": "<name>", "data": { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PushFrame {
    pub fn new(event: &str, data: serde_json::Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }

    /// 创建新通知事件帧
    pub fn notification(payload: &PushPayload) -> Self {
        Self {
            event: NEW_NOTIFICATION_EVENT.to_string(),
            data: serde_json::to_value(payload).unwrap_or_default(),
        }
    }

    pub fn is_notification(&self) -> bool {
        self.event == NEW_NOTIFICATION_EVENT
    }

    /// 解析通知负载，缺失或为null的数据视为空负载
    pub fn payload(&self) -> serde_json::Result<PushPayload> {
        if self.data.is_null() {
            return Ok(PushPayload::default());
        }
        serde_json::from_value(self.data.clone())
    }
}

/// 连接生命周期信号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionEvent {
    Connected {
        connection_id: String,
        at: DateTime<Utc>,
    },
    Disconnected {
        connection_id: String,
        reason: String,
    },
    ConnectError {
        connection_id: String,
        message: String,
    },
    /// 重连次数耗尽，推送降级为仅REST
    ReconnectExhausted {
        connection_id: String,
        attempts: u32,
    },
}

/// 连接句柄状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// 不再自动重连，等待显式触发
    GaveUp,
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// 句柄是否已失效 (放弃或已关闭)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::GaveUp | ConnectionState::Closed)
    }
}
