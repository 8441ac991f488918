use crate::{
    error::{AppError, Result},
    models::websocket::PushFrame,
};
use async_trait::async_trait;
use futures::{future, stream::BoxStream, StreamExt};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue},
        Message,
    },
};
use tracing::{debug, info, warn};
use url::Url;

/// 推送帧流，结束即表示连接断开
pub type PushStream = BoxStream<'static, Result<PushFrame>>;

/// 推送通道连接器
/// 握手时携带bearer令牌，成功后返回推送帧流
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self, endpoint: &Url, token: &str) -> Result<PushStream>;
}

/// WebSocket连接器
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PushConnector for WebSocketConnector {
    async fn connect(&self, endpoint: &Url, token: &str) -> Result<PushStream> {
        let mut request = endpoint.as_str().into_client_request()?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AppError::unauthorized("Session token is not a valid header value"))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let (ws_stream, response) = connect_async(request).await?;
        info!("WebSocket handshake completed with status {}", response.status());

        let frames = ws_stream
            .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
            .filter_map(|msg| future::ready(decode_message(msg)));

        Ok(frames.boxed())
    }
}

/// 解析单条WebSocket消息
/// 控制帧和无法解析的文本被跳过
fn decode_message(
    msg: std::result::Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<Result<PushFrame>> {
    match msg {
        Ok(Message::Text(text)) => match serde_json::from_str::<PushFrame>(&text) {
            Ok(frame) => Some(Ok(frame)),
            Err(e) => {
                warn!("Discarding malformed push frame: {}", e);
                None
            }
        },
        Ok(Message::Binary(data)) => {
            debug!("Ignoring binary message of {} bytes", data.len());
            None
        }
        Ok(_) => None,
        Err(e) => Some(Err(AppError::WebSocket(e))),
    }
}
