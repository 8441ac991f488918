use crate::{
    config::Config,
    error::{AppError, Result},
    models::notification::{Notification, NotificationId, NotificationListResponse, UnreadCountResponse},
    services::session::SessionStore,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use std::sync::Arc;
use tracing::{debug, error, warn};

#[cfg(test)]
use mockall::automock;

/// 通知REST协作服务
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn unread_count(&self) -> Result<u64>;
    async fn recent(&self, limit: usize) -> Result<Vec<Notification>>;
    /// 旧接口，不带分页参数直接返回数组
    async fn list_all(&self) -> Result<Vec<Notification>>;
    async fn mark_read(&self, id: &NotificationId) -> Result<()>;
    async fn mark_all_read(&self) -> Result<()>;
}

/// 基于reqwest的通知API客户端
#[derive(Clone)]
pub struct RestNotificationApi {
    http_client: Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl RestNotificationApi {
    pub fn new(config: &Config, session: Arc<dyn SessionStore>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http_client.request(method, &url);

        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(|e| {
            error!("Notification API request failed: {}", e);
            AppError::Request(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Notification API returned error status: {}", status);
            return Err(AppError::from_status(status.as_u16(), &body));
        }

        Ok(response)
    }
}

#[async_trait]
impl NotificationApi for RestNotificationApi {
    async fn unread_count(&self) -> Result<u64> {
        let response = self
            .send(self.request(Method::GET, "/notifications/unread-count"))
            .await?;
        let body: UnreadCountResponse = response.json().await?;

        debug!("Fetched unread count: {}", body.count);
        Ok(body.count)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Notification>> {
        let response = self
            .send(
                self.request(Method::GET, "/notifications")
                    .query(&[("limit", limit)]),
            )
            .await?;
        let body: NotificationListResponse = response.json().await?;
        let items = body.into_items();

        debug!("Fetched {} recent notifications", items.len());
        Ok(items)
    }

    async fn list_all(&self) -> Result<Vec<Notification>> {
        let response = self.send(self.request(Method::GET, "/notifications")).await?;
        let body: NotificationListResponse = response.json().await?;
        Ok(body.into_items())
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<()> {
        let path = format!("/notifications/{}/read", urlencode_segment(&id.to_string()));
        self.send(self.request(Method::PATCH, &path)).await?;

        debug!("Marked notification {} as read", id);
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<()> {
        self.send(self.request(Method::PATCH, "/notifications/read-all"))
            .await?;

        debug!("Marked all notifications as read");
        Ok(())
    }
}

fn urlencode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}
