use std::future::Future;

use reqwest::{Method, Response};
use serde::de::DeserializeOwned;

use great_core::api::{
    ApiErrorBody, CreateMomentRequest, DaySummariesResponse, FeedbackRequest, LIMIT_REACHED_CODE,
    RemoteMoment, TimelineResponse, UserStats,
};
use great_core::error::ApiError;
use great_core::models::DaySummary;
use great_core::service::PraiseApi;

/// HTTP client for the praise API. Requests carry the anonymous user id and,
/// when configured, the app token.
pub struct PraiseClient {
    client: reqwest::Client,
    base_url: String,
    app_token: Option<String>,
    user_id: String,
    rt: tokio::runtime::Handle,
}

impl PraiseClient {
    pub fn new(base_url: &str, app_token: Option<&str>, user_id: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "great-cli/{} (moment journal)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_token: app_token.map(ToString::to_string),
            user_id: user_id.to_string(),
            rt: tokio::runtime::Handle::current(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let mut req = self
            .client
            .request(method, url)
            .header("X-Anon-Id", &self.user_id);
        if let Some(token) = &self.app_token {
            req = req.header("X-App-Token", token);
        }
        req
    }

    pub async fn create_moment_async(
        &self,
        request: &CreateMomentRequest,
    ) -> Result<RemoteMoment, ApiError> {
        let resp = self
            .request(Method::POST, "/v1/moments")
            .json(request)
            .send()
            .await
            .map_err(map_transport)?;
        decode(resp).await
    }

    pub async fn get_moment_async(&self, server_id: &str) -> Result<RemoteMoment, ApiError> {
        let resp = self
            .request(Method::GET, &format!("/v1/moments/{server_id}"))
            .send()
            .await
            .map_err(map_transport)?;
        decode(resp).await
    }

    pub async fn timeline_async(
        &self,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<TimelineResponse, ApiError> {
        let mut req = self
            .request(Method::GET, "/v1/moments")
            .query(&[("limit", limit.to_string())]);
        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor)]);
        }
        let resp = req.send().await.map_err(map_transport)?;
        decode(resp).await
    }

    pub async fn set_favorite_async(
        &self,
        server_id: &str,
        favorite: bool,
    ) -> Result<RemoteMoment, ApiError> {
        let resp = self
            .request(Method::PATCH, &format!("/v1/moments/{server_id}"))
            .json(&serde_json::json!({ "favorite": favorite }))
            .send()
            .await
            .map_err(map_transport)?;
        decode(resp).await
    }

    pub async fn delete_moment_async(&self, server_id: &str) -> Result<(), ApiError> {
        let resp = self
            .request(Method::DELETE, &format!("/v1/moments/{server_id}"))
            .send()
            .await
            .map_err(map_transport)?;
        expect_ok(resp).await
    }

    pub async fn day_summaries_async(&self, limit: i64) -> Result<Vec<DaySummary>, ApiError> {
        let resp = self
            .request(Method::GET, "/v1/days")
            .query(&[("limit", limit.to_string())])
            .send()
            .await
            .map_err(map_transport)?;
        let page: DaySummariesResponse = decode(resp).await?;
        Ok(page.summaries)
    }

    pub async fn user_stats_async(&self) -> Result<UserStats, ApiError> {
        let resp = self
            .request(Method::GET, "/v1/me/stats")
            .send()
            .await
            .map_err(map_transport)?;
        decode(resp).await
    }

    pub async fn send_feedback_async(&self, message: &str) -> Result<(), ApiError> {
        let resp = self
            .request(Method::POST, "/v1/feedback")
            .json(&FeedbackRequest {
                message: message.to_string(),
            })
            .send()
            .await
            .map_err(map_transport)?;
        expect_ok(resp).await
    }

    // The service layer is synchronous; bridge onto the runtime without
    // blocking a worker thread outright.
    fn blocking<T>(
        &self,
        fut: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        tokio::task::block_in_place(|| self.rt.block_on(fut))
    }
}

impl PraiseApi for PraiseClient {
    fn create_moment(&self, request: &CreateMomentRequest) -> Result<RemoteMoment, ApiError> {
        self.blocking(self.create_moment_async(request))
    }

    fn get_moment(&self, server_id: &str) -> Result<RemoteMoment, ApiError> {
        self.blocking(self.get_moment_async(server_id))
    }

    fn timeline(&self, cursor: Option<&str>, limit: i64) -> Result<TimelineResponse, ApiError> {
        self.blocking(self.timeline_async(cursor, limit))
    }

    fn set_favorite(&self, server_id: &str, favorite: bool) -> Result<RemoteMoment, ApiError> {
        self.blocking(self.set_favorite_async(server_id, favorite))
    }

    fn delete_moment(&self, server_id: &str) -> Result<(), ApiError> {
        self.blocking(self.delete_moment_async(server_id))
    }

    fn day_summaries(&self, limit: i64) -> Result<Vec<DaySummary>, ApiError> {
        self.blocking(self.day_summaries_async(limit))
    }

    fn user_stats(&self) -> Result<UserStats, ApiError> {
        self.blocking(self.user_stats_async())
    }

    fn send_feedback(&self, message: &str) -> Result<(), ApiError> {
        self.blocking(self.send_feedback_async(message))
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify_status(status.as_u16(), &body))
}

async fn expect_ok(resp: Response) -> Result<(), ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify_status(status.as_u16(), &body))
}

/// Map a non-success status (plus whatever error envelope came with it) to
/// the client-side error taxonomy. The limit code wins over the raw status:
/// the server has sent it with both 200-with-flag and 429 responses.
fn classify_status(status: u16, body: &str) -> ApiError {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        if parsed.code.as_deref() == Some(LIMIT_REACHED_CODE) {
            return ApiError::LimitReached;
        }
    }
    match status {
        401 | 403 => ApiError::Unauthorized,
        404 => ApiError::NotFound,
        429 => ApiError::LimitReached,
        500..=599 => ApiError::Server(status),
        _ => ApiError::Network(format!("unexpected HTTP {status}")),
    }
}

fn map_transport(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_connect() {
        ApiError::Offline
    } else {
        ApiError::Network(e.to_string())
    }
}
