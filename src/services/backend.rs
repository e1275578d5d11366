//! Membership backend client
//!
//! Thin typed wrapper over the console's REST API. Every method returns the
//! decoded [`ApiResponse`] envelope; interpreting the success sentinel is left to
//! the calling workflow because some callers (the usage query) treat a rejected
//! slot differently from a failed request.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::BackendConfig;
use crate::models::{
    AddEnterpriseMembersParams, ApiResponse, CreateEnterpriseParams, DailyUsageAggregate,
    DateRange, Enterprise, EnterpriseListData, EnterpriseListQuery, MemberInfo, MemberType,
    MembersInfo, MembershipMutationRequest, QuotaUsageEvent, UpdateEnterpriseParams,
};
use crate::utils::error::{AppError, AppResult};

/// Longest response body echoed into an error message
const MAX_ERROR_BODY: usize = 500;

/// Membership backend API client
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct EmailsBody<'a> {
    emails: &'a [String],
}

impl BackendClient {
    /// Create a new client from configuration
    pub fn new(config: &BackendConfig) -> Result<Self> {
        info!("Initializing backend client for {}", config.url);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(ref token) = config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .context("Bearer token contains invalid header characters")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        } else {
            debug!("No bearer token configured, sending anonymous requests");
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers);

        if !config.ssl_verify {
            warn!("SSL certificate verification is DISABLED - this is insecure!");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ==================== Member Endpoints ====================

    /// Fetch the registered-user email directory
    pub async fn fetch_emails(&self) -> AppResult<ApiResponse<Vec<String>>> {
        let url = format!("{}/userMember/emails", self.base_url);
        self.get(&url).await
    }

    /// Submit a membership mutation
    pub async fn update_membership(
        &self,
        request: &MembershipMutationRequest,
    ) -> AppResult<ApiResponse<serde_json::Value>> {
        let url = format!("{}/userMember/admin", self.base_url);
        self.send_json(Method::POST, &url, request).await
    }

    /// List members of one tier
    pub async fn fetch_members(
        &self,
        member_type: MemberType,
    ) -> AppResult<ApiResponse<Vec<MemberInfo>>> {
        let url = format!(
            "{}/userMember/members?type={}",
            self.base_url,
            member_type.as_str()
        );
        self.get(&url).await
    }

    /// Look up profiles and registration status for a set of addresses
    pub async fn fetch_members_info(
        &self,
        emails: &[String],
    ) -> AppResult<ApiResponse<MembersInfo>> {
        let url = format!("{}/userMember/members-info", self.base_url);
        self.send_json(Method::POST, &url, &EmailsBody { emails })
            .await
    }

    // ==================== Usage Endpoints ====================

    /// Itemized usage events for one account
    pub async fn fetch_quota_details(
        &self,
        email: &str,
        range: &DateRange,
    ) -> AppResult<ApiResponse<Vec<QuotaUsageEvent>>> {
        let url = self.usage_url("details", email, range);
        self.get(&url).await
    }

    /// Daily usage aggregates for one account
    pub async fn fetch_daily_quota(
        &self,
        email: &str,
        range: &DateRange,
    ) -> AppResult<ApiResponse<Vec<DailyUsageAggregate>>> {
        let url = self.usage_url("daily", email, range);
        self.get(&url).await
    }

    fn usage_url(&self, kind: &str, email: &str, range: &DateRange) -> String {
        let mut params = vec![format!("email={}", urlencoding::encode(email))];
        for (key, value) in range.query_pairs() {
            params.push(format!("{}={}", key, value));
        }
        format!(
            "{}/userMember/quota/{}?{}",
            self.base_url,
            kind,
            params.join("&")
        )
    }

    // ==================== Enterprise Endpoints ====================

    pub async fn create_enterprise(
        &self,
        params: &CreateEnterpriseParams,
    ) -> AppResult<ApiResponse<serde_json::Value>> {
        let url = format!("{}/enterprise", self.base_url);
        self.send_json(Method::POST, &url, params).await
    }

    pub async fn update_enterprise(
        &self,
        id: &str,
        params: &UpdateEnterpriseParams,
    ) -> AppResult<ApiResponse<serde_json::Value>> {
        let url = self.enterprise_url(id);
        self.send_json(Method::PUT, &url, params).await
    }

    /// Get a single enterprise with its members
    ///
    /// HTTP 404 maps to [`AppError::NotFound`].
    pub async fn get_enterprise(&self, id: &str) -> AppResult<ApiResponse<Enterprise>> {
        let url = self.enterprise_url(id);
        debug!("Backend: Sending GET request to {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_failure(&url, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Enterprise {}", id)));
        }

        self.handle_response(response).await
    }

    pub async fn list_enterprises(
        &self,
        query: &EnterpriseListQuery,
    ) -> AppResult<ApiResponse<EnterpriseListData>> {
        let url = format!("{}/enterprise{}", self.base_url, query.to_query_string());
        self.get(&url).await
    }

    pub async fn add_enterprise_members(
        &self,
        id: &str,
        params: &AddEnterpriseMembersParams,
    ) -> AppResult<ApiResponse<serde_json::Value>> {
        let url = format!("{}/members", self.enterprise_url(id));
        self.send_json(Method::POST, &url, params).await
    }

    pub async fn remove_enterprise_member(
        &self,
        id: &str,
        user_id: &str,
    ) -> AppResult<ApiResponse<serde_json::Value>> {
        let url = format!(
            "{}/members/{}",
            self.enterprise_url(id),
            urlencoding::encode(user_id)
        );
        debug!("Backend: Sending DELETE request to {}", url);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| transport_failure(&url, e))?;

        self.handle_response(response).await
    }

    fn enterprise_url(&self, id: &str) -> String {
        format!("{}/enterprise/{}", self.base_url, urlencoding::encode(id))
    }

    // ==================== Helper Methods ====================

    /// Internal GET request handler
    async fn get<T: DeserializeOwned>(&self, url: &str) -> AppResult<ApiResponse<T>> {
        debug!("Backend: Sending GET request to {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_failure(url, e))?;

        self.handle_response(response).await
    }

    /// Internal JSON body request handler
    async fn send_json<B, T>(&self, method: Method, url: &str, body: &B) -> AppResult<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("Backend: Sending {} request to {}", method, url);
        let response = self
            .client
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_failure(url, e))?;

        self.handle_response(response).await
    }

    /// Require HTTP 200 and decode the envelope
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<ApiResponse<T>> {
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            let truncated = truncate(&body);
            warn!(status = %status, body = %truncated, "Backend returned non-200 status");
            return Err(AppError::Transport(format!(
                "unexpected HTTP status {}: {}",
                status, truncated
            )));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            error!(body = %truncate(&body), "Failed to parse backend response: {}", e);
            AppError::from(e)
        })?;

        if !envelope.is_success() {
            debug!(
                status_code = envelope.status_code,
                message = ?envelope.message,
                "Backend returned non-success status code"
            );
        }

        Ok(envelope)
    }
}

fn transport_failure(url: &str, err: reqwest::Error) -> AppError {
    error!(
        "Backend ERROR: HTTP request failed to {}: {} (connect: {}, timeout: {})",
        url,
        err,
        err.is_connect(),
        err.is_timeout()
    );
    AppError::from(err)
}

fn truncate(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}
