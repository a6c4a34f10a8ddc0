//! HTTP client for the rider-payment API.
//!
//! One method per endpoint. Every request carries the bearer token when the
//! client has one; any status outside 2xx becomes an [`ApiError`].

mod error;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

pub use error::{
    classify_import, error_for_status, extract_detail, message_from_body, ApiError, ImportOutcome,
    GENERIC_FAILURE,
};

use crate::model::{
    DashboardStats, LogPage, LoginResponse, Me, PaymentRecord, Profile, RefreshResponse,
    ResetTokenResponse, Role, UserRecord,
};

/// Row order for `/admin/riders`, by serial number. The `/my/payments`
/// route has no ordering parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RiderOrder {
    #[default]
    Asc,
    Desc,
}

impl RiderOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Query for `/admin/logs`. Dates go out as `YYYY-MM-DD`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogQuery {
    pub limit: u32,
    pub skip: u32,
    pub username: Option<String>,
    pub action: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            skip: 0,
            username: None,
            action: None,
            start_date: None,
            end_date: None,
        }
    }
}

impl LogQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("skip", self.skip.to_string()),
        ];
        if let Some(username) = self.username.as_deref().filter(|u| !u.trim().is_empty()) {
            pairs.push(("username", username.trim().to_string()));
        }
        if let Some(action) = self.action.as_deref().filter(|a| !a.trim().is_empty()) {
            pairs.push(("action", action.trim().to_string()));
        }
        if let Some(start) = self.start_date {
            pairs.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        pairs
    }

    pub fn next_page(&self) -> Self {
        Self {
            skip: self.skip.saturating_add(self.limit),
            ..self.clone()
        }
    }

    pub fn previous_page(&self) -> Self {
        Self {
            skip: self.skip.saturating_sub(self.limit),
            ..self.clone()
        }
    }
}

/// The operations the dashboard needs from the API.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), ApiError>;
    async fn me(&self) -> Result<Me, ApiError>;
    async fn profile(&self) -> Result<Profile, ApiError>;
    async fn update_password(&self, old_password: &str, new_password: &str)
        -> Result<String, ApiError>;
    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError>;
    async fn payments(&self, role: Role, order: RiderOrder)
        -> Result<Vec<PaymentRecord>, ApiError>;
    async fn import_data(&self) -> Result<ImportOutcome, ApiError>;
    async fn register_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<String, ApiError>;
    async fn update_user(&self, username: &str, role: Role) -> Result<String, ApiError>;
    async fn delete_user(&self, username: &str) -> Result<String, ApiError>;
    async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError>;
    async fn list_logs(&self, query: &LogQuery) -> Result<LogPage, ApiError>;
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url.trim()).map_err(|_| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url.to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("riderpay/", env!("CARGO_PKG_VERSION"))),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::HttpClientBuild { source: e })?;

        Ok(Self {
            http,
            base,
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, url: &Url, builder: RequestBuilder) -> Result<(u16, String), ApiError> {
        tracing::debug!(url = %url, "sending request");
        let response = builder.send().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        tracing::debug!(url = %url, status, bytes = body.len(), "response received");
        Ok((status, body))
    }

    async fn send_checked(&self, url: &Url, builder: RequestBuilder) -> Result<String, ApiError> {
        let (status, body) = self.send(url, builder).await?;
        if !(200..300).contains(&status) {
            let err = error_for_status(status, &body);
            tracing::warn!(url = %url, status, error = %err, "request rejected");
            return Err(err);
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments);
        let body = self
            .send_checked(&url, self.request(Method::GET, url.clone()))
            .await?;
        decode(&url, &body)
    }

    async fn send_for_message(
        &self,
        url: &Url,
        builder: RequestBuilder,
    ) -> Result<String, ApiError> {
        let body = self.send_checked(url, builder).await?;
        Ok(message_from_body(&body))
    }

    /// `POST /login` with the OAuth2 password form.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint(&["login"]);
        let builder = self
            .request(Method::POST, url.clone())
            .form(&[("username", username), ("password", password)]);
        let body = self.send_checked(&url, builder).await?;
        decode(&url, &body)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let url = self.endpoint(&["refresh"]);
        let builder = self
            .request(Method::POST, url.clone())
            .json(&json!({ "refresh_token": refresh_token }));
        let body = self.send_checked(&url, builder).await?;
        decode(&url, &body)
    }

    /// `POST /generate-reset-token`; needs no session.
    pub async fn generate_reset_token(&self, username: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["generate-reset-token"]);
        let builder = self
            .request(Method::POST, url.clone())
            .json(&json!({ "username": username }));
        let body = self.send_checked(&url, builder).await?;
        decode::<ResetTokenResponse>(&url, &body).map(|r| r.reset_token)
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["reset-password"]);
        let builder = self.request(Method::POST, url.clone()).json(&json!({
            "token": token,
            "new_password": new_password,
        }));
        self.send_for_message(&url, builder).await
    }
}

fn decode<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        source: e,
    })
}

#[async_trait]
impl Gateway for ApiClient {
    async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["logout"]);
        let builder = self.request(Method::POST, url.clone()).json(&json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
        }));
        self.send_checked(&url, builder).await.map(|_| ())
    }

    async fn me(&self) -> Result<Me, ApiError> {
        self.get_json(&["me"]).await
    }

    async fn profile(&self) -> Result<Profile, ApiError> {
        self.get_json(&["profile"]).await
    }

    async fn update_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(&["profile", "update-password"]);
        let builder = self.request(Method::PUT, url.clone()).json(&json!({
            "old_password": old_password,
            "new_password": new_password,
        }));
        self.send_for_message(&url, builder).await
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get_json(&["dashboard", "stats"]).await
    }

    async fn payments(
        &self,
        role: Role,
        order: RiderOrder,
    ) -> Result<Vec<PaymentRecord>, ApiError> {
        match role {
            Role::Admin => {
                let url = self.endpoint(&["admin", "riders"]);
                let builder = self
                    .request(Method::GET, url.clone())
                    .query(&[("order", order.as_str())]);
                let body = self.send_checked(&url, builder).await?;
                decode(&url, &body)
            }
            Role::User => self.get_json(&["my", "payments"]).await,
        }
    }

    async fn import_data(&self) -> Result<ImportOutcome, ApiError> {
        let url = self.endpoint(&["import-data"]);
        let (status, body) = self
            .send(&url, self.request(Method::POST, url.clone()))
            .await?;
        let outcome = classify_import(status, &body);
        if let Err(e) = outcome.as_ref() {
            tracing::warn!(status, error = %e, "import failed");
        }
        outcome
    }

    async fn register_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(&["register"]);
        let builder = self.request(Method::POST, url.clone()).query(&[
            ("username", username),
            ("password", password),
            ("role", role.as_str()),
        ]);
        self.send_for_message(&url, builder).await
    }

    async fn update_user(&self, username: &str, role: Role) -> Result<String, ApiError> {
        let url = self.endpoint(&["admin", "update-user"]);
        let builder = self.request(Method::PUT, url.clone()).json(&json!({
            "username": username,
            "role": role.as_str(),
        }));
        self.send_for_message(&url, builder).await
    }

    async fn delete_user(&self, username: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["admin", "delete-user", username]);
        let builder = self.request(Method::DELETE, url.clone());
        self.send_for_message(&url, builder).await
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        self.get_json(&["admin", "users"]).await
    }

    async fn list_logs(&self, query: &LogQuery) -> Result<LogPage, ApiError> {
        let url = self.endpoint(&["admin", "logs"]);
        let builder = self
            .request(Method::GET, url.clone())
            .query(&query.to_pairs());
        let body = self.send_checked(&url, builder).await?;
        decode(&url, &body)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn endpoint_joins_and_encodes_segments() {
        let client = ApiClient::new("http://api.test/v1/").unwrap();
        assert_eq!(
            client.endpoint(&["admin", "delete-user", "ali khan"]).as_str(),
            "http://api.test/v1/admin/delete-user/ali%20khan"
        );
        let client = ApiClient::new("http://api.test").unwrap();
        assert_eq!(
            client.endpoint(&["dashboard", "stats"]).as_str(),
            "http://api.test/dashboard/stats"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(matches!(
            ApiClient::new("mailto:ops@example.com"),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn log_query_skips_blank_filters() {
        let query = LogQuery {
            username: Some("  ".to_string()),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 2),
            ..Default::default()
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("limit", "10".to_string()),
                ("skip", "0".to_string()),
                ("start_date", "2024-01-02".to_string()),
            ]
        );
        assert_eq!(query.next_page().skip, 10);
        assert_eq!(query.previous_page().skip, 0);
    }

    /// Serves one canned HTTP response and hands back the raw request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}/"), handle)
    }

    #[tokio::test]
    async fn payments_send_bearer_and_pick_route_by_role() {
        let (base, server) =
            serve_once("200 OK", r#"[{"careem_captain_id":"C1","net_salary":100}]"#).await;
        let client = ApiClient::new(&base)
            .unwrap()
            .with_token(Some("secret".to_string()));
        let rows = client.payments(Role::Admin, RiderOrder::Desc).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].careem_captain_id, serde_json::json!("C1"));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /admin/riders?order=desc "));
        assert!(request.to_lowercase().contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn server_detail_is_surfaced_on_failure() {
        let (base, server) =
            serve_once("400 Bad Request", r#"{"detail":"Username already exists"}"#).await;
        let client = ApiClient::new(&base).unwrap();
        let err = client
            .register_user("ali", "pw", Role::User)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Username already exists");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /register?username=ali&password=pw&role=user "));
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[test]
    fn rider_order_parses_both_spellings() {
        assert_eq!(RiderOrder::parse(" DESC "), Some(RiderOrder::Desc));
        assert_eq!(RiderOrder::parse("ascending"), Some(RiderOrder::Asc));
        assert_eq!(RiderOrder::parse("newest"), None);
        assert_eq!(RiderOrder::default().as_str(), "asc");
    }

    #[tokio::test]
    async fn reset_token_is_read_from_the_body() {
        let (base, server) = serve_once("200 OK", r#"{"reset_token":"rst-1"}"#).await;
        let client = ApiClient::new(&base).unwrap();
        assert_eq!(client.generate_reset_token("sam").await.unwrap(), "rst-1");
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /generate-reset-token "));
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn expired_reset_token_is_unauthorized() {
        let (base, server) = serve_once(
            "401 Unauthorized",
            r#"{"detail":"Invalid or expired reset token"}"#,
        )
        .await;
        let client = ApiClient::new(&base).unwrap();
        let err = client.reset_password("old", "pw").await.unwrap_err();
        assert!(err.is_unauthorized());
        server.await.unwrap();
    }
}
