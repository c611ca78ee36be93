use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;

use crate::domain::notification::NotificationPage;
use crate::repository::errors::RepositoryError;
use crate::usecase::contracts::NotificationRepository;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkReadRequest<'a> {
    user_id: &'a str,
    id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkAllReadRequest<'a> {
    user_id: &'a str,
}

/// Notification API client over plain JSON/HTTPS.
#[derive(Clone)]
pub struct HttpNotificationRepository {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpNotificationRepository {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let client = Client::builder()
            .user_agent("OneKamer-Notifications/1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::debug!(%base_url, "notification repository created");

        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RepositoryError> {
        let response = self.authorize(request).send().await.map_err(|e| {
            tracing::warn!(error = %e, "notification API request failed");
            RepositoryError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "notification API returned error");
            return Err(RepositoryError::Status(status.as_u16()));
        }

        Ok(response)
    }
}

impl NotificationRepository for HttpNotificationRepository {
    #[tracing::instrument(skip(self), fields(%user_id, %limit))]
    async fn list(
        &self,
        user_id: &str,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<NotificationPage, RepositoryError> {
        let url = format!("{}/notifications", self.base_url);
        tracing::debug!(%url, ?cursor, "listing notifications");

        let page_size = limit.to_string();
        let mut request = self
            .client
            .get(&url)
            .query(&[("userId", user_id), ("limit", page_size.as_str())]);
        if let Some(cursor) = cursor.as_deref() {
            request = request.query(&[("cursor", cursor)]);
        }

        let response = self.send(request).await?;
        let page: NotificationPage = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to parse notification page");
            RepositoryError::Decode(e.to_string())
        })?;

        tracing::debug!(
            count = page.items.len(),
            unread_count = page.unread_count,
            has_more = page.has_more,
            "notification page received"
        );
        Ok(page)
    }

    #[tracing::instrument(skip(self), fields(%user_id, notification_id = %id))]
    async fn mark_as_read(&self, user_id: &str, id: &str) -> Result<(), RepositoryError> {
        let url = format!("{}/notifications/mark-read", self.base_url);
        tracing::debug!(%url, "marking notification as read");

        let request = self.client.post(&url).json(&MarkReadRequest { user_id, id });
        self.send(request).await?;

        tracing::debug!("notification marked as read");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(%user_id))]
    async fn mark_all_as_read(&self, user_id: &str) -> Result<(), RepositoryError> {
        let url = format!("{}/notifications/mark-all-read", self.base_url);
        tracing::debug!(%url, "marking all notifications as read");

        let request = self.client.post(&url).json(&MarkAllReadRequest { user_id });
        self.send(request).await?;

        tracing::debug!("all notifications marked as read");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repository(server: &MockServer, token: Option<&str>) -> HttpNotificationRepository {
        HttpNotificationRepository::new(
            &format!("{}/", server.uri()),
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let repo = HttpNotificationRepository::new(
            "https://api.onekamer.co//",
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(repo.base_url(), "https://api.onekamer.co");
    }

    #[tokio::test]
    async fn test_list_first_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications"))
            .and(query_param("userId", "user-1"))
            .and(query_param("limit", "20"))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"id": "n1", "title": "Salut", "type": "mentions", "is_read": false, "created_at": "2024-01-01"}
                ],
                "unreadCount": 4,
                "hasMore": true,
                "nextCursor": "c2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = repository(&server, None).list("user-1", 20, None).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "n1");
        assert_eq!(page.unread_count, 4);
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_list_with_cursor_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications"))
            .and(query_param("cursor", "c2"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [],
                "unreadCount": 0,
                "hasMore": false,
                "nextCursor": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = repository(&server, Some("secret"))
            .list("user-1", 20, Some("c2".to_string()))
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_list_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = repository(&server, None).list("user-1", 20, None).await;

        assert_eq!(result.unwrap_err(), RepositoryError::Status(503));
    }

    #[tokio::test]
    async fn test_list_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = repository(&server, None).list("user-1", 20, None).await;

        assert!(matches!(result, Err(RepositoryError::Decode(_))));
    }

    #[tokio::test]
    async fn test_list_unreachable_host() {
        let repo = HttpNotificationRepository::new(
            "http://127.0.0.1:9",
            None,
            Duration::from_millis(500),
        )
        .unwrap();

        let result = repo.list("user-1", 20, None).await;

        assert!(matches!(result, Err(RepositoryError::Transport(_))));
    }

    #[tokio::test]
    async fn test_mark_as_read_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notifications/mark-read"))
            .and(body_json(json!({"userId": "user-1", "id": "n1"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = repository(&server, None).mark_as_read("user-1", "n1").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_mark_as_read_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notifications/mark-read"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = repository(&server, None).mark_as_read("user-1", "missing").await;

        assert_eq!(result.unwrap_err(), RepositoryError::Status(404));
    }

    #[tokio::test]
    async fn test_mark_all_as_read_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notifications/mark-all-read"))
            .and(body_json(json!({"userId": "user-1"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = repository(&server, None).mark_all_as_read("user-1").await;

        assert!(result.is_ok());
    }
}
