//! HTTP-backed project refresh collaborators

use async_trait::async_trait;
use scribe_chat::{Error, ProjectRefresher, Result};

/// Re-reads project and story lists from the backend.
///
/// The responses are only counted; rendering them belongs to whatever UI
/// listens for `ProjectDataChanged`.
pub struct HttpProjectRefresher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProjectRefresher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn projects_url(&self) -> String {
        format!("{}/api/projects", self.base_url)
    }

    fn stories_url(&self, project_id: &str) -> String {
        format!("{}/api/projects/{}/stories", self.base_url, project_id)
    }

    async fn fetch(&self, url: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Refresh(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| Error::Refresh(e.to_string()))
    }
}

fn item_count(value: &serde_json::Value) -> usize {
    value.as_array().map(Vec::len).unwrap_or(0)
}

#[async_trait]
impl ProjectRefresher for HttpProjectRefresher {
    async fn refresh_projects(&self) -> Result<()> {
        let projects = self.fetch(&self.projects_url()).await?;
        tracing::debug!(count = item_count(&projects), "Projects refreshed");
        Ok(())
    }

    async fn refresh_stories(&self, project_id: &str) -> Result<()> {
        let stories = self.fetch(&self.stories_url(project_id)).await?;
        tracing::debug!(project_id, count = item_count(&stories), "Stories refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let refresher = HttpProjectRefresher::new("http://localhost:3000/");
        assert_eq!(refresher.projects_url(), "http://localhost:3000/api/projects");
        assert_eq!(
            refresher.stories_url("p-1"),
            "http://localhost:3000/api/projects/p-1/stories"
        );
    }

    #[test]
    fn test_item_count() {
        assert_eq!(item_count(&serde_json::json!([1, 2, 3])), 3);
        assert_eq!(item_count(&serde_json::json!({"items": []})), 0);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_refresh_error() {
        let refresher = HttpProjectRefresher::new("http://127.0.0.1:9");
        let err = refresher.refresh_projects().await.unwrap_err();
        assert!(matches!(err, Error::Refresh(_)));
    }
}
