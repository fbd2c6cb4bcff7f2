use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use super::Tracker;
use crate::config::{required, JiraConfig};
use crate::error::{check_status, ApiError};
use crate::model::work_item::WorkItem;
use crate::util::adf::{extract_text_from_adf, to_adf};

const SERVICE: &str = "Jira";

pub struct JiraProvider {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl JiraProvider {
    pub fn new(base_url: String, email: &str, api_token: &str, client: reqwest::Client) -> Self {
        let creds = format!("{email}:{api_token}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Basic {encoded}"),
            client,
        }
    }

    pub fn from_config(config: &JiraConfig, client: reqwest::Client) -> Result<Self> {
        let base_url = config.base_url()?;
        let email = required(&config.email, "JIRA_EMAIL")?;
        let token = required(&config.api_token, "JIRA_TOKEN")?;
        Ok(Self::new(base_url, email, token, client))
    }

    fn issue_url(&self, key: &str) -> String {
        format!("{}/rest/api/3/issue/{}", self.base_url, urlencoding::encode(key))
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct JiraIssue {
    key: String,
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    summary: Option<String>,
    description: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Myself {
    #[serde(rename = "displayName")]
    display_name: String,
}

#[async_trait]
impl Tracker for JiraProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn fetch_items(&self, filter: &str, limit: u32) -> Result<Vec<WorkItem>, ApiError> {
        let url = format!(
            "{}/rest/api/3/search?jql={}&maxResults={limit}&fields=summary,description",
            self.base_url,
            urlencoding::encode(filter)
        );

        let resp = self
            .client
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::transport(SERVICE, e))?;

        let search: SearchResponse = check_status(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::malformed(SERVICE, e))?;

        let items = search
            .issues
            .into_iter()
            .map(|issue| {
                let description = issue
                    .fields
                    .description
                    .as_ref()
                    .and_then(extract_text_from_adf);
                WorkItem::new(issue.key, issue.fields.summary.unwrap_or_default(), description)
            })
            .collect();

        Ok(items)
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<(), ApiError> {
        let payload = serde_json::json!({ "body": to_adf(body) });
        let resp = self
            .client
            .post(format!("{}/comment", self.issue_url(key)))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ApiError::transport(SERVICE, e))?;
        check_status(SERVICE, resp).await?;
        Ok(())
    }

    async fn replace_description(&self, key: &str, body: &str) -> Result<(), ApiError> {
        let payload = serde_json::json!({ "fields": { "description": to_adf(body) } });
        let resp = self
            .client
            .put(self.issue_url(key))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ApiError::transport(SERVICE, e))?;
        check_status(SERVICE, resp).await?;
        Ok(())
    }

    async fn whoami(&self) -> Result<String, ApiError> {
        let resp = self
            .client
            .get(format!("{}/rest/api/3/myself", self.base_url))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::transport(SERVICE, e))?;
        let me: Myself = check_status(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::malformed(SERVICE, e))?;
        Ok(me.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    // base64("me@example.com:tok")
    const AUTH: &str = "Basic bWVAZXhhbXBsZS5jb206dG9r";

    fn provider(server: &Server) -> JiraProvider {
        JiraProvider::new(server.url(), "me@example.com", "tok", reqwest::Client::new())
    }

    #[tokio::test]
    async fn fetch_items_maps_issues() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/3/search")
            .match_header("authorization", AUTH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("jql".into(), r#"project = SCRUM AND status = "REFINING""#.into()),
                Matcher::UrlEncoded("maxResults".into(), "10".into()),
                Matcher::UrlEncoded("fields".into(), "summary,description".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "issues": [
                        {
                            "key": "SCRUM-1",
                            "fields": {
                                "summary": "Export invoices",
                                "description": {
                                    "type": "doc", "version": 1,
                                    "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "PDF please" }] }]
                                }
                            }
                        },
                        { "key": "SCRUM-2", "fields": { "summary": "Dark mode", "description": null } }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let items = provider(&server)
            .fetch_items(r#"project = SCRUM AND status = "REFINING""#, 10)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], WorkItem::new("SCRUM-1", "Export invoices", Some("PDF please".into())));
        assert_eq!(items[1].description, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_items_surfaces_auth_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/search")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"errorMessages":["Unauthorized"]}"#)
            .create_async()
            .await;

        let err = provider(&server).fetch_items("project = X", 5).await.unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.details().unwrap()["errorMessages"][0], "Unauthorized");
    }

    #[tokio::test]
    async fn add_comment_posts_adf_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/api/3/issue/SCRUM-7/comment")
            .match_header("authorization", AUTH)
            .match_body(Matcher::Json(json!({ "body": to_adf("Refined story") })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        provider(&server).add_comment("SCRUM-7", "Refined story").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn replace_description_puts_adf_field() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/rest/api/3/issue/SCRUM-7")
            .match_body(Matcher::Json(json!({ "fields": { "description": to_adf("New body") } })))
            .with_status(204)
            .create_async()
            .await;

        provider(&server).replace_description("SCRUM-7", "New body").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn replace_description_reports_jira_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/rest/api/3/issue/SCRUM-7")
            .with_status(400)
            .with_body(r#"{"errors":{"description":"Operation value must be an Atlassian Document"}}"#)
            .create_async()
            .await;

        let err = provider(&server).replace_description("SCRUM-7", "x").await.unwrap_err();
        assert_eq!(err.status_tag(), "ERROR_400");
        assert!(err.details().unwrap().contains_key("errors"));
    }

    #[tokio::test]
    async fn whoami_reads_display_name() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/myself")
            .with_status(200)
            .with_body(r#"{"accountId":"abc","displayName":"Dana Reviewer"}"#)
            .create_async()
            .await;

        assert_eq!(provider(&server).whoami().await.unwrap(), "Dana Reviewer");
    }
}
