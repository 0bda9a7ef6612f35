use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use super::{StoreError, UserStore};
use crate::config::StoreConfig;
use crate::model::{CreatedUser, NewUser, User, MAX_USER_ID};

const PAGE_SIZE: usize = 100;
const VERSION_HEADER: &str = "Notion-Version";

#[derive(Debug, Error)]
pub enum NotionError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Request failed (error {0})")]
    RequestFailed(u16),
    #[error("No page id in response")]
    MissingId,
}

/// Users kept as pages of a Notion database with the properties `UserID`
/// (number), `Name` (title) and `Email` (email).
#[derive(Debug, Clone)]
pub struct NotionStore {
    client: Client,
    config: StoreConfig,
}

impl NotionStore {
    pub fn new(config: StoreConfig) -> Result<Self, NotionError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, NotionError> {
        let res = req
            .bearer_auth(&self.config.credential)
            .header(VERSION_HEADER, &self.config.api_version)
            .send()
            .await?;

        let status = res.status();
        let body = res.bytes().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn query_all(&self) -> Result<Vec<User>, NotionError> {
        let url = format!(
            "{}/databases/{}/query",
            self.config.api_url, self.config.collection_id
        );

        let mut users = Vec::new();
        let mut cursor = None;
        loop {
            let body = query_body(cursor.as_deref());
            let value = self.send(self.client.post(&url).json(&body)).await?;
            let page = serde_json::from_value::<QueryResponse>(value)?;

            users.extend(page.results.into_iter().map(User::from));
            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        debug!("Fetched {} users", users.len());
        Ok(users)
    }

    async fn create_page(&self, user: &NewUser) -> Result<CreatedUser, NotionError> {
        let url = format!("{}/pages", self.config.api_url);
        let body = create_body(&self.config.collection_id, user);
        let raw = self.send(self.client.post(&url).json(&body)).await?;

        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .ok_or(NotionError::MissingId)?
            .to_string();

        Ok(CreatedUser {
            id,
            user_id: user.user_id,
            raw,
        })
    }

    async fn update_user_id(&self, id: &str, user_id: u64) -> Result<(), NotionError> {
        let url = format!("{}/pages/{}", self.config.api_url, id);
        let body = json!({ "properties": { "UserID": { "number": user_id } } });
        self.send(self.client.patch(&url).json(&body)).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for NotionStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.query_all().await.map_err(|e| {
            error!("Failed to query database {}: {}", self.config.collection_id, e);
            StoreError::Query(e.to_string())
        })
    }

    async fn insert_user(&self, user: &NewUser) -> Result<CreatedUser, StoreError> {
        self.create_page(user).await.map_err(|e| {
            error!("Failed to create page for user {}: {}", user.user_id, e);
            StoreError::Write(e.to_string())
        })
    }

    async fn renumber_user(&self, id: &str, user_id: u64) -> Result<(), StoreError> {
        self.update_user_id(id, user_id).await.map_err(|e| {
            error!("Failed to renumber page {} to {}: {}", id, user_id, e);
            StoreError::Write(e.to_string())
        })
    }
}

fn query_body(cursor: Option<&str>) -> Value {
    let mut body = json!({
        "sorts": [{ "property": "UserID", "direction": "ascending" }],
        "page_size": PAGE_SIZE,
    });
    if let Some(cursor) = cursor {
        body["start_cursor"] = Value::from(cursor);
    }
    body
}

fn create_body(database_id: &str, user: &NewUser) -> Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": {
            "Name": { "title": [{ "text": { "content": user.name } }] },
            "Email": { "email": user.email },
            "UserID": { "number": user.user_id },
        },
    })
}

fn api_error(status: u16, body: &[u8]) -> NotionError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(err) => NotionError::Api {
            status,
            code: err.code,
            message: err.message,
        },
        Err(_) => NotionError::RequestFailed(status),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    #[serde(default)]
    created_time: String,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(rename = "UserID")]
    user_id: Option<NumberProperty>,
    #[serde(rename = "Name")]
    name: Option<TitleProperty>,
    #[serde(rename = "Email")]
    email: Option<EmailProperty>,
}

#[derive(Debug, Deserialize)]
struct NumberProperty {
    number: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TitleProperty {
    #[serde(default)]
    title: Vec<RichText>,
}

#[derive(Debug, Deserialize)]
struct RichText {
    #[serde(default)]
    plain_text: String,
}

#[derive(Debug, Deserialize)]
struct EmailProperty {
    email: Option<String>,
}

impl From<Page> for User {
    fn from(page: Page) -> Self {
        let props = page.properties;
        let user_id = props
            .user_id
            .and_then(|p| p.number)
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map_or(0, |n| (n as u64).min(MAX_USER_ID));
        let name = props
            .name
            .and_then(|p| p.title.into_iter().next())
            .map(|t| t.plain_text)
            .unwrap_or_default();
        let email = props.email.and_then(|p| p.email).unwrap_or_default();

        Self {
            id: page.id,
            user_id,
            name,
            email,
            created_time: page.created_time,
        }
    }
}
