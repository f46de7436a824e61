use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use super::ClientError;
use crate::{
    auth::dto::PublicUser,
    tasks::{dto::TaskFields, model::Task},
};

/// Successful login: the bearer token plus the caller's profile.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResult {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: PublicUser,
}

#[derive(Deserialize)]
struct TaskEnvelope {
    task: Task,
}

#[derive(Deserialize)]
struct TaskListEnvelope {
    tasks: Vec<Task>,
}

/// Thin wrapper over the REST API. Holds the bearer token of the current session, if any.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Sends the request and unwraps the `{ success, message, ... }` envelope.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let res = req.send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        debug!(%status, "api response");

        let ok = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        if !status.is_success() || !ok {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| fallback_message(status));
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_value(body)?)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, ClientError> {
        let req = self
            .request(Method::POST, "/api/user/register")
            .json(&json!({ "name": name, "email": email, "password": password }));
        Ok(self.send::<UserEnvelope>(req).await?.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, ClientError> {
        let req = self
            .request(Method::POST, "/api/user/login")
            .json(&json!({ "email": email, "password": password }));
        self.send(req).await
    }

    pub async fn me(&self) -> Result<PublicUser, ClientError> {
        self.require_token()?;
        let req = self.request(Method::GET, "/api/user/me");
        Ok(self.send::<UserEnvelope>(req).await?.user)
    }

    pub async fn update_profile(
        &self,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<PublicUser, ClientError> {
        self.require_token()?;
        let req = self
            .request(Method::PUT, "/api/user/profile")
            .json(&json!({ "name": name, "email": email }));
        Ok(self.send::<UserEnvelope>(req).await?.user)
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), ClientError> {
        self.require_token()?;
        let req = self
            .request(Method::PUT, "/api/user/password")
            .json(&json!({ "currentPassword": current, "newPassword": new }));
        self.send::<Value>(req).await.map(|_| ())
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        self.require_token()?;
        let req = self.request(Method::GET, "/api/tasks");
        Ok(self.send::<TaskListEnvelope>(req).await?.tasks)
    }

    pub async fn create_task(&self, fields: &TaskFields) -> Result<Task, ClientError> {
        self.require_token()?;
        let req = self.request(Method::POST, "/api/tasks").json(fields);
        Ok(self.send::<TaskEnvelope>(req).await?.task)
    }

    pub async fn update_task(&self, id: Uuid, fields: &TaskFields) -> Result<Task, ClientError> {
        self.require_token()?;
        let req = self
            .request(Method::PUT, &format!("/api/tasks/{id}"))
            .json(fields);
        Ok(self.send::<TaskEnvelope>(req).await?.task)
    }

    pub async fn toggle_task(&self, id: Uuid) -> Result<Task, ClientError> {
        self.require_token()?;
        let req = self.request(Method::PATCH, &format!("/api/tasks/{id}/toggle"));
        Ok(self.send::<TaskEnvelope>(req).await?.task)
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<(), ClientError> {
        self.require_token()?;
        let req = self.request(Method::DELETE, &format!("/api/tasks/{id}"));
        self.send::<Value>(req).await.map(|_| ())
    }

    fn require_token(&self) -> Result<(), ClientError> {
        match self.token {
            Some(_) => Ok(()),
            None => Err(ClientError::NotLoggedIn),
        }
    }
}

fn fallback_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
