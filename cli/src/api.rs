use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use mealbook_core::models::{NewRecipe, Recipe};

/// Outcomes of a backend call that commands report specially.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("backend error ({status}): {message}")]
    Server { status: StatusCode, message: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

/// HTTP client for the mealbook recipe API.
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("mealbook/{}", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn recipe_url(&self, meal_id: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.url("/recipes"))
            .with_context(|| format!("Invalid backend URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Invalid backend URL: {}", self.base_url))?
            .push(meal_id);
        Ok(url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .json::<ErrorBody>()
            .await
            .map_or_else(|_| status.to_string(), |b| b.error);
        let err = match status {
            StatusCode::BAD_REQUEST => ClientError::Conflict(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            _ => ClientError::Server { status, message },
        };
        Err(err.into())
    }

    pub async fn list(&self) -> Result<Vec<Recipe>> {
        let resp = self
            .client
            .get(self.url("/recipes"))
            .send()
            .await
            .context("Failed to reach mealbook backend")?;
        Self::check(resp)
            .await?
            .json()
            .await
            .context("Failed to parse saved recipes")
    }

    pub async fn create(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let resp = self
            .client
            .post(self.url("/recipes"))
            .json(recipe)
            .send()
            .await
            .context("Failed to reach mealbook backend")?;
        Self::check(resp)
            .await?
            .json()
            .await
            .context("Failed to parse saved recipe")
    }

    pub async fn update_notes(&self, meal_id: &str, notes: &str) -> Result<Recipe> {
        let resp = self
            .client
            .put(self.recipe_url(meal_id)?)
            .json(&serde_json::json!({ "notes": notes }))
            .send()
            .await
            .context("Failed to reach mealbook backend")?;
        Self::check(resp)
            .await?
            .json()
            .await
            .context("Failed to parse updated recipe")
    }

    /// Returns the backend's confirmation message.
    pub async fn delete(&self, meal_id: &str) -> Result<String> {
        let resp = self
            .client
            .delete(self.recipe_url(meal_id)?)
            .send()
            .await
            .context("Failed to reach mealbook backend")?;
        let body: MessageBody = Self::check(resp)
            .await?
            .json()
            .await
            .context("Failed to parse delete confirmation")?;
        Ok(body.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{AppState, build_router};

    async fn spawn_backend() -> BackendClient {
        let state = AppState::in_memory("http://127.0.0.1:9").unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        BackendClient::new(&format!("http://{addr}")).unwrap()
    }

    fn teriyaki() -> NewRecipe {
        NewRecipe {
            meal_id: "52772".to_string(),
            name: "Teriyaki Chicken".to_string(),
            category: "Chicken".to_string(),
            area: "Japanese".to_string(),
            ..NewRecipe::default()
        }
    }

    #[tokio::test]
    async fn test_client_lifecycle() {
        let backend = spawn_backend().await;

        let created = backend.create(&teriyaki()).await.unwrap();
        assert_eq!(created.meal_id, "52772");

        let updated = backend
            .update_notes("52772", "great with rice")
            .await
            .unwrap();
        assert_eq!(updated.notes, "great with rice");

        let listed = backend.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].notes, "great with rice");

        assert_eq!(backend.delete("52772").await.unwrap(), "Recipe deleted");
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_client_maps_conflict_and_not_found() {
        let backend = spawn_backend().await;
        backend.create(&teriyaki()).await.unwrap();

        let err = backend.create(&teriyaki()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::Conflict(msg)) if msg == "Meal already saved"
        ));

        let err = backend.delete("404").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::NotFound(_))
        ));

        let err = backend.update_notes("404", "x").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_recipe_url_escapes_meal_id() {
        let backend = BackendClient::new("http://localhost:5000/").unwrap();
        let url = backend.recipe_url("a/b c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/recipes/a%2Fb%20c");
    }
}
