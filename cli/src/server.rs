use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::{error, info, warn};

use crate::mealdb::MealDbClient;
use mealbook_core::mealdb::MealsResponse;
use mealbook_core::models::{NewRecipe, Recipe, StoreError};
use mealbook_core::service::RecipeService;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MiB

#[derive(Clone)]
pub(crate) struct AppState {
    recipes: Arc<Mutex<RecipeService>>,
    meals: Arc<MealDbClient>,
}

impl AppState {
    pub(crate) fn new(recipes: RecipeService, meals: MealDbClient) -> Self {
        Self {
            recipes: Arc::new(Mutex::new(recipes)),
            meals: Arc::new(meals),
        }
    }

    #[cfg(test)]
    pub(crate) fn in_memory(mealdb_url: &str) -> anyhow::Result<Self> {
        Ok(Self::new(
            RecipeService::new_in_memory()?,
            MealDbClient::new(mealdb_url)?,
        ))
    }

    fn recipes(&self) -> MutexGuard<'_, RecipeService> {
        self.recipes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct UpdateNotesRequest {
    notes: Option<String>,
}

#[derive(Deserialize)]
struct MealSearchQuery {
    #[serde(default)]
    search: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

// --- Error handling ---

#[derive(Debug)]
enum ApiError {
    /// Duplicate `mealId`. Reported as 400 like any other rejected payload.
    Conflict,
    NotFound(String),
    BadRequest(String),
    /// The cause is logged; clients only see the short message.
    Internal(&'static str, anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Conflict => (StatusCode::BAD_REQUEST, "Meal already saved".to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg, err) => {
                error!("{msg}: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl ApiError {
    /// Map a store outcome to the response for the operation that hit it.
    fn from_store(err: StoreError, failure: &'static str) -> Self {
        match err {
            StoreError::Conflict(_) => Self::Conflict,
            StoreError::NotFound(_) => Self::NotFound("Recipe not found".to_string()),
            StoreError::Invalid(msg) => Self::BadRequest(msg),
            other @ (StoreError::Database(_) | StoreError::Serialization(_)) => {
                Self::Internal(failure, other.into())
            }
        }
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn health() -> &'static str {
    "mealbook recipe API is running..."
}

async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = state
        .recipes()
        .list()
        .map_err(|e| ApiError::from_store(e, "Failed to fetch saved recipes"))?;
    Ok(Json(recipes))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<NewRecipe>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = state.recipes().create(&req).map_err(|e| {
        if let StoreError::Conflict(ref id) = e {
            warn!(meal_id = %id, "rejected duplicate save");
        }
        ApiError::from_store(e, "Failed to save recipe")
    })?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(meal_id): Path<String>,
    Json(req): Json<UpdateNotesRequest>,
) -> Result<Json<Recipe>, ApiError> {
    let svc = state.recipes();
    let recipe = match req.notes {
        Some(notes) => svc.update_notes(&meal_id, &notes),
        // Nothing to change; still report a missing record.
        None => svc
            .get(&meal_id)
            .and_then(|r| r.ok_or_else(|| StoreError::NotFound(meal_id.clone()))),
    }
    .map_err(|e| ApiError::from_store(e, "Failed to update recipe"))?;
    Ok(Json(recipe))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(meal_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .recipes()
        .delete(&meal_id)
        .map_err(|e| ApiError::from_store(e, "Failed to delete recipe"))?;
    Ok(Json(MessageResponse {
        message: "Recipe deleted".to_string(),
    }))
}

async fn search_meals(
    State(state): State<AppState>,
    Query(params): Query<MealSearchQuery>,
) -> Result<Json<MealsResponse>, ApiError> {
    let resp = state
        .meals
        .search_raw(&params.search)
        .await
        .map_err(|e| ApiError::Internal("Failed to fetch meals", e))?;
    Ok(Json(resp))
}

// --- Router builder ---

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/{meal_id}",
            axum::routing::put(update_recipe).delete(delete_recipe),
        )
        .route("/meals", get(search_meals))
}

/// Routes are served at the root and again under `/api`.
pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .merge(api_routes())
        .nest("/api", api_routes())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    recipes: RecipeService,
    meals: MealDbClient,
    port: u16,
    bind: &str,
) -> anyhow::Result<()> {
    match recipes.count() {
        Ok(count) => info!(count, "recipe store ready"),
        Err(e) => warn!("Could not count saved recipes: {e}"),
    }
    let app = build_router(AppState::new(recipes, meals));

    let address = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on http://{address}");

    if bind != "127.0.0.1" && bind != "localhost" {
        warn!("Listening on {bind} with no authentication. Any device on your network can access this API.");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    // Nothing listens on the discard port, so upstream calls fail fast.
    const DEAD_UPSTREAM: &str = "http://127.0.0.1:9";

    fn test_app() -> Router {
        build_router(AppState::in_memory(DEAD_UPSTREAM).unwrap())
    }

    async fn send(app: &Router, request: axum::http::Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn teriyaki() -> serde_json::Value {
        serde_json::json!({
            "mealId": "52772",
            "name": "Teriyaki Chicken",
            "thumbnail": "https://www.themealdb.com/images/media/meals/wvpsxx1468256321.jpg",
            "category": "Chicken",
            "area": "Japanese",
            "tags": "Meat,Casserole",
            "instructions": "Preheat oven to 350 F.",
            "ingredients": ["3/4 cup soy sauce", "1/2 cup water"],
            "notes": ""
        })
    }

    async fn list(app: &Router) -> Vec<serde_json::Value> {
        let (status, body) = send(app, empty_request("GET", "/recipes")).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_check() {
        let app = test_app();
        let (status, body) = send(&app, empty_request("GET", "/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("running"));
    }

    #[tokio::test]
    async fn list_starts_empty() {
        let app = test_app();
        assert!(list(&app).await.is_empty());
    }

    #[tokio::test]
    async fn teriyaki_scenario() {
        let app = test_app();

        let (status, body) = send(&app, json_request("POST", "/recipes", &teriyaki())).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(created["mealId"], "52772");
        assert_eq!(created["notes"], "");
        assert!(created["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(created["createdAt"].is_string());

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/recipes/52772",
                &serde_json::json!({ "notes": "great with rice" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let updated: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(updated["notes"], "great with rice");
        for field in ["id", "mealId", "name", "thumbnail", "category", "area", "tags", "instructions", "ingredients", "createdAt"] {
            assert_eq!(updated[field], created[field], "{field} changed");
        }

        let (status, body) = send(&app, empty_request("DELETE", "/recipes/52772")).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Recipe deleted");

        assert!(
            list(&app)
                .await
                .iter()
                .all(|r| r["mealId"] != "52772")
        );
    }

    #[tokio::test]
    async fn create_then_list_has_one_match() {
        let app = test_app();
        send(&app, json_request("POST", "/recipes", &teriyaki())).await;

        let recipes = list(&app).await;
        assert_eq!(recipes.iter().filter(|r| r["mealId"] == "52772").count(), 1);
        assert_eq!(recipes[0]["ingredients"][1], "1/2 cup water");
    }

    #[tokio::test]
    async fn duplicate_create_returns_400() {
        let app = test_app();
        let (status, _) = send(&app, json_request("POST", "/recipes", &teriyaki())).await;
        assert_eq!(status, StatusCode::CREATED);

        let mut second = teriyaki();
        second["notes"] = serde_json::json!("overwrite?");
        let (status, body) = send(&app, json_request("POST", "/recipes", &second)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Meal already saved");

        let recipes = list(&app).await;
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0]["notes"], "");
    }

    #[tokio::test]
    async fn create_without_meal_id_returns_400() {
        let app = test_app();
        let (status, _) = send(
            &app,
            json_request("POST", "/recipes", &serde_json::json!({ "name": "Nameless" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(list(&app).await.is_empty());
    }

    #[tokio::test]
    async fn create_accepts_nulls_from_upstream() {
        let app = test_app();
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/recipes",
                &serde_json::json!({ "mealId": "1", "tags": null, "thumbnail": null }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["tags"].is_null());
        assert_eq!(json["thumbnail"], "");
    }

    #[tokio::test]
    async fn update_missing_returns_404() {
        let app = test_app();
        send(&app, json_request("POST", "/recipes", &teriyaki())).await;

        let (status, body) = send(
            &app,
            json_request("PUT", "/recipes/99999", &serde_json::json!({ "notes": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Recipe not found");

        let recipes = list(&app).await;
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0]["notes"], "");
    }

    #[tokio::test]
    async fn update_without_notes_is_noop() {
        let app = test_app();
        send(&app, json_request("POST", "/recipes", &teriyaki())).await;

        let (status, body) =
            send(&app, json_request("PUT", "/recipes/52772", &serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["notes"], "");

        let (status, _) =
            send(&app, json_request("PUT", "/recipes/nope", &serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_missing_returns_404() {
        let app = test_app();
        send(&app, json_request("POST", "/recipes", &teriyaki())).await;

        let (status, _) = send(&app, empty_request("DELETE", "/recipes/00000")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(list(&app).await.len(), 1);
    }

    #[tokio::test]
    async fn api_prefix_serves_same_routes() {
        let app = test_app();
        let (status, _) = send(&app, json_request("POST", "/api/recipes", &teriyaki())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, empty_request("GET", "/api/recipes")).await;
        assert_eq!(status, StatusCode::OK);
        let recipes: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(list(&app).await.len(), 1);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let app = test_app();
        let request = axum::http::Request::post("/recipes")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert!(status.is_client_error());
        assert!(list(&app).await.is_empty());
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app();
        let response = app.oneshot(empty_request("GET", "/recipes")).await.unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app();
        let big_body = vec![b' '; BODY_LIMIT + 1];
        let request = axum::http::Request::post("/recipes")
            .header("content-type", "application/json")
            .body(Body::from(big_body))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(
            "Failed to save recipe",
            anyhow::anyhow!("disk I/O error at /home/user/.local/share/mealbook/mealbook.db"),
        );
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Failed to save recipe");
    }

    #[tokio::test]
    async fn meal_proxy_upstream_failure_returns_500() {
        let app = test_app();
        let (status, body) = send(&app, empty_request("GET", "/meals?search=chicken")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Failed to fetch meals");
    }

    #[tokio::test]
    async fn meal_proxy_passes_through_results() {
        let upstream = crate::mealdb::tests::spawn_stub().await;
        let app = build_router(AppState::in_memory(&upstream).unwrap());

        let (status, body) = send(&app, empty_request("GET", "/api/meals?search=teriyaki")).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["meals"][0]["idMeal"], "52772");
        assert_eq!(json["meals"][0]["strIngredient1"], "soy sauce");

        let (status, body) = send(&app, empty_request("GET", "/meals?search=zzz")).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["meals"].is_null());
    }
}
