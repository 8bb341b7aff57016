//! Stand-in backend for local runs of the gateway.
//!
//! Serves the routes the gateway forwards to (after the `/api` prefix is
//! stripped) and mints tokens with the same secret the gateway verifies.
//!
//! ```text
//! GATEWAY_JWT_SECRET=dev-secret cargo run --example mock_backend
//! GATEWAY_JWT_SECRET=dev-secret cargo run -- --config config/gateway.toml
//! ```

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
struct Backend {
    secret: Arc<String>,
    tasks: Arc<Mutex<Vec<serde_json::Value>>>,
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct NewTask {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

async fn login(State(backend): State<Backend>, Json(creds): Json<Credentials>) -> Response {
    let name = creds.name.unwrap_or_else(|| "Demo User".to_string());
    let claims = json!({
        "id": 1,
        "email": creds.email,
        "name": name,
        "exp": Utc::now().timestamp() + 24 * 3600,
    });
    match encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(backend.secret.as_bytes()),
    ) {
        Ok(token) => Json(json!({
            "message": "Login successful",
            "token": token,
            "user": { "id": 1, "email": claims["email"], "name": claims["name"] },
        }))
        .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
            .into_response(),
    }
}

async fn list_tasks(State(backend): State<Backend>) -> Json<serde_json::Value> {
    Json(serde_json::Value::Array(backend.tasks.lock().await.clone()))
}

async fn create_task(
    State(backend): State<Backend>,
    Json(task): Json<NewTask>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut tasks = backend.tasks.lock().await;
    let created = json!({
        "_id": (tasks.len() + 1).to_string(),
        "title": task.title,
        "description": task.description.unwrap_or_default(),
        "completed": false,
    });
    tasks.push(created.clone());
    (StatusCode::CREATED, Json(created))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let secret = std::env::var("GATEWAY_JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string());
    let backend = Backend {
        secret: Arc::new(secret),
        tasks: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/login", post(login))
        .route("/register", post(login))
        .route(
            "/data",
            get(|| async { Json(json!({ "data": "Protected cloud resource accessed!" })) }),
        )
        .route(
            "/profile",
            get(|| async { Json(json!({ "profile": { "id": 1, "name": "Demo User" } })) }),
        )
        .route("/secure/tasks", get(list_tasks).post(create_task))
        .with_state(backend);

    let addr = SocketAddr::from(([127, 0, 0, 1], 8081));
    println!("Mock backend listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
