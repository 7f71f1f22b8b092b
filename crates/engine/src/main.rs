//! Delver Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod infrastructure;
mod use_cases;

use app::App;
use infrastructure::{
    comfyui::{ComfyUIClient, DEFAULT_COMFYUI_BASE_URL},
    image_store::{ImageStore, PUBLIC_IMAGE_BASE},
    ollama::{OllamaClient, DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL},
    ports::ImageGenPort,
};
use use_cases::scene::DEFAULT_MAX_RECENT_TURNS;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "delver_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Delver Engine");

    // Load configuration
    let ollama_url = std::env::var("OLLAMA_URL")
        .or_else(|_| std::env::var("OLLAMA_BASE_URL"))
        .unwrap_or_else(|_| DEFAULT_OLLAMA_BASE_URL.into());
    let ollama_model =
        std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.into());
    let comfyui_url = std::env::var("COMFYUI_URL")
        .or_else(|_| std::env::var("COMFYUI_BASE_URL"))
        .unwrap_or_else(|_| DEFAULT_COMFYUI_BASE_URL.into());
    let image_dir = std::env::var("IMAGE_STORE_DIR").unwrap_or_else(|_| "static/images".into());
    let max_recent: usize = std::env::var("MAX_RECENT_TURNS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_RECENT_TURNS);
    let server_host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let server_port: u16 = std::env::var("SERVER_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .unwrap_or(3000);

    // Create infrastructure clients
    let llm = Arc::new(OllamaClient::new(&ollama_url, &ollama_model));
    let image_gen = Arc::new(ComfyUIClient::new(&comfyui_url));
    let store = ImageStore::new(&image_dir);

    tracing::info!(%ollama_url, %ollama_model, %comfyui_url, %image_dir, "Configuration loaded");

    // Illustration is best-effort; just report whether the backend is up.
    match image_gen.check_health().await {
        Ok(true) => tracing::info!("ComfyUI is reachable"),
        _ => tracing::warn!("ComfyUI is not reachable; scenes will render without illustrations"),
    }

    // Create application
    let serve_images = ServeDir::new(store.root().to_path_buf());
    let app = Arc::new(App::new(llm, image_gen, store, max_recent));

    // Build router; generated images are served from the store's root.
    let router = api::http::routes()
        .nest_service(PUBLIC_IMAGE_BASE, serve_images)
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = format!("{server_host}:{server_port}").parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
