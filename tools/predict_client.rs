//! Prediction Smoke-Test Client
//!
//! Sends an image to a running classification server and prints the ranked
//! result.
//!
//! Usage: predict-client <image> [server_url] [multipart|json|data-url]

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::path::Path;
use tracing::{info, warn};

/// How the image is sent to `/predict`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Multipart,
    Json,
    DataUrl,
}

impl Transport {
    fn parse(arg: &str) -> Result<Self> {
        match arg {
            "multipart" => Ok(Self::Multipart),
            "json" => Ok(Self::Json),
            "data-url" => Ok(Self::DataUrl),
            other => bail!("unknown transport '{other}', expected multipart, json or data-url"),
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("predict_client=info".parse()?),
        )
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let Some(image_path) = args.get(1) else {
        bail!("usage: predict-client <image> [server_url] [multipart|json|data-url]");
    };
    let server_url = args
        .get(2)
        .map(|s| s.trim_end_matches('/'))
        .unwrap_or("http://localhost:5001");
    let transport = Transport::parse(args.get(3).map(|s| s.as_str()).unwrap_or("multipart"))?;

    let path = Path::new(image_path);
    let image = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    info!(
        image = %path.display(),
        bytes = image.len(),
        server = %server_url,
        transport = ?transport,
        "Configuration loaded"
    );

    let client = reqwest::Client::new();

    // Probe the server first
    match client.get(format!("{server_url}/health")).send().await {
        Ok(response) => {
            let health: Value = response.json().await?;
            info!(health = %health, "Server health");
            if health["model_loaded"] == json!(false) {
                warn!("Server reports the model is not loaded; prediction will fail");
            }
        }
        Err(e) => bail!("Server at {server_url} is not reachable: {e}"),
    }

    let request = client.post(format!("{server_url}/predict"));
    let request = match transport {
        Transport::Multipart => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let part = Part::bytes(image)
                .file_name(file_name)
                .mime_str(mime_for(path))?;
            request.multipart(Form::new().part("image", part))
        }
        Transport::Json => request.json(&json!({ "image": STANDARD.encode(&image) })),
        Transport::DataUrl => {
            let data_url = format!("data:{};base64,{}", mime_for(path), STANDARD.encode(&image));
            request.json(&json!({ "image": data_url }))
        }
    };

    let response = request.send().await.context("Prediction request failed")?;
    let status = response.status();
    let body: Value = response.json().await.context("Response was not JSON")?;

    if !status.is_success() {
        bail!(
            "Server returned {status}: {}",
            body["error"].as_str().unwrap_or("unknown error")
        );
    }

    info!(
        "Prediction: {} ({:.2}%)",
        body["prediction"]["name"].as_str().unwrap_or("?"),
        body["prediction"]["percentage"].as_f64().unwrap_or(0.0)
    );
    if let Some(top) = body["top_classes"].as_array() {
        for (rank, class) in top.iter().enumerate() {
            info!(
                "  {}. {:<40} {:>6.2}%",
                rank + 1,
                class["name"].as_str().unwrap_or("?"),
                class["percentage"].as_f64().unwrap_or(0.0)
            );
        }
    }
    println!("{}", serde_json::to_string_pretty(&body)?);

    Ok(())
}
