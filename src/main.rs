use std::io::Write;

use ollama_console::api::ApiClient;
use ollama_console::config::Config;
use ollama_console::consumer::{GenerationConsumer, GenerationRequest, GenerationSink};
use ollama_console::error::{ErrorKind, log_error};

// ============================================================================
// Console Sink
// ============================================================================

struct ConsoleSink;

impl GenerationSink for ConsoleSink {
    fn on_fragment(&mut self, text: &str) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }

    fn on_complete(&mut self, full_text: &str) {
        println!();
        log::info!("✅ Reply complete ({} chars)", full_text.chars().count());
    }

    fn on_error(&mut self, kind: ErrorKind, detail: &str) {
        log::error!("⚠️  Generation failed: [{}] {}", kind, detail);
    }
}

fn fmt_bytes(n: Option<u64>) -> String {
    let Some(n) = n else {
        return "-".to_string();
    };
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = n as f64;
    let mut idx = 0;
    while size >= 1024.0 && idx < UNITS.len() - 1 {
        size /= 1024.0;
        idx += 1;
    }
    format!("{:.1} {}", size, UNITS[idx])
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenv::dotenv().ok();
    let config = Config::from_env();
    log::info!("🚀 Ollama console");
    log::info!("📍 {}", config.base_url);

    let api = ApiClient::new(&config.base_url);
    if !api.check().await {
        log::warn!("⚠️  API not reachable at {}", config.base_url);
    }

    let models = match api.list_models().await {
        Ok(models) => models,
        Err(err) => {
            log_error(&err);
            Vec::new()
        }
    };
    for model in &models {
        log::info!("📦 {} ({})", model.name, fmt_bytes(model.size));
    }
    match api.list_processes().await {
        Ok(procs) if procs.is_empty() => log::info!("⚙️  No active processes"),
        Ok(procs) => {
            for proc in &procs {
                log::info!("⚙️  {} ({})", proc.name, fmt_bytes(proc.size));
            }
        }
        Err(err) => log_error(&err),
    }

    // Caller-side preconditions: a non-empty trimmed prompt and a resolved
    // model identifier, checked before the consumer is ever invoked.
    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        log::info!("No prompt given. Usage: ollama-console <prompt>");
        return Ok(());
    }
    let model = config
        .default_model
        .clone()
        .or_else(|| models.first().map(|m| m.name.clone()));
    let Some(model) = model else {
        log::error!("No model available: set OLLAMA_MODEL or install one");
        return Ok(());
    };

    log::info!("🤖 {}", model);
    let consumer = GenerationConsumer::new();
    let request = GenerationRequest::new(model, prompt, config.generate_endpoint());
    let handle = consumer.start(request, ConsoleSink)?;
    handle.wait().await;

    Ok(())
}
