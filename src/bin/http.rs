#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use timeline_blueprint::{BusinessCalendar, JsonDirTemplateStore, http_api};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let addr: SocketAddr = std::env::var("BLUEPRINT_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;
    let store_dir =
        std::env::var("BLUEPRINT_STORE_DIR").unwrap_or_else(|_| ".blueprints".to_string());

    let store = JsonDirTemplateStore::new(&store_dir)?;
    let state = http_api::AppState::new(BusinessCalendar::default(), store);

    println!("timeline-blueprint HTTP API listening on http://{addr} (store: {store_dir})");
    http_api::serve(addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
