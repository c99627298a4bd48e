use portal_client::domain::gateway::RemoteGateway;
use portal_client::domain::models::catalog::resolve_asset_url;
use portal_client::infrastructure::http_gateway::{GatewayConfig, HttpRemoteGateway};

/// Smoke binary: fetch the marketing catalog from the configured backend
/// and print it. `PORTAL_API_BASE_URL` selects the backend origin.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let base_url = dotenvy::var("PORTAL_API_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string());
    let gateway = HttpRemoteGateway::new(GatewayConfig::with_base_url(base_url));

    let carousel = gateway.list_carousel_items().await?;
    println!("carousel: {} item(s)", carousel.len());
    for item in &carousel {
        let image = item
            .image
            .as_deref()
            .map(|path| resolve_asset_url(gateway.base_url(), path));
        println!("  [{}] {} ({})", item.id, item.title, image.unwrap_or_default());
    }

    let events = gateway.list_events().await?;
    println!("events: {} item(s)", events.len());
    for event in &events {
        println!(
            "  [{}] {} at {}, {}",
            event.id,
            event.title,
            event.venue,
            event.date.as_deref().unwrap_or("date tba"),
        );
    }

    let about = gateway.about_us(1).await?;
    for section in &about {
        println!("about: {}", section.title);
    }

    Ok(())
}
