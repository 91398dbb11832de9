/// Smoke-test for `BrowserSession`.
///
/// Launches a headless Chromium, loads the locally running map application,
/// and prints how many places rendered.
///
/// Run with:
///   cargo run --example smoke
use mapcheck_core::traits::PageDriver;
use mapcheck_browser::BrowserSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let url =
        std::env::var("MAPCHECK_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

    println!("Launching headless browser…");
    let session = BrowserSession::launch().await?;
    let page = session.new_page().await?;

    println!("Loading {url} …");
    page.navigate(&url).await?;

    let places = page.count(".place-item").await?;
    let markers = page.count(".marker").await?;
    println!("OK — {places} places in the list, {markers} markers on the map");

    page.close().await?;
    Ok(())
}
