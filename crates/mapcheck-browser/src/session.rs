use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use mapcheck_core::error::CheckError;

use crate::page::ChromiumPage;

/// Window size the scenarios were written against — wide enough that the
/// sidebar and detail panel both render.
const WINDOW_SIZE: (u32, u32) = (1200, 800);

/// Headless Chromium session over the Chrome DevTools Protocol.
///
/// One Chromium process backs the session; each scenario gets its own tab
/// via [`BrowserSession::new_page`], so parallel scenarios share no page
/// state. The Chromium process is killed when the session is dropped, so a
/// failed run cannot leak a browser.
///
/// # Example
///
/// ```rust,no_run
/// use mapcheck_browser::BrowserSession;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let session = BrowserSession::launch().await?;
/// let page = session.new_page().await?;
/// # Ok(())
/// # }
/// ```
pub struct BrowserSession {
    browser: Arc<Browser>,
    nav_timeout: Duration,
}

impl BrowserSession {
    /// Launches a headless Chromium with a **30 s** navigation timeout.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH` (or the
    /// default locations checked by `chromiumoxide`).
    pub async fn launch() -> Result<Self, CheckError> {
        Self::with_timeout(Duration::from_secs(30)).await
    }

    /// Launches a headless Chromium with a custom navigation timeout.
    pub async fn with_timeout(nav_timeout: Duration) -> Result<Self, CheckError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        // Snap-packaged Chromium exposes a wrapper that rejects standard
        // Chrome CLI flags (--headless, --disable-gpu, …).  We try to
        // locate the *real* binary buried inside the snap, falling back
        // to any other Chrome/Chromium the user may have installed.
        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .window_size(WINDOW_SIZE.0, WINDOW_SIZE.1)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .build()
            .map_err(|e| CheckError::Generic(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CheckError::Generic(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            nav_timeout,
        })
    }

    /// Open a fresh tab for one scenario. The returned page implements
    /// `PageDriver`; the runner closes it at scenario end.
    pub async fn new_page(&self) -> Result<ChromiumPage, CheckError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| CheckError::Generic(format!("Failed to open page: {e}")))?;
        Ok(ChromiumPage::new(page, self.nav_timeout))
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// On systems where Chromium is installed via **snap**, the wrapper at
    /// `/snap/bin/chromium` strips unknown CLI flags, breaking headless
    /// mode.  We look for the real binary inside the snap first, then fall
    /// back to well-known system paths.  If nothing is found we return
    /// `None` and let `chromiumoxide` do its own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        let candidates: &[&str] = &[
            // Snap (Ubuntu default)
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            // Flatpak
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            // Common apt / manual installs
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        // Also honour an explicit override via env var.
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }
}
