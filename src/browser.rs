//! Browser session lifecycle
//!
//! Owns the controlled Chromium process: discovery/launch with
//! fingerprint-reduction arguments, automation-signal suppression, and
//! guaranteed teardown. [`BrowserSession`] is the scoped-acquisition handle:
//! `close()` releases the process and its profile directory on the happy
//! path, `Drop` covers every other exit path so a failing run never leaks a
//! zombie Chrome.

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};

/// Identity string presented to the target site. A stock desktop Chrome UA,
/// consistent with the launch arguments below.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Find a Chrome/Chromium executable with platform-specific search paths.
///
/// `CHROMIUM_PATH` overrides all other discovery when it points at an
/// existing file.
pub async fn find_browser_executable() -> ScrapeResult<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH points to non-existent file: {}",
            path.display()
        );
    }

    let paths = if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for path_str in paths {
        let path = if let Some(rest) = path_str.strip_prefix("~/") {
            match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => continue,
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(path_str);
                    info!("Found browser via 'which': {}", path.display());
                    return Ok(path);
                }
            }
        }
    }

    Err(ScrapeError::SessionAcquisition(
        "Chrome/Chromium executable not found".to_string(),
    ))
}

/// Download a managed Chromium when no system browser exists. Returns the
/// path to the downloaded executable.
pub async fn download_managed_browser() -> ScrapeResult<PathBuf> {
    info!("No system browser found, downloading managed Chromium");

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("catascrape")
        .join("chromium");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        ScrapeError::SessionAcquisition(format!(
            "failed to create browser cache directory {}: {e}",
            cache_dir.display()
        ))
    })?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .map_err(|e| {
                ScrapeError::SessionAcquisition(format!("failed to build fetcher options: {e}"))
            })?,
    );

    let revision_info = fetcher.fetch().await.map_err(|e| {
        ScrapeError::SessionAcquisition(format!("failed to fetch browser: {e}"))
    })?;

    info!(
        "Downloaded Chromium to: {}",
        revision_info.folder_path.display()
    );

    Ok(revision_info.executable_path)
}

/// One owned browser process plus its CDP handler task and profile
/// directory. Created once at pipeline start, destroyed exactly once.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserSession {
    /// Launch a Chromium process configured to minimize automation-detection
    /// signals: suppressed automation banner, realistic user agent, stable
    /// maximized viewport, no first-run chrome.
    ///
    /// # Errors
    ///
    /// Any launch failure is [`ScrapeError::SessionAcquisition`] and fatal.
    pub async fn acquire(config: &ScrapeConfig) -> ScrapeResult<Self> {
        let chrome_path = match find_browser_executable().await {
            Ok(path) => path,
            Err(_) => download_managed_browser().await?,
        };

        let user_data_dir = config.chrome_data_dir().cloned().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("catascrape_chrome_{}", std::process::id()))
        });

        std::fs::create_dir_all(&user_data_dir).map_err(|e| {
            ScrapeError::SessionAcquisition(format!(
                "failed to create user data directory {}: {e}",
                user_data_dir.display()
            ))
        })?;

        let mut config_builder = BrowserConfigBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .window_size(1920, 1080)
            .user_data_dir(user_data_dir.clone())
            .chrome_executable(chrome_path);

        if config.headless() {
            config_builder = config_builder.headless_mode(HeadlessMode::default());
        } else {
            config_builder = config_builder.with_head();
        }

        config_builder = config_builder
            .arg(format!("--user-agent={USER_AGENT}"))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-notifications")
            .arg("--disable-desktop-notifications")
            .arg("--start-maximized")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-background-networking")
            .arg("--disable-background-timer-throttling")
            .arg("--disable-backgrounding-occluded-windows")
            .arg("--disable-hang-monitor")
            .arg("--disable-prompt-on-repost")
            .arg("--metrics-recording-only")
            .arg("--password-store=basic")
            .arg("--use-mock-keychain")
            .arg("--mute-audio");

        let browser_config = config_builder.build().map_err(|e| {
            ScrapeError::SessionAcquisition(format!("failed to build browser config: {e}"))
        })?;

        info!(headless = config.headless(), "Launching browser");
        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            ScrapeError::SessionAcquisition(format!("failed to launch browser: {e}"))
        })?;

        // Drive the CDP connection until the browser goes away. Tracked so
        // teardown can abort it instead of leaking a forever-task.
        let handler_task = task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {e}");
                }
            }
            debug!("Browser handler task completed");
        });

        Ok(Self {
            browser,
            handler: handler_task,
            user_data_dir: Some(user_data_dir),
        })
    }

    /// Reference to the underlying browser handle.
    #[must_use]
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Open a blank page, ready for automation-signal suppression before the
    /// first real navigation.
    pub async fn new_page(&self) -> ScrapeResult<Page> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(page)
    }

    /// Terminate the browser process and remove the profile directory.
    ///
    /// Errors during teardown are reported but do not abort the remaining
    /// cleanup steps: every resource gets its release attempt.
    pub async fn close(mut self) -> ScrapeResult<()> {
        debug!("Closing browser");
        let mut first_error: Option<ScrapeError> = None;

        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {e}");
            first_error.get_or_insert(ScrapeError::Browser(e.to_string()));
        }

        // Wait for the process to fully exit so the profile directory is
        // unlocked before removal.
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {e}");
            first_error.get_or_insert(ScrapeError::Browser(e.to_string()));
        }

        self.handler.abort();
        if let Err(e) = (&mut self.handler).await
            && !e.is_cancelled()
        {
            warn!("Handler task failed during abort: {e}");
        }

        if let Some(dir) = self.user_data_dir.take()
            && let Err(e) = std::fs::remove_dir_all(&dir)
        {
            warn!("Failed to remove user data directory {}: {e}", dir.display());
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("Browser session released");
                Ok(())
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Fallback for exit paths that never reached close(). Browser::drop
        // kills the Chrome process; we still need to stop the handler task
        // and remove the profile directory.
        self.handler.abort();
        if let Some(dir) = self.user_data_dir.take() {
            warn!("BrowserSession dropped without explicit close, removing profile dir");
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!(
                    "Failed to remove user data directory {} in drop: {e}",
                    dir.display()
                );
            }
        }
    }
}

/// Override the automation signals a vanilla CDP session leaks:
/// `navigator.webdriver` and an implausibly empty language list.
pub async fn suppress_automation_signals(page: &Page) -> ScrapeResult<()> {
    let webdriver_js = r"
        Object.defineProperty(navigator, 'webdriver', {
            get: () => undefined
        });
    ";
    page.evaluate(webdriver_js).await?;

    let languages_js = r"
        Object.defineProperty(navigator, 'languages', {
            get: () => ['en-US', 'en']
        });
    ";
    page.evaluate(languages_js).await?;

    debug!("Automation signals suppressed");
    Ok(())
}
