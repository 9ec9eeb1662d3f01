//! edgewin: a desktop window hosting the system WebView2 engine.
//!
//! Usage: `edgewin [config.toml]`. The configuration fills
//! [`WebViewOptions`]; missing keys keep their defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use edgewin_core::WebViewOptions;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const DEMO_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>edgewin</title></head>
<body style="font-family: sans-serif">
  <h1>edgewin</h1>
  <p id="sum">Adding...</p>
  <p>Press Ctrl+Alt+Q to quit.</p>
  <script>
    window.add(2, 3).then(function(sum) {
      document.getElementById('sum').textContent = '2 + 3 = ' + sum;
    });
  </script>
</body>
</html>"#;

fn load_options() -> Result<WebViewOptions> {
    match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => WebViewOptions::load(&path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(WebViewOptions::default()),
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let options = load_options()?;
    info!("edgewin starting");
    run(options)?;
    info!("edgewin shutting down");
    Ok(())
}

#[cfg(windows)]
fn run(options: WebViewOptions) -> Result<()> {
    use edgewin_core::{Binding, WebView};
    use edgewin_win32::Win32Platform;

    #[derive(serde::Serialize)]
    struct About {
        name: &'static str,
        version: &'static str,
    }

    let platform = Win32Platform::new()?;
    let view = WebView::new(&platform, options)?;

    view.bind("add", Binding::new(|a: f64, b: f64| a + b))?;
    view.bind(
        "about",
        Binding::new(|| {
            edgewin_core::Json(About {
                name: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            })
        }),
    )?;
    view.register_hotkey("Ctrl+Alt+Q", |view| view.terminate())?;
    view.on_title_changed(|title| info!("Title: {}", title));
    view.set_html(DEMO_PAGE)?;

    view.run()?;
    view.destroy()?;
    Ok(())
}

#[cfg(not(windows))]
fn run(_options: WebViewOptions) -> Result<()> {
    anyhow::bail!("edgewin needs Windows and the WebView2 runtime")
}
