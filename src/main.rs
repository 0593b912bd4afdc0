use anyhow::{Context, Result};
use clap::Parser;
use curator::api::ApiClient;
use curator::app::App;
use curator::config::Config;
use curator::shell;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

/// Get the config directory path (~/.config/curator/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("curator"))
}

#[derive(Parser, Debug)]
#[command(
    name = "curator",
    about = "Terminal admin console for the media gallery and category catalog"
)]
struct Args {
    /// Config file (defaults to ~/.config/curator/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Store base URL (overrides the config file)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Gallery rows per page (overrides the config file)
    #[arg(long, value_name = "N")]
    page_size: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the shell's tables and prompts.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let config_dir = get_config_dir()?;
            if !config_dir.exists() {
                std::fs::create_dir_all(&config_dir)
                    .context("Failed to create config directory")?;
            }

            // The config file may hold an API token, so keep the directory
            // user-only on Unix.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                match std::fs::metadata(&config_dir) {
                    Ok(metadata) => {
                        let mut perms = metadata.permissions();
                        perms.set_mode(0o700);
                        if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                            tracing::warn!(
                                path = %config_dir.display(),
                                error = %e,
                                "Failed to set config directory permissions to 0700"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %config_dir.display(),
                            error = %e,
                            "Failed to read config directory metadata"
                        );
                    }
                }
            }

            config_dir.join("config.toml")
        }
    };

    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(timeout) = args.timeout_secs {
        config.timeout_secs = timeout;
    }
    if let Some(page_size) = args.page_size {
        config.gallery_page_size = page_size;
    }

    // Environment beats the file so the token never has to be written down.
    let token = std::env::var("CURATOR_API_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| config.api_token.clone())
        .map(SecretString::from);

    let api = ApiClient::new(
        &config.base_url,
        token,
        Duration::from_secs(config.timeout_secs),
    )
    .with_context(|| format!("Invalid store URL '{}'", config.base_url))?;

    let mut app = App::new(api, config.gallery_page_size);

    // A failed first fetch is a notice, not a startup error: the operator can
    // retry from the prompt once the store is reachable.
    app.refresh().await;

    shell::run(&mut app).await?;

    println!("Goodbye!");
    Ok(())
}
