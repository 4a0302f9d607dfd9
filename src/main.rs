use std::path::Path;

use site_preview::api::{ProjectClient, Session};
use site_preview::config::PreviewConfig;
use site_preview::page::{NoticeLevel, PageState, PreviewPage};
use site_preview::server::start_preview_server;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SESSION_ENV: &str = "SITE_PREVIEW_SESSION";

const USAGE: &str = "usage: site-preview <project-id> [version-id]
       site-preview --file <path>
       site-preview --serve";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let config = PreviewConfig::from_env().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}. Using defaults.");
        PreviewConfig::default()
    });

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| {
            eprintln!("Failed to start async runtime: {err}");
            std::process::exit(1);
        });

    let code = match args.as_slice() {
        [flag, path] if flag == "--file" => normalize_file(&config, Path::new(path)),
        [flag] if flag == "--serve" => rt.block_on(serve(&config)),
        [project_id] if !project_id.starts_with("--") => {
            rt.block_on(print_preview(&config, project_id, None))
        }
        [project_id, version_id] if !project_id.starts_with("--") => {
            rt.block_on(print_preview(&config, project_id, Some(version_id.clone())))
        }
        _ => {
            eprintln!("{USAGE}");
            2
        }
    };
    std::process::exit(code);
}

fn normalize_file(config: &PreviewConfig, path: &Path) -> i32 {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            println!("{}", config.normalizer().normalize(&raw));
            0
        }
        Err(err) => {
            eprintln!("Failed to read {}: {err}", path.display());
            1
        }
    }
}

async fn print_preview(config: &PreviewConfig, project_id: &str, version_id: Option<String>) -> i32 {
    let client = match ProjectClient::new(config.api_base.clone()) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Failed to create project client: {err}");
            return 1;
        }
    };
    let session = std::env::var(SESSION_ENV)
        .ok()
        .map(|token| Session::from_token(&config.session_cookie, token.trim()));

    let mut options = config.bridge_options();
    options.show_editor_panel = false;
    let mut page = PreviewPage::new(project_id, version_id, options);
    let state = page.load(&client, session.as_ref()).await;

    let mut failed = false;
    for notice in page.take_notices() {
        failed |= notice.level == NoticeLevel::Error;
        eprintln!("{}", notice.message);
    }
    if failed || state == PageState::Loading {
        return 1;
    }

    match page.bridge().document() {
        Some(document) => println!("{document}"),
        None => info!("project has no code to preview yet"),
    }
    0
}

async fn serve(config: &PreviewConfig) -> i32 {
    let client = match ProjectClient::new(config.api_base.clone()) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Failed to create project client: {err}");
            return 1;
        }
    };
    let handle = match start_preview_server(config.listen, client, config.normalizer()).await {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("Failed to start preview server: {err}");
            return 1;
        }
    };
    println!("Serving previews at http://{}/preview/<project-id>", handle.addr);

    if let Err(err) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to listen for shutdown signal: {err}");
    }
    handle.shutdown().await;
    0
}
