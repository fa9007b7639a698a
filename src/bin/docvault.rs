//! CLI binary for docvault.
//!
//! `serve` runs the HTTP API, `scan` runs the extraction pipeline on a local
//! file, `token` mints a bearer token for local testing.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use docvault::{
    router, AppState, DocumentCategory, DocumentVault, IncomingFile, LocalObjectStore,
    MemoryDocumentStore, TokenKeys, VaultConfig, VaultConfigBuilder,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the API with OCR through OpenAI
  OPENAI_API_KEY=sk-... DOCVAULT_JWT_SECRET=dev docvault serve

  # Mint a token and upload a passport scan
  TOKEN=$(DOCVAULT_JWT_SECRET=dev docvault token alice)
  curl -H "Authorization: Bearer $TOKEN" \
       -F document=@passport.jpg -F category=passport \
       http://127.0.0.1:8080/documents/upload

  # Try the extractor on a file without storing anything
  docvault scan visa.png --category visa

ENVIRONMENT:
  EDGEQUAKE_LLM_PROVIDER / EDGEQUAKE_MODEL select the OCR provider and model.
  Otherwise the provider is detected from OPENAI_API_KEY, ANTHROPIC_API_KEY,
  GEMINI_API_KEY, etc. RUST_LOG overrides --verbose.
"#;

/// Travel-document vault with OCR and expiry reminders.
#[derive(Parser, Debug)]
#[command(
    name = "docvault",
    version,
    about = "Travel-document vault with OCR and expiry reminders",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging.
    #[arg(short, long, global = true, env = "DOCVAULT_VERBOSE")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Run validate → normalise → OCR → parse on a local file and print JSON.
    Scan(ScanArgs),
    /// Mint a bearer token for OWNER.
    Token(TokenArgs),
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Vision model ID (e.g. gpt-4.1-nano, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Skip OCR; documents are stored without text.
    #[arg(long, env = "DOCVAULT_NO_OCR")]
    no_ocr: bool,

    /// Largest accepted upload, in bytes.
    #[arg(long, env = "DOCVAULT_MAX_UPLOAD_BYTES", default_value_t = docvault::config::DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: u64,

    /// Longest edge of a normalised image, in pixels.
    #[arg(long, env = "DOCVAULT_MAX_DIMENSION", default_value_t = 2048)]
    max_dimension: u32,

    /// JPEG quality for normalised images (1–100).
    #[arg(long, env = "DOCVAULT_JPEG_QUALITY", default_value_t = 85)]
    jpeg_quality: u8,

    /// Retries per OCR call.
    #[arg(long, env = "DOCVAULT_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call OCR timeout in seconds.
    #[arg(long, env = "DOCVAULT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

impl PipelineArgs {
    fn builder(&self) -> VaultConfigBuilder {
        let mut builder = VaultConfig::builder()
            .ocr_enabled(!self.no_ocr)
            .max_upload_bytes(self.max_upload_bytes)
            .max_dimension(self.max_dimension)
            .jpeg_quality(self.jpeg_quality)
            .max_retries(self.max_retries)
            .api_timeout_secs(self.api_timeout);
        if let Some(model) = &self.model {
            builder = builder.model(model);
        }
        if let Some(provider) = &self.provider {
            builder = builder.provider_name(provider);
        }
        builder
    }
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Address to listen on.
    #[arg(long, env = "DOCVAULT_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Directory holding stored binaries.
    #[arg(long, env = "DOCVAULT_STORAGE_ROOT", default_value = "./vault-data")]
    storage_root: PathBuf,

    /// Base URL prefixed to stored object paths.
    #[arg(long, env = "DOCVAULT_PUBLIC_BASE_URL", default_value = "/files")]
    public_base_url: String,

    /// HS256 secret for bearer tokens.
    #[arg(long, env = "DOCVAULT_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Include error details in responses. Development only.
    #[arg(long, env = "DOCVAULT_EXPOSE_ERRORS")]
    expose_errors: bool,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Image or PDF to scan.
    file: PathBuf,

    /// Treat the document as this category instead of detecting it.
    #[arg(long)]
    category: Option<DocumentCategory>,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct TokenArgs {
    /// Owner id placed in the `sub` claim.
    owner: String,

    /// HS256 secret for bearer tokens.
    #[arg(long, env = "DOCVAULT_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Token lifetime in hours.
    #[arg(long, default_value_t = 24)]
    ttl_hours: i64,
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    if args.jwt_secret.trim().is_empty() {
        bail!("--jwt-secret must not be empty");
    }

    let config = args
        .pipeline
        .builder()
        .expose_error_detail(args.expose_errors)
        .build()
        .context("Invalid configuration")?;

    tokio::fs::create_dir_all(&args.storage_root)
        .await
        .with_context(|| format!("Cannot create storage root {}", args.storage_root.display()))?;

    let vault = DocumentVault::new(
        config,
        Arc::new(LocalObjectStore::new(&args.storage_root, &args.public_base_url)),
        Arc::new(MemoryDocumentStore::new()),
    );
    let app = router(AppState::new(vault, TokenKeys::new(&args.jwt_secret)));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Cannot bind {}", args.bind))?;
    tracing::info!(
        "docvault listening on http://{} (storage: {})",
        args.bind,
        args.storage_root.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn scan(args: ScanArgs) -> Result<()> {
    let config = args
        .pipeline
        .builder()
        .build()
        .context("Invalid configuration")?;

    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Cannot read {}", args.file.display()))?;
    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    let file = IncomingFile {
        content_type: docvault::pipeline::ingress::guess_content_type(file_name.as_deref()),
        file_name,
        bytes: bytes.into(),
    };

    // Scanning never persists, so the stores are throwaway.
    let scratch = std::env::temp_dir().join("docvault-scan");
    let vault = DocumentVault::new(
        config,
        Arc::new(LocalObjectStore::new(scratch, "/files")),
        Arc::new(MemoryDocumentStore::new()),
    );
    let outcome = vault.scan(file, args.category).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn token(args: TokenArgs) -> Result<()> {
    let keys = TokenKeys::new(&args.jwt_secret);
    let token = keys.mint(&args.owner, chrono::Duration::hours(args.ttl_hours))?;
    println!("{token}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Scan(args) => scan(args).await,
        Command::Token(args) => token(args),
    }
}
