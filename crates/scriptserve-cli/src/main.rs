//! Scriptserve entry point
//!
//! Binary for the scriptserve web server: static file serving plus
//! JavaScript route handlers.
//!
//! ## Usage
//!
//! ```bash
//! # Serve the current directory layout (static/ and scripts/)
//! scriptserve serve
//!
//! # Serve on another interface and port
//! scriptserve serve --host 0.0.0.0 --port 9000
//!
//! # Scaffold a new project in the current directory
//! scriptserve init --name "Big Reptiles"
//! ```
//!
//! Every `serve` flag can also be set through a `SCRIPTSERVE_*`
//! environment variable; a flag given on the command line wins.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;

use scriptserve_common::config::{env_bool, env_string, env_u16, env_u64, DEFAULT_TIMEOUT_MS};
use scriptserve_common::ServerConfig;
use scriptserve_server::runtime::PoolConfig;
use scriptserve_server::routes::ScriptCache;
use scriptserve_server::static_files::StaticFiles;
use scriptserve_server::{HttpServer, ResourceLimits, RouteDispatcher};

mod init;

use init::InitArgs;

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// scriptserve - a light weight web server with JavaScript route handlers
struct Cli {
    /// print version and exit
    #[argh(switch, short = 'v')]
    version: bool,

    #[argh(subcommand)]
    command: Option<Commands>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Init(InitArgs),
}

/// Arguments for running the server.
///
/// Without a subcommand the server also starts with these defaults, so a
/// bare `scriptserve` serves `static/` and `scripts/` from the current
/// directory.
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// start the web server
struct ServeArgs {
    /// hostname to bind to (SCRIPTSERVE_HOST)
    #[argh(option, default = "default_host()")]
    host: String,

    /// port to listen on (SCRIPTSERVE_PORT)
    #[argh(option, short = 'p', default = "default_port()")]
    port: u16,

    /// document root for static files (SCRIPTSERVE_DOCROOT)
    #[argh(option, short = 'd', default = "default_docroot()")]
    docroot: String,

    /// directory of JavaScript route handlers (SCRIPTSERVE_SCRIPTS)
    #[argh(option, short = 's', default = "default_scripts()")]
    scripts: String,

    /// include script diagnostics in error responses (SCRIPTSERVE_DEBUG)
    #[argh(switch)]
    debug: bool,

    /// script execution deadline in milliseconds (SCRIPTSERVE_TIMEOUT_MS)
    #[argh(option, long = "timeout-ms", default = "default_timeout_ms()")]
    timeout_ms: u64,
}

fn default_host() -> String {
    env_string("SCRIPTSERVE_HOST", "localhost")
}

fn default_port() -> u16 {
    env_u16("SCRIPTSERVE_PORT", 8000)
}

fn default_docroot() -> String {
    env_string("SCRIPTSERVE_DOCROOT", "static")
}

fn default_scripts() -> String {
    env_string("SCRIPTSERVE_SCRIPTS", "scripts")
}

fn default_timeout_ms() -> u64 {
    env_u64("SCRIPTSERVE_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)
}

fn default_serve_args() -> ServeArgs {
    ServeArgs {
        host: default_host(),
        port: default_port(),
        docroot: default_docroot(),
        scripts: default_scripts(),
        debug: false,
        timeout_ms: default_timeout_ms(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    if cli.version {
        println!("scriptserve {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Default log level is INFO; RUST_LOG overrides.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Serve(args)) => run_serve(args).await,
        Some(Commands::Init(args)) => init::run(args),
        None => run_serve(default_serve_args()).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = ServerConfig {
        hostname: args.host,
        port: args.port,
        docroot: PathBuf::from(args.docroot),
        scripts_dir: PathBuf::from(args.scripts),
        debug: args.debug || env_bool("SCRIPTSERVE_DEBUG", false),
        timeout_ms: args.timeout_ms,
    };
    config.validate()?;

    let limits = ResourceLimits::default()
        .with_execution_timeout(Duration::from_millis(config.timeout_ms));
    limits.validate()?;

    let scripts = if config.has_scripts() {
        Some(ScriptCache::load(&config.scripts_dir)?)
    } else {
        tracing::info!(
            dir = %config.scripts_dir.display(),
            "no scripts directory, serving static files only"
        );
        None
    };

    if config.debug {
        tracing::warn!("debug mode is on, error responses expose script diagnostics");
    }

    let dispatcher = RouteDispatcher::new(
        scripts,
        StaticFiles::new(&config.docroot),
        limits,
        PoolConfig::default(),
        config.debug,
    );

    tracing::info!("starting http://{}", config.bind_addr());
    HttpServer::new(dispatcher).run(config.bind_addr()).await?;
    Ok(())
}
