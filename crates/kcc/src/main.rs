use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use env_flags::env_flags;
use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

use kcc::config::{LoggingCfg, UserConfig, load_user_config};
use kcc::dispatch::{Command, Dispatcher, EXIT_FAILURE, EXIT_OK, EXIT_USAGE, USAGE, parse_args};
use kcc::invoker::ProcessInvoker;
use kcc::launcher::{DetachedSpawner, GameTable, Launcher};
use kcc::model::DEFAULT_ARTIFACT_EXTENSION;
use kcc::pipeline::PipelineRunner;
use kcc::resolver::PathResolver;
use kcc::resolver::lookup::ToolLookupTable;
use kcc::store::ProfileStore;

env_flags! {
    /// Tracing filter, e.g. "info", "debug", or targets format.
    RUST_LOG: &str = "warn";
    /// Preferred filter env (alias). If set, overrides RUST_LOG.
    TRACING_FILTER: &str = "";
    /// Pretty formatting for logs (ignored if TRACING_JSON=true).
    TRACING_PRETTY: bool = false;
    /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
    TRACING_COMPACT: bool = true;
    /// JSON formatting for logs
    TRACING_JSON: bool = false;
    /// If true, also log to file under <KCC_HOME>/logs or LOG_DIR
    LOG_TO_FILE: bool = false;
    /// Optional explicit log directory. Defaults to <KCC_HOME>/logs
    LOG_DIR: &str = "";
    /// Home for config.toml and logs. Defaults to $HOME/.kcc
    KCC_HOME: &str = "";
    /// Profile file read and written by every command
    KCC_CONFIG: &str = "config.json";
    /// Per-tool timeout in seconds; 0 waits indefinitely
    KCC_TOOL_TIMEOUT_SECS: u64 = 0;
}

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

#[derive(Clone, Copy)]
enum LogStyle {
    Json,
    Compact,
    Pretty,
    Full,
}

fn env_set(key: &str) -> bool {
    std::env::var_os(key).is_some()
}

fn kcc_home() -> PathBuf {
    if !(*KCC_HOME).is_empty() {
        PathBuf::from((*KCC_HOME).to_string())
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".kcc")
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".kcc")
    }
}

fn fmt_layer<W>(writer: W, ansi: bool, style: LogStyle) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    match style {
        LogStyle::Json => base.json().boxed(),
        LogStyle::Compact => base.compact().boxed(),
        LogStyle::Pretty => base.pretty().boxed(),
        LogStyle::Full => base.boxed(),
    }
}

fn init_tracing(home: &std::path::Path, cfg: Option<&LoggingCfg>) {
    // Environment wins; the [logging] table fills in whatever is unset.
    let mut filter = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut json = *TRACING_JSON;
    let mut compact = *TRACING_COMPACT;
    let mut pretty = *TRACING_PRETTY;
    let mut to_file = *LOG_TO_FILE;
    let mut log_dir = (!(*LOG_DIR).is_empty()).then(|| PathBuf::from((*LOG_DIR).to_string()));

    if let Some(cfg) = cfg {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            filter = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(kcc::config::expand_home(dir));
        }
    }

    let style = if json {
        LogStyle::Json
    } else if compact {
        LogStyle::Compact
    } else if pretty {
        LogStyle::Pretty
    } else {
        LogStyle::Full
    };

    let mut layers = vec![fmt_layer(std::io::stderr, true, style)];
    let mut dir_error = None;
    if to_file {
        let dir = log_dir.unwrap_or_else(|| home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "kccompile.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(fmt_layer(nb, false, style));
            }
            Err(e) => dir_error = Some((dir, e)),
        }
    }

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Err(e) = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
    {
        eprintln!("tracing already set: {e}");
    }
    if let Some((dir, e)) = dir_error {
        tracing::warn!("failed to create log dir {}: {}", dir.display(), e);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cmd = match parse_args(std::env::args().skip(1)) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("error: {e}\n");
            eprint!("{USAGE}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let home = kcc_home();
    let (user_cfg, cfg_error) = match load_user_config(&home) {
        Ok(cfg) => (cfg.unwrap_or_default(), None),
        Err(e) => (UserConfig::default(), Some(e)),
    };
    init_tracing(&home, user_cfg.logging.as_ref());
    if let Some(e) = cfg_error {
        tracing::warn!(
            "ignoring {}: {:#}",
            home.join("config.toml").display(),
            e
        );
    }
    tracing::debug!("kcc_home={}", home.display());

    if cmd == Command::Help {
        print!("{USAGE}");
        return ExitCode::from(EXIT_OK);
    }

    match run(cmd, &user_cfg).await {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(cmd: Command, user_cfg: &UserConfig) -> anyhow::Result<()> {
    let pipeline_cfg = user_cfg.pipeline.as_ref();
    let timeout_secs = if env_set("KCC_TOOL_TIMEOUT_SECS") {
        *KCC_TOOL_TIMEOUT_SECS
    } else {
        pipeline_cfg.and_then(|p| p.timeout_secs).unwrap_or(0)
    };
    let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
    let extension = pipeline_cfg
        .and_then(|p| p.artifact_extension.as_deref())
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(DEFAULT_ARTIFACT_EXTENSION);
    tracing::debug!("artifact_extension={} timeout={:?}", extension, timeout);

    let resolver = PathResolver::new(ToolLookupTable::from_config(&user_cfg.tools), extension);
    let runner = PipelineRunner::new(resolver, ProcessInvoker::new(timeout));
    let launcher = Launcher::new(
        GameTable::from_config(&user_cfg.games),
        extension,
        DetachedSpawner,
    );
    let store = ProfileStore::open(std::path::Path::new(*KCC_CONFIG))?;

    let mut dispatcher = Dispatcher::new(store, runner, launcher);
    dispatcher.execute(cmd, &mut std::io::stdout()).await
}
