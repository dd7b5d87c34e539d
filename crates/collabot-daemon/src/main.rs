// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collabot Daemon (collabotd)
//!
//! Background process that owns the dispatch runtime, the socket listener,
//! and the draft-session manager. Typically started by the `collabot` CLI
//! and not invoked directly.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::collections::HashMap;
use std::sync::Arc;

use collabot_adapters::SubprocessAgentAdapter;
use collabot_core::provider::{CommunicationProviderManifest, ProviderType};
use collabot_core::{Role, RoleName, SystemClock};
use collabot_daemon::config::{Config, ConfigError};
use collabot_daemon::draft_bridge::DraftInboundHandler;
use collabot_daemon::listener::{self, DaemonCtx};
use collabot_daemon::protocol;
use collabot_daemon::socket_provider::{self, SocketProvider};
use collabot_engine::{DispatchRuntime, DraftManager, FullTools, ModelAliases};
use collabot_providers::{ProviderRegistry, TerminalProvider};
use collabot_store::TaskLocks;
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("collabotd {}", protocol::PROTOCOL_VERSION);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("collabotd {}", protocol::PROTOCOL_VERSION);
                println!("Collabot Daemon - background process owning the dispatch runtime and socket listener");
                println!();
                println!("USAGE:");
                println!("    collabotd");
                println!();
                println!("The daemon is typically started by the `collabot` CLI and should not");
                println!("be invoked directly. It listens on a Unix socket for JSON-RPC requests.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: collabotd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("Starting collabotd");

    if let Some(pid) = probe_running_instance(&config).await {
        eprintln!("collabotd is already running");
        eprintln!("  pid: {pid}");
        drop(log_guard);
        std::process::exit(1);
    }

    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.projects_dir)?;
    std::fs::create_dir_all(&config.roles_dir)?;
    write_pid_file(&config)?;
    std::fs::write(&config.version_path, protocol::PROTOCOL_VERSION)?;

    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let unix_listener = UnixListener::bind(&config.socket_path)?;

    let agent = Arc::new(
        SubprocessAgentAdapter::new(config.agent_binary.clone()).with_args(config.agent_args.clone()),
    );
    let clock = SystemClock;
    let pool = Arc::new(collabot_engine::AgentPool::new(config.max_concurrent_agents));
    let tracker = Arc::new(collabot_engine::DispatchTracker::new());
    let task_locks = TaskLocks::new();
    let providers = Arc::new(ProviderRegistry::new());
    let (notifications, _) = tokio::sync::broadcast::channel(1024);

    let roles: HashMap<RoleName, Role> = collabot_store::role_manifest::list_roles(&config.roles_dir)?
        .into_iter()
        .map(|role| (role.name.clone(), role))
        .collect();
    if roles.is_empty() {
        warn!("no role definitions found under {}", config.roles_dir.display());
    }
    let roles = Arc::new(roles);

    let model_aliases = ModelAliases::new(config.model_aliases.clone());
    let runtime = DispatchRuntime::new(
        Arc::clone(&agent),
        clock.clone(),
        Arc::clone(&pool),
        Arc::clone(&tracker),
        Arc::clone(&providers),
        task_locks.clone(),
        config.default_model.clone(),
        model_aliases,
    );
    let tools = FullTools::new(runtime, Arc::clone(&pool), Arc::clone(&tracker), config.projects_dir.clone());
    let draft_manager = Arc::new(DraftManager::new(
        Arc::clone(&agent),
        clock.clone(),
        Arc::clone(&pool),
        Arc::clone(&providers),
        task_locks,
        config.default_model.clone(),
    ));

    if let Some(session) = draft_manager.load_active_draft(&config.projects_dir)? {
        info!(session_id = %session.session_id, "resumed active draft session from disk");
    }

    let terminal_manifest = CommunicationProviderManifest::new(
        "terminal",
        protocol::PROTOCOL_VERSION,
        "Terminal",
        "writes every broadcast message to stdout",
        ProviderType::Terminal,
    );
    let socket_manifest = CommunicationProviderManifest::new(
        "socket",
        protocol::PROTOCOL_VERSION,
        "Socket",
        "fans out broadcast messages as JSON-RPC notifications",
        ProviderType::Socket,
    );
    providers
        .register(Arc::new(TerminalProvider::new(terminal_manifest)), None)
        .map_err(|err| format!("failed to register terminal provider: {err}"))?;
    providers
        .register(
            Arc::new(SocketProvider::new(socket_manifest, notifications.clone())),
            None,
        )
        .map_err(|err| format!("failed to register socket provider: {err}"))?;
    providers.install_inbound_handler(Arc::new(DraftInboundHandler::new(
        Arc::clone(&draft_manager),
        Arc::clone(&roles),
        config.projects_dir.clone(),
    )));

    let startup_failures = providers.start_all().await;
    for (id, err) in &startup_failures {
        warn!(provider = %id, error = %err, "provider failed to start");
    }

    let notifications_for_pool = notifications.clone();
    pool.on_change(move |agents| socket_provider::emit_pool_status(&notifications_for_pool, agents));

    let ctx = Arc::new(DaemonCtx {
        tools,
        draft_manager,
        providers: Arc::clone(&providers),
        roles,
        projects_dir: config.projects_dir.clone(),
        clock,
        notifications,
    });

    tokio::spawn(listener::serve(unix_listener, ctx));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("collabotd ready, listening on {}", config.socket_path.display());
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    providers.stop_all().await;
    shutdown(&config);
    info!("collabotd stopped");
    Ok(())
}

/// Checks whether a previous daemon instance is already listening on the
/// configured socket. There is no atomic file lock here (the teacher uses
/// `fs2::FileExt::try_lock_exclusive`, dropped here rather than adding a new
/// dependency for one call site — see `DESIGN.md`): a stale socket file from
/// an unclean shutdown is indistinguishable from a live one except by
/// attempting to connect, so that is the liveness check. A true race between
/// two daemons starting at the same instant is not resolved by this probe;
/// it is guarded at the `collabot` CLI layer instead (`daemon start` refuses
/// to spawn a second `collabotd` it can already reach).
async fn probe_running_instance(config: &Config) -> Option<String> {
    if !config.socket_path.exists() {
        return None;
    }
    if UnixStream::connect(&config.socket_path).await.is_err() {
        return None;
    }
    std::fs::read_to_string(&config.lock_path)
        .ok()
        .map(|pid| pid.trim().to_string())
        .filter(|pid| !pid.is_empty())
        .or_else(|| Some("unknown".to_string()))
}

fn write_pid_file(config: &Config) -> Result<(), ConfigError> {
    std::fs::write(&config.lock_path, format!("{}\n", std::process::id())).map_err(|source| ConfigError::Read {
        path: config.lock_path.clone(),
        source,
    })
}

fn shutdown(config: &Config) {
    if config.socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.socket_path) {
            warn!("failed to remove socket file: {}", e);
        }
    }
    if config.lock_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.lock_path) {
            warn!("failed to remove pid file: {}", e);
        }
    }
    if config.version_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.version_path) {
            warn!("failed to remove version file: {}", e);
        }
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;

fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }
    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

const STARTUP_MARKER_PREFIX: &str = "--- collabotd: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), ConfigError> {
    use std::io::Write;
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Read {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .map_err(|source| ConfigError::Read {
            path: config.log_path.clone(),
            source,
        })?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id()).map_err(|source| ConfigError::Read {
        path: config.log_path.clone(),
        source,
    })?;
    Ok(())
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, ConfigError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Read {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(ConfigError::NoStateDir)?,
        config.log_path.file_name().ok_or(ConfigError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
