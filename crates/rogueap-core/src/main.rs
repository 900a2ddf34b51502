use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rogueap_core::cli::ApArgs;
use rogueap_core::{AccessPoint, Cli, Commands, HostOps, OutputFormat, RealHostOps};
use rogueap_logging::LoggingConfig;
use serde_json::{json, Value};
use tokio::signal::unix::{signal, SignalKind};

const DEFAULT_ROOT: &str = "/var/lib/rogueap";

fn main() {
    let cli = Cli::parse();
    let format = cli.output_format;
    let root = cli
        .root
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));

    // only a long-running AP persists a logging config; `render` writes nothing at all
    let mut logging = match cli.command {
        Commands::Run(_) => rogueap_logging::fs::read_config(&root),
        Commands::Render(_) => LoggingConfig {
            to_file: false,
            ..rogueap_logging::fs::peek_config(&root)
        },
        Commands::Cleanup | Commands::Check => rogueap_logging::fs::peek_config(&root),
    };
    if let Some(ref level) = cli.log_level {
        logging = logging.with_level(level.clone());
    }
    // Avoid aborting if the log directory is not writable; stderr logging still works.
    let guards = match rogueap_logging::init("rogueap", &root, &logging) {
        Ok(guards) => Some(guards),
        Err(err) => {
            eprintln!("failed to init logging: {err}");
            None
        }
    };

    if let Err(err) = run(cli.command, format, &root) {
        emit_error(format, &err);
        drop(guards);
        std::process::exit(1);
    }
}

fn run(command: Commands, output_format: OutputFormat, root: &Path) -> Result<()> {
    let (message, data) = match command {
        Commands::Run(args) => run_ap(&args, root)?,
        Commands::Render(args) => render(&args)?,
        Commands::Cleanup => cleanup(),
        Commands::Check => check(),
    };
    emit_success(output_format, message, data)
}

fn run_ap(args: &ApArgs, root: &Path) -> Result<(String, Value)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;

    runtime.block_on(async {
        // Register before starting so an interrupt during startup still reaches cleanup.
        let mut sigterm =
            signal(SignalKind::terminate()).context("registering SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt()).context("registering SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("registering SIGHUP handler")?;

        let mut ap = AccessPoint::new();
        args.configure(&mut ap);

        let outcome = ap.start().context("starting access point")?;
        if let Err(err) = outcome.clone().require_interface_ready() {
            if args.strict_interface {
                let report = ap.stop();
                tracing::debug!("cleanup after interface check: {:?}", report);
                return Err(err).context("configuring AP interface");
            }
            tracing::warn!("{}; continuing anyway", err);
        }

        tracing::info!(
            "Access point '{}' up on {} via {} (pid {}); waiting for SIGINT/SIGTERM",
            args.essid,
            args.interface,
            outcome.backend,
            outcome.pid
        );

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down access point");
                    break;
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, shutting down access point");
                    break;
                }
                _ = sighup.recv() => reload_logging(root),
            }
        }

        let report = ap.stop();
        Ok::<_, anyhow::Error>((
            format!("Access point '{}' stopped", args.essid),
            json!({
                "backend": outcome.backend.to_string(),
                "pid": outcome.pid,
                "interface_ready": outcome.interface.is_ready(),
                "cleanup": report,
            }),
        ))
    })
}

fn reload_logging(root: &Path) {
    let cfg = rogueap_logging::fs::read_config(root);
    match rogueap_logging::apply(&cfg) {
        Ok(()) => tracing::info!("Reloaded logging config (level={})", cfg.level),
        Err(err) => tracing::warn!("Logging reload failed: {:#}", err),
    }
}

fn render(args: &ApArgs) -> Result<(String, Value)> {
    let mut ap = AccessPoint::new();
    args.configure(&mut ap);

    let hostapd = ap.compose_hostapd()?;
    let dnsmasq = ap.compose_dnsmasq()?;
    let settings = ap.settings();
    let hostapd_conf = hostapd.render(&settings.deny_macs_path);
    let dnsmasq_conf = dnsmasq.render();

    Ok((
        format!(
            "# {}\n{}\n# {}\n{}",
            settings.hostapd_conf_path.display(),
            hostapd_conf,
            settings.dhcp_conf_path.display(),
            dnsmasq_conf
        ),
        json!({
            "hostapd": hostapd_conf,
            "deny_list": hostapd.render_deny_list(),
            "dnsmasq": dnsmasq_conf,
        }),
    ))
}

fn cleanup() -> (String, Value) {
    let report = AccessPoint::new().stop();
    let message = if report.is_clean() {
        "Cleanup complete".to_string()
    } else {
        format!("Cleanup finished with {} failed step(s)", report.failures.len())
    };
    (message, json!(report))
}

fn check() -> (String, Value) {
    let settings = rogueap_core::ControllerSettings::from_env();
    let host = RealHostOps;
    let mut tools = serde_json::Map::new();
    let mut missing = Vec::new();
    for bin in [
        &settings.dnsmasq_bin,
        &settings.hostapd_bin,
        &settings.roguehostapd_bin,
        &settings.ip_bin,
    ] {
        let found = host.locate(bin);
        if found.is_none() {
            missing.push(bin.clone());
        }
        tools.insert(
            bin.clone(),
            found.map_or(Value::Null, |p| Value::String(p.display().to_string())),
        );
    }

    // leftovers from a previous run that `cleanup` would kill
    let mut running = serde_json::Map::new();
    for bin in [
        &settings.dnsmasq_bin,
        &settings.hostapd_bin,
        &settings.roguehostapd_bin,
    ] {
        let name = rogueap_core::host::process_name(bin);
        match rogueap_core::process::running(name) {
            Ok(found) => {
                let pids: Vec<i32> = found.iter().map(|p| p.pid).collect();
                running.insert(name.to_string(), json!(pids));
            }
            Err(err) => tracing::warn!("Could not scan for {}: {}", name, err),
        }
    }

    let mut message = if missing.is_empty() {
        "All external tools found".to_string()
    } else {
        format!("Missing: {}", missing.join(", "))
    };
    let busy: Vec<&str> = running
        .iter()
        .filter(|(_, pids)| pids.as_array().is_some_and(|a| !a.is_empty()))
        .map(|(name, _)| name.as_str())
        .collect();
    if !busy.is_empty() {
        message.push_str(&format!("; already running: {}", busy.join(", ")));
    }
    (message, json!({ "tools": tools, "running": running }))
}

fn emit_success(format: OutputFormat, message: String, data: Value) -> Result<()> {
    emit_payload(format, "ok", message, data)
}

fn emit_error(format: OutputFormat, err: &anyhow::Error) {
    let details: Vec<String> = err.chain().map(|cause| cause.to_string()).collect();
    let payload = json!({
        "status": "error",
        "message": err.to_string(),
        "details": details,
        "data": Value::Null,
    });

    match format {
        OutputFormat::Json => println!("{}", payload),
        OutputFormat::Text => {
            eprintln!("Error: {}", err);
            if details.len() > 1 {
                for detail in details.iter().skip(1) {
                    eprintln!("  -> {}", detail);
                }
            }
        }
    }
}

fn emit_payload(format: OutputFormat, status: &str, message: String, data: Value) -> Result<()> {
    let payload = json!({
        "status": status,
        "message": message,
        "data": data,
    });

    match format {
        OutputFormat::Json => println!("{}", payload),
        OutputFormat::Text => {
            println!("{}", payload["message"].as_str().unwrap_or_default());
        }
    }
    Ok(())
}
