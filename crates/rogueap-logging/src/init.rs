use std::path::Path;

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_log::LogTracer;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::targets::{T_AP, T_DHCP};

static RELOAD: OnceCell<reload::Handle<EnvFilter, Registry>> = OnceCell::new();

/// Keeps the non-blocking file writers flushing; hold until exit.
pub struct LoggingGuards {
    _file_guards: Vec<WorkerGuard>,
}

/// Install the global subscriber.
///
/// Records go to stderr and, when `cfg.to_file` is set, to daily files under
/// `<root>/logs`: `<component>.log` for general records, `ap.log` and
/// `dhcp.log` for the two daemon targets.
pub fn init(component: &str, root: &Path, cfg: &LoggingConfig) -> Result<LoggingGuards> {
    let (filter_layer, handle) = reload::Layer::new(build_filter(cfg));
    let _ = RELOAD.set(handle);

    let base = tracing_subscriber::registry()
        .with(filter_layer)
        .with(ErrorLayer::default())
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact(),
        );

    let log_dir = root.join("logs");
    let file_error = if cfg.to_file {
        std::fs::create_dir_all(&log_dir).err()
    } else {
        None
    };

    if !cfg.to_file || file_error.is_some() {
        base.try_init().ok();
        let _ = LogTracer::init();
        if let Some(err) = file_error {
            tracing::warn!("File logging disabled ({}): {}", log_dir.display(), err);
        }
        return Ok(LoggingGuards {
            _file_guards: Vec::new(),
        });
    }

    let general = Targets::new()
        .with_default(LevelFilter::TRACE)
        .with_target(T_AP, LevelFilter::OFF)
        .with_target(T_DHCP, LevelFilter::OFF);
    let (general_layer, general_guard) =
        file_layer(&log_dir, &format!("{component}.log"), general);
    let (ap_layer, ap_guard) = file_layer(&log_dir, "ap.log", only(T_AP));
    let (dhcp_layer, dhcp_guard) = file_layer(&log_dir, "dhcp.log", only(T_DHCP));

    base.with(general_layer)
        .with(ap_layer)
        .with(dhcp_layer)
        .try_init()
        .ok();
    let _ = LogTracer::init();

    Ok(LoggingGuards {
        _file_guards: vec![general_guard, ap_guard, dhcp_guard],
    })
}

/// Swap the active filter after `init`.
pub fn apply(cfg: &LoggingConfig) -> Result<()> {
    let handle = RELOAD
        .get()
        .ok_or_else(|| anyhow!("logging not initialized"))?;
    handle.reload(build_filter(cfg))?;
    Ok(())
}

fn build_filter(cfg: &LoggingConfig) -> EnvFilter {
    if !cfg.enabled {
        return EnvFilter::new("off");
    }
    EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn only(target: &'static str) -> Targets {
    Targets::new().with_target(target, LevelFilter::TRACE)
}

fn file_layer<S>(
    log_dir: &Path,
    filename: &str,
    targets: Targets,
) -> (impl Layer<S> + Send + Sync, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, filename));
    let layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_writer(writer)
        .with_filter(targets);
    (layer, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_turns_everything_off() {
        let cfg = LoggingConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(build_filter(&cfg).to_string(), "off");
    }

    #[test]
    fn bad_level_falls_back_to_info() {
        let cfg = LoggingConfig::default().with_level("rogueap=verbose");
        assert_eq!(build_filter(&cfg).to_string(), "info");
    }

    #[test]
    fn apply_before_init_is_an_error() {
        // RELOAD is only set by `init`, which no test in this crate calls
        assert!(apply(&LoggingConfig::default()).is_err());
    }
}
