// src/logging.rs

use color_eyre::eyre::{Result, WrapErr};
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::fs::File;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DIRECTIVE: &str = concat!(env!("CARGO_CRATE_NAME"), "=info");

lazy_static! {
    /// Consulted when `RUST_LOG` is unset or blank.
    static ref LEVEL_VAR: String = format!("{}_LOGLEVEL", env!("CARGO_CRATE_NAME").to_uppercase());
}

pub(crate) fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "hostscope", env!("CARGO_PKG_NAME"))
}

fn data_dir() -> PathBuf {
    match project_directory() {
        Some(proj_dirs) => proj_dirs.data_local_dir().to_path_buf(),
        None => PathBuf::from(".").join(".data"),
    }
}

fn log_path(directory: &Path) -> PathBuf {
    directory.join(concat!(env!("CARGO_PKG_NAME"), ".log"))
}

/// First non-blank of `RUST_LOG` and `HOSTSCOPE_LOGLEVEL`, else `hostscope=info`.
fn filter_directive(var: impl Fn(&str) -> Option<String>) -> String {
    ["RUST_LOG", LEVEL_VAR.as_str()]
        .into_iter()
        .filter_map(|name| var(name))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

/// Starts the file log and returns its path. Each run truncates the previous log.
///
/// The terminal belongs to the UI or to the report on stdout, so events are only
/// mirrored to stderr when `echo_to_stderr` is set.
pub fn initialize_logging(echo_to_stderr: bool) -> Result<PathBuf> {
    let directory = data_dir();
    std::fs::create_dir_all(&directory)
        .wrap_err_with(|| format!("cannot create log directory {}", directory.display()))?;
    let path = log_path(&directory);
    let file = File::create(&path).wrap_err_with(|| format!("cannot open log file {}", path.display()))?;

    let directive = filter_directive(|name| std::env::var(name).ok());

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_timer(LocalTime::new(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        )))
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(&directive));

    let stderr_layer = echo_to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .compact()
            .with_filter(EnvFilter::new(&directive))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(ErrorLayer::default())
        .try_init()
        .wrap_err("a global subscriber is already installed")?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn rust_log_wins_over_the_app_variable() {
        let directive = filter_directive(lookup(&[("RUST_LOG", "debug"), ("HOSTSCOPE_LOGLEVEL", "warn")]));
        assert_eq!(directive, "debug");
    }

    #[test]
    fn blank_rust_log_falls_through() {
        let directive = filter_directive(lookup(&[("RUST_LOG", "  "), ("HOSTSCOPE_LOGLEVEL", "hostscope=trace")]));
        assert_eq!(directive, "hostscope=trace");
    }

    #[test]
    fn default_directive_targets_this_crate() {
        assert_eq!(filter_directive(lookup(&[])), "hostscope=info");
    }

    #[test]
    fn log_file_is_named_after_the_package() {
        assert_eq!(log_path(Path::new("/var/log")), PathBuf::from("/var/log/hostscope.log"));
    }
}
