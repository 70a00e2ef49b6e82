// src/cli.rs

use clap::Parser;

use crate::config::Settings;
use crate::core::models::ProbeKind;

/// Probe up to five hosts for TLS, DNS and liveness problems.
#[derive(Parser, Debug)]
#[command(name = "hostscope", version, about)]
pub struct Cli {
    /// Domains or URLs to probe (at most 5). Opens the interactive UI when omitted.
    pub targets: Vec<String>,

    /// Read a JSON batch body (`{"targets": [...]}`) from stdin instead of arguments.
    #[arg(long, conflicts_with = "targets")]
    pub stdin: bool,

    /// Print the batch report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Mirror log events to stderr in headless runs.
    #[arg(short, long)]
    pub verbose: bool,

    /// Seconds any single probe may run before it is reported as timed out.
    #[arg(short, long, env = "HOSTSCOPE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Comma-separated probes to run: ssl, dns, status, headers, tech, wordpress.
    #[arg(short, long, value_delimiter = ',', env = "HOSTSCOPE_PROBES")]
    pub probes: Option<Vec<ProbeKind>>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        self.targets.is_empty() && !self.stdin
    }

    /// Stderr is shared with the UI in interactive mode, so it is never echoed there.
    pub fn echo_logs(&self) -> bool {
        self.verbose && !self.is_interactive()
    }

    /// Layers command-line overrides on top of file settings.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(timeout) = self.timeout {
            settings.probe_timeout_secs = timeout;
        }
        if let Some(probes) = &self.probes {
            settings.probes = probes.clone();
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from(["hostscope", "example.com", "--timeout", "7", "--probes", "dns,tech"]);
        let settings = cli.apply(Settings::default());

        assert_eq!(cli.targets, vec!["example.com"]);
        assert!(!cli.is_interactive());
        assert_eq!(settings.probe_timeout_secs, 7);
        assert_eq!(settings.probes, vec![ProbeKind::Dns, ProbeKind::Tech]);
    }

    #[test]
    fn no_targets_means_interactive() {
        let cli = Cli::parse_from(["hostscope"]);
        assert!(cli.is_interactive());
        assert_eq!(cli.apply(Settings::default()), Settings::default());
    }

    #[test]
    fn stdin_runs_headless() {
        let cli = Cli::parse_from(["hostscope", "--stdin", "--json"]);
        assert!(cli.stdin);
        assert!(!cli.is_interactive());
    }

    #[test]
    fn stdin_and_positional_targets_are_exclusive() {
        assert!(Cli::try_parse_from(["hostscope", "--stdin", "a.com"]).is_err());
    }

    #[test]
    fn logs_are_echoed_only_outside_the_ui() {
        assert!(Cli::parse_from(["hostscope", "-v", "a.com"]).echo_logs());
        assert!(!Cli::parse_from(["hostscope", "-v"]).echo_logs());
        assert!(!Cli::parse_from(["hostscope", "a.com"]).echo_logs());
    }

    #[test]
    fn unknown_probe_is_a_usage_error() {
        assert!(Cli::try_parse_from(["hostscope", "a.com", "--probes", "ssl,whois"]).is_err());
    }
}
