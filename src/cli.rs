//! CLI gateway (§4.I, §6). A single flag set, not a subcommand tree: the
//! program this is modeled on took flags only.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "cliap2", about = "AirPlay 2 pipe-input streaming client", disable_version_flag = true)]
pub struct Cli {
    /// Log verbosity 0-5.
    #[arg(long)]
    pub loglevel: Option<u8>,

    /// Comma-separated list of log domains to enable.
    #[arg(long, value_name = "csv")]
    pub logdomains: Option<String>,

    /// Config file path.
    #[arg(long, value_name = "file")]
    pub config: Option<PathBuf>,

    /// Device name advertised to the receiver.
    #[arg(long, default_value = "cliap2")]
    pub name: String,

    /// Receiver hostname or IP. Required unless `--testrun`/`--ntp`/
    /// `--version`/`--check` is given.
    #[arg(long)]
    pub hostname: Option<String>,

    /// Local bind address.
    #[arg(long, default_value = "0.0.0.0")]
    pub address: String,

    /// Receiver port.
    #[arg(long, default_value_t = 7000)]
    pub port: u16,

    /// Quoted `"KEY=VALUE"` pairs, whitespace separated.
    #[arg(long, default_value = "")]
    pub txt: String,

    /// Audio FIFO path. Required unless `--testrun`/`--ntp`/`--version`/
    /// `--check` is given.
    #[arg(long)]
    pub pipe: Option<PathBuf>,

    /// Print current NTP time as a decimal u64 and exit 0.
    #[arg(long)]
    pub ntp: bool,

    /// Target NTP start instant. Defaults to now.
    #[arg(long)]
    pub ntpstart: Option<u64>,

    /// Extra delay in milliseconds added to `ntpstart`.
    #[arg(long, default_value_t = 0)]
    pub wait: u64,

    /// Applied latency in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub latency: u64,

    /// Initial volume, 0-100.
    #[arg(long, default_value_t = 75)]
    pub volume: u8,

    /// Print version and exit 0.
    #[arg(long, short = 'v')]
    pub version: bool,

    /// CI smoke test: create and remove the testrun FIFOs, then exit.
    #[arg(long)]
    pub testrun: bool,

    /// Print `<pkg> check` and exit 0.
    #[arg(long)]
    pub check: bool,

    /// Legacy 0-9 debug level, mapped onto `--loglevel` when the latter is
    /// not given.
    #[arg(long, value_name = "0-9")]
    pub debug: Option<u8>,

    /// Advertise 48kHz/24-bit pipe quality instead of the negotiated
    /// default (experimental).
    #[arg(long)]
    pub alac24bit: bool,
}

/// Map a legacy `--debug 0-9` level onto the 0-5 `--loglevel` scale.
pub fn debug_to_loglevel(debug: u8) -> u8 {
    ((debug as u16 * 5) / 9) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn debug_level_maps_into_0_5_range() {
        assert_eq!(debug_to_loglevel(0), 0);
        assert_eq!(debug_to_loglevel(9), 5);
        assert!(debug_to_loglevel(4) <= 5);
    }

    #[test]
    fn parses_minimal_normal_mode_args() {
        let cli = Cli::parse_from(["cliap2", "--hostname", "192.0.2.5", "--pipe", "/tmp/a"]);
        assert_eq!(cli.hostname.as_deref(), Some("192.0.2.5"));
        assert_eq!(cli.port, 7000);
        assert_eq!(cli.volume, 75);
    }
}
