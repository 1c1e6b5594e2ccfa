//Command line interface
// runtime configuration (uplink port, key, firewall policy, log locations)
use anyhow::{bail, Result};
use clap::Parser;
use shared_protocol::{DEFAULT_KEY_HEX, FRESHNESS_WINDOW_SECS, MIN_PACKET_LEN, TAG_LEN};
use std::fmt;
use std::path::PathBuf;

use crate::firewall::FirewallPolicy;

/// File name prefix of the daily rolling text log in `log_dir`.
pub const LOG_FILE_PREFIX: &str = "satellite_ocs.log";

#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub key_hex: String,
    pub policy: FirewallPolicy,
    pub events_path: PathBuf,
    pub log_dir: PathBuf,
}

// key stays out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("key_hex", &"<redacted>")
            .field("policy", &self.policy)
            .field("events_path", &self.events_path)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "satellite_ocs", about = "On-board uplink firewall")]
pub struct Cli {
    #[arg(long, default_value = "0.0.0.0:7890")]              pub bind_addr: String,
    #[arg(long, default_value = DEFAULT_KEY_HEX)]             pub key_hex: String,
    #[arg(long, default_value_t = FRESHNESS_WINDOW_SECS)]     pub freshness_window_secs: f64,
    #[arg(long, default_value_t = MIN_PACKET_LEN)]            pub min_packet_len: usize,
    #[arg(long, default_value = "logs/security_events.jsonl")] pub events_path: PathBuf,
    #[arg(long, default_value = "logs")]                      pub log_dir: PathBuf,
}

impl Cli {
    pub fn parse_and_build_config() -> Result<Config> {
        <Cli as Parser>::parse().into_config()
    }

    pub fn into_config(self) -> Result<Config> {
        if !self.freshness_window_secs.is_finite() || self.freshness_window_secs < 0.0 {
            bail!("freshness_window_secs must be a finite, non-negative number of seconds");
        }
        // the tag is always the trailing TAG_LEN bytes
        if self.min_packet_len < TAG_LEN {
            bail!("min_packet_len must be at least {TAG_LEN}");
        }
        Ok(Config {
            bind_addr: self.bind_addr,
            key_hex: self.key_hex,
            policy: FirewallPolicy {
                min_packet_len: self.min_packet_len,
                freshness_window_secs: self.freshness_window_secs,
            },
            events_path: self.events_path,
            log_dir: self.log_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_firewall_policy() {
        let cfg = Cli::try_parse_from(["satellite_ocs"]).unwrap().into_config().unwrap();
        assert_eq!(cfg.policy, FirewallPolicy::default());
        assert_eq!(cfg.bind_addr, "0.0.0.0:7890");
        assert_eq!(cfg.key_hex, DEFAULT_KEY_HEX);
    }

    #[test]
    fn rejects_bad_policy() {
        let neg = Cli::try_parse_from(["satellite_ocs", "--freshness-window-secs=-1"]).unwrap();
        assert!(neg.into_config().is_err());

        let short = Cli::try_parse_from(["satellite_ocs", "--min-packet-len", "16"]).unwrap();
        assert!(short.into_config().is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = Cli::try_parse_from(["satellite_ocs", "--key-hex", "deadbeef"])
            .unwrap()
            .into_config()
            .unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("deadbeef"));
        assert!(shown.contains("<redacted>"));
    }
}
