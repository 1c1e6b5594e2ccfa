// src/crypto.rs: shared-secret loading for the uplink firewall
use std::sync::Arc;
use anyhow::{Context, Result};
use shared_protocol::Authenticator;
use tracing::warn;
use crate::config::Config;

/// HMAC-SHA256 accepts any key, but anything under the digest size is weak.
const RECOMMENDED_KEY_LEN: usize = 32;

pub fn load_authenticator(cfg: &Config) -> Result<Arc<Authenticator>> {
    let key = hex::decode(cfg.key_hex.trim()).context("invalid key_hex")?;
    if key.len() < RECOMMENDED_KEY_LEN {
        warn!(len = key.len(), "uplink key shorter than {RECOMMENDED_KEY_LEN} bytes");
    }
    let auth = Authenticator::new(&key).context("building uplink authenticator")?;
    Ok(Arc::new(auth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use clap::Parser;

    fn cfg_with_key(key_hex: &str) -> Config {
        Cli::try_parse_from(["satellite_ocs", "--key-hex", key_hex])
            .unwrap()
            .into_config()
            .unwrap()
    }

    #[test]
    fn loads_default_key() {
        let cfg = Cli::try_parse_from(["satellite_ocs"]).unwrap().into_config().unwrap();
        let auth = load_authenticator(&cfg).unwrap();
        let expected = Authenticator::new(b"TOP_SECRET_SATELLITE_KEY_2024").unwrap();
        assert_eq!(auth.sign(b"ping"), expected.sign(b"ping"));
    }

    #[test]
    fn rejects_bad_hex_and_empty_keys() {
        assert!(load_authenticator(&cfg_with_key("not-hex")).is_err());
        assert!(load_authenticator(&cfg_with_key("")).is_err());
    }
}
