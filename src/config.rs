//! Public, substrate-agnostic session configuration.
//!
//! This type intentionally contains no transport-specific concepts. It can be
//! built in code or loaded from JSON:
//!
//! ```
//! use radio_config_rpc::{HalVersion, SessionConfig};
//!
//! let config = SessionConfig::from_json(r#"{
//!     "candidate_versions": [{ "major": 1, "minor": 1 }, { "major": 1, "minor": 0 }],
//!     "five_g_standalone": true
//! }"#).unwrap();
//!
//! assert_eq!(config.candidate_versions[0], HalVersion::V1_1);
//! assert!(config.mobile_network_supported);
//! ```

use serde::{Deserialize, Serialize};

use crate::{HalVersion, NrCapability, Result, RetryConfig, RpcError, WorkSource};

/// Radio config session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    // ---
    /// Service versions to probe, tried newest first.
    ///
    /// Default: 1.3, 1.1, 1.0
    pub candidate_versions: Vec<HalVersion>,

    /// Whether this deployment has a mobile network at all.
    ///
    /// When false (e.g. Wi-Fi only devices) the service is never probed and
    /// every request fails with `Unavailable`.
    ///
    /// Default: true
    pub mobile_network_supported: bool,

    /// Attribution recorded on every request.
    pub work_source: WorkSource,

    /// Device is configured for 5G standalone.
    pub five_g_standalone: bool,

    /// Device is configured for 5G non-standalone.
    pub five_g_non_standalone: bool,

    /// Optional retry of transient discovery failures.
    ///
    /// Default: `None` (one probe pass per acquire)
    pub discovery_retry: Option<RetryConfig>,

    /// Capacity of the slot-status indication inbox.
    ///
    /// Default: 16
    pub indication_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        // ---
        Self {
            candidate_versions: vec![HalVersion::V1_3, HalVersion::V1_1, HalVersion::V1_0],
            mobile_network_supported: true,
            work_source: WorkSource::default(),
            five_g_standalone: false,
            five_g_non_standalone: false,
            discovery_retry: None,
            indication_buffer: 16,
        }
    }
}

impl SessionConfig {
    // ---

    /// Parse a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Config`] on malformed JSON or an invalid value.
    pub fn from_json(json: &str) -> Result<Self> {
        // ---
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        // ---
        if self.candidate_versions.is_empty() {
            return Err(RpcError::MissingConfig("candidate_versions".into()));
        }
        if self.indication_buffer == 0 {
            return Err(RpcError::Config("indication_buffer must be non-zero".into()));
        }
        Ok(())
    }

    /// 5G capabilities the device is configured for, NSA before SA.
    pub fn device_nr_capabilities(&self) -> Vec<NrCapability> {
        // ---
        let mut caps = Vec::new();
        if self.five_g_non_standalone {
            caps.push(NrCapability::Nsa);
        }
        if self.five_g_standalone {
            caps.push(NrCapability::Sa);
        }
        caps
    }
}
