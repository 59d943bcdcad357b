//! Radio config client builder.
//!
//! Provides a fluent builder API for configuring a [`RadioConfigClient`]
//! with candidate versions, attribution and discovery retry settings.

use crate::{
    HalVersion, RadioConfigClient, Result, RetryConfig, ServiceProviderPtr, SessionConfig,
    WorkSource,
};
use std::time::Duration;

/// Builder for creating radio config clients.
///
/// Starts from [`SessionConfig::default`] or a loaded configuration and
/// allows individual settings to be overridden.
///
/// # Examples
///
/// ## Client with discovery retry
/// ```no_run
/// use radio_config_rpc::{HalVersion, MemoryHub, RadioConfigBuilder};
/// use std::time::Duration;
///
/// # fn example() -> radio_config_rpc::Result<()> {
/// let hub = MemoryHub::new();
///
/// let client = RadioConfigBuilder::new(hub)
///     .candidate_versions([HalVersion::V1_1, HalVersion::V1_0])
///     .discovery_retry_max_attempts(5)
///     .discovery_retry_initial_delay(Duration::from_millis(200))
///     .build()?;
/// # Ok(())
/// # }
/// ```
///
/// ## Device without a mobile network
/// ```no_run
/// use radio_config_rpc::{MemoryHub, RadioConfigBuilder};
///
/// # fn example() -> radio_config_rpc::Result<()> {
/// let client = RadioConfigBuilder::new(MemoryHub::new())
///     .mobile_network_supported(false)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RadioConfigBuilder {
    // ---
    provider: ServiceProviderPtr,
    config: SessionConfig,

    // Retry configuration (all optional)
    retry_max_attempts: Option<u32>,
    retry_multiplier: Option<f32>,
    retry_initial_delay: Option<Duration>,
    retry_max_delay: Option<Duration>,
}

impl RadioConfigBuilder {
    /// Create a new client builder over `provider`.
    pub fn new(provider: ServiceProviderPtr) -> Self {
        // ---
        Self {
            provider,
            config: SessionConfig::default(),
            retry_max_attempts: None,
            retry_multiplier: None,
            retry_initial_delay: None,
            retry_max_delay: None,
        }
    }

    /// Start from a complete configuration, e.g. one loaded with
    /// [`SessionConfig::from_json`].
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the service versions to probe.
    ///
    /// Default: 1.3, 1.1, 1.0.
    pub fn candidate_versions(mut self, versions: impl IntoIterator<Item = HalVersion>) -> Self {
        self.config.candidate_versions = versions.into_iter().collect();
        self
    }

    /// Declare whether the device has a mobile network.
    ///
    /// Default: true.
    pub fn mobile_network_supported(mut self, supported: bool) -> Self {
        self.config.mobile_network_supported = supported;
        self
    }

    /// Set the attribution recorded on every request.
    pub fn work_source(mut self, work_source: WorkSource) -> Self {
        self.config.work_source = work_source;
        self
    }

    /// Set the capacity of the slot-status indication inbox.
    ///
    /// Default: 16.
    pub fn indication_buffer(mut self, capacity: usize) -> Self {
        self.config.indication_buffer = capacity;
        self
    }

    /// Set maximum discovery retry attempts.
    ///
    /// Default: no retries (single probe pass).
    pub fn discovery_retry_max_attempts(mut self, attempts: u32) -> Self {
        self.retry_max_attempts = Some(attempts);
        self
    }

    /// Set discovery retry backoff multiplier.
    ///
    /// Default: 2.0 (exponential backoff).
    pub fn discovery_retry_multiplier(mut self, multiplier: f32) -> Self {
        self.retry_multiplier = Some(multiplier);
        self
    }

    /// Set initial delay before the first discovery retry.
    ///
    /// Default: 100ms.
    pub fn discovery_retry_initial_delay(mut self, delay: Duration) -> Self {
        self.retry_initial_delay = Some(delay);
        self
    }

    /// Set maximum delay between discovery retries.
    ///
    /// Default: 5s.
    pub fn discovery_retry_max_delay(mut self, delay: Duration) -> Self {
        self.retry_max_delay = Some(delay);
        self
    }

    /// Build the client (consumes self).
    ///
    /// No connection is made until the first request.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::MissingConfig`](crate::RpcError::MissingConfig) or
    /// [`RpcError::Config`](crate::RpcError::Config) for an invalid
    /// configuration.
    pub fn build(self) -> Result<RadioConfigClient> {
        // ---
        let mut config = self.config;

        // Override retry config only if at least one retry parameter was set
        if self.retry_max_attempts.is_some()
            || self.retry_multiplier.is_some()
            || self.retry_initial_delay.is_some()
            || self.retry_max_delay.is_some()
        {
            let base = config.discovery_retry.take().unwrap_or_default();
            config.discovery_retry = Some(RetryConfig {
                max_attempts: self.retry_max_attempts.unwrap_or(base.max_attempts),
                multiplier: self.retry_multiplier.unwrap_or(base.multiplier),
                initial_delay: self.retry_initial_delay.unwrap_or(base.initial_delay),
                max_delay: self.retry_max_delay.unwrap_or(base.max_delay),
            });
        }

        config.validate()?;

        Ok(RadioConfigClient::new(self.provider, &config))
    }
}
