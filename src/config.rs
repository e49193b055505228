//! Configuration for GPIOSysV
//!
//! Centralized configuration with the well-known queue identifiers as defaults.

use std::time::Duration;

use crate::error::{GpioError, Result};
use crate::protocol::{
    FRAME_HEADER_SIZE, MAX_MESSAGE_SIZE, REPLY_QUEUE_KEY, REQUEST_QUEUE_KEY, REQUEST_TAG,
};

/// Shared configuration for clients and the server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Queue Configuration
    // -------------------------------------------------------------------------
    /// Key of the request queue (clients send, server receives)
    pub request_queue_key: i32,

    /// Key of the reply queue (server answers queries here)
    pub reply_queue_key: i32,

    /// Message type tag carried by every request
    pub request_tag: i64,

    /// Largest encoded message accepted by either side (bytes)
    pub max_message_size: usize,

    // -------------------------------------------------------------------------
    // Timing Configuration
    // -------------------------------------------------------------------------
    /// How long the server waits on the request queue before re-checking
    /// its running flag (milliseconds)
    pub poll_interval_ms: u64,

    /// How long a client waits for a query reply (milliseconds)
    pub reply_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Correlation Configuration
    // -------------------------------------------------------------------------
    /// Mint a unique reply tag per query instead of the fixed per-kind tags
    pub unique_reply_tags: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_queue_key: REQUEST_QUEUE_KEY,
            reply_queue_key: REPLY_QUEUE_KEY,
            request_tag: REQUEST_TAG,
            max_message_size: MAX_MESSAGE_SIZE,
            poll_interval_ms: 1000,
            reply_timeout_ms: 1000,
            unique_reply_tags: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Server liveness poll window
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Client reply watchdog
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    /// Reject settings no queue could work with
    pub fn validate(&self) -> Result<()> {
        if self.request_queue_key == 0 || self.reply_queue_key == 0 {
            return Err(GpioError::Config("queue keys must be non-zero".to_string()));
        }
        if self.request_queue_key == self.reply_queue_key {
            return Err(GpioError::Config(
                "request and reply queues must use different keys".to_string(),
            ));
        }
        if self.request_tag < 1 {
            return Err(GpioError::Config(format!(
                "request tag {} must be >= 1",
                self.request_tag
            )));
        }
        if self.max_message_size <= FRAME_HEADER_SIZE {
            return Err(GpioError::Config(format!(
                "max message size {} leaves no room for a request",
                self.max_message_size
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(GpioError::Config("poll interval must be positive".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the request queue key
    pub fn request_queue_key(mut self, key: i32) -> Self {
        self.config.request_queue_key = key;
        self
    }

    /// Set the reply queue key
    pub fn reply_queue_key(mut self, key: i32) -> Self {
        self.config.reply_queue_key = key;
        self
    }

    /// Set the request message type tag
    pub fn request_tag(mut self, tag: i64) -> Self {
        self.config.request_tag = tag;
        self
    }

    /// Set the maximum encoded message size (in bytes)
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Set the server poll interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the client reply timeout (in milliseconds)
    pub fn reply_timeout_ms(mut self, ms: u64) -> Self {
        self.config.reply_timeout_ms = ms;
        self
    }

    /// Use per-call reply tags (true) or the fixed per-kind tags (false)
    pub fn unique_reply_tags(mut self, enabled: bool) -> Self {
        self.config.unique_reply_tags = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
