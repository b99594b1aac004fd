//! Configuration and limits for HTTP connections.

/// Resource limits for a single HTTP connection.
///
/// These limits bound memory usage per connection and reject oversized
/// messages before they are buffered in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size of a request or response header block in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_header_size: usize,

    /// Maximum size of a message body in bytes.
    ///
    /// Default: 64 MB (64 * 1024 * 1024)
    pub max_body_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_header_size: 8192,
            max_body_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(max_header_size: usize, max_body_size: usize) -> Self {
        Self {
            max_header_size,
            max_body_size,
        }
    }

    /// Create limits suitable for small embedded systems.
    ///
    /// - Max header block: 4 KB
    /// - Max body: 256 KB
    #[must_use]
    pub const fn embedded() -> Self {
        Self {
            max_header_size: 4096,
            max_body_size: 256 * 1024,
        }
    }

    /// Validate that a header block size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeaderTooLarge`](crate::Error::HeaderTooLarge) if
    /// `size` exceeds the configured maximum.
    pub const fn check_header_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_header_size {
            Err(crate::Error::HeaderTooLarge {
                size,
                max: self.max_header_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a body size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyTooLarge`](crate::Error::BodyTooLarge) if `size`
    /// exceeds the configured maximum.
    pub const fn check_body_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_body_size {
            Err(crate::Error::BodyTooLarge {
                size,
                max: self.max_body_size,
            })
        } else {
            Ok(())
        }
    }
}

/// HTTP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resource limits.
    pub limits: Limits,

    /// Read buffer size (in bytes).
    ///
    /// Default: 8 KB (8192)
    pub read_buffer_size: usize,

    /// Write buffer size (in bytes).
    ///
    /// Default: 8 KB (8192)
    pub write_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            read_buffer_size: 8192,
            write_buffer_size: 8192,
        }
    }
}

impl Config {
    /// Create a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set read buffer size.
    #[must_use]
    pub const fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set write buffer size.
    #[must_use]
    pub const fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Configuration for the server side of a connection.
    #[must_use]
    pub fn server() -> Self {
        Self::default()
    }

    /// Configuration for the client side of a connection.
    #[must_use]
    pub fn client() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default() {
        let limits = Limits::default();
        assert_eq!(limits.max_header_size, 8192);
        assert_eq!(limits.max_body_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_limits_embedded() {
        let limits = Limits::embedded();
        assert_eq!(limits.max_header_size, 4096);
        assert_eq!(limits.max_body_size, 256 * 1024);
    }

    #[test]
    fn test_limits_check_header_size() {
        let limits = Limits::default();
        assert!(limits.check_header_size(1024).is_ok());
        assert!(limits.check_header_size(10000).is_err());
    }

    #[test]
    fn test_limits_check_body_size() {
        let limits = Limits::default();
        assert!(limits.check_body_size(1024).is_ok());
        assert!(limits.check_body_size(100 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_limits(Limits::embedded())
            .with_read_buffer_size(1024)
            .with_write_buffer_size(2048);

        assert_eq!(config.limits.max_header_size, 4096);
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(config.write_buffer_size, 2048);
    }
}
