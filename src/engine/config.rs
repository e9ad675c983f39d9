// 10.1: engine configuration. defaults mirror the production job: one-minute
// buckets, lenient about unmapped instruments.

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("bucket width must be positive, got {0}ms")]
    NonPositiveBucketWidth(i64),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub bucket_width_ms: i64,
    // when set, an instrument with no conversion-map row aborts its run
    // instead of assuming USD passthrough
    pub fail_on_unmapped: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bucket_width_ms: 60_000,
            fail_on_unmapped: false,
        }
    }
}

impl EngineConfig {
    pub fn strict() -> Self {
        Self {
            fail_on_unmapped: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_width_ms <= 0 {
            return Err(ConfigError::NonPositiveBucketWidth(self.bucket_width_ms));
        }
        Ok(())
    }
}
