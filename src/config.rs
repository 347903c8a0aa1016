/// Runtime configuration for a creel instance.
#[derive(Debug, Clone)]
pub struct CreelConfig {
    /// Maximum number of requests accepted in one batch call.
    pub max_batch_requests: usize,
    pub max_key_bytes: usize,
    pub max_value_bytes: usize,
}

impl Default for CreelConfig {
    fn default() -> Self {
        Self {
            max_batch_requests: 1_000,
            max_key_bytes: 1024,
            max_value_bytes: 1024 * 1024,
        }
    }
}

impl CreelConfig {
    pub fn with_max_batch_requests(mut self, max_batch_requests: usize) -> Self {
        self.max_batch_requests = max_batch_requests;
        self
    }

    pub fn with_max_key_bytes(mut self, max_key_bytes: usize) -> Self {
        self.max_key_bytes = max_key_bytes;
        self
    }

    pub fn with_max_value_bytes(mut self, max_value_bytes: usize) -> Self {
        self.max_value_bytes = max_value_bytes;
        self
    }
}
