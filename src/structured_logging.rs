//! Structured logging for batch submissions

use uuid::Uuid;

/// Emits submission events tagged with one correlation id
#[derive(Debug, Clone)]
pub struct BatchLogger {
    correlation_id: String,
}

impl BatchLogger {
    /// Logger with a fresh UUID v4 correlation id
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn log_planned(&self, asset: &str, recipients: usize, instructions: usize, creations: usize) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            asset = %asset,
            recipients,
            instructions,
            accounts_created = creations,
            "Batch planned"
        );
    }

    pub fn log_submitting(&self, size_bytes: usize) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            size_bytes,
            "Submitting batch"
        );
    }

    pub fn log_oversized(&self, size_bytes: usize, limit: usize) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            size_bytes,
            limit,
            "Transaction exceeds packet size and will likely be rejected"
        );
    }

    pub fn log_success(&self, signature: &str, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            latency_ms,
            "Batch confirmed"
        );
    }

    /// `broadcast` is true when the transaction left the signer before failing
    pub fn log_failure(&self, category: &str, error: &str, broadcast: bool, latency_ms: u64) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            category = %category,
            error = %error,
            broadcast,
            latency_ms,
            "Batch failed"
        );
    }
}

impl Default for BatchLogger {
    fn default() -> Self {
        Self::new()
    }
}
