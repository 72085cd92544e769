//! Scan configuration

use std::time::Duration;

use felica_cards::StationLayoutRevision;

/// Settings for one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upper bound for a single card exchange
    pub transceive_timeout: Duration,
    /// Pause between single-block reads, keeps the radio link stable
    pub inter_read_delay: Duration,
    /// RAPICA station field layout to decode with
    pub station_layout: StationLayoutRevision,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            transceive_timeout: Duration::from_millis(3000),
            inter_read_delay: Duration::from_millis(30),
            station_layout: StationLayoutRevision::V2,
        }
    }
}

impl ScanConfig {
    /// Set the per-exchange timeout
    pub fn transceive_timeout(mut self, timeout: Duration) -> Self {
        self.transceive_timeout = timeout;
        self
    }

    /// Set the pause between block reads
    pub fn inter_read_delay(mut self, delay: Duration) -> Self {
        self.inter_read_delay = delay;
        self
    }

    /// Set the RAPICA station layout revision
    pub fn station_layout(mut self, revision: StationLayoutRevision) -> Self {
        self.station_layout = revision;
        self
    }
}
