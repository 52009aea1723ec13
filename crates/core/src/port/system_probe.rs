// System Resource Monitoring Port

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// CPU information and load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuStats {
    pub cores: usize,
    pub model: String,
    pub frequency_mhz: u64,
    pub usage_percent: f32,
    /// 1/5/15 minute load averages (zeros where the platform lacks them)
    pub load_avg: [f64; 3],
}

/// Memory totals in megabytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_mb: u64,
    pub free_mb: u64,
    pub used_mb: u64,
    pub usage_percent: u64,
}

/// Per-interface traffic counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterfaceStats {
    pub name: String,
    pub mac_address: String,
    pub total_received_bytes: u64,
    pub total_transmitted_bytes: u64,
}

/// System probe port for read-only resource inspection
#[async_trait]
pub trait SystemProbe: Send + Sync {
    async fn cpu(&self) -> CpuStats;

    async fn memory(&self) -> MemoryStats;

    /// Enumerate network interfaces with their traffic counters
    async fn network_interfaces(&self) -> Vec<NetworkInterfaceStats>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Mock SystemProbe returning fixed metrics
    pub struct MockSystemProbe;

    #[async_trait]
    impl SystemProbe for MockSystemProbe {
        async fn cpu(&self) -> CpuStats {
            CpuStats {
                cores: 8,
                model: "Mock CPU".to_string(),
                frequency_mhz: 2400,
                usage_percent: 12.5,
                load_avg: [0.5, 0.4, 0.3],
            }
        }

        async fn memory(&self) -> MemoryStats {
            MemoryStats {
                total_mb: 16384,
                free_mb: 8192,
                used_mb: 8192,
                usage_percent: 50,
            }
        }

        async fn network_interfaces(&self) -> Vec<NetworkInterfaceStats> {
            vec![NetworkInterfaceStats {
                name: "lo0".to_string(),
                mac_address: "00:00:00:00:00:00".to_string(),
                total_received_bytes: 1024,
                total_transmitted_bytes: 1024,
            }]
        }
    }
}
