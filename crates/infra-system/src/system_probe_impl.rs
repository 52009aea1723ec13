// System probe implementation
// sysinfo-backed, cross-platform read-only resource inspection

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use sysinfo::{Networks, System};
use tracing::debug;

use opsmedic_core::port::{CpuStats, MemoryStats, NetworkInterfaceStats, SystemProbe};

/// System probe implementation using sysinfo
pub struct SystemProbeImpl {
    system: Arc<Mutex<System>>,
}

impl SystemProbeImpl {
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new_all())),
        }
    }
}

impl Default for SystemProbeImpl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemProbe for SystemProbeImpl {
    async fn cpu(&self) -> CpuStats {
        let mut sys = self.system.lock().unwrap();
        sys.refresh_cpu();

        let cpus = sys.cpus();
        let model = cpus
            .first()
            .map(|c| c.brand().to_string())
            .unwrap_or_default();
        let frequency_mhz = cpus.first().map(|c| c.frequency()).unwrap_or(0);
        let usage_percent = sys.global_cpu_info().cpu_usage();

        // zeros on platforms without load averages (Windows)
        let load = System::load_average();

        let stats = CpuStats {
            cores: cpus.len(),
            model,
            frequency_mhz,
            usage_percent,
            load_avg: [load.one, load.five, load.fifteen],
        };

        debug!(cores = %stats.cores, usage = %stats.usage_percent, "CPU stats collected");
        stats
    }

    async fn memory(&self) -> MemoryStats {
        let mut sys = self.system.lock().unwrap();
        sys.refresh_memory();

        let total = sys.total_memory();
        let free = sys.free_memory();
        let used = total.saturating_sub(free);

        MemoryStats {
            total_mb: total / 1024 / 1024,
            free_mb: free / 1024 / 1024,
            used_mb: used / 1024 / 1024,
            usage_percent: if total > 0 { used * 100 / total } else { 0 },
        }
    }

    async fn network_interfaces(&self) -> Vec<NetworkInterfaceStats> {
        let networks = Networks::new_with_refreshed_list();

        networks
            .iter()
            .map(|(name, data)| NetworkInterfaceStats {
                name: name.clone(),
                mac_address: data.mac_address().to_string(),
                total_received_bytes: data.total_received(),
                total_transmitted_bytes: data.total_transmitted(),
            })
            .collect()
    }
}
