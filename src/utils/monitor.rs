use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub phase_time: Duration,
    pub elapsed_time: Duration,
}

/// 每個 ETL 階段結束時記錄行程資源用量
pub struct RunMonitor {
    /// 未啟用監控時為 `None`
    #[cfg(feature = "cli")]
    system: Option<Mutex<System>>,
    #[cfg(feature = "cli")]
    pid: Option<Pid>,
    #[cfg(feature = "cli")]
    peak_memory: Mutex<u64>,
    start_time: Instant,
    phase_start: Mutex<Instant>,
}

impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        #[cfg(not(feature = "cli"))]
        let _ = enabled;

        let now = Instant::now();
        Self {
            #[cfg(feature = "cli")]
            system: enabled
                .then(|| Mutex::new(System::new_with_specifics(RefreshKind::everything()))),
            #[cfg(feature = "cli")]
            pid: sysinfo::get_current_pid().ok(),
            #[cfg(feature = "cli")]
            peak_memory: Mutex::new(0),
            start_time: now,
            phase_start: Mutex::new(now),
        }
    }

    /// 標記新階段開始
    pub fn start_phase(&self) {
        if let Ok(mut start) = self.phase_start.lock() {
            *start = Instant::now();
        }
    }

    #[cfg(feature = "cli")]
    fn sample(&self) -> Option<PhaseStats> {
        let mut system = self.system.as_ref()?.lock().ok()?;
        system.refresh_all();

        let process = system.process(self.pid?)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        let phase_time = self.phase_start.lock().ok()?.elapsed();

        Some(PhaseStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            phase_time,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    #[cfg(not(feature = "cli"))]
    fn sample(&self) -> Option<PhaseStats> {
        None
    }

    /// `rows` 為該階段處理的列數，用來計算吞吐量
    pub fn log_phase(&self, phase: &str, rows: usize) {
        if let Some(stats) = self.sample() {
            let secs = stats.phase_time.as_secs_f64();
            let throughput = if secs > 0.0 { rows as f64 / secs } else { 0.0 };
            tracing::info!(
                "📊 {} - {} rows in {:?} ({:.2} rows/s), CPU: {:.1}%, Memory: {}MB, Peak: {}MB",
                phase,
                rows,
                stats.phase_time,
                throughput,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.sample() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed_time,
                stats.peak_memory_mb
            );
        }
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_produces_no_stats() {
        let monitor = RunMonitor::new(false);
        assert!(monitor.sample().is_none());
        monitor.log_phase("Extract", 3);
    }
}
