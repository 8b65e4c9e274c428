use std::time::Duration;

/// CPU time consumed by this process so far (all threads).
pub fn process_cpu_time() -> Duration {
    unsafe {
        let mut ts: libc::timespec = std::mem::zeroed();
        if libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) != 0 {
            return Duration::ZERO;
        }
        Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
    }
}

/// Measures CPU time, not wall-clock time, from its creation.
#[derive(Debug, Clone, Copy)]
pub struct CpuTimer {
    start: Duration,
}

impl CpuTimer {
    pub fn start() -> Self {
        Self {
            start: process_cpu_time(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        process_cpu_time().saturating_sub(self.start)
    }
}

/// Milliseconds with four decimals, e.g. `12.3456 ms`.
pub fn format_millis(d: Duration) -> String {
    format!("{:.4} ms", d.as_secs_f64() * 1000.0)
}
