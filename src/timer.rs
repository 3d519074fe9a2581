use std::time::{Duration, Instant};

/// Target update rate of the control loop.
pub const TICK_HZ: u32 = 60;

/// Monotonic trial-engine tick counter.
pub type Tick = u64;

/// Converts a configured duration in seconds to whole ticks, rounding to
/// the nearest tick.
pub fn secs_to_ticks(secs: f32) -> u64 {
    (secs * TICK_HZ as f32).round().max(0.0) as u64
}

pub fn ticks_to_secs(ticks: u64) -> f32 {
    ticks as f32 / TICK_HZ as f32
}

/// Paces the loop at TICK_HZ and keeps a rolling window of frame durations
/// for diagnostics. Uses a platform high-precision sleep where available.
#[derive(Debug)]
pub struct TickClock {
    tick_interval: Duration,
    last_tick: Instant,
    frame_times: Vec<Duration>,
    max_samples: usize,
}

impl TickClock {
    pub fn new() -> Self {
        Self {
            tick_interval: Duration::from_secs_f64(1.0 / TICK_HZ as f64),
            last_tick: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }

    /// Sleeps out the remainder of the current tick interval and records the
    /// observed frame duration.
    pub fn pace(&mut self) {
        let elapsed = self.last_tick.elapsed();
        if elapsed < self.tick_interval {
            high_precision_sleep(self.tick_interval - elapsed);
        }
        let frame = self.last_tick.elapsed();
        self.last_tick = Instant::now();
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.remove(0);
        }
        self.frame_times.push(frame);
    }

    /// Mean observed frame duration in milliseconds, 0.0 before any sample.
    pub fn average_frame_ms(&self) -> f64 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .frame_times
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .sum();
        total / self.frame_times.len() as f64
    }

    pub fn frame_count(&self) -> usize {
        self.frame_times.len()
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

/// High precision sleep (platform specific).
pub fn high_precision_sleep(duration: Duration) {
    #[cfg(target_os = "windows")]
    windows_sleep(duration);
    #[cfg(target_os = "linux")]
    linux_sleep(duration);
    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    std::thread::sleep(duration);
}

#[cfg(target_os = "windows")]
fn windows_sleep(duration: Duration) {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::Foundation::FILETIME;
    use windows::Win32::System::Threading::{
        CreateWaitableTimerW, SetWaitableTimer, WaitForSingleObject,
    };

    unsafe {
        let timer = CreateWaitableTimerW(None, true, None).unwrap();

        let intervals = -(duration.as_nanos() as i64 / 100);

        let due_time = FILETIME {
            dwLowDateTime: intervals as u32,
            dwHighDateTime: (intervals >> 32) as u32,
        };

        if SetWaitableTimer(timer, &due_time, 0, None, None, false).as_bool() {
            WaitForSingleObject(timer, u32::MAX);
        }

        CloseHandle(timer);
    }
}

#[cfg(target_os = "linux")]
fn linux_sleep(duration: Duration) {
    use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

    let req = timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    };

    unsafe {
        clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
    }
}
