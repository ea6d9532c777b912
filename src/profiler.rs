use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cumulative time per pipeline stage. Stages are reported in the order
/// they first ran, so the output reads like one pass of `World::update`.
pub struct Profiler {
    totals: HashMap<&'static str, Duration>,
    order: Vec<&'static str>,
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            totals: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn finish(&mut self, guard: &ProfilerGuard) {
        let elapsed = guard.start.elapsed();
        if !self.totals.contains_key(guard.name) {
            self.order.push(guard.name);
        }
        *self.totals.entry(guard.name).or_default() += elapsed;
    }

    /// Stage timings in pipeline order.
    pub fn report(&self) -> Vec<(&'static str, Duration)> {
        self.order.iter().map(|&n| (n, self.totals[n])).collect()
    }

    pub fn clear(&mut self) {
        self.totals.clear();
        self.order.clear();
    }

    pub fn print_and_clear(&mut self) {
        let total: Duration = self.totals.values().sum();
        for (name, dur) in self.report() {
            let share = if total.is_zero() {
                0.0
            } else {
                100.0 * dur.as_secs_f64() / total.as_secs_f64()
            };
            println!("{:<20} {:>12.2?} {:>5.1}%", name, dur, share);
        }
        self.clear();
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ProfilerGuard {
    name: &'static str,
    start: Instant,
}

/// Start a profiling section. Returns a guard that will update the global
/// profiler when dropped.
pub fn start(name: &'static str) -> ProfilerGuard {
    ProfilerGuard {
        name,
        start: Instant::now(),
    }
}

#[cfg(feature = "profiling")]
impl Drop for ProfilerGuard {
    fn drop(&mut self) {
        crate::PROFILER.lock().finish(self);
    }
}

/// Macro helper to profile a scope only when the `profiling` feature is enabled.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _guard = $crate::profiler::start($name);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_follows_first_seen_stage_order() {
        let mut p = Profiler::new();
        let a = start("prepare");
        p.finish(&a);
        let b = start("integrate");
        p.finish(&b);
        let a2 = start("prepare");
        p.finish(&a2);
        let names: Vec<_> = p.report().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["prepare", "integrate"]);
    }
}
