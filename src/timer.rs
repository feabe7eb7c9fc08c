/*
 * Copyright 2019 Zejun Li
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Wall clock shared by all workers of a run.
///
/// Workers poll [`Timer::needs_to_end`] at the top of each search iteration;
/// the flag trips either when the optional time limit is exceeded or when
/// [`Timer::set_end`] is called (SIGINT handler, tests).
#[derive(Clone)]
pub struct Timer {
    start: Instant,
    time_limit: Option<f64>,
    end: Arc<AtomicBool>,
}

impl Default for Timer {
    fn default() -> Self {
        Timer::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Timer {
            start: Instant::now(),
            time_limit: None,
            end: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_time_limit(mut self, time_limit: f64) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    /// Seconds elapsed since the timer was created.
    pub fn elapsed_time(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn remaining_time(&self) -> f64 {
        match self.time_limit {
            Some(limit) => (limit - self.elapsed_time()).max(0.0),
            None => f64::INFINITY,
        }
    }

    /// Flag checked cooperatively by the workers.
    pub fn needs_to_end(&self) -> bool {
        if self.end.load(Ordering::Relaxed) {
            return true;
        }
        match self.time_limit {
            Some(limit) => self.elapsed_time() >= limit,
            None => false,
        }
    }

    /// Request a graceful drain. Cheap to call from a signal handler.
    pub fn set_end(&self) {
        self.end.store(true, Ordering::Relaxed);
    }

    /// Handle that lets a SIGINT handler trip the flag without owning the
    /// timer.
    pub fn end_flag(&self) -> Arc<AtomicBool> {
        self.end.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_flag_trips_timer() {
        let timer = Timer::new();
        assert!(!timer.needs_to_end());
        timer.end_flag().store(true, Ordering::Relaxed);
        assert!(timer.needs_to_end());
    }

    #[test]
    fn zero_time_limit_ends_immediately() {
        let timer = Timer::new().with_time_limit(0.0);
        assert!(timer.needs_to_end());
        assert_eq!(timer.remaining_time(), 0.0);
    }
}
