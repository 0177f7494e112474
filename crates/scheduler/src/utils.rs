use serde::{Deserialize, Serialize};

/// Retry schedule: the first retry after `start_after` seconds, then `count[i]` retries spaced
/// `frequency[i]` seconds apart for each step `i`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RetryMapping {
    pub start_after: i32,
    pub frequency: Vec<i32>,
    pub count: Vec<i32>,
}

impl RetryMapping {
    /// Total retries before the work is given up.
    pub fn max_retries(&self) -> i32 {
        self.count
            .iter()
            .fold(0_i32, |total, &count| total.saturating_add(count))
            .saturating_add(1)
    }

    /// Delay in seconds before retry number `retry_count` (0 based), `None` once the schedule
    /// is exhausted.
    pub fn get_schedule_time(&self, retry_count: i32) -> Option<i32> {
        if retry_count == 0 {
            Some(self.start_after)
        } else {
            get_delay(retry_count, self.count.iter().zip(self.frequency.iter()))
        }
    }
}

/// Walk the `(count, frequency)` steps until `retry_count` is covered.
pub fn get_delay<'a>(
    retry_count: i32,
    steps: impl IntoIterator<Item = (&'a i32, &'a i32)>,
) -> Option<i32> {
    let mut cumulative_count: i32 = 0;
    for (&count, &frequency) in steps {
        cumulative_count = cumulative_count.saturating_add(count);
        if cumulative_count >= retry_count {
            return Some(frequency);
        }
    }
    None
}
