//! 时钟 - 基础设施层
//!
//! 所有状态机只通过 `Clock` 读取时间，测试中用 `ManualClock` 手动推进

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn offset(base: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    base + chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero())
}

/// 时钟能力
pub trait Clock: Send + Sync {
    /// 自时钟创建以来经过的单调时间
    fn elapsed(&self) -> Duration;

    /// 当前墙上时间，用于事件时间戳
    fn wall_now(&self) -> DateTime<Utc>;
}

/// 基于 tokio 时间的时钟
///
/// tokio 暂停时间（`start_paused`）时同样随虚拟时间推进
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: tokio::time::Instant,
    wall_origin: DateTime<Utc>,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            wall_origin: Utc::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        offset(self.wall_origin, self.elapsed())
    }
}

/// 手动推进的时钟，克隆后共享同一时间线
#[derive(Debug, Clone)]
pub struct ManualClock {
    elapsed_ms: Arc<AtomicU64>,
    wall_origin: DateTime<Utc>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(wall_origin: DateTime<Utc>) -> Self {
        Self {
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            wall_origin,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }

    fn wall_now(&self) -> DateTime<Utc> {
        offset(self.wall_origin, self.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let origin = DateTime::<Utc>::from_timestamp(1_000, 0).unwrap();
        let clock = ManualClock::starting_at(origin);
        let other = clock.clone();

        clock.advance_ms(1_500);
        assert_eq!(other.elapsed(), Duration::from_millis(1_500));
        assert_eq!(other.wall_now().timestamp_millis(), 1_001_500);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_paused_time() {
        let clock = TokioClock::new();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
    }
}
