//! 考试倒计时 - 业务能力层
//!
//! 每次 `tick` 代表一秒；归零时恰好报告一次 `Expired`

/// 一次 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// 未在计时（尚未开始、已停止或已到时）
    Idle,
    /// 剩余秒数
    Running(u64),
    /// 本次 tick 计到了零
    Expired,
}

/// 会话倒计时
#[derive(Debug, Clone)]
pub struct SessionClock {
    total_secs: u64,
    time_left: u64,
    started: bool,
    running: bool,
    expired: bool,
}

impl SessionClock {
    pub fn new(duration_minutes: u32) -> Self {
        let total_secs = u64::from(duration_minutes) * 60;
        Self {
            total_secs,
            time_left: total_secs,
            started: false,
            running: false,
            expired: false,
        }
    }

    /// 开始计时，剩余时间重置为总时长
    ///
    /// 只有第一次调用生效
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.time_left = self.total_secs;
        self.running = true;
    }

    /// 停止计时，不触发到时
    pub fn halt(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs - self.time_left
    }

    pub fn tick(&mut self) -> ClockTick {
        if !self.running {
            return ClockTick::Idle;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.running = false;
            self.expired = true;
            ClockTick::Expired
        } else {
            ClockTick::Running(self.time_left)
        }
    }
}

/// 剩余时间格式化为 `HH:MM:SS`
pub fn format_hms(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
