//! 对局计时
//!
//! 记录一局实际进行的墙钟时间（暂停期间不计）。棋盘的模拟时间由固定帧长
//! 累加，两者之差可以反映驱动循环是否跟得上帧率。

use std::time::Duration;

use tokio::time::Instant;

/// 对局时钟
#[derive(Debug, Default)]
pub struct GameClock {
    /// 已结算的时间
    accumulated: Duration,
    /// 当前运行段的开始时间（暂停或未开始时为 None）
    running_since: Option<Instant>,
    /// 是否已停止
    stopped: bool,
}

impl GameClock {
    /// 创建未开始的时钟
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始计时（已停止的时钟不能重新开始）
    pub fn start(&mut self) {
        if !self.stopped && self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    /// 已进行的时间
    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(start) => self.accumulated + start.elapsed(),
            None => self.accumulated,
        }
    }

    /// 暂停计时
    pub fn pause(&mut self) {
        if let Some(start) = self.running_since.take() {
            self.accumulated += start.elapsed();
        }
    }

    /// 恢复计时
    pub fn resume(&mut self) {
        self.start();
    }

    /// 停止计时
    pub fn stop(&mut self) {
        self.pause();
        self.stopped = true;
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    #[tokio::test(start_paused = true)]
    async fn test_clock_initial() {
        let clock = GameClock::new();
        time::sleep(Duration::from_millis(200)).await;

        assert_eq!(clock.elapsed(), Duration::ZERO);
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_pause_resume() {
        let mut clock = GameClock::new();
        clock.start();
        time::sleep(Duration::from_millis(200)).await;
        clock.pause();

        let at_pause = clock.elapsed();
        assert_eq!(at_pause, Duration::from_millis(200));

        // 暂停期间时间不变
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(clock.elapsed(), at_pause);

        clock.resume();
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(clock.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_stop_is_final() {
        let mut clock = GameClock::new();
        clock.start();
        time::sleep(Duration::from_millis(50)).await;
        clock.stop();
        clock.resume();

        time::sleep(Duration::from_millis(50)).await;
        assert!(clock.is_stopped());
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed(), Duration::from_millis(50));
    }
}
