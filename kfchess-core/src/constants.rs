//! 模拟常量定义

use std::time::Duration;

/// 默认棋盘行数
pub const DEFAULT_ROWS: i32 = 8;

/// 默认棋盘列数
pub const DEFAULT_COLS: i32 = 8;

/// 默认格子边长（像素，仅供渲染层使用）
pub const DEFAULT_TILE_SIZE: f64 = 100.0;

/// 布局文件中的单元格分隔符，同时用于棋子 ID（"行,列"）
pub const POSITION_SEPARATOR: char = ',';

/// 移动速度（格/秒）
pub const MOVE_SPEED_CELLS_PER_SEC: f64 = 1.0;

/// 跳跃持续时间（毫秒）
pub const JUMP_DURATION_MS: u64 = 1000;

/// 短休息（跳跃后冷却）时间（毫秒）
pub const SHORT_REST_MS: u64 = 500;

/// 长休息（移动后冷却）时间（毫秒）
pub const LONG_REST_MS: u64 = 2000;

/// 服务端默认帧间隔（毫秒）
pub const DEFAULT_TICK_MS: u64 = 50;

/// 默认帧间隔 Duration
pub const DEFAULT_TICK: Duration = Duration::from_millis(DEFAULT_TICK_MS);
