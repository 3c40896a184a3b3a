//! 功夫象棋服务端
//!
//! 包含:
//! - 对局配置加载
//! - 对局会话与计时
//! - 固定帧率的驱动循环和指令队列
//! - 计分

pub mod config;
pub mod driver;
pub mod game;
pub mod score;
pub mod session;

pub use config::GameConfig;
pub use driver::{spawn, Command, GameHandle, GameLoop, GameReport};
pub use game::GameClock;
pub use score::ScoreKeeper;
pub use session::{GameSession, SessionState};
