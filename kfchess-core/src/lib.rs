//! 功夫象棋模拟核心
//!
//! 包含:
//! - 坐标、棋子类型、棋子状态机
//! - 走法表和走法合法性检查
//! - 玩家棋子名册（吃子标记、兵升变）
//! - 棋盘逐帧更新（状态推进、落子吃子判定）
//! - 吃子事件总线
//! - 初始布局和状态配置解析

mod board;
mod config;
mod constants;
mod error;
mod event;
mod layout;
mod moves;
mod piece;
mod player;
mod position;
mod state;

pub use board::{Board, CellView, GridSnapshot, Outcome, PieceKey};
pub use config::{BoardConfig, PlayerRows};
pub use constants::*;
pub use error::{Error, Result};
pub use event::{CapturePhase, EventBus, GameEvent, Listener, ListenerId, Topic};
pub use layout::{Layout, STANDARD_LAYOUT};
pub use moves::{MoveCondition, MoveRule, MoveTable};
pub use piece::{Piece, PieceId, PieceType};
pub use player::{Player, PlayerId};
pub use position::Position;
pub use state::{ActionState, PieceState, PieceTemplate, StateCatalog, StateConfigs, StateTemplate};
