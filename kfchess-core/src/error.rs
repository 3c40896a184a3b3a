//! 错误类型定义

use thiserror::Error;

use crate::piece::PieceType;
use crate::player::PlayerId;

/// 模拟核心错误
#[derive(Error, Debug)]
pub enum Error {
    /// 无效的位置
    #[error("Invalid position: row={row}, col={col}")]
    InvalidPosition { row: i32, col: i32 },

    /// 名册中没有该棋子
    #[error("No piece for player {player} in slot {slot}")]
    UnknownPiece { player: PlayerId, slot: usize },

    /// 无法识别的棋子代码
    #[error("Unknown piece code: {code:?}")]
    UnknownPieceCode { code: String },

    /// 无效的初始布局
    #[error("Invalid layout: {reason}")]
    InvalidLayout { reason: String },

    /// 某种棋子没有任何可用状态
    #[error("No usable states loaded for piece type {piece_type:?}")]
    NoStates { piece_type: PieceType },

    /// 两个棋子出生在同一格
    #[error("Two pieces spawn at row={row}, col={col}")]
    DuplicateSpawn { row: i32, col: i32 },

    /// 玩家没有配置主场行
    #[error("No home rows configured for player {0}")]
    UnknownPlayer(PlayerId),
}

/// 模拟核心操作结果类型
pub type Result<T> = std::result::Result<T, Error>;
