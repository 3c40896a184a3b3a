//! 棋盘配置

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COLS, DEFAULT_ROWS, DEFAULT_TILE_SIZE};
use crate::error::{Error, Result};
use crate::player::PlayerId;
use crate::position::Position;

/// 某一方的主场行范围
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRows {
    pub player: PlayerId,
    pub rows: Range<i32>,
}

/// 棋盘配置，构造后只读，由棋盘和所有棋子共享
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub rows: i32,
    pub cols: i32,
    /// 格子边长，仅供渲染层换算像素
    pub tile_size: f64,
    /// 行范围到玩家的映射
    pub player_rows: Vec<PlayerRows>,
}

impl BoardConfig {
    /// 创建自定义尺寸的棋盘配置（双方各占两行主场）
    pub fn with_size(rows: i32, cols: i32) -> Self {
        Self {
            rows,
            cols,
            tile_size: DEFAULT_TILE_SIZE,
            player_rows: vec![
                PlayerRows { player: 0, rows: (rows - 2).max(0)..rows },
                PlayerRows { player: 1, rows: 0..2.min(rows) },
            ],
        }
    }

    /// 检查位置是否在棋盘内
    pub fn is_in_bounds(&self, pos: Position) -> bool {
        (0..self.rows).contains(&pos.row) && (0..self.cols).contains(&pos.col)
    }

    /// 获取某行所属的玩家
    pub fn player_of(&self, row: i32) -> Option<PlayerId> {
        self.player_rows
            .iter()
            .find(|entry| entry.rows.contains(&row))
            .map(|entry| entry.player)
    }

    /// 玩家数量
    pub fn player_count(&self) -> usize {
        self.player_rows
            .iter()
            .map(|entry| entry.player + 1)
            .max()
            .unwrap_or(0)
    }

    /// 玩家的前进方向：主场在上半区则向行号增大方向前进（+1），否则 -1
    pub fn forward_of(&self, player: PlayerId) -> Result<i32> {
        let entry = self
            .player_rows
            .iter()
            .find(|entry| entry.player == player)
            .ok_or(Error::UnknownPlayer(player))?;
        let home_mid = entry.rows.start + entry.rows.end - 1;
        Ok(if home_mid < self.rows - 1 { 1 } else { -1 })
    }

    /// 是否是底线（第一行或最后一行）
    pub fn is_edge_row(&self, row: i32) -> bool {
        row == 0 || row == self.rows - 1
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::with_size(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let config = BoardConfig::default();
        assert!(config.is_in_bounds(Position::new(0, 0)));
        assert!(config.is_in_bounds(Position::new(7, 7)));
        assert!(!config.is_in_bounds(Position::new(8, 0)));
        assert!(!config.is_in_bounds(Position::new(0, -1)));
    }

    #[test]
    fn test_player_of() {
        let config = BoardConfig::default();
        assert_eq!(config.player_of(7), Some(0));
        assert_eq!(config.player_of(6), Some(0));
        assert_eq!(config.player_of(1), Some(1));
        assert_eq!(config.player_of(4), None);
        assert_eq!(config.player_count(), 2);
    }

    #[test]
    fn test_forward() {
        let config = BoardConfig::default();
        assert_eq!(config.forward_of(0).unwrap(), -1);
        assert_eq!(config.forward_of(1).unwrap(), 1);
        assert!(matches!(config.forward_of(5), Err(Error::UnknownPlayer(5))));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = BoardConfig::with_size(10, 9);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: BoardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
