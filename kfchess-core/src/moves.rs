//! 走法表
//!
//! 每种棋子有一组有序的 (dr, dc) 偏移，每个偏移可以附带若干条件；
//! 只有全部条件成立时该偏移才可用。偏移的行分量以“前进方向”为正，
//! 查询时乘以玩家的前进方向。

use std::collections::HashMap;

use crate::board::Board;
use crate::config::BoardConfig;
use crate::piece::{Piece, PieceType};
use crate::position::Position;

/// 走法附加条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCondition {
    /// 棋子从未移动过
    NeverMoved,
    /// 目标格为空
    DestinationEmpty,
    /// 目标格是敌方棋子
    DestinationEnemy,
}

impl MoveCondition {
    /// 检查条件是否成立
    pub fn holds(&self, board: &Board, piece: &Piece, to: Position) -> bool {
        match self {
            MoveCondition::NeverMoved => !piece.has_moved(),
            MoveCondition::DestinationEmpty => board.piece_at(to).is_none(),
            MoveCondition::DestinationEnemy => board
                .piece_at(to)
                .is_some_and(|target| target.owner() != piece.owner()),
        }
    }
}

/// 单条走法
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRule {
    /// 行偏移（前进方向为正）
    pub dr: i32,
    /// 列偏移
    pub dc: i32,
    pub conditions: Vec<MoveCondition>,
}

impl MoveRule {
    /// 无条件走法
    pub fn new(dr: i32, dc: i32) -> Self {
        Self {
            dr,
            dc,
            conditions: Vec::new(),
        }
    }

    /// 带条件的走法
    pub fn when(dr: i32, dc: i32, conditions: &[MoveCondition]) -> Self {
        Self {
            dr,
            dc,
            conditions: conditions.to_vec(),
        }
    }

    /// 按前进方向换算后的实际偏移
    pub fn offset(&self, forward: i32) -> (i32, i32) {
        (self.dr * forward, self.dc)
    }

    /// 全部条件是否成立
    pub fn conditions_hold(&self, board: &Board, piece: &Piece, to: Position) -> bool {
        self.conditions.iter().all(|c| c.holds(board, piece, to))
    }
}

/// 各类棋子的走法表
#[derive(Debug, Clone, Default)]
pub struct MoveTable {
    rules: HashMap<PieceType, Vec<MoveRule>>,
}

impl MoveTable {
    /// 空表
    pub fn new() -> Self {
        Self::default()
    }

    /// 8x8 棋盘上的标准走法
    pub fn standard() -> Self {
        Self::for_board(&BoardConfig::default())
    }

    /// 国际象棋标准走法（不含王车易位和吃过路兵），直线棋子的射程覆盖整个棋盘
    pub fn for_board(config: &BoardConfig) -> Self {
        use MoveCondition::*;

        let reach = (config.rows.max(config.cols) - 1).max(1);

        let orthogonal = [(1, 0), (-1, 0), (0, 1), (0, -1)];
        let diagonal = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
        let rays = |dirs: &[(i32, i32)]| -> Vec<MoveRule> {
            dirs.iter()
                .flat_map(|&(dr, dc)| (1..=reach).map(move |n| MoveRule::new(dr * n, dc * n)))
                .collect()
        };

        let pawn = vec![
            MoveRule::when(1, 0, &[DestinationEmpty]),
            MoveRule::when(2, 0, &[NeverMoved, DestinationEmpty]),
            MoveRule::when(1, -1, &[DestinationEnemy]),
            MoveRule::when(1, 1, &[DestinationEnemy]),
        ];
        let knight = [(2, 1), (1, 2), (-1, 2), (-2, 1), (-2, -1), (-1, -2), (1, -2), (2, -1)]
            .into_iter()
            .map(|(dr, dc)| MoveRule::new(dr, dc))
            .collect();
        let king = orthogonal
            .iter()
            .chain(diagonal.iter())
            .map(|&(dr, dc)| MoveRule::new(dr, dc))
            .collect();
        let queen = [rays(&orthogonal[..]), rays(&diagonal[..])].concat();

        Self::new()
            .with_rules(PieceType::Pawn, pawn)
            .with_rules(PieceType::Knight, knight)
            .with_rules(PieceType::Bishop, rays(&diagonal[..]))
            .with_rules(PieceType::Rook, rays(&orthogonal[..]))
            .with_rules(PieceType::Queen, queen)
            .with_rules(PieceType::King, king)
    }

    /// 设置某类棋子的走法
    pub fn with_rules(mut self, piece_type: PieceType, rules: Vec<MoveRule>) -> Self {
        self.rules.insert(piece_type, rules);
        self
    }

    /// 获取某类棋子的走法，未配置时为空
    pub fn rules(&self, piece_type: PieceType) -> &[MoveRule] {
        self.rules.get(&piece_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 查找与实际偏移匹配的走法
    pub fn matching(
        &self,
        piece_type: PieceType,
        forward: i32,
        dr: i32,
        dc: i32,
    ) -> impl Iterator<Item = &MoveRule> {
        self.rules(piece_type)
            .iter()
            .filter(move |rule| rule.offset(forward) == (dr, dc))
    }
}
