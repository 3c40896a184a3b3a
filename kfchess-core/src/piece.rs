//! 棋子定义

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::POSITION_SEPARATOR;
use crate::player::PlayerId;
use crate::position::Position;
use crate::state::{ActionState, PieceState, PieceTemplate, StateTemplate};

/// 棋子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    /// 到达底线时能否升变
    pub fn can_promote(&self) -> bool {
        matches!(self, PieceType::Pawn)
    }

    /// 是否跳过路径检查（马）
    pub fn can_skip(&self) -> bool {
        matches!(self, PieceType::Knight)
    }

    /// 棋子分值（用于计分）
    pub fn value(&self) -> i32 {
        match self {
            PieceType::Pawn => 1,
            PieceType::Knight => 3,
            PieceType::Bishop => 3,
            PieceType::Rook => 5,
            PieceType::Queen => 9,
            PieceType::King => 100,
        }
    }

    /// 布局代码中的字母
    pub fn code(&self) -> char {
        match self {
            PieceType::Pawn => 'P',
            PieceType::Knight => 'N',
            PieceType::Bishop => 'B',
            PieceType::Rook => 'R',
            PieceType::Queen => 'Q',
            PieceType::King => 'K',
        }
    }

    /// 从布局代码字母解析
    pub fn from_code(c: char) -> Option<PieceType> {
        PieceType::ALL
            .into_iter()
            .find(|piece_type| piece_type.code() == c.to_ascii_uppercase())
    }
}

/// 棋子 ID，由出生位置生成，升变后保持不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceId(Position);

impl PieceId {
    pub fn from_spawn(pos: Position) -> Self {
        Self(pos)
    }

    pub fn spawn(&self) -> Position {
        self.0
    }
}

impl std::fmt::Display for PieceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.0.row, POSITION_SEPARATOR, self.0.col)
    }
}

/// 棋子：身份、所属玩家和自己的状态机
///
/// 棋子只推进自己的计时，不负责碰撞后果；吃子由棋盘判定后通过
/// [`Piece::mark_captured`] 标记。
#[derive(Debug, Clone)]
pub struct Piece {
    id: PieceId,
    owner: PlayerId,
    template: Arc<PieceTemplate>,
    action: ActionState,
    captured: bool,
    moved: bool,
}

impl Piece {
    /// 在 `at` 处以模板的初始状态创建棋子，ID 取自出生位置
    pub fn new(owner: PlayerId, template: Arc<PieceTemplate>, at: Position) -> Self {
        Self::with_id(PieceId::from_spawn(at), owner, template, at)
    }

    /// 使用指定 ID 创建棋子（升变时沿用原 ID）
    pub fn with_id(id: PieceId, owner: PlayerId, template: Arc<PieceTemplate>, at: Position) -> Self {
        let action = ActionState::stationary(template.initial_state(), at);
        Self {
            id,
            owner,
            template,
            action,
            captured: false,
            moved: false,
        }
    }

    pub fn id(&self) -> PieceId {
        self.id
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn piece_type(&self) -> PieceType {
        self.template.piece_type()
    }

    pub fn template(&self) -> &Arc<PieceTemplate> {
        &self.template
    }

    pub fn action(&self) -> &ActionState {
        &self.action
    }

    pub fn state(&self) -> PieceState {
        self.action.state
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// 是否移动过（兵的两步走条件）
    pub fn has_moved(&self) -> bool {
        self.moved
    }

    pub fn target(&self) -> Position {
        self.action.target
    }

    fn state_template(&self) -> Option<&StateTemplate> {
        self.template.get(self.action.state)
    }

    /// 棋盘上可见的位置（插值后的当前格子）
    ///
    /// 可跳跃的棋子（马）在空中不经过中间格，落地前一直占据起点。
    pub fn position(&self) -> Position {
        if self.piece_type().can_skip() && !self.action.is_stationary() {
            return if self.is_action_finished() {
                self.action.target
            } else {
                self.action.source
            };
        }
        match self.state_template() {
            Some(template) => self.action.current_cell(template),
            None => self.action.source,
        }
    }

    pub fn can_act(&self) -> bool {
        self.state_template().is_some_and(|template| template.can_act)
    }

    pub fn can_be_moved_over(&self) -> bool {
        self.state_template()
            .is_some_and(|template| template.can_be_moved_over)
    }

    pub fn is_action_finished(&self) -> bool {
        self.state_template()
            .is_some_and(|template| self.action.is_finished(template))
    }

    /// 累加本帧经过的时间（不改变状态）
    pub fn advance_clock(&mut self, dt: Duration) {
        self.action.elapsed += dt;
    }

    /// 推进状态机：未完成则保持状态；完成则落在终点并进入后继状态
    pub fn update(&mut self) {
        if !self.is_action_finished() {
            return;
        }
        let next = self.template.successor(self.action.state);
        self.action = ActionState::stationary(next, self.action.target);
    }

    /// 开始向 `to` 移动，模板没有 Move 状态时返回 false
    pub fn start_move(&mut self, to: Position) -> bool {
        if !self.template.has(PieceState::Move) {
            return false;
        }
        self.action = ActionState::travelling(PieceState::Move, self.position(), to);
        self.moved = true;
        true
    }

    /// 原地起跳，模板没有 Jump 状态时返回 false
    pub fn start_jump(&mut self) -> bool {
        if !self.template.has(PieceState::Jump) {
            return false;
        }
        self.action = ActionState::stationary(PieceState::Jump, self.position());
        true
    }

    /// 以给定状态停在 `at`（升变后的新棋子使用）
    pub(crate) fn settle(&mut self, state: PieceState, at: Position) {
        self.action = ActionState::stationary(state, at);
    }

    pub(crate) fn mark_moved(&mut self) {
        self.moved = true;
    }

    pub(crate) fn mark_captured(&mut self) {
        self.captured = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateCatalog;

    fn piece(piece_type: PieceType, at: Position) -> Piece {
        let catalog = StateCatalog::standard();
        Piece::new(0, catalog.get(piece_type).unwrap().clone(), at)
    }

    #[test]
    fn test_piece_codes() {
        assert_eq!(PieceType::from_code('q'), Some(PieceType::Queen));
        assert_eq!(PieceType::from_code('N'), Some(PieceType::Knight));
        assert_eq!(PieceType::from_code('X'), None);
        for piece_type in PieceType::ALL {
            assert_eq!(PieceType::from_code(piece_type.code()), Some(piece_type));
        }
    }

    #[test]
    fn test_piece_id_display() {
        let p = piece(PieceType::Rook, Position::new(7, 0));
        assert_eq!(p.id().to_string(), "7,0");
        assert_eq!(p.id().spawn(), Position::new(7, 0));
    }

    #[test]
    fn test_move_cycle() {
        let mut p = piece(PieceType::Rook, Position::new(7, 0));
        assert!(p.can_act());
        assert!(!p.can_be_moved_over());

        assert!(p.start_move(Position::new(5, 0)));
        assert!(p.has_moved());
        assert!(!p.can_act());
        assert!(p.can_be_moved_over());

        p.advance_clock(Duration::from_millis(1000));
        p.update();
        assert_eq!(p.state(), PieceState::Move);
        assert_eq!(p.position(), Position::new(6, 0));

        p.advance_clock(Duration::from_millis(1000));
        assert!(p.is_action_finished());
        p.update();
        assert_eq!(p.state(), PieceState::LongRest);
        assert_eq!(p.position(), Position::new(5, 0));
        assert!(!p.can_act());

        p.advance_clock(Duration::from_millis(crate::LONG_REST_MS));
        p.update();
        assert_eq!(p.state(), PieceState::Idle);
        assert!(p.can_act());
    }

    #[test]
    fn test_jump_cycle() {
        let mut p = piece(PieceType::Pawn, Position::new(6, 3));
        assert!(p.start_jump());
        assert_eq!(p.state(), PieceState::Jump);
        assert_eq!(p.position(), Position::new(6, 3));

        p.advance_clock(Duration::from_millis(crate::JUMP_DURATION_MS));
        p.update();
        assert_eq!(p.state(), PieceState::ShortRest);
        assert!(!p.has_moved());
    }

    #[test]
    fn test_knight_stays_on_source_until_landing() {
        let mut p = piece(PieceType::Knight, Position::new(7, 1));
        p.start_move(Position::new(5, 2));

        p.advance_clock(Duration::from_millis(1500));
        assert_eq!(p.position(), Position::new(7, 1));

        p.advance_clock(Duration::from_millis(1000));
        assert_eq!(p.position(), Position::new(5, 2));
    }
}
