//! 玩家棋子名册

use crate::piece::{Piece, PieceType};
use crate::position::Position;
use crate::state::{PieceState, StateCatalog};

/// 玩家 ID（即玩家在棋盘玩家列表中的下标）
pub type PlayerId = usize;

/// 一方的全部棋子
///
/// 棋子顺序在整局中保持稳定：被吃只打标记，升变原地替换。
#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    /// 前进方向（+1 行号增大，-1 行号减小）
    forward: i32,
    pieces: Vec<Piece>,
}

impl Player {
    pub fn new(id: PlayerId, forward: i32) -> Self {
        Self {
            id,
            forward,
            pieces: Vec::new(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn forward(&self) -> i32 {
        self.forward
    }

    /// 添加棋子，返回其槽位
    pub fn add_piece(&mut self, piece: Piece) -> usize {
        self.pieces.push(piece);
        self.pieces.len() - 1
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, slot: usize) -> Option<&Piece> {
        self.pieces.get(slot)
    }

    pub fn piece_mut(&mut self, slot: usize) -> Option<&mut Piece> {
        self.pieces.get_mut(slot)
    }

    /// 标记棋子被吃，返回是否是新标记
    pub fn mark_captured(&mut self, slot: usize) -> bool {
        match self.pieces.get_mut(slot) {
            Some(piece) if !piece.is_captured() => {
                piece.mark_captured();
                true
            }
            _ => false,
        }
    }

    /// 把兵替换为后，保留 ID 和所属玩家，新棋子停在 `at`
    ///
    /// 新后进入其 Move 状态的后继状态，就像刚完成这一步移动。
    /// 槽位不是可升变棋子或模板缺失时返回 false。
    pub fn promote(&mut self, slot: usize, at: Position, catalog: &StateCatalog) -> bool {
        let Some(old) = self.pieces.get(slot) else {
            return false;
        };
        if old.is_captured() || !old.piece_type().can_promote() {
            return false;
        }
        let Some(template) = catalog.get(PieceType::Queen) else {
            return false;
        };

        let rest = if template.has(PieceState::Move) {
            template.successor(PieceState::Move)
        } else {
            template.initial_state()
        };
        let mut queen = Piece::with_id(old.id(), self.id, template.clone(), at);
        queen.settle(rest, at);
        queen.mark_moved();
        self.pieces[slot] = queen;
        true
    }

    /// 存活棋子数量
    pub fn alive_count(&self) -> usize {
        self.pieces.iter().filter(|p| !p.is_captured()).count()
    }

    /// 是否拥有过王
    pub fn has_king(&self) -> bool {
        self.pieces.iter().any(|p| p.piece_type() == PieceType::King)
    }

    /// 是否还有存活的王
    pub fn has_live_king(&self) -> bool {
        self.pieces
            .iter()
            .any(|p| p.piece_type() == PieceType::King && !p.is_captured())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> (Player, StateCatalog) {
        let catalog = StateCatalog::standard();
        let mut player = Player::new(1, 1);
        player.add_piece(Piece::new(1, catalog.get(PieceType::Pawn).unwrap().clone(), Position::new(1, 0)));
        player.add_piece(Piece::new(1, catalog.get(PieceType::King).unwrap().clone(), Position::new(0, 4)));
        (player, catalog)
    }

    #[test]
    fn test_mark_captured_keeps_slot() {
        let (mut player, _) = roster();

        assert!(player.mark_captured(0));
        assert!(!player.mark_captured(0));
        assert_eq!(player.pieces().len(), 2);
        assert_eq!(player.alive_count(), 1);
        assert!(player.piece(0).unwrap().is_captured());
    }

    #[test]
    fn test_promote() {
        let (mut player, catalog) = roster();
        let id = player.piece(0).unwrap().id();

        assert!(player.promote(0, Position::new(7, 0), &catalog));

        let queen = player.piece(0).unwrap();
        assert_eq!(queen.piece_type(), PieceType::Queen);
        assert_eq!(queen.id(), id);
        assert_eq!(queen.owner(), 1);
        assert_eq!(queen.position(), Position::new(7, 0));
        assert_eq!(queen.state(), PieceState::LongRest);

        // 后不能再升变，王也不能
        assert!(!player.promote(0, Position::new(7, 0), &catalog));
        assert!(!player.promote(1, Position::new(7, 4), &catalog));
    }

    #[test]
    fn test_king_tracking() {
        let (mut player, _) = roster();
        assert!(player.has_king());
        assert!(player.has_live_king());

        player.mark_captured(1);
        assert!(player.has_king());
        assert!(!player.has_live_king());
    }
}
