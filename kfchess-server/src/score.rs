//! 计分
//!
//! 订阅吃子事件，按棋子价值累计每方损失的子力。一方的得分是其他各方
//! 损失子力之和。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use kfchess_core::{EventBus, GameEvent, ListenerId, PieceType, PlayerId, Topic};

/// 单方的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// 损失的子力
    pub material_lost: i32,
    /// 被吃的棋子
    pub pieces_lost: Vec<PieceType>,
}

/// 计分器（可克隆的句柄，克隆共享同一份统计）
#[derive(Debug, Clone, Default)]
pub struct ScoreKeeper {
    tallies: Arc<Mutex<HashMap<PlayerId, Tally>>>,
}

impl ScoreKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建计分器并订阅吃子事件
    pub fn attach(bus: &EventBus) -> (Self, ListenerId) {
        let keeper = Self::new();
        let sink = keeper.clone();
        let id = bus.subscribe(Topic::PieceCaptured, move |event: &GameEvent| {
            sink.record(event);
        });
        (keeper, id)
    }

    /// 记录一个吃子事件，其他事件忽略
    pub fn record(&self, event: &GameEvent) {
        let GameEvent::PieceCaptured {
            piece,
            piece_type,
            owner,
            ..
        } = event
        else {
            return;
        };

        let mut tallies = self.tallies.lock().unwrap_or_else(PoisonError::into_inner);
        let tally = tallies.entry(*owner).or_default();
        tally.material_lost += piece_type.value();
        tally.pieces_lost.push(*piece_type);
        debug!(
            "Player {} lost {} ({:?}), material lost {}",
            owner, piece, piece_type, tally.material_lost
        );
    }

    /// 某方损失的子力
    pub fn material_lost(&self, player: PlayerId) -> i32 {
        self.tally(player).material_lost
    }

    /// 某方的得分（吃掉的对方子力）
    pub fn score(&self, player: PlayerId) -> i32 {
        self.tallies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(owner, _)| **owner != player)
            .map(|(_, tally)| tally.material_lost)
            .sum()
    }

    /// 某方的统计
    pub fn tally(&self, player: PlayerId) -> Tally {
        self.tallies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&player)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kfchess_core::{CapturePhase, PieceId, Position};

    fn captured(piece_type: PieceType, owner: PlayerId) -> GameEvent {
        GameEvent::PieceCaptured {
            piece: PieceId::from_spawn(Position::new(0, 0)),
            piece_type,
            owner,
            at: Position::new(3, 3),
            phase: CapturePhase::OnLanding,
            time: Utc::now(),
        }
    }

    #[test]
    fn test_scores_from_bus() {
        let bus = EventBus::new();
        let (keeper, _) = ScoreKeeper::attach(&bus);

        bus.emit(captured(PieceType::Rook, 1));
        bus.emit(captured(PieceType::Pawn, 1));
        bus.emit(captured(PieceType::Knight, 0));

        assert_eq!(keeper.material_lost(1), 6);
        assert_eq!(keeper.score(0), 6);
        assert_eq!(keeper.score(1), 3);
        assert_eq!(
            keeper.tally(1).pieces_lost,
            vec![PieceType::Rook, PieceType::Pawn]
        );
    }

    #[test]
    fn test_detach() {
        let bus = EventBus::new();
        let (keeper, id) = ScoreKeeper::attach(&bus);
        assert!(bus.unsubscribe(Topic::PieceCaptured, id));

        bus.emit(captured(PieceType::Queen, 0));
        assert_eq!(keeper.material_lost(0), 0);
        assert_eq!(keeper.tally(0), Tally::default());
    }
}
