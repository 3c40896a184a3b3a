//! 对局会话
//!
//! 会话拥有棋盘，负责对局生命周期：等待开始、进行中、暂停、结束。
//! 只有进行中的对局才接受走子指令和推进时间。

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use kfchess_core::{Board, GameEvent, GridSnapshot, Outcome, Position};

use crate::game::GameClock;
use crate::score::ScoreKeeper;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Waiting,
    Playing,
    Paused,
    Finished,
}

/// 对局会话
pub struct GameSession {
    board: Board,
    state: SessionState,
    clock: GameClock,
    score: ScoreKeeper,
    outcome: Option<Outcome>,
}

impl GameSession {
    /// 创建会话并挂上计分器
    pub fn new(board: Board) -> Self {
        let (score, _) = ScoreKeeper::attach(board.bus());
        Self {
            board,
            state: SessionState::Waiting,
            clock: GameClock::new(),
            score,
            outcome: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn score(&self) -> &ScoreKeeper {
        &self.score
    }

    /// 对局结果（被中止的对局没有结果）
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.board.snapshot()
    }

    /// 开始对局
    pub fn start(&mut self) -> bool {
        if self.state != SessionState::Waiting {
            return false;
        }
        self.state = SessionState::Playing;
        self.clock.start();
        info!("Game started");
        true
    }

    /// 暂停
    pub fn pause(&mut self) -> bool {
        if self.state != SessionState::Playing {
            return false;
        }
        self.state = SessionState::Paused;
        self.clock.pause();
        info!("Game paused at {:?}", self.board.elapsed());
        true
    }

    /// 继续
    pub fn resume(&mut self) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        self.state = SessionState::Playing;
        self.clock.resume();
        info!("Game resumed");
        true
    }

    /// 中止对局，不产生结果
    pub fn stop(&mut self) -> bool {
        if self.state == SessionState::Finished {
            return false;
        }
        self.state = SessionState::Finished;
        self.clock.stop();
        info!("Game stopped at {:?}", self.board.elapsed());
        true
    }

    /// 发起移动
    pub fn move_piece(&mut self, from: Position, to: Position) -> bool {
        if self.state != SessionState::Playing {
            debug!("Ignoring move {} -> {} while {:?}", from, to, self.state);
            return false;
        }
        self.board.move_piece(from, to)
    }

    /// 发起跳跃
    pub fn jump(&mut self, at: Position) -> bool {
        if self.state != SessionState::Playing {
            debug!("Ignoring jump at {} while {:?}", at, self.state);
            return false;
        }
        self.board.jump(at)
    }

    /// 推进一帧，对局在本帧结束时返回结果
    pub fn tick(&mut self, dt: Duration) -> Option<Outcome> {
        if self.state != SessionState::Playing {
            return None;
        }
        self.board.update_all(dt);

        let outcome = self.board.outcome()?;
        self.finish(outcome);
        Some(outcome)
    }

    fn finish(&mut self, outcome: Outcome) {
        self.state = SessionState::Finished;
        self.outcome = Some(outcome);
        self.clock.stop();

        match outcome {
            Outcome::Winner(player) => info!(
                "Game over: player {} wins after {:?} (score {})",
                player,
                self.board.elapsed(),
                self.score.score(player)
            ),
            Outcome::Draw => info!("Game over: draw after {:?}", self.board.elapsed()),
        }
        self.board.bus().emit(GameEvent::GameOver {
            outcome,
            time: Utc::now(),
        });
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .field("board", &self.board)
            .finish()
    }
}
