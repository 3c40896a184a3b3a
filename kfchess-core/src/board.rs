//! 棋盘：权威网格、逐帧更新和走法合法性
//!
//! 网格的每一格最多存放一个存活棋子的句柄 [`PieceKey`]。棋子自己推进
//! 计时和插值位置，碰撞后果（吃子、升变）全部由棋盘在 [`Board::update_all`]
//! 中判定。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::event::{CapturePhase, EventBus, GameEvent};
use crate::layout::Layout;
use crate::moves::MoveTable;
use crate::piece::{Piece, PieceId, PieceType};
use crate::player::{Player, PlayerId};
use crate::position::Position;
use crate::state::{PieceState, StateCatalog};

/// 棋子句柄：玩家下标 + 名册槽位，升变后不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceKey {
    pub player: PlayerId,
    pub slot: usize,
}

/// 对局结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// 只剩这一方的王存活
    Winner(PlayerId),
    /// 所有王在同一帧被吃
    Draw,
}

/// 网格快照中的一格
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub piece: PieceId,
    pub owner: PlayerId,
    pub piece_type: PieceType,
    pub state: PieceState,
}

/// 只读网格快照（供传输层向外发布）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub rows: i32,
    pub cols: i32,
    pub elapsed_ms: u64,
    /// 行优先
    pub cells: Vec<Option<CellView>>,
}

impl GridSnapshot {
    pub fn get(&self, pos: Position) -> Option<&CellView> {
        if !(0..self.rows).contains(&pos.row) || !(0..self.cols).contains(&pos.col) {
            return None;
        }
        self.cells[(pos.row * self.cols + pos.col) as usize].as_ref()
    }
}

/// 棋盘
pub struct Board {
    config: Arc<BoardConfig>,
    catalog: Arc<StateCatalog>,
    moves: Arc<MoveTable>,
    players: Vec<Player>,
    /// rows x cols，行优先
    grid: Vec<Option<PieceKey>>,
    bus: EventBus,
    elapsed: Duration,
}

impl Board {
    /// 按初始布局创建棋盘和双方名册
    pub fn new(
        config: Arc<BoardConfig>,
        catalog: Arc<StateCatalog>,
        moves: Arc<MoveTable>,
        layout: &Layout,
        bus: EventBus,
    ) -> Result<Self> {
        if layout.rows() != config.rows || layout.cols() != config.cols {
            return Err(Error::InvalidLayout {
                reason: format!(
                    "Layout is {}x{}, board is {}x{}",
                    layout.rows(),
                    layout.cols(),
                    config.rows,
                    config.cols
                ),
            });
        }

        let mut players = (0..config.player_count())
            .map(|id| Ok(Player::new(id, config.forward_of(id)?)))
            .collect::<Result<Vec<_>>>()?;

        for (pos, piece_type, owner) in layout.pieces() {
            let player = players.get_mut(owner).ok_or(Error::UnknownPlayer(owner))?;
            let template = catalog
                .get(piece_type)
                .ok_or(Error::NoStates { piece_type })?;
            player.add_piece(Piece::new(owner, Arc::clone(template), pos));
        }

        Self::with_players(config, catalog, moves, players, bus)
    }

    /// 标准 8x8 开局
    pub fn standard(bus: EventBus) -> Result<Self> {
        let config = BoardConfig::default();
        let moves = MoveTable::for_board(&config);
        Self::new(
            Arc::new(config),
            Arc::new(StateCatalog::standard()),
            Arc::new(moves),
            &Layout::standard(),
            bus,
        )
    }

    /// 由现成的名册创建棋盘，名册下标必须等于玩家 ID
    pub fn with_players(
        config: Arc<BoardConfig>,
        catalog: Arc<StateCatalog>,
        moves: Arc<MoveTable>,
        players: Vec<Player>,
        bus: EventBus,
    ) -> Result<Self> {
        if let Some((_, player)) = players.iter().enumerate().find(|(i, p)| p.id() != *i) {
            return Err(Error::UnknownPlayer(player.id()));
        }

        let cells = (config.rows.max(0) * config.cols.max(0)) as usize;
        let mut board = Self {
            config,
            catalog,
            moves,
            players,
            grid: vec![None; cells],
            bus,
            elapsed: Duration::ZERO,
        };

        for key in board.keys() {
            let pos = board.position_of(key);
            let index = board.index(pos).ok_or(Error::InvalidPosition {
                row: pos.row,
                col: pos.col,
            })?;
            if board.grid[index].is_some() {
                return Err(Error::DuplicateSpawn {
                    row: pos.row,
                    col: pos.col,
                });
            }
            board.grid[index] = Some(key);
        }

        Ok(board)
    }

    // === 查询 ===

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn catalog(&self) -> &StateCatalog {
        &self.catalog
    }

    pub fn move_table(&self) -> &MoveTable {
        &self.moves
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn rows(&self) -> i32 {
        self.config.rows
    }

    pub fn cols(&self) -> i32 {
        self.config.cols
    }

    /// 已模拟的总时间
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// 某行所属的玩家
    pub fn player_of(&self, row: i32) -> Option<PlayerId> {
        self.config.player_of(row)
    }

    pub fn is_in_bounds(&self, pos: Position) -> bool {
        self.config.is_in_bounds(pos)
    }

    pub fn piece(&self, key: PieceKey) -> Option<&Piece> {
        self.players.get(key.player)?.piece(key.slot)
    }

    fn piece_mut(&mut self, key: PieceKey) -> Option<&mut Piece> {
        self.players.get_mut(key.player)?.piece_mut(key.slot)
    }

    /// 某格上存活棋子的句柄
    pub fn key_at(&self, pos: Position) -> Option<PieceKey> {
        let key = self.grid[self.index(pos)?]?;
        self.piece(key)
            .filter(|piece| !piece.is_captured())
            .map(|_| key)
    }

    /// 某格上的存活棋子
    pub fn piece_at(&self, pos: Position) -> Option<&Piece> {
        self.key_at(pos).and_then(|key| self.piece(key))
    }

    pub fn has_piece(&self, pos: Position) -> bool {
        self.key_at(pos).is_some()
    }

    /// 所有棋子句柄，按玩家顺序、名册顺序排列（即每帧的结算顺序）
    pub fn keys(&self) -> Vec<PieceKey> {
        self.players
            .iter()
            .enumerate()
            .flat_map(|(player, p)| (0..p.pieces().len()).map(move |slot| PieceKey { player, slot }))
            .collect()
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.is_in_bounds(pos)
            .then(|| (pos.row * self.config.cols + pos.col) as usize)
    }

    fn cell_of(&self, index: usize) -> Position {
        let index = index as i32;
        Position::new(index / self.config.cols, index % self.config.cols)
    }

    fn position_of(&self, key: PieceKey) -> Position {
        self.piece(key).map_or(Position::new(-1, -1), Piece::position)
    }

    /// 把棋子写入其当前位置所在的格子
    pub fn place_piece(&mut self, key: PieceKey) -> Result<()> {
        let piece = self.piece(key).ok_or(Error::UnknownPiece {
            player: key.player,
            slot: key.slot,
        })?;
        let pos = piece.position();
        let index = self.index(pos).ok_or(Error::InvalidPosition {
            row: pos.row,
            col: pos.col,
        })?;
        self.grid[index] = Some(key);
        Ok(())
    }

    // === 合法性 ===

    /// 检查从 `from` 到 `to` 的移动是否合法（不会执行吃子）
    pub fn is_move_legal(&self, from: Position, to: Position) -> bool {
        if !self.is_in_bounds(from) || !self.is_in_bounds(to) {
            return false;
        }
        let Some(piece) = self.piece_at(from) else {
            return false;
        };

        // 冷却中不能行动
        if !piece.can_act() {
            return false;
        }

        let Some(forward) = self.player(piece.owner()).map(Player::forward) else {
            return false;
        };
        let (dr, dc) = to.delta(from);
        let matched = self
            .moves
            .matching(piece.piece_type(), forward, dr, dc)
            .any(|rule| rule.conditions_hold(self, piece, to));
        if !matched {
            return false;
        }

        // 马不检查路径
        if !piece.piece_type().can_skip() && !self.is_path_clear(from, to) {
            return false;
        }

        // 目标为空，或是可被越过的敌方棋子
        match self.piece_at(to) {
            None => true,
            Some(target) => target.owner() != piece.owner() && target.can_be_moved_over(),
        }
    }

    /// 起点和终点之间（不含两端）的格子是否都为空或可被越过
    pub fn is_path_clear(&self, from: Position, to: Position) -> bool {
        let (dr, dc) = to.delta(from);
        let (step_r, step_c) = from.step_towards(to);
        let steps = dr.abs().max(dc.abs());

        (1..steps)
            .map(|i| from.offset(step_r * i, step_c * i))
            .take_while(|pos| *pos != to)
            .all(|pos| self.piece_at(pos).map_or(true, Piece::can_be_moved_over))
    }

    /// 某格上的棋子能否起跳
    pub fn is_jump_legal(&self, at: Position) -> bool {
        self.piece_at(at).is_some_and(Piece::can_act)
    }

    /// 某格棋子所有合法的目标格（按走法表顺序）
    pub fn legal_moves(&self, from: Position) -> Vec<Position> {
        let Some(piece) = self.piece_at(from) else {
            return Vec::new();
        };
        let Some(forward) = self.player(piece.owner()).map(Player::forward) else {
            return Vec::new();
        };

        self.moves
            .rules(piece.piece_type())
            .iter()
            .map(|rule| {
                let (dr, dc) = rule.offset(forward);
                from.offset(dr, dc)
            })
            .filter(|to| self.is_move_legal(from, *to))
            .collect()
    }

    // === 动作 ===

    /// 发起移动；不合法时不做任何改变并返回 false
    pub fn move_piece(&mut self, from: Position, to: Position) -> bool {
        if !self.is_move_legal(from, to) {
            debug!("Rejected move {} -> {}", from, to);
            return false;
        }
        let Some(key) = self.key_at(from) else {
            return false;
        };
        let Some(piece) = self.piece_mut(key) else {
            return false;
        };
        if !piece.start_move(to) {
            return false;
        }

        let event = GameEvent::PieceMoved {
            piece: piece.id(),
            owner: piece.owner(),
            from,
            to,
            time: Utc::now(),
        };
        debug!("Piece {} moving {} -> {}", piece.id(), from, to);
        self.bus.emit(event);
        true
    }

    /// 原地起跳；不合法时不做任何改变并返回 false
    pub fn jump(&mut self, at: Position) -> bool {
        if !self.is_jump_legal(at) {
            debug!("Rejected jump at {}", at);
            return false;
        }
        let Some(key) = self.key_at(at) else {
            return false;
        };
        let Some(piece) = self.piece_mut(key) else {
            return false;
        };
        if !piece.start_jump() {
            return false;
        }

        let event = GameEvent::PieceJumped {
            piece: piece.id(),
            owner: piece.owner(),
            at,
            time: Utc::now(),
        };
        debug!("Piece {} jumping at {}", piece.id(), at);
        self.bus.emit(event);
        true
    }

    // === 逐帧更新 ===

    /// 推进一帧
    ///
    /// 三个阶段严格按顺序执行，每个阶段内按玩家 ID 升序、名册顺序遍历
    /// （见 [`Board::keys`]）。这个顺序决定同一帧内冲突的结算结果：
    /// 两个棋子在同一帧落到同一空格时，顺序靠后的棋子吃掉靠前的棋子。
    ///
    /// 1. 清除占据者已离开（或已被吃）的格子。
    /// 2. 累加时间；动作刚完成的棋子检查目标格：目标格上有其他可被越过的
    ///    存活棋子时，若其正在跳跃则移动方被吃，否则目标棋子被吃。兵到达
    ///    底线时升变，其余棋子推进状态机。
    /// 3. 按当前位置写回网格；格子已被其他存活棋子占据时，非跳跃的占据者
    ///    被吃，跳跃中的占据者存活而移动方被吃。
    pub fn update_all(&mut self, dt: Duration) {
        self.elapsed += dt;
        let keys = self.keys();

        self.clear_stale_cells();
        self.advance_pieces(&keys, dt);
        self.resolve_landings(&keys);
        self.clear_stale_cells();

        debug_assert!(self.is_consistent());
    }

    /// 第 1 阶段
    fn clear_stale_cells(&mut self) {
        for index in 0..self.grid.len() {
            let Some(key) = self.grid[index] else {
                continue;
            };
            let cell = self.cell_of(index);
            let stale = self
                .piece(key)
                .map_or(true, |piece| piece.is_captured() || piece.position() != cell);
            if stale {
                self.grid[index] = None;
            }
        }
    }

    /// 第 2 阶段
    fn advance_pieces(&mut self, keys: &[PieceKey], dt: Duration) {
        for &key in keys {
            let Some(piece) = self.piece_mut(key) else {
                continue;
            };
            if piece.is_captured() {
                continue;
            }
            piece.advance_clock(dt);

            if piece.is_action_finished() {
                let target = piece.target();
                let state = piece.state();
                let piece_type = piece.piece_type();

                if let Some(occupant) = self.live_occupant(target, key) {
                    let (vulnerable, jumping) = self
                        .piece(occupant)
                        .map_or((false, false), |o| (o.can_be_moved_over(), o.state() == PieceState::Jump));
                    if vulnerable {
                        if jumping {
                            // 落在跳跃中的棋子上，移动方被吃
                            self.capture(key, CapturePhase::BeforeLanding);
                            continue;
                        }
                        self.capture(occupant, CapturePhase::BeforeLanding);
                    }
                }

                if state == PieceState::Move
                    && piece_type.can_promote()
                    && self.config.is_edge_row(target.row)
                    && self.promote(key, target)
                {
                    continue;
                }
            }

            if let Some(piece) = self.piece_mut(key) {
                piece.update();
            }
        }
    }

    /// 第 3 阶段
    fn resolve_landings(&mut self, keys: &[PieceKey]) {
        for &key in keys {
            let Some(piece) = self.piece(key) else {
                continue;
            };
            if piece.is_captured() {
                continue;
            }
            let pos = piece.position();
            let Some(index) = self.index(pos) else {
                continue;
            };

            if let Some(existing) = self.live_occupant(pos, key) {
                let jumping = self
                    .piece(existing)
                    .is_some_and(|e| e.state() == PieceState::Jump);
                if jumping {
                    // 不能落在跳跃中的棋子上
                    self.capture(key, CapturePhase::OnLanding);
                    continue;
                }
                self.capture(existing, CapturePhase::OnLanding);
            }

            self.grid[index] = Some(key);
        }
    }

    /// 格子上除 `except` 以外、确实位于该格的存活棋子
    fn live_occupant(&self, pos: Position, except: PieceKey) -> Option<PieceKey> {
        let key = self.grid[self.index(pos)?]?;
        if key == except {
            return None;
        }
        let piece = self.piece(key)?;
        (!piece.is_captured() && piece.position() == pos).then_some(key)
    }

    fn capture(&mut self, key: PieceKey, phase: CapturePhase) {
        let Some(piece) = self.piece(key) else {
            return;
        };
        let (id, piece_type, owner, at) = (piece.id(), piece.piece_type(), piece.owner(), piece.position());

        if !self.players[key.player].mark_captured(key.slot) {
            return;
        }
        debug!("Captured {:?}: {} ({:?}, player {}) at {}", phase, id, piece_type, owner, at);
        self.bus.emit(GameEvent::PieceCaptured {
            piece: id,
            piece_type,
            owner,
            at,
            phase,
            time: Utc::now(),
        });
    }

    fn promote(&mut self, key: PieceKey, at: Position) -> bool {
        let catalog = Arc::clone(&self.catalog);
        let Some(player) = self.players.get_mut(key.player) else {
            return false;
        };
        if !player.promote(key.slot, at, &catalog) {
            return false;
        }

        if let Some(piece) = self.piece(key) {
            info!("Piece {} promoted at {}", piece.id(), at);
            let event = GameEvent::PiecePromoted {
                piece: piece.id(),
                owner: piece.owner(),
                at,
                time: Utc::now(),
            };
            self.bus.emit(event);
        }
        true
    }

    // === 状态检查 ===

    /// 网格是否与所有存活棋子的位置一致
    pub fn is_consistent(&self) -> bool {
        let mut occupied = HashSet::new();
        for key in self.keys() {
            let Some(piece) = self.piece(key) else {
                return false;
            };
            if piece.is_captured() {
                continue;
            }
            let pos = piece.position();
            let Some(index) = self.index(pos) else {
                return false;
            };
            if self.grid[index] != Some(key) || !occupied.insert(pos) {
                return false;
            }
        }

        // 网格中不能残留被吃或已离开的棋子
        self.grid.iter().enumerate().all(|(index, cell)| {
            cell.map_or(true, |key| {
                self.piece(key)
                    .is_some_and(|p| !p.is_captured() && p.position() == self.cell_of(index))
            })
        })
    }

    /// 对局是否结束：至少两方有王，且只剩一方（或没有一方）的王存活
    pub fn outcome(&self) -> Option<Outcome> {
        let contenders: Vec<&Player> = self.players.iter().filter(|p| p.has_king()).collect();
        if contenders.len() < 2 {
            return None;
        }
        let alive: Vec<PlayerId> = contenders
            .iter()
            .filter(|p| p.has_live_king())
            .map(|p| p.id())
            .collect();
        match alive.as_slice() {
            [] => Some(Outcome::Draw),
            [winner] => Some(Outcome::Winner(*winner)),
            _ => None,
        }
    }

    /// 当前网格快照
    pub fn snapshot(&self) -> GridSnapshot {
        let cells = self
            .grid
            .iter()
            .map(|cell| {
                cell.and_then(|key| self.piece(key))
                    .filter(|piece| !piece.is_captured())
                    .map(|piece| CellView {
                        piece: piece.id(),
                        owner: piece.owner(),
                        piece_type: piece.piece_type(),
                        state: piece.state(),
                    })
            })
            .collect();

        GridSnapshot {
            rows: self.config.rows,
            cols: self.config.cols,
            elapsed_ms: self.elapsed.as_millis() as u64,
            cells,
        }
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("rows", &self.config.rows)
            .field("cols", &self.config.cols)
            .field("players", &self.players.len())
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}
