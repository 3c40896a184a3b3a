//! 棋子状态机
//!
//! 每种棋子的每个状态对应一个静态的 [`StateTemplate`]（速度、持续时间、
//! 完成后的下一个状态、能否被越过、能否发起新动作）。同类棋子共享
//! 同一个 [`PieceTemplate`]；每个棋子只持有自己的 [`ActionState`]。

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{JUMP_DURATION_MS, LONG_REST_MS, MOVE_SPEED_CELLS_PER_SEC, SHORT_REST_MS};
use crate::error::{Error, Result};
use crate::piece::PieceType;
use crate::position::Position;

/// 棋子状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PieceState {
    /// 待命，可以发起动作
    Idle,
    /// 移动中
    Move,
    /// 原地跳跃
    Jump,
    /// 跳跃后的短冷却
    ShortRest,
    /// 移动后的长冷却
    LongRest,
}

impl PieceState {
    pub const ALL: [PieceState; 5] = [
        PieceState::Idle,
        PieceState::Move,
        PieceState::Jump,
        PieceState::ShortRest,
        PieceState::LongRest,
    ];

    /// 配置文件中使用的名字
    pub fn name(&self) -> &'static str {
        match self {
            PieceState::Idle => "idle",
            PieceState::Move => "move",
            PieceState::Jump => "jump",
            PieceState::ShortRest => "short_rest",
            PieceState::LongRest => "long_rest",
        }
    }

    /// 默认模板
    pub fn default_template(&self) -> StateTemplate {
        match self {
            PieceState::Idle => StateTemplate {
                speed: 0.0,
                duration: Duration::ZERO,
                next: PieceState::Idle,
                can_be_moved_over: false,
                can_act: true,
            },
            PieceState::Move => StateTemplate {
                speed: MOVE_SPEED_CELLS_PER_SEC,
                duration: Duration::ZERO,
                next: PieceState::LongRest,
                can_be_moved_over: true,
                can_act: false,
            },
            PieceState::Jump => StateTemplate {
                speed: 0.0,
                duration: Duration::from_millis(JUMP_DURATION_MS),
                next: PieceState::ShortRest,
                can_be_moved_over: true,
                can_act: false,
            },
            PieceState::ShortRest => StateTemplate {
                speed: 0.0,
                duration: Duration::from_millis(SHORT_REST_MS),
                next: PieceState::Idle,
                can_be_moved_over: true,
                can_act: false,
            },
            PieceState::LongRest => StateTemplate {
                speed: 0.0,
                duration: Duration::from_millis(LONG_REST_MS),
                next: PieceState::Idle,
                can_be_moved_over: true,
                can_act: false,
            },
        }
    }
}

impl FromStr for PieceState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PieceState::ALL
            .into_iter()
            .find(|state| state.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown state {:?}", s))
    }
}

impl std::fmt::Display for PieceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// (棋子类型, 状态) 的静态模板
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateTemplate {
    /// 移动速度（格/秒），0 表示静止状态
    pub speed: f64,
    /// 静止状态的持续时间，0 表示没有计时
    pub duration: Duration,
    /// 动作完成后自动进入的状态
    pub next: PieceState,
    /// 处于此状态时其他棋子能否越过或落在该棋子上
    pub can_be_moved_over: bool,
    /// 处于此状态时能否发起新的移动/跳跃
    pub can_act: bool,
}

/// 某种棋子所有已加载状态的模板
#[derive(Debug, Clone)]
pub struct PieceTemplate {
    piece_type: PieceType,
    states: BTreeMap<PieceState, StateTemplate>,
    initial: PieceState,
}

impl PieceTemplate {
    /// 由已加载的状态创建模板，没有任何状态时报错
    pub fn new(piece_type: PieceType, states: BTreeMap<PieceState, StateTemplate>) -> Result<Self> {
        // 优先 Idle，其次 LongRest，否则取第一个
        let initial = [PieceState::Idle, PieceState::LongRest]
            .into_iter()
            .find(|state| states.contains_key(state))
            .or_else(|| states.keys().next().copied())
            .ok_or(Error::NoStates { piece_type })?;

        Ok(Self {
            piece_type,
            states,
            initial,
        })
    }

    pub fn piece_type(&self) -> PieceType {
        self.piece_type
    }

    pub fn initial_state(&self) -> PieceState {
        self.initial
    }

    pub fn get(&self, state: PieceState) -> Option<&StateTemplate> {
        self.states.get(&state)
    }

    pub fn has(&self, state: PieceState) -> bool {
        self.states.contains_key(&state)
    }

    /// 动作完成后的后继状态，后继未加载时回到初始状态
    pub fn successor(&self, state: PieceState) -> PieceState {
        self.get(state)
            .map(|template| template.next)
            .filter(|next| self.has(*next))
            .unwrap_or(self.initial)
    }
}

/// 每类棋子的原始状态配置（状态名 -> JSON）
pub type StateConfigs = BTreeMap<PieceType, BTreeMap<String, serde_json::Value>>;

/// 单个状态的 JSON 配置
#[derive(Debug, Deserialize)]
struct StateConfig {
    #[serde(default)]
    physics: PhysicsConfig,
    can_act: Option<bool>,
    can_be_moved_over: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PhysicsConfig {
    #[serde(default)]
    speed_m_per_sec: f64,
    next_state_when_finished: Option<String>,
    #[serde(default)]
    duration_ms: u64,
}

impl StateConfig {
    fn into_template(self, state: PieceState) -> std::result::Result<StateTemplate, String> {
        let defaults = state.default_template();
        let next = match self.physics.next_state_when_finished {
            Some(name) => name.parse()?,
            None => state,
        };
        Ok(StateTemplate {
            speed: self.physics.speed_m_per_sec,
            duration: Duration::from_millis(self.physics.duration_ms),
            next,
            can_be_moved_over: self.can_be_moved_over.unwrap_or(defaults.can_be_moved_over),
            can_act: self.can_act.unwrap_or(defaults.can_act),
        })
    }
}

/// 所有棋子类型的状态模板表
#[derive(Debug, Clone)]
pub struct StateCatalog {
    templates: HashMap<PieceType, Arc<PieceTemplate>>,
}

impl StateCatalog {
    /// 所有棋子、所有状态都使用默认模板
    pub fn standard() -> Self {
        let templates = PieceType::ALL
            .into_iter()
            .map(|piece_type| {
                let states = PieceState::ALL
                    .into_iter()
                    .map(|state| (state, state.default_template()))
                    .collect();
                let template = PieceTemplate {
                    piece_type,
                    states,
                    initial: PieceState::Idle,
                };
                (piece_type, Arc::new(template))
            })
            .collect();
        Self { templates }
    }

    /// 从 JSON 状态配置构建模板表
    ///
    /// 单个状态解析失败只记录警告并跳过；某种棋子没有任何可用状态则整体失败。
    pub fn from_configs(configs: &StateConfigs) -> Result<Self> {
        let templates = PieceType::ALL
            .into_iter()
            .map(|piece_type| {
                let states = configs.get(&piece_type).cloned().unwrap_or_default();
                let template = Self::load_template(piece_type, &states)?;
                Ok((piece_type, Arc::new(template)))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self { templates })
    }

    /// 只替换配置中出现的棋子类型，其余保持不变
    pub fn with_configs(mut self, configs: &StateConfigs) -> Result<Self> {
        for (piece_type, states) in configs {
            let template = Self::load_template(*piece_type, states)?;
            self.templates.insert(*piece_type, Arc::new(template));
        }
        Ok(self)
    }

    fn load_template(
        piece_type: PieceType,
        configs: &BTreeMap<String, serde_json::Value>,
    ) -> Result<PieceTemplate> {
        let mut states = BTreeMap::new();

        for (name, value) in configs {
            let state: PieceState = match name.parse() {
                Ok(state) => state,
                Err(e) => {
                    warn!("Skipping state config for {:?}: {}", piece_type, e);
                    continue;
                }
            };

            let parsed = serde_json::from_value::<StateConfig>(value.clone())
                .map_err(|e| e.to_string())
                .and_then(|config| config.into_template(state));
            match parsed {
                Ok(template) => {
                    states.insert(state, template);
                }
                Err(e) => {
                    warn!("Missing or broken config for {:?} state {}: {}", piece_type, state, e);
                }
            }
        }

        PieceTemplate::new(piece_type, states)
    }

    /// 替换某种棋子的模板
    pub fn with_template(mut self, template: PieceTemplate) -> Self {
        self.templates.insert(template.piece_type, Arc::new(template));
        self
    }

    pub fn get(&self, piece_type: PieceType) -> Option<&Arc<PieceTemplate>> {
        self.templates.get(&piece_type)
    }
}

impl Default for StateCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// 棋子当前状态实例：起点、终点和已经过的时间
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionState {
    pub state: PieceState,
    pub source: Position,
    pub target: Position,
    pub elapsed: Duration,
}

impl ActionState {
    /// 停在某格的状态
    pub fn stationary(state: PieceState, at: Position) -> Self {
        Self {
            state,
            source: at,
            target: at,
            elapsed: Duration::ZERO,
        }
    }

    /// 从 `source` 前往 `target` 的状态
    pub fn travelling(state: PieceState, source: Position, target: Position) -> Self {
        Self {
            state,
            source,
            target,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_stationary(&self) -> bool {
        self.source == self.target
    }

    /// 已完成的比例 [0, 1]
    pub fn progress(&self, template: &StateTemplate) -> f64 {
        if self.is_stationary() {
            return if self.is_finished(template) { 1.0 } else { 0.0 };
        }
        if template.speed <= 0.0 {
            return 1.0;
        }
        let travelled = self.elapsed.as_secs_f64() * template.speed;
        (travelled / self.source.distance(self.target)).min(1.0)
    }

    /// 当前动作是否已完成
    pub fn is_finished(&self, template: &StateTemplate) -> bool {
        if !self.is_stationary() {
            return self.progress(template) >= 1.0;
        }
        if template.duration.is_zero() {
            // 无计时的静止状态：只有后继不同才立即完成
            return template.next != self.state;
        }
        self.elapsed >= template.duration
    }

    /// 插值后的当前格子，只有完全进入下一格才算到达
    pub fn current_cell(&self, template: &StateTemplate) -> Position {
        if self.is_stationary() {
            return self.source;
        }
        let t = self.progress(template);
        if t >= 1.0 {
            return self.target;
        }
        let (dr, dc) = self.target.delta(self.source);
        Position::new(
            self.source.row + (t * f64::from(dr)).trunc() as i32,
            self.source.col + (t * f64::from(dc)).trunc() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn move_template(speed: f64) -> StateTemplate {
        StateTemplate {
            speed,
            ..PieceState::Move.default_template()
        }
    }

    #[test]
    fn test_state_names() {
        for state in PieceState::ALL {
            assert_eq!(state.name().parse::<PieceState>().unwrap(), state);
        }
        assert_eq!("LONG_REST".parse::<PieceState>().unwrap(), PieceState::LongRest);
        assert!("fly".parse::<PieceState>().is_err());
    }

    #[test]
    fn test_travel_interpolation() {
        let template = move_template(2.0);
        let mut action = ActionState::travelling(
            PieceState::Move,
            Position::new(6, 0),
            Position::new(2, 0),
        );

        action.elapsed = Duration::from_millis(400);
        assert_eq!(action.current_cell(&template), Position::new(6, 0));

        action.elapsed = Duration::from_millis(500);
        assert_eq!(action.current_cell(&template), Position::new(5, 0));
        assert!(!action.is_finished(&template));

        action.elapsed = Duration::from_millis(1500);
        assert_eq!(action.current_cell(&template), Position::new(3, 0));

        action.elapsed = Duration::from_millis(2000);
        assert!(action.is_finished(&template));
        assert_eq!(action.current_cell(&template), Position::new(2, 0));
    }

    #[test]
    fn test_timed_rest() {
        let template = PieceState::LongRest.default_template();
        let mut action = ActionState::stationary(PieceState::LongRest, Position::new(3, 3));
        assert!(!action.is_finished(&template));

        action.elapsed = Duration::from_millis(LONG_REST_MS);
        assert!(action.is_finished(&template));
        assert_eq!(action.current_cell(&template), Position::new(3, 3));
    }

    #[test]
    fn test_idle_never_finishes() {
        let template = PieceState::Idle.default_template();
        let mut action = ActionState::stationary(PieceState::Idle, Position::new(0, 0));
        action.elapsed = Duration::from_secs(3600);
        assert!(!action.is_finished(&template));
    }

    #[test]
    fn test_standard_catalog() {
        let catalog = StateCatalog::standard();
        for piece_type in PieceType::ALL {
            let template = catalog.get(piece_type).unwrap();
            assert_eq!(template.initial_state(), PieceState::Idle);
            assert_eq!(template.successor(PieceState::Move), PieceState::LongRest);
            assert_eq!(template.successor(PieceState::Jump), PieceState::ShortRest);
        }
    }

    #[test]
    fn test_from_configs_skips_broken_state() {
        let mut configs = BTreeMap::new();
        for piece_type in PieceType::ALL {
            let mut states = BTreeMap::new();
            states.insert("idle".to_string(), json!({}));
            states.insert(
                "move".to_string(),
                json!({"physics": {"speed_m_per_sec": 3.0, "next_state_when_finished": "idle"}}),
            );
            // 后继状态名无法识别
            states.insert(
                "jump".to_string(),
                json!({"physics": {"next_state_when_finished": "hover"}}),
            );
            // 类型错误
            states.insert("long_rest".to_string(), json!({"physics": {"duration_ms": "soon"}}));
            configs.insert(piece_type, states);
        }

        let catalog = StateCatalog::from_configs(&configs).unwrap();
        let rook = catalog.get(PieceType::Rook).unwrap();

        assert!(rook.has(PieceState::Idle));
        assert!(rook.has(PieceState::Move));
        assert!(!rook.has(PieceState::Jump));
        assert!(!rook.has(PieceState::LongRest));
        assert_eq!(rook.get(PieceState::Move).unwrap().speed, 3.0);
        assert_eq!(rook.successor(PieceState::Move), PieceState::Idle);
        assert!(rook.get(PieceState::Idle).unwrap().can_act);
    }

    #[test]
    fn test_from_configs_type_without_states_is_fatal() {
        let mut configs = BTreeMap::new();
        for piece_type in PieceType::ALL {
            let mut states = BTreeMap::new();
            if piece_type != PieceType::Knight {
                states.insert("idle".to_string(), json!({}));
            } else {
                states.insert("idle".to_string(), json!("not an object"));
            }
            configs.insert(piece_type, states);
        }

        let err = StateCatalog::from_configs(&configs).unwrap_err();
        assert!(matches!(err, Error::NoStates { piece_type: PieceType::Knight }));
    }

    #[test]
    fn test_with_configs_overrides_listed_types() {
        let mut configs = BTreeMap::new();
        let mut states = BTreeMap::new();
        states.insert("idle".to_string(), json!({}));
        configs.insert(PieceType::Pawn, states);

        let catalog = StateCatalog::standard().with_configs(&configs).unwrap();
        assert!(!catalog.get(PieceType::Pawn).unwrap().has(PieceState::Move));
        assert!(catalog.get(PieceType::Rook).unwrap().has(PieceState::Move));

        configs.insert(PieceType::Rook, BTreeMap::new());
        assert!(StateCatalog::standard().with_configs(&configs).is_err());
    }

    #[test]
    fn test_initial_state_preference() {
        let mut states = BTreeMap::new();
        states.insert(PieceState::Jump, PieceState::Jump.default_template());
        states.insert(PieceState::LongRest, PieceState::LongRest.default_template());
        let template = PieceTemplate::new(PieceType::Pawn, states).unwrap();
        assert_eq!(template.initial_state(), PieceState::LongRest);
        // ShortRest 未加载，跳跃完成后回到初始状态
        assert_eq!(template.successor(PieceState::Jump), PieceState::LongRest);
    }
}
