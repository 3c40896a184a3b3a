//! 对局配置
//!
//! 配置文件为 JSON，所有字段都可省略，缺省即标准 8x8 开局：
//!
//! ```json
//! {
//!   "tick_ms": 50,
//!   "board": { "rows": 8, "cols": 8, "tile_size": 100.0, "player_rows": [...] },
//!   "layout": "RB,NB,...\n...",
//!   "states": { "Pawn": { "move": { "physics": { "speed_m_per_sec": 1.0 } } } }
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use kfchess_core::{
    Board, BoardConfig, EventBus, Layout, MoveTable, StateCatalog, StateConfigs, DEFAULT_TICK_MS,
    STANDARD_LAYOUT,
};

/// 对局配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// 帧间隔（毫秒）
    pub tick_ms: u64,
    pub board: BoardConfig,
    /// 初始布局（CSV）
    pub layout: String,
    /// 状态配置，未列出的棋子类型使用内置状态
    pub states: Option<StateConfigs>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            board: BoardConfig::default(),
            layout: STANDARD_LAYOUT.to_string(),
            states: None,
        }
    }
}

impl GameConfig {
    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {:?}", path))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("解析配置文件失败: {:?}", path))?;
        info!("Loaded game config from {:?}", path);
        Ok(config)
    }

    /// 从 JSON 文本解析并校验
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            bail!("tick_ms 必须大于 0");
        }
        if self.board.rows <= 0 || self.board.cols <= 0 {
            bail!("棋盘尺寸无效: {}x{}", self.board.rows, self.board.cols);
        }
        if self.board.player_count() == 0 {
            bail!("至少需要一个玩家");
        }
        Ok(())
    }

    /// 帧间隔
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// 状态表
    pub fn catalog(&self) -> Result<StateCatalog> {
        match &self.states {
            Some(states) => StateCatalog::standard()
                .with_configs(states)
                .context("状态配置无效"),
            None => Ok(StateCatalog::standard()),
        }
    }

    /// 按配置创建棋盘
    pub fn build_board(&self, bus: EventBus) -> Result<Board> {
        let layout = Layout::parse(&self.layout, &self.board).context("布局无效")?;
        let board = Board::new(
            Arc::new(self.board.clone()),
            Arc::new(self.catalog()?),
            Arc::new(MoveTable::for_board(&self.board)),
            &layout,
            bus,
        )
        .context("创建棋盘失败")?;
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfchess_core::{PieceState, PieceType, Position};
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick(), Duration::from_millis(DEFAULT_TICK_MS));

        let board = config.build_board(EventBus::new()).unwrap();
        assert!(board.is_consistent());
        assert_eq!(board.keys().len(), 32);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "tick_ms": 20,
                "layout": ",,,,KB\n\n\n\n\n\n\n,,,,KW"
            }}"#
        )
        .unwrap();

        let config = GameConfig::load(file.path()).unwrap();
        assert_eq!(config.tick(), Duration::from_millis(20));
        assert_eq!(config.board, BoardConfig::default());

        let board = config.build_board(EventBus::new()).unwrap();
        assert_eq!(board.keys().len(), 2);
        assert_eq!(board.piece_at(Position::new(7, 4)).unwrap().owner(), 0);
    }

    #[test]
    fn test_custom_states() {
        let config = GameConfig::from_json(
            r#"{
                "layout": "",
                "states": {
                    "Pawn": {
                        "long_rest": { "physics": { "duration_ms": 100, "next_state_when_finished": "idle" } },
                        "idle": { "physics": {} }
                    }
                }
            }"#,
        )
        .unwrap();

        let catalog = config.catalog().unwrap();
        let pawn = catalog.get(PieceType::Pawn).unwrap();
        assert!(pawn.has(PieceState::LongRest));
        assert!(!pawn.has(PieceState::Jump));
        assert_eq!(pawn.initial_state(), PieceState::Idle);
        assert!(catalog.get(PieceType::Rook).unwrap().has(PieceState::Jump));
    }

    #[test]
    fn test_larger_board_has_full_rays() {
        let mut config = GameConfig::from_json(
            r#"{
                "board": {
                    "rows": 10,
                    "cols": 10,
                    "tile_size": 100.0,
                    "player_rows": [
                        { "player": 0, "rows": { "start": 8, "end": 10 } },
                        { "player": 1, "rows": { "start": 0, "end": 2 } }
                    ]
                }
            }"#,
        )
        .unwrap();
        config.layout = "QW".to_string();

        let board = config.build_board(EventBus::new()).unwrap();
        assert_eq!(board.rows(), 10);
        assert!(board.is_move_legal(Position::new(0, 0), Position::new(9, 9)));
        assert!(board.is_move_legal(Position::new(0, 0), Position::new(0, 9)));
    }

    #[test]
    fn test_type_without_states_is_fatal() {
        // Queen 的唯一状态名无法识别
        let config =
            GameConfig::from_json(r#"{ "states": { "Queen": { "fly": {} } } }"#).unwrap();
        assert!(config.catalog().is_err());
        assert!(config.build_board(EventBus::new()).is_err());
    }

    #[test]
    fn test_invalid_files() {
        assert!(GameConfig::load("/nonexistent/kfchess.json").is_err());
        assert!(GameConfig::from_json(r#"{ "tick_ms": 0 }"#).is_err());
        assert!(GameConfig::from_json("not json").is_err());

        let config = GameConfig::from_json(r#"{ "layout": "XW" }"#).unwrap();
        assert!(config.build_board(EventBus::new()).is_err());
    }
}
