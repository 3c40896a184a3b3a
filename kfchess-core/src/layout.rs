//! 初始布局解析
//!
//! 布局是 CSV 文本，每行对应棋盘一行，单元格以 `,` 分隔。
//! 非空单元格为 `<棋子字母><W|B>`，例如 `PW`（白兵）、`KB`（黑王）。
//! W 属于玩家 0，B 属于玩家 1。
//!
//! 示例（标准开局）见 [`STANDARD_LAYOUT`]。

use crate::config::BoardConfig;
use crate::constants::POSITION_SEPARATOR;
use crate::error::{Error, Result};
use crate::piece::PieceType;
use crate::player::PlayerId;
use crate::position::Position;

/// 标准开局布局（第 0 行为黑方底线）
pub const STANDARD_LAYOUT: &str = "\
RB,NB,BB,QB,KB,BB,NB,RB
PB,PB,PB,PB,PB,PB,PB,PB
,,,,,,,
,,,,,,,
,,,,,,,
,,,,,,,
PW,PW,PW,PW,PW,PW,PW,PW
RW,NW,BW,QW,KW,BW,NW,RW
";

/// 初始布局：每格为空或 (棋子类型, 所属玩家)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    rows: i32,
    cols: i32,
    cells: Vec<Option<(PieceType, PlayerId)>>,
}

impl Layout {
    /// 空布局
    pub fn empty(rows: i32, cols: i32) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; (rows.max(0) * cols.max(0)) as usize],
        }
    }

    /// 标准开局
    pub fn standard() -> Self {
        Self::parse(STANDARD_LAYOUT, &BoardConfig::default())
            .unwrap_or_else(|_| Self::empty(8, 8))
    }

    /// 解析布局文本，行或单元格不足时视为空，超出棋盘则报错
    pub fn parse(text: &str, config: &BoardConfig) -> Result<Self> {
        let mut layout = Self::empty(config.rows, config.cols);
        let lines: Vec<&str> = text.lines().collect();

        // 末尾空行不算
        let used = lines
            .iter()
            .rposition(|line| !line.trim().is_empty())
            .map_or(0, |i| i + 1);
        if used as i32 > config.rows {
            return Err(Error::InvalidLayout {
                reason: format!("Expected at most {} rows, got {}", config.rows, used),
            });
        }

        for (row, line) in lines.iter().take(used).enumerate() {
            let cells: Vec<&str> = line.split(POSITION_SEPARATOR).collect();
            if cells.len() as i32 > config.cols {
                return Err(Error::InvalidLayout {
                    reason: format!(
                        "Row {} has {} cells, board has {} columns",
                        row,
                        cells.len(),
                        config.cols
                    ),
                });
            }

            for (col, cell) in cells.iter().enumerate() {
                let code = cell.trim();
                if code.is_empty() {
                    continue;
                }
                let piece = Self::parse_code(code)?;
                layout.set(Position::new(row as i32, col as i32), Some(piece));
            }
        }

        Ok(layout)
    }

    /// 解析单个棋子代码
    fn parse_code(code: &str) -> Result<(PieceType, PlayerId)> {
        let unknown = || Error::UnknownPieceCode {
            code: code.to_string(),
        };
        let mut chars = code.chars();
        let piece_type = chars.next().and_then(PieceType::from_code).ok_or_else(unknown)?;
        let owner = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('W') => 0,
            Some('B') => 1,
            _ => return Err(unknown()),
        };
        if chars.next().is_some() {
            return Err(unknown());
        }
        Ok((piece_type, owner))
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if (0..self.rows).contains(&pos.row) && (0..self.cols).contains(&pos.col) {
            Some((pos.row * self.cols + pos.col) as usize)
        } else {
            None
        }
    }

    pub fn get(&self, pos: Position) -> Option<(PieceType, PlayerId)> {
        self.index(pos).and_then(|i| self.cells[i])
    }

    /// 设置某格，越界时忽略
    pub fn set(&mut self, pos: Position, piece: Option<(PieceType, PlayerId)>) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = piece;
        }
    }

    /// 放置一个棋子（构建测试局面用）
    pub fn with(mut self, pos: Position, piece_type: PieceType, owner: PlayerId) -> Self {
        self.set(pos, Some((piece_type, owner)));
        self
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    /// 按行优先顺序列出所有棋子
    pub fn pieces(&self) -> impl Iterator<Item = (Position, PieceType, PlayerId)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.map(|(piece_type, owner)| {
                let pos = Position::new(i as i32 / self.cols, i as i32 % self.cols);
                (pos, piece_type, owner)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout() {
        let layout = Layout::standard();

        assert_eq!(layout.pieces().count(), 32);
        assert_eq!(layout.get(Position::new(0, 4)), Some((PieceType::King, 1)));
        assert_eq!(layout.get(Position::new(7, 3)), Some((PieceType::Queen, 0)));
        assert_eq!(layout.get(Position::new(6, 5)), Some((PieceType::Pawn, 0)));
        assert_eq!(layout.get(Position::new(4, 4)), None);
    }

    #[test]
    fn test_short_rows_are_empty() {
        let config = BoardConfig::default();
        let layout = Layout::parse("RB\n\n,,KW", &config).unwrap();

        assert_eq!(layout.pieces().count(), 2);
        assert_eq!(layout.get(Position::new(0, 0)), Some((PieceType::Rook, 1)));
        assert_eq!(layout.get(Position::new(2, 2)), Some((PieceType::King, 0)));
    }

    #[test]
    fn test_unknown_code() {
        let config = BoardConfig::default();
        assert!(matches!(
            Layout::parse("XW", &config),
            Err(Error::UnknownPieceCode { .. })
        ));
        assert!(matches!(
            Layout::parse("PX", &config),
            Err(Error::UnknownPieceCode { .. })
        ));
        assert!(matches!(
            Layout::parse("PWW", &config),
            Err(Error::UnknownPieceCode { .. })
        ));
    }

    #[test]
    fn test_too_large() {
        let config = BoardConfig::with_size(2, 2);
        assert!(matches!(
            Layout::parse("PW,PW,PW", &config),
            Err(Error::InvalidLayout { .. })
        ));
        assert!(matches!(
            Layout::parse("PW\nPW\nPW", &config),
            Err(Error::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_pieces_order_is_row_major() {
        let layout = Layout::empty(3, 3)
            .with(Position::new(2, 0), PieceType::Rook, 0)
            .with(Position::new(0, 2), PieceType::Rook, 1);

        let order: Vec<Position> = layout.pieces().map(|(pos, _, _)| pos).collect();
        assert_eq!(order, vec![Position::new(0, 2), Position::new(2, 0)]);
    }
}
