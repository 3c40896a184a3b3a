//! 棋盘坐标

use serde::{Deserialize, Serialize};

/// 棋盘位置（行、列），不做边界检查，边界由 `BoardConfig` 判断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    /// 创建新位置
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// 获取偏移后的位置
    pub fn offset(&self, dr: i32, dc: i32) -> Position {
        Position::new(self.row + dr, self.col + dc)
    }

    /// 从 `from` 到 `self` 的有符号位移 (dr, dc)
    pub fn delta(&self, from: Position) -> (i32, i32) {
        (self.row - from.row, self.col - from.col)
    }

    /// 朝 `target` 的单位步长 (signum(dr), signum(dc))
    pub fn step_towards(&self, target: Position) -> (i32, i32) {
        let (dr, dc) = target.delta(*self);
        (dr.signum(), dc.signum())
    }

    /// 到 `other` 的欧氏距离（格）
    pub fn distance(&self, other: Position) -> f64 {
        let (dr, dc) = other.delta(*self);
        f64::from(dr).hypot(f64::from(dc))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_and_offset() {
        let from = Position::new(6, 4);
        let to = Position::new(4, 5);

        assert_eq!(to.delta(from), (-2, 1));
        assert_eq!(from.offset(-2, 1), to);
    }

    #[test]
    fn test_step_towards() {
        let from = Position::new(0, 0);
        assert_eq!(from.step_towards(Position::new(5, 5)), (1, 1));
        assert_eq!(from.step_towards(Position::new(0, -3)), (0, -1));
        assert_eq!(from.step_towards(from), (0, 0));
    }

    #[test]
    fn test_distance() {
        let a = Position::new(1, 1);
        assert_eq!(a.distance(Position::new(1, 4)), 3.0);
        assert_eq!(a.distance(Position::new(4, 5)), 5.0);
    }
}
