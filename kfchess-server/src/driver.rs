//! 驱动循环
//!
//! [`GameLoop`] 独占会话，以固定帧率推进棋盘。其他任务通过 [`GameHandle`]
//! 把指令放进无界队列；每帧开始时先按到达顺序处理队列中的全部指令，
//! 再推进一帧，因此指令永远不会与帧更新交错。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use kfchess_core::{GridSnapshot, Outcome, Position, POSITION_SEPARATOR};

use crate::session::GameSession;

/// 外部指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move { from: Position, to: Position },
    Jump { at: Position },
    Pause,
    Resume,
    Stop,
}

/// 解析 `row,col`
fn parse_position(text: &str) -> Result<Position> {
    let (row, col) = text
        .split_once(POSITION_SEPARATOR)
        .ok_or_else(|| anyhow!("坐标格式应为 row{}col: {:?}", POSITION_SEPARATOR, text))?;
    let row = row.trim().parse::<i32>().with_context(|| format!("行号无效: {:?}", row))?;
    let col = col.trim().parse::<i32>().with_context(|| format!("列号无效: {:?}", col))?;
    Ok(Position::new(row, col))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    /// 文本指令：`move 6,4 4,4`、`jump 6,4`、`pause`、`resume`、`stop`
    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let Some(verb) = words.next() else {
            bail!("空指令");
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("move", [from, to]) => Command::Move {
                from: parse_position(from)?,
                to: parse_position(to)?,
            },
            ("jump", [at]) => Command::Jump {
                at: parse_position(at)?,
            },
            ("pause", []) => Command::Pause,
            ("resume", []) => Command::Resume,
            ("stop" | "quit", []) => Command::Stop,
            _ => bail!("无法识别的指令: {:?}", s.trim()),
        };
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = POSITION_SEPARATOR;
        match self {
            Command::Move { from, to } => write!(
                f,
                "move {}{}{} {}{}{}",
                from.row, sep, from.col, to.row, sep, to.col
            ),
            Command::Jump { at } => write!(f, "jump {}{}{}", at.row, sep, at.col),
            Command::Pause => f.write_str("pause"),
            Command::Resume => f.write_str("resume"),
            Command::Stop => f.write_str("stop"),
        }
    }
}

/// 指令发送端（可克隆）
#[derive(Debug, Clone)]
pub struct GameHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl GameHandle {
    /// 发送指令，循环已退出时返回错误
    pub fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|e| anyhow!("对局已结束，指令被丢弃: {}", e.0))
    }

    pub fn move_piece(&self, from: Position, to: Position) -> Result<()> {
        self.send(Command::Move { from, to })
    }

    pub fn jump(&self, at: Position) -> Result<()> {
        self.send(Command::Jump { at })
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    /// 循环是否已退出
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 对局结束时的汇总
#[derive(Debug, Clone, Serialize)]
pub struct GameReport {
    pub outcome: Option<Outcome>,
    pub snapshot: GridSnapshot,
    /// 模拟时间（毫秒）
    pub elapsed_ms: u64,
    /// 实际进行的墙钟时间（毫秒，暂停不计）
    pub wall_ms: u64,
    /// 成功执行的指令数
    pub accepted: usize,
    /// 被拒绝的指令数
    pub rejected: usize,
}

/// 驱动循环
pub struct GameLoop {
    session: GameSession,
    rx: mpsc::UnboundedReceiver<Command>,
    tick: Duration,
    accepted: usize,
    rejected: usize,
}

impl GameLoop {
    /// 创建循环和对应的指令句柄
    pub fn new(session: GameSession, tick: Duration) -> (Self, GameHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let game_loop = Self {
            session,
            rx,
            tick,
            accepted: 0,
            rejected: 0,
        };
        (game_loop, GameHandle { tx })
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// 处理单条指令
    fn apply(&mut self, command: Command) {
        let ok = match command {
            Command::Move { from, to } => self.session.move_piece(from, to),
            Command::Jump { at } => self.session.jump(at),
            Command::Pause => self.session.pause(),
            Command::Resume => self.session.resume(),
            Command::Stop => self.session.stop(),
        };
        if ok {
            self.accepted += 1;
            debug!("Applied {}", command);
        } else {
            self.rejected += 1;
            debug!("Rejected {}", command);
        }
    }

    /// 处理队列中已到达的全部指令，返回所有发送端是否都已关闭
    fn drain(&mut self) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
    }

    /// 执行一帧：先处理指令，再推进时间
    pub fn step(&mut self) -> bool {
        let disconnected = self.drain();
        self.session.tick(self.tick);
        disconnected
    }

    /// 运行到对局结束、被中止或所有句柄都被丢弃，退出前关闭事件总线
    pub async fn run(mut self) -> GameReport {
        self.session.start();
        info!("Game loop running at {:?} per tick", self.tick);

        let mut interval = time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let disconnected = self.step();
            if self.session.is_finished() {
                break;
            }
            if disconnected {
                warn!("All game handles dropped, stopping");
                self.session.stop();
                break;
            }
        }

        self.rx.close();
        self.session.board().bus().shutdown();
        debug!("Event bus shut down");
        self.report()
    }

    fn report(&self) -> GameReport {
        let snapshot = self.session.snapshot();
        GameReport {
            outcome: self.session.outcome(),
            elapsed_ms: snapshot.elapsed_ms,
            wall_ms: self.session.clock().elapsed().as_millis() as u64,
            snapshot,
            accepted: self.accepted,
            rejected: self.rejected,
        }
    }
}

/// 在后台任务中运行对局
pub fn spawn(session: GameSession, tick: Duration) -> (GameHandle, JoinHandle<GameReport>) {
    let (game_loop, handle) = GameLoop::new(session, tick);
    let task = tokio::spawn(game_loop.run());
    (handle, task)
}
