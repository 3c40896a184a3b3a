//! 事件总线
//!
//! 按主题发布/订阅。总线是一个可克隆的句柄，由创建者显式初始化并传给
//! 棋盘和订阅方，`shutdown` 之后发布不再调用任何监听者。

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::board::Outcome;
use crate::piece::{PieceId, PieceType};
use crate::player::PlayerId;
use crate::position::Position;

/// 事件主题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    PieceCaptured,
    PieceMoved,
    PieceJumped,
    PiecePromoted,
    GameOver,
}

/// 吃子发生在哪个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapturePhase {
    /// 动作完成时，目标格上已有棋子
    BeforeLanding,
    /// 移动后落在已被占据的格子
    OnLanding,
}

/// 游戏事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PieceCaptured {
        piece: PieceId,
        piece_type: PieceType,
        owner: PlayerId,
        at: Position,
        phase: CapturePhase,
        time: DateTime<Utc>,
    },
    PieceMoved {
        piece: PieceId,
        owner: PlayerId,
        from: Position,
        to: Position,
        time: DateTime<Utc>,
    },
    PieceJumped {
        piece: PieceId,
        owner: PlayerId,
        at: Position,
        time: DateTime<Utc>,
    },
    PiecePromoted {
        piece: PieceId,
        owner: PlayerId,
        at: Position,
        time: DateTime<Utc>,
    },
    GameOver {
        outcome: Outcome,
        time: DateTime<Utc>,
    },
}

impl GameEvent {
    /// 事件对应的主题
    pub fn topic(&self) -> Topic {
        match self {
            GameEvent::PieceCaptured { .. } => Topic::PieceCaptured,
            GameEvent::PieceMoved { .. } => Topic::PieceMoved,
            GameEvent::PieceJumped { .. } => Topic::PieceJumped,
            GameEvent::PiecePromoted { .. } => Topic::PiecePromoted,
            GameEvent::GameOver { .. } => Topic::GameOver,
        }
    }
}

/// 事件监听者
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &GameEvent);
}

impl<F> Listener for F
where
    F: Fn(&GameEvent) + Send + Sync,
{
    fn on_event(&self, event: &GameEvent) {
        self(event)
    }
}

/// 订阅 ID，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerMap = HashMap<Topic, Vec<(ListenerId, Arc<dyn Listener>)>>;

struct Inner {
    listeners: RwLock<ListenerMap>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// 事件总线句柄
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                listeners: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// 订阅主题
    pub fn subscribe<L>(&self, topic: Topic, listener: L) -> ListenerId
    where
        L: Listener + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let mut map = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(topic).or_default().push((id, Arc::new(listener)));
        id
    }

    /// 取消订阅，返回是否找到
    pub fn unsubscribe(&self, topic: Topic, id: ListenerId) -> bool {
        let mut map = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(listeners) = map.get_mut(&topic) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            map.remove(&topic);
        }
        removed
    }

    /// 同步调用该主题当前的所有监听者（按订阅顺序）
    ///
    /// 调用的是发布时刻的快照，监听者内部可以安全地订阅/取消订阅。
    /// 某个监听者 panic 只会被记录，不影响其余监听者。
    pub fn publish(&self, topic: Topic, event: &GameEvent) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }

        let snapshot: Vec<Arc<dyn Listener>> = {
            let map = self
                .inner
                .listeners
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match map.get(&topic) {
                Some(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
                None => return,
            }
        };

        for listener in snapshot {
            let result = panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
            if result.is_err() {
                warn!("Listener for {:?} panicked, skipping", topic);
            }
        }
    }

    /// 发布事件到其自身的主题
    pub fn emit(&self, event: GameEvent) {
        self.publish(event.topic(), &event);
    }

    /// 某主题的监听者数量
    pub fn listener_count(&self, topic: Topic) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .map_or(0, Vec::len)
    }

    /// 关闭总线并移除所有监听者
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("closed", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}
