use anyhow::Result;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kfchess_core::EventBus;
use kfchess_server::{spawn, Command, GameConfig, GameSession};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("kfchess_server=debug".parse()?))
        .init();

    info!("功夫象棋服务端启动中...");

    // 可选参数：配置文件路径
    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };

    let board = config.build_board(EventBus::new())?;
    let (handle, task) = spawn(GameSession::new(board), config.tick());

    // 从标准输入读取指令，输入结束时中止对局
    let reader = handle.clone();
    let input = tokio::spawn(async move {
        let mut lines = BufReader::new(io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => {
                    if reader.send(command).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{:#}", e),
            }
        }
        let _ = reader.stop();
    });
    drop(handle);

    let report = task.await?;
    input.abort();

    match report.outcome {
        Some(outcome) => info!("对局结束: {:?}", outcome),
        None => info!("对局已中止"),
    }
    info!(
        "模拟时间 {}ms，实际用时 {}ms",
        report.elapsed_ms, report.wall_ms
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
