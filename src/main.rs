//! Jarvis - 命令行外壳
//!
//! 入口：初始化日志与配置、组装编排器，然后逐行读取用户输入，每行驱动一个回合。
//! 工具返回的图表保存到 media_dir，回答中给出文件路径。

use std::path::{Path, PathBuf};

use anyhow::Context;
use jarvis::config::load_config;
use jarvis::core::{create_assistant, Orchestrator, Session, TurnEvent, TurnOutput};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "Commands: :help  :tools  :history  :retry  :quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jarvis::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path)?;

    let (orchestrator, mut session) = create_assistant(&cfg);
    println!("{} ready. Tools: {}", cfg.app.name, session.registry().tool_names().join(", "));
    println!("{}", HELP);

    // 过程事件只用于显示进度
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<TurnEvent>();
    tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            if let Some(status) = describe(&ev) {
                eprintln!("  … {}", status);
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            ":quit" | ":q" | ":exit" => break,
            ":help" => println!("{}", HELP),
            ":tools" => {
                for tool in session.registry().tools() {
                    println!("- {}: {}", tool.name(), tool.description());
                }
            }
            ":history" => {
                for turn in session.history().turns() {
                    println!("[{:?}] {}", turn.role, turn.content);
                }
            }
            ":retry" => run_turn(&orchestrator, &mut session, &event_tx, &cfg.app.media_dir).await,
            _ => {
                if !session.submit(input) {
                    println!("The previous request is still unanswered. Type :retry to try it again.");
                    continue;
                }
                run_turn(&orchestrator, &mut session, &event_tx, &cfg.app.media_dir).await;
            }
        }
    }
    Ok(())
}

async fn run_turn(
    orchestrator: &Orchestrator,
    session: &mut Session,
    event_tx: &mpsc::UnboundedSender<TurnEvent>,
    media_dir: &Path,
) {
    match orchestrator.advance(session, Some(event_tx)).await {
        Ok(Some(output)) => {
            println!("{}", output.answer);
            for path in save_media(&output, media_dir) {
                println!("(chart saved to {})", path.display());
            }
        }
        Ok(None) => println!("Nothing pending."),
        Err(e) => {
            tracing::error!(error = %e, "turn failed");
            println!("Error: {} (type :retry to try again)", e);
        }
    }
}

fn save_media(output: &TurnOutput, media_dir: &Path) -> Vec<PathBuf> {
    let with_media: Vec<_> = output
        .results
        .iter()
        .filter_map(|r| r.media.as_ref().map(|m| (r, m)))
        .collect();
    if with_media.is_empty() {
        return Vec::new();
    }
    if let Err(e) = std::fs::create_dir_all(media_dir) {
        tracing::warn!(dir = %media_dir.display(), error = %e, "cannot create media dir");
        return Vec::new();
    }

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let mut saved = Vec::new();
    for (i, (result, media)) in with_media.into_iter().enumerate() {
        let bytes = match media.decode() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(tool = %result.tool, error = %e, "invalid media payload");
                continue;
            }
        };
        let name = format!("{}-{}-{}-{}.{}", result.tool, result.display, stamp, i, media.extension());
        let path = media_dir.join(sanitize(&name));
        match std::fs::write(&path, bytes) {
            Ok(()) => saved.push(path),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to save media"),
        }
    }
    saved
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

fn describe(ev: &TurnEvent) -> Option<String> {
    match ev {
        TurnEvent::Resolving => Some("deciding which tools to use".to_string()),
        TurnEvent::IntentsResolved { tools } => Some(format!("intents: {}", tools.join(", "))),
        TurnEvent::ToolStarted { tool } => Some(format!("running {}", tool)),
        TurnEvent::ToolFinished { tool, status } => Some(format!("{} finished ({})", tool, status)),
        TurnEvent::Synthesizing { tools } => Some(format!("combining results from {}", tools.join(", "))),
        TurnEvent::AnsweringDirectly => Some("answering directly".to_string()),
        TurnEvent::Answered => None,
    }
}
