//! Agent run modes: interactive chat, autonomous, and the framed stdio
//! protocol used when supervised by the dual-agent router.

use super::{Agent, AgentEvent};
use crate::router::{RequestFrame, ResponseFrame};
use crate::Result;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};

/// Printed after every chunk of agent output
pub const CHUNK_SEPARATOR: &str = "-------------------";

/// Prompts cycled through in autonomous mode
pub const AUTO_THOUGHTS: &[&str] = &[
    "Check the wallet details and report the ETH and sETH balances on the current chain.",
    "Deposit a small amount of ETH (0.0001) into SuperETH to receive sETH.",
    "Bridge 0.0001 sETH from Base Sepolia to Optimism Sepolia for the agent address.",
    "Switch to the other Skywire chain and report the sETH balance there.",
    "Withdraw 0.0001 sETH back to ETH if the balance allows it.",
];

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

async fn print_events<W: AsyncWrite + Unpin>(out: &mut W, events: &[AgentEvent]) -> Result<()> {
    for event in events {
        write_line(out, event.text()).await?;
        write_line(out, CHUNK_SEPARATOR).await?;
    }
    Ok(())
}

/// Interactive prompt loop; `exit` or end of input stops it
pub async fn chat_loop<R, W>(agent: &mut Agent, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_line(out, "Starting chat mode... Type 'exit' to end.").await?;
    let mut lines = input.lines();

    loop {
        out.write_all(b"\nPrompt: ").await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let mut events = Vec::new();
        match agent.run_turn(line, |e| events.push(e)).await {
            Ok(_) => print_events(out, &events).await?,
            Err(e) => {
                print_events(out, &events).await?;
                error!(error = %e, "Agent turn failed");
                write_line(out, &format!("Error: {}", e)).await?;
            }
        }
    }
    Ok(())
}

/// Pick an autonomous prompt from the clock
pub fn thought_for(now: SystemTime) -> &'static str {
    let secs = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    AUTO_THOUGHTS[(secs % AUTO_THOUGHTS.len() as u64) as usize]
}

/// Act on a rotating prompt every `interval` until Ctrl-C
pub async fn auto_loop<W: AsyncWrite + Unpin>(
    agent: &mut Agent,
    interval: Duration,
    out: &mut W,
) -> Result<()> {
    write_line(out, "Starting autonomous mode...").await?;

    loop {
        let thought = thought_for(SystemTime::now());
        info!(thought, "Autonomous step");

        let mut events = Vec::new();
        let turn = tokio::select! {
            result = agent.run_turn(thought, |e| events.push(e)) => result,
            _ = tokio::signal::ctrl_c() => break,
        };
        print_events(out, &events).await?;
        if let Err(e) = turn {
            error!(error = %e, "Autonomous step failed");
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    write_line(out, "Goodbye Agent!").await?;
    Ok(())
}

/// Framed child protocol: one JSON request per input line, answered by
/// message frames and a closing `done` (or `error`) frame with the same id.
pub async fn serve_loop<R, W>(agent: &mut Agent, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_line(out, &ResponseFrame::Ready.encode()?).await?;
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: RequestFrame = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed request frame");
                let frame = ResponseFrame::Error {
                    id: String::new(),
                    message: format!("malformed request: {}", e),
                };
                write_line(out, &frame.encode()?).await?;
                continue;
            }
        };

        info!(id = %request.id, "Handling instruction");
        let mut events = Vec::new();
        let result = agent
            .run_turn(&request.instruction, |e| events.push(e))
            .await;

        for event in &events {
            let frame = ResponseFrame::Message {
                id: request.id.clone(),
                text: event.text().to_string(),
            };
            write_line(out, &frame.encode()?).await?;
        }
        let closing = match result {
            Ok(_) => ResponseFrame::Done { id: request.id },
            Err(e) => ResponseFrame::Error {
                id: request.id,
                message: e.to_string(),
            },
        };
        write_line(out, &closing.encode()?).await?;
    }

    info!("Input closed, leaving serve mode");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionRegistry, WalletActionProvider};
    use crate::agent::testing::{call, ScriptedModel};
    use crate::config::LlmConfig;
    use crate::llm::ChatMessage;
    use crate::network::Network;
    use crate::wallet::mock::MockWallet;
    use alloy::primitives::Address;
    use std::sync::Arc;
    use tokio::io::BufReader;

    fn agent(replies: Vec<ChatMessage>) -> Agent {
        let wallet = Arc::new(MockWallet::new(Address::ZERO, Network::base_sepolia()));
        let actions = ActionRegistry::new(wallet).with_provider(WalletActionProvider::new());
        Agent::new(
            Arc::new(ScriptedModel::new(replies)),
            actions,
            "system".to_string(),
            &LlmConfig::default(),
        )
    }

    #[tokio::test]
    async fn serve_answers_each_request_with_framed_output() {
        let mut agent = agent(vec![
            call("c1", "switch_network", r#"{"network_id":"base-sepolia"}"#),
            ChatMessage::assistant("All set."),
        ]);
        let input = "{\"id\":\"r1\",\"instruction\":\"stay on base\"}\nnot json\n";
        let mut out = Vec::new();
        serve_loop(&mut agent, BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap();

        let frames: Vec<ResponseFrame> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(frames[0], ResponseFrame::Ready);
        assert_eq!(
            frames[1],
            ResponseFrame::Message {
                id: "r1".to_string(),
                text: "Already on network base-sepolia, no need to switch.".to_string()
            }
        );
        assert_eq!(
            frames[2],
            ResponseFrame::Message {
                id: "r1".to_string(),
                text: "All set.".to_string()
            }
        );
        assert_eq!(frames[3], ResponseFrame::Done { id: "r1".to_string() });
        assert!(matches!(&frames[4], ResponseFrame::Error { id, .. } if id.is_empty()));
        assert_eq!(frames.len(), 5);
    }

    #[tokio::test]
    async fn chat_prints_chunks_with_separator_until_exit() {
        let mut agent = agent(vec![ChatMessage::assistant("hello there")]);
        let input = "hi\nexit\nnever read\n";
        let mut out = Vec::new();
        chat_loop(&mut agent, BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Prompt: hello there\n-------------------\n"));
        assert!(!text.contains("never read"));
    }

    #[test]
    fn thoughts_rotate_with_time() {
        let t0 = UNIX_EPOCH + Duration::from_secs(0);
        let t1 = UNIX_EPOCH + Duration::from_secs(1);
        assert_eq!(thought_for(t0), AUTO_THOUGHTS[0]);
        assert_eq!(thought_for(t1), AUTO_THOUGHTS[1]);
    }
}
