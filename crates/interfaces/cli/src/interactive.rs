use std::io;
use std::io::{IsTerminal, Write};
use std::sync::Arc;

use anyhow::Result;

use falcon_agent::{AgentEvent, AgentLoop, CancellationToken, FileConfirmation};
use falcon_exec::ConfirmationManager;
use falcon_memory::SessionLog;
use falcon_tools::ConfirmationDecision;

/// Plain line-based REPL: reads one message per line, drives it through
/// the Agent Loop, and renders the event stream as it arrives. No TUI —
/// this crate's whole interface surface is this loop and the
/// `run --request` path in `requests.rs`.
///
/// Confirmable writes surface through `confirmation_manager` rather than
/// through the Agent Loop's own event stream: the tool blocks on its
/// verdict independently of the turn's `on_event` callback, so this loop
/// races the turn's future against `manager.next()` and answers each
/// request from the same stdin the rest of the session reads from.
pub async fn run_interactive_session(
    agent: &AgentLoop,
    session_log: &mut SessionLog,
    confirmation_manager: Arc<ConfirmationManager>,
) -> Result<()> {
    println!("falcon interactive session — type a message, or /exit to quit");
    if !io::stdin().is_terminal() {
        println!("(stdin is not a terminal; reading one message per line)");
    }

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = stdin.read_line(&mut line)?;
        if bytes == 0 {
            println!("session closed");
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/exit" {
            println!("session closed");
            break;
        }

        session_log.record_turn(line);
        let cancellation = CancellationToken::new();
        let mut tools_used = Vec::new();

        let mut on_event = |event| {
            render_event(&event, &mut tools_used);
        };
        let turn = agent.process_message_with_events(&cancellation, line, &mut on_event);
        let result = run_turn_with_confirmations(turn, &confirmation_manager).await;

        for tool in tools_used {
            session_log.record_tool_use(&tool);
        }

        match result {
            Ok(answer) => println!("\n{answer}"),
            Err(err) => eprintln!("\nerror: {err}"),
        }
    }

    Ok(())
}

/// Drives `turn` to completion while concurrently answering any
/// confirmation requests it triggers along the way. A request that
/// arrives after the turn has already finished is impossible: the
/// manager's sender is only held by tools the turn itself invoked.
async fn run_turn_with_confirmations<T>(
    turn: impl std::future::Future<Output = T>,
    manager: &ConfirmationManager,
) -> T {
    tokio::pin!(turn);
    loop {
        tokio::select! {
            result = &mut turn => return result,
            pending = manager.next() => {
                let Some((request, verdict)) = pending else { continue };
                let confirmation = FileConfirmation {
                    path: request.target_path.clone(),
                    proposed_content: request.new_content.clone(),
                    original_content: request.original_content.clone(),
                    diff: request.diff.clone(),
                };
                render_event(&AgentEvent::ConfirmationRequired(confirmation), &mut Vec::new());
                let decision = prompt_for_confirmation();
                let _ = verdict.send(decision);
            }
        }
    }
}

fn prompt_for_confirmation() -> ConfirmationDecision {
    print!("approve this write? [y/N] ");
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return ConfirmationDecision::Reject;
    }
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => ConfirmationDecision::Approve,
        _ => ConfirmationDecision::Reject,
    }
}

fn render_event(event: &AgentEvent, tools_used: &mut Vec<String>) {
    match event {
        AgentEvent::Thinking => {}
        AgentEvent::Streaming { content } => {
            print!("{content}");
            let _ = io::stdout().flush();
        }
        AgentEvent::ToolCall { name, tool_args } => {
            tools_used.push(name.clone());
            println!("\n[tool_call] {name}({tool_args})");
        }
        AgentEvent::Observation { content, success } => {
            let marker = if *success { "ok" } else { "failed" };
            println!("[observation:{marker}] {content}");
        }
        AgentEvent::ToolUsage(usage) => {
            println!(
                "[tool_usage] {} {}/{} (session {}/{})",
                usage.tool_name, usage.calls_made, usage.calls_limit, usage.total_calls, usage.total_limit
            );
        }
        AgentEvent::Answer { .. } => {}
        AgentEvent::Error { content } => println!("[error] {content}"),
        AgentEvent::ConfirmationRequired(confirmation) => {
            println!("[confirmation_required] {}\n{}", confirmation.path, confirmation.diff);
        }
    }
}
