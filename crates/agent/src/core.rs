//! The bounded ReAct driver: stream a turn from the LLM, parse it for a
//! tool call or a final answer, dispatch through the `ToolExecutor`,
//! enforce call budgets, and narrate every step through `AgentEvent`s.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument, warn};

use falcon_config::ToolLimitsSection;
use falcon_exec::ToolExecutor;
use falcon_llm::{ChatMessage, LlmClient};
use falcon_workspace::FalconError;

use crate::events::{AgentEvent, ToolUsage};
use crate::parser::{parse_assistant_message, ParsedMessage};

/// Cooperative cancellation: checked between loop iterations, never
/// preempts a tool call already in flight.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything the loop needs across one conversation: history, budgets,
/// and the collaborators it drives (`llm`, `executor`).
pub struct AgentLoop {
    llm: Arc<dyn LlmClient>,
    executor: ToolExecutor,
    system_prompt: String,
    tool_limits: ToolLimitsSection,
    total_limit: u32,
    history: Mutex<Vec<ChatMessage>>,
    tool_counts: Mutex<HashMap<String, u32>>,
    total_calls: AtomicU32,
}

impl AgentLoop {
    pub fn new(llm: Arc<dyn LlmClient>, executor: ToolExecutor, system_prompt: String, tool_limits: ToolLimitsSection) -> Self {
        let total_limit = tool_limits.total_limit;
        Self {
            llm,
            executor,
            system_prompt,
            tool_limits,
            total_limit,
            history: Mutex::new(Vec::new()),
            tool_counts: Mutex::new(HashMap::new()),
            total_calls: AtomicU32::new(0),
        }
    }

    /// Blocking convenience: runs the streaming variant with a no-op
    /// callback and keeps only the final answer.
    pub async fn process_message(&self, input: &str) -> Result<String, FalconError> {
        self.process_message_with_events(&CancellationToken::new(), input, &mut |_event| {}).await
    }

    /// The main driver. `on_event` is invoked, in order, for every event
    /// the turn produces; the returned string is the final answer (or an
    /// error if the turn was cancelled or the LLM transport failed).
    #[instrument(skip(self, cancellation, on_event))]
    pub async fn process_message_with_events(
        &self,
        cancellation: &CancellationToken,
        input: &str,
        on_event: &mut (dyn FnMut(AgentEvent) + Send),
    ) -> Result<String, FalconError> {
        {
            let mut history = self.history.lock().unwrap();
            if history.is_empty() {
                history.push(ChatMessage::system(self.system_prompt.clone()));
            } else {
                history[0] = ChatMessage::system(self.system_prompt.clone());
            }
            history.push(ChatMessage::user(input.to_string()));
        }

        let known_tools = self.executor.registry().names();

        loop {
            if cancellation.is_cancelled() {
                return Err(FalconError::Cancelled);
            }

            let messages = self.history.lock().unwrap().clone();
            on_event(AgentEvent::Thinking);
            let stream_result = self
                .llm
                .chat_stream(&messages, &mut |chunk: &str| {
                    on_event(AgentEvent::streaming(chunk));
                })
                .await;

            let assistant_text = match stream_result {
                Ok(full) => full,
                Err(err) => return Err(FalconError::LlmTransport(err.to_string())),
            };

            self.history.lock().unwrap().push(ChatMessage::assistant(assistant_text.clone()));

            match parse_assistant_message(&assistant_text, &known_tools) {
                ParsedMessage::Final(text) => {
                    on_event(AgentEvent::answer(text.clone()));
                    return Ok(text);
                }
                ParsedMessage::None => {
                    on_event(AgentEvent::answer(assistant_text.clone()));
                    return Ok(assistant_text);
                }
                ParsedMessage::MalformedCall { name, diagnostic } => {
                    on_event(AgentEvent::error(diagnostic.clone()));
                    self.push_observation(&format!("Observation: {diagnostic}"));
                    debug!(tool = %name, "malformed tool call recovered as observation");
                    continue;
                }
                ParsedMessage::Call { name, args } => {
                    if cancellation.is_cancelled() {
                        return Err(FalconError::Cancelled);
                    }

                    if let Some(diagnostic) = self.check_limits(&name) {
                        on_event(AgentEvent::error(diagnostic.clone()));
                        self.push_observation(&format!("Observation: {diagnostic}"));
                        warn!(tool = %name, "tool call budget exhausted");
                        continue;
                    }

                    on_event(AgentEvent::tool_call(&name, &args));
                    let outcome = self.executor.execute(&name, &args).await;

                    let (success, output_text) = match outcome {
                        Ok(output) => (output.success, output.output),
                        Err(FalconError::UnknownTool(tool_name)) => {
                            let diagnostic = format!("unknown tool '{tool_name}'");
                            on_event(AgentEvent::error(diagnostic.clone()));
                            self.push_observation(&format!("Observation: {diagnostic}"));
                            continue;
                        }
                        Err(err) => (false, err.to_string()),
                    };

                    self.record_call(&name);
                    on_event(AgentEvent::observation(output_text.clone(), success));
                    on_event(AgentEvent::ToolUsage(self.usage_snapshot(&name)));
                    self.push_observation(&format!("Observation: {output_text}"));
                }
            }
        }
    }

    fn check_limits(&self, name: &str) -> Option<String> {
        let tool_count = *self.tool_counts.lock().unwrap().get(name).unwrap_or(&0);
        let total = self.total_calls.load(Ordering::SeqCst);
        let per_tool_limit = self.tool_limits.limit_for(name);
        if tool_count >= per_tool_limit {
            return Some(format!("limit reached: '{name}' has hit its call budget of {per_tool_limit}"));
        }
        if total >= self.total_limit {
            return Some(format!("limit reached: session call budget of {} exhausted", self.total_limit));
        }
        None
    }

    fn record_call(&self, name: &str) {
        *self.tool_counts.lock().unwrap().entry(name.to_string()).or_insert(0) += 1;
        self.total_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn usage_snapshot(&self, name: &str) -> ToolUsage {
        let calls_made = *self.tool_counts.lock().unwrap().get(name).unwrap_or(&0);
        ToolUsage {
            tool_name: name.to_string(),
            calls_made,
            calls_limit: self.tool_limits.limit_for(name),
            total_calls: self.total_calls.load(Ordering::SeqCst),
            total_limit: self.total_limit,
        }
    }

    fn push_observation(&self, text: &str) {
        self.history.lock().unwrap().push(ChatMessage::user(text.to_string()));
    }
}
