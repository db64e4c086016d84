//! ReAct-style agent loop
//!
//! Each user turn alternates model calls and tool execution until the model
//! answers without requesting tools, or the step budget runs out.

mod modes;
mod prompt;

use crate::actions::ActionRegistry;
use crate::config::LlmConfig;
use crate::llm::{ChatMessage, ChatModel, Role};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub use modes::{auto_loop, chat_loop, serve_loop, AUTO_THOUGHTS, CHUNK_SEPARATOR};
pub use prompt::system_prompt;

/// Output produced while a turn runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Assistant text
    Agent(String),
    /// Result of one action call
    Tool { name: String, output: String },
}

impl AgentEvent {
    pub fn text(&self) -> &str {
        match self {
            AgentEvent::Agent(text) => text,
            AgentEvent::Tool { output, .. } => output,
        }
    }
}

pub struct Agent {
    model: Arc<dyn ChatModel>,
    actions: ActionRegistry,
    system_prompt: String,
    history: Vec<ChatMessage>,
    max_steps: usize,
    max_history: usize,
}

impl Agent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        actions: ActionRegistry,
        system_prompt: String,
        config: &LlmConfig,
    ) -> Self {
        Self {
            model,
            actions,
            system_prompt,
            history: Vec::new(),
            max_steps: config.max_steps.max(1),
            max_history: config.max_history_messages.max(1),
        }
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Run one user turn, reporting events as they happen; returns the final answer
    pub async fn run_turn<F>(&mut self, input: &str, mut on_event: F) -> Result<String>
    where
        F: FnMut(AgentEvent) + Send,
    {
        self.history.push(ChatMessage::user(input));
        let mut answer = String::new();

        for step in 0..self.max_steps {
            let tools = self.actions.tool_specs().await;
            let mut messages = Vec::with_capacity(self.history.len() + 1);
            messages.push(ChatMessage::system(self.system_prompt.clone()));
            messages.extend(self.history.iter().cloned());

            let reply = self.model.complete(&messages, &tools).await?;
            let calls = reply.tool_calls().to_vec();
            debug!(step, tool_calls = calls.len(), "Model replied");

            if let Some(text) = reply.content.as_deref().filter(|t| !t.trim().is_empty()) {
                answer = text.to_string();
                on_event(AgentEvent::Agent(answer.clone()));
            }
            self.history.push(reply);

            if calls.is_empty() {
                self.trim_history();
                return Ok(answer);
            }

            for call in calls {
                let output = match serde_json::from_str::<Value>(&call.function.arguments) {
                    Ok(args) => self.actions.invoke(&call.function.name, args).await,
                    Err(e) => format!("Error: arguments are not valid JSON: {}", e),
                };
                on_event(AgentEvent::Tool {
                    name: call.function.name.clone(),
                    output: output.clone(),
                });
                self.history.push(ChatMessage::tool_result(call.id, output));
            }
        }

        warn!(max_steps = self.max_steps, "Agent hit step limit");
        self.trim_history();
        if answer.is_empty() {
            answer = format!(
                "Stopped after {} steps without a final answer.",
                self.max_steps
            );
            on_event(AgentEvent::Agent(answer.clone()));
        }
        Ok(answer)
    }

    /// Drop the oldest turns so at most `max_history` messages remain.
    /// Cuts only at user messages so tool results never lose their call.
    fn trim_history(&mut self) {
        if self.history.len() <= self.max_history {
            return;
        }
        let earliest = self.history.len() - self.max_history;
        if let Some(cut) =
            (earliest..self.history.len()).find(|&i| self.history[i].role == Role::User)
        {
            self.history.drain(..cut);
        }
    }
}
