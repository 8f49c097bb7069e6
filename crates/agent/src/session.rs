use anyhow::{Context, Result};
use index::Pacing;
use query::ResumeSearch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::llm::CompletionService;
use crate::message::{Message, TokenUsage};
use crate::prompt::SYSTEM_PROMPT;
use crate::protocol::{self, Action, ActionKind, Reply};

pub const DEFAULT_MAX_TURNS: usize = 5;
pub const DEFAULT_ACTION_PACING: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_turns: usize,
    pub system_prompt: String,
    /// Wait applied after every retrieval action
    pub action_pacing: Pacing,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            system_prompt: SYSTEM_PROMPT.to_string(),
            action_pacing: Pacing::Fixed(DEFAULT_ACTION_PACING),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Answered,
    /// The model replied without an answer or action line
    NoProtocol,
    BudgetExhausted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    pub answer: String,
    pub total_tokens: u64,
    pub usage: TokenUsage,
    pub turns: usize,
    pub status: SessionStatus,
    pub transcript: Vec<Message>,
}

pub fn fallback_message(max_turns: usize) -> String {
    format!(
        "No se obtuvo respuesta satisfactoria después de {} iteraciones.",
        max_turns
    )
}

/// Answers questions about indexed résumés. Each question runs in its own session.
pub struct Agent {
    completion: Arc<dyn CompletionService>,
    search: Arc<dyn ResumeSearch>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        search: Arc<dyn ResumeSearch>,
        config: AgentConfig,
    ) -> Self {
        Self {
            completion,
            search,
            config,
        }
    }

    pub async fn ask(&self, question: &str) -> Result<AgentReply> {
        AgentSession::new(self).run(question).await
    }
}

/// One question's transcript and token tally.
pub struct AgentSession<'a> {
    agent: &'a Agent,
    transcript: Vec<Message>,
    usage: Vec<TokenUsage>,
}

impl<'a> AgentSession<'a> {
    pub fn new(agent: &'a Agent) -> Self {
        Self {
            agent,
            transcript: vec![Message::system(agent.config.system_prompt.clone())],
            usage: Vec::new(),
        }
    }

    /// Send one prompt and parse what comes back.
    async fn turn(&mut self, prompt: String) -> Result<Reply> {
        debug!(prompt = %prompt, "User turn");
        self.transcript.push(Message::user(prompt));

        let completion = self
            .agent
            .completion
            .complete(&self.transcript)
            .await
            .context("Completion request failed")?;

        debug!(reply = %completion.text, tokens = completion.usage.total_tokens, "Assistant turn");
        let reply = protocol::parse_reply(&completion.text);
        self.transcript.push(Message::assistant(completion.text));
        self.usage.push(completion.usage);

        Ok(reply)
    }

    /// Run the action and build the next prompt from its result.
    async fn dispatch(&self, action: &Action) -> Result<String> {
        let search = &self.agent.search;

        let result = match &action.kind {
            ActionKind::LookupResume => search.lookup(&action.argument).await?,
            ActionKind::LookupMany => search.lookup_multi(&action.argument).await?,
            ActionKind::Unknown(name) => {
                warn!(action = %name, "Unknown action");
                return Ok(protocol::unknown_action_observation(name));
            }
        };

        self.agent.config.action_pacing.wait().await;
        Ok(protocol::observation(&result))
    }

    pub async fn run(mut self, question: &str) -> Result<AgentReply> {
        let max_turns = self.agent.config.max_turns;
        let mut next_prompt = question.to_string();
        let mut turns = 0;

        let (answer, status) = loop {
            if turns >= max_turns {
                warn!(max_turns, "Turn budget exhausted");
                break (fallback_message(max_turns), SessionStatus::BudgetExhausted);
            }
            turns += 1;
            info!(turn = turns, max_turns, "Agent turn");

            match self.turn(next_prompt).await? {
                Reply::Answer(answer) => break (answer, SessionStatus::Answered),
                Reply::Action(action) => {
                    info!(action = action.kind.name(), argument = %action.argument, "Dispatching action");
                    next_prompt = self.dispatch(&action).await?;
                }
                Reply::Unstructured => {
                    warn!(turn = turns, "Reply has neither an answer nor an action");
                    break (fallback_message(max_turns), SessionStatus::NoProtocol);
                }
            }
        };

        let usage: TokenUsage = self.usage.iter().copied().sum();
        info!(turns, total_tokens = usage.total_tokens, ?status, "Session finished");

        Ok(AgentReply {
            answer,
            total_tokens: usage.total_tokens,
            usage,
            turns,
            status,
            transcript: self.transcript,
        })
    }
}
