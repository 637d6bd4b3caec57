//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation, composes outbound
//! prompts, and drives one completion at a time through a [`CompletionClient`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::chat::config::{ChatConfig, HistoryPolicy};
use crate::chat::conversation::{Conversation, Turn};
use crate::chat::template::{PromptMode, PromptTemplate};
use crate::client::{CompletionClient, CompletionRequest};
use crate::error::{Error, Result};
use crate::observability::{
    SESSION_REJECTED_INPUTS, SESSION_RESETS, SESSION_TEMPLATED_PROMPTS, SESSION_TURN_FAILURES,
    SESSION_TURNS,
};
use crate::render::{Renderer, render_reply};
use crate::types::Model;

/// How a submitted message ended.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The model replied; the reply is now the last turn.
    Completed {
        /// The reply text.
        reply: String,
    },
    /// The exchange failed; only the user turn was recorded.
    Failed {
        /// Why it failed.
        error: Error,
    },
}

impl TurnOutcome {
    /// True when the model replied.
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed { .. })
    }

    /// The reply, if any.
    pub fn reply(&self) -> Option<&str> {
        match self {
            TurnOutcome::Completed { reply } => Some(reply),
            TurnOutcome::Failed { .. } => None,
        }
    }

    /// The error, if any.
    pub fn error(&self) -> Option<&Error> {
        match self {
            TurnOutcome::Completed { .. } => None,
            TurnOutcome::Failed { error } => Some(error),
        }
    }
}

/// Holds the busy flag for the duration of one exchange and clears it on drop.
struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(busy: &Arc<AtomicBool>) -> Result<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(Self {
            busy: Arc::clone(busy),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// A chat session that manages conversation state and API interactions.
///
/// The session is the single owner of its [`Conversation`].  Each call to
/// [`submit`](ChatSession::submit) runs to completion before the next is accepted: the busy flag
/// is raised for the whole exchange and new input is rejected while it is up.
pub struct ChatSession<C: CompletionClient> {
    client: C,
    config: ChatConfig,
    conversation: Conversation,
    busy: Arc<AtomicBool>,
    halted: Option<Error>,
    completed_turns: u64,
    failed_turns: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The number of turns in the conversation.
    pub turn_count: usize,
    /// The system instruction, if any.
    pub system_instruction: Option<String>,
    /// Raw or templated prompts.
    pub prompt_mode: PromptMode,
    /// Continuity policy.
    pub history: HistoryPolicy,
    /// Marker heading for the optimized prompt block.
    pub marker: String,
    /// Output token cap, if set.
    pub max_tokens: Option<u32>,
    /// Messages that got a reply.
    pub completed_turns: u64,
    /// Messages whose exchange failed.
    pub failed_turns: u64,
}

impl<C: CompletionClient> ChatSession<C> {
    /// Creates a new chat session with the given client and configuration.
    pub fn new(client: C, config: ChatConfig) -> Self {
        Self {
            client,
            config,
            conversation: Conversation::new(),
            busy: Arc::new(AtomicBool::new(false)),
            halted: None,
            completed_turns: 0,
            failed_turns: 0,
        }
    }

    /// Sends a user message and records the outcome.
    ///
    /// This method:
    /// 1. Raises the busy flag
    /// 2. Applies the history policy and records the user turn
    /// 3. Composes the prompt (raw or templated) and calls the client
    /// 4. Records the assistant turn on success
    /// 5. Lowers the busy flag
    ///
    /// A failed exchange is reported as [`TurnOutcome::Failed`], leaving the user turn in place.
    /// A configuration error halts the session: later calls fail with that error until
    /// [`reset`](ChatSession::reset) or [`set_client`](ChatSession::set_client).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if another exchange is in flight, or the configuration error
    /// that halted the session; nothing is recorded.
    pub async fn submit(&mut self, user_input: &str) -> Result<TurnOutcome> {
        if let Some(err) = &self.halted {
            SESSION_REJECTED_INPUTS.click();
            return Err(err.clone());
        }
        let _guard = BusyGuard::acquire(&self.busy).inspect_err(|_| {
            SESSION_REJECTED_INPUTS.click();
        })?;

        if self.config.history == HistoryPolicy::SingleTurn {
            self.conversation.reset();
        }
        self.conversation.append(Turn::user(user_input));

        let request = self.compose_request(user_input);
        if self.config.prompt_mode == PromptMode::Templated {
            SESSION_TEMPLATED_PROMPTS.click();
        }
        SESSION_TURNS.click();
        let outcome = match self.client.complete(&request).await {
            Ok(reply) => {
                self.conversation.append(Turn::assistant(reply.as_str()));
                self.completed_turns += 1;
                TurnOutcome::Completed { reply }
            }
            Err(error) => {
                SESSION_TURN_FAILURES.click();
                self.failed_turns += 1;
                if error.is_configuration() {
                    self.halted = Some(error.clone());
                }
                TurnOutcome::Failed { error }
            }
        };
        Ok(outcome)
    }

    /// Sends a user message and draws the reply (or the error) through `renderer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if another exchange is in flight.
    pub async fn send(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let outcome = self.submit(user_input).await?;
        match &outcome {
            TurnOutcome::Completed { reply } => render_reply(renderer, reply, &self.config.marker),
            TurnOutcome::Failed { error } => renderer.print_error(&error.to_string()),
        }
        Ok(outcome)
    }

    /// The request that `user_input` becomes under the current configuration.
    pub fn compose_request(&self, user_input: &str) -> CompletionRequest {
        let prompt = self
            .config
            .template
            .compose(self.config.prompt_mode, user_input);
        let mut request = CompletionRequest::new(prompt)
            .with_model(self.config.model.clone())
            .with_max_output_tokens(self.config.max_tokens);
        if let Some(instruction) = self.config.system_instruction() {
            request = request.with_system_instruction(instruction);
        }
        request
    }

    /// Clears the conversation history, the busy flag, and any configuration error.
    pub fn reset(&mut self) {
        SESSION_RESETS.click();
        self.conversation.reset();
        self.busy.store(false, Ordering::Release);
        self.halted = None;
    }

    /// The configuration error that stopped the session, if any.
    pub fn halted(&self) -> Option<&Error> {
        self.halted.as_ref()
    }

    /// The conversation so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// True while an exchange is in flight.
    pub fn busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// A shared handle on the busy flag, for input widgets that must disable themselves.
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.busy)
    }

    /// The active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The completion client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Replaces the completion client, lifting a configuration halt.
    pub fn set_client(&mut self, client: C) {
        self.client = client;
        self.halted = None;
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: Model) {
        self.config.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Sets the system instruction; `None` restores the default persona.
    pub fn set_system_instruction(&mut self, instruction: Option<String>) {
        self.config.system_instruction = instruction
            .unwrap_or_else(|| crate::chat::config::DEFAULT_SYSTEM_INSTRUCTION.to_string());
    }

    /// Returns the current system instruction, if any.
    pub fn system_instruction(&self) -> Option<&str> {
        self.config.system_instruction()
    }

    /// Switches between raw and templated prompts.
    pub fn set_prompt_mode(&mut self, mode: PromptMode) {
        self.config.prompt_mode = mode;
    }

    /// Returns the prompt mode.
    pub fn prompt_mode(&self) -> PromptMode {
        self.config.prompt_mode
    }

    /// Changes the continuity policy.
    pub fn set_history_policy(&mut self, history: HistoryPolicy) {
        self.config.history = history;
    }

    /// Replaces the marker heading.
    pub fn set_marker(&mut self, marker: String) {
        self.config.marker = marker;
    }

    /// Returns the marker heading.
    pub fn marker(&self) -> &str {
        &self.config.marker
    }

    /// Replaces the prompt-engineering template.
    pub fn set_template(&mut self, template: PromptTemplate) {
        self.config.template = template;
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            turn_count: self.conversation.len(),
            system_instruction: self.config.system_instruction().map(String::from),
            prompt_mode: self.config.prompt_mode,
            history: self.config.history,
            marker: self.config.marker.clone(),
            max_tokens: self.config.max_tokens,
            completed_turns: self.completed_turns,
            failed_turns: self.failed_turns,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::chat::config::DEFAULT_SYSTEM_INSTRUCTION;
    use crate::chat::conversation::Role;
    use crate::chat::template::DEFAULT_TEMPLATE;
    use crate::types::KnownModel;

    /// Replays canned results and records every request it sees.
    #[derive(Default)]
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("default reply".to_string()))
        }
    }

    fn session(replies: Vec<Result<String>>) -> ChatSession<ScriptedClient> {
        ChatSession::new(ScriptedClient::new(replies), ChatConfig::default())
    }

    #[test]
    fn new_session_empty() {
        let session = session(vec![]);
        assert!(session.conversation().is_empty());
        assert!(!session.busy());
        assert_eq!(session.model(), &Model::Known(KnownModel::Gemini25Flash));
    }

    #[tokio::test]
    async fn successful_turns_interleave() {
        let mut session = session(vec![]);
        for n in 1..=4 {
            let outcome = session.submit(&format!("question {n}")).await.unwrap();
            assert!(outcome.is_completed());
            assert_eq!(session.conversation().len(), 2 * n);
        }
        let roles: Vec<Role> = session.conversation().iter().map(Turn::role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant].repeat(4));
        assert_eq!(session.conversation().all()[2].content(), "question 2");
        assert!(!session.busy());
    }

    #[tokio::test]
    async fn failure_records_only_the_user_turn() {
        let mut session = session(vec![
            Ok("first".to_string()),
            Err(Error::rate_limit("quota", None)),
            Ok("third".to_string()),
        ]);
        session.submit("one").await.unwrap();
        assert_eq!(session.conversation().len(), 2);

        let outcome = session.submit("two").await.unwrap();
        assert!(outcome.error().unwrap().is_rate_limit());
        assert!(outcome.reply().is_none());
        assert_eq!(session.conversation().len(), 3);
        assert_eq!(session.conversation().last(), Some(&Turn::user("two")));
        assert!(!session.busy());

        let outcome = session.submit("three").await.unwrap();
        assert_eq!(outcome.reply(), Some("third"));
        assert_eq!(session.conversation().len(), 5);

        let stats = session.stats();
        assert_eq!(stats.completed_turns, 2);
        assert_eq!(stats.failed_turns, 1);
    }

    #[tokio::test]
    async fn configuration_error_halts_until_reset() {
        let mut session = session(vec![Err(Error::configuration(
            "API key contains characters not allowed in an HTTP header",
            Some("GOOGLE_API_KEY".to_string()),
        ))]);
        let outcome = session.submit("first").await.unwrap();
        assert!(outcome.error().unwrap().is_configuration());
        assert!(session.halted().is_some());
        assert_eq!(session.conversation().len(), 1);

        let err = session.submit("second").await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(session.conversation().len(), 1);
        assert_eq!(session.client().requests().len(), 1);
        assert!(!session.busy());

        session.reset();
        assert!(session.halted().is_none());
        let outcome = session.submit("third").await.unwrap();
        assert_eq!(outcome.reply(), Some("default reply"));
    }

    #[tokio::test]
    async fn new_client_lifts_configuration_halt() {
        let mut session = session(vec![Err(Error::configuration("bad key", None))]);
        session.submit("first").await.unwrap();
        assert!(session.submit("second").await.is_err());

        session.set_client(ScriptedClient::new(vec![Ok("fixed".to_string())]));
        let outcome = session.submit("second").await.unwrap();
        assert_eq!(outcome.reply(), Some("fixed"));
        assert_eq!(session.conversation().len(), 3);
    }

    #[tokio::test]
    async fn busy_session_rejects_input() {
        let mut session = session(vec![]);
        let flag = session.busy_flag();
        flag.store(true, Ordering::SeqCst);
        let err = session.submit("hello").await.unwrap_err();
        assert!(err.is_busy());
        assert!(session.conversation().is_empty());
        assert!(session.client().requests().is_empty());
        assert!(session.busy());

        session.reset();
        assert!(!session.busy());
        assert!(session.submit("hello").await.is_ok());
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let mut session = session(vec![]);
        session.submit("a").await.unwrap();
        session.submit("b").await.unwrap();
        session.reset();
        assert!(session.conversation().is_empty());
        assert!(!session.busy());
    }

    #[tokio::test]
    async fn single_turn_policy_forgets_earlier_turns() {
        let mut session = session(vec![]);
        session.set_history_policy(HistoryPolicy::SingleTurn);
        for input in ["a", "b", "c"] {
            session.submit(input).await.unwrap();
            assert_eq!(session.conversation().len(), 2);
        }
        assert_eq!(session.conversation().all()[0].content(), "c");
    }

    #[tokio::test]
    async fn templated_prompt_carries_template_and_input() {
        let mut session = session(vec![]);
        session.set_prompt_mode(PromptMode::Templated);
        session.submit("여행 블로그 써줘").await.unwrap();

        let requests = session.client().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].prompt,
            format!("{DEFAULT_TEMPLATE}\n\n여행 블로그 써줘")
        );
        assert_eq!(
            requests[0].system_instruction.as_deref(),
            Some(DEFAULT_SYSTEM_INSTRUCTION)
        );
        // The conversation records what the user typed, not the composed prompt.
        assert_eq!(session.conversation().all()[0].content(), "여행 블로그 써줘");
    }

    #[tokio::test]
    async fn raw_prompt_is_input_verbatim() {
        let mut session = session(vec![]);
        session.set_system_instruction(Some("   ".to_string()));
        session.submit("  spaced  ").await.unwrap();
        let requests = session.client().requests();
        assert_eq!(requests[0].prompt, "  spaced  ");
        assert!(requests[0].system_instruction.is_none());
        assert_eq!(
            requests[0].model,
            Some(Model::Known(KnownModel::Gemini25Flash))
        );
    }

    #[test]
    fn system_instruction_default_restored() {
        let mut session = session(vec![]);
        session.set_system_instruction(Some("Be terse".to_string()));
        assert_eq!(session.system_instruction(), Some("Be terse"));
        session.set_system_instruction(None);
        assert_eq!(session.system_instruction(), Some(DEFAULT_SYSTEM_INSTRUCTION));
    }

    #[test]
    fn set_model_flows_into_requests() {
        let mut session = session(vec![]);
        session.set_model(Model::Known(KnownModel::Gemini25Pro));
        let request = session.compose_request("x");
        assert_eq!(request.model, Some(Model::Known(KnownModel::Gemini25Pro)));
    }

    #[test]
    fn busy_guard_releases_on_drop() {
        let busy = Arc::new(AtomicBool::new(false));
        {
            let _guard = BusyGuard::acquire(&busy).unwrap();
            assert!(busy.load(Ordering::SeqCst));
            assert!(BusyGuard::acquire(&busy).is_err());
        }
        assert!(!busy.load(Ordering::SeqCst));
    }
}
