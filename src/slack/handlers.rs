//! # Event Handlers
//!
//! One handler per Slack event the assistant reacts to. Handlers never return
//! errors: failures are logged and, where a thread is known, reported back
//! into it as a warning message.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use super::api::{SlackApiClient, SuggestedPrompt};
use super::blocks::feedback_block;
use super::events::{non_empty, MessageEvent, SlackEvent, ThreadStarted};
use super::stream::{SlackChatStream, StreamTarget, TaskDisplayMode};
use crate::history::PromptHistory;
use crate::orchestrator::Orchestrator;
use crate::stream::{ChatStream, Chunk, TaskStatus};

// =============================================================================
// USER-VISIBLE TEXT
// =============================================================================
pub const THINKING_STATUS: &str = "thinking...";

pub const LOADING_MESSAGES: [&str; 5] = [
    "Teaching the hamsters to type faster…",
    "Untangling the internet cables…",
    "Consulting the office goldfish…",
    "Polishing up a response just for you…",
    "Convincing the AI to stop overthinking…",
];

pub const MISSING_INFO_WARNING: &str =
    ":warning: Unable to process request due to missing information.";

pub const GREETING: &str = "👋 Hello! I'm a code assistant here to help you with programming \
                            tasks. What would you like to work on today?";

/// Message text that plays the scripted plan demo instead of calling a model.
pub const DEMO_TRIGGER: &str = "Wonder a few deep thoughts.";

pub const DEFAULT_DEMO_STEP_DELAY: Duration = Duration::from_secs(4);

fn suggested_prompts() -> Vec<SuggestedPrompt> {
    vec![
        SuggestedPrompt::new(
            "💻 Explain this code",
            "Can you explain what this code does? [paste your code here]",
        ),
        SuggestedPrompt::new(
            "🐛 Find bugs in my code",
            "Please review this code and find any potential bugs or issues: [paste your code here]",
        ),
        SuggestedPrompt::new(
            "⚡ Optimize performance",
            "How can I optimize the performance of this code? [paste your code here]",
        ),
        SuggestedPrompt::new(
            "🔧 Write a function",
            "Write a Python function that [describe what you need]",
        ),
        SuggestedPrompt::new(
            "❓ Code best practices",
            "What are the best practices for [specific programming concept]?",
        ),
        SuggestedPrompt::new(
            "🎲 Roll dice for fun",
            "Roll two 12-sided dice and three 6-sided dice for a pseudo-random score.",
        ),
    ]
}

fn failure_warning(error: &anyhow::Error) -> String {
    format!(":warning: Something went wrong! ({error:#})")
}

// =============================================================================
// HANDLERS
// =============================================================================
pub struct EventHandlers {
    client: Arc<SlackApiClient>,
    orchestrator: Arc<Orchestrator>,
    demo_step_delay: Duration,
}

impl EventHandlers {
    pub fn new(client: Arc<SlackApiClient>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            client,
            orchestrator,
            demo_step_delay: DEFAULT_DEMO_STEP_DELAY,
        }
    }

    pub fn with_demo_step_delay(mut self, delay: Duration) -> Self {
        self.demo_step_delay = delay;
        self
    }

    pub async fn handle(&self, event: SlackEvent) {
        info!(kind = event.kind(), "Handling Slack event");
        match event {
            SlackEvent::AppMention(event) => self.on_app_mention(event).await,
            SlackEvent::AssistantMessage(event) => self.on_assistant_message(event).await,
            SlackEvent::AssistantThreadStarted(thread) => self.on_thread_started(thread).await,
        }
    }

    async fn on_app_mention(&self, event: MessageEvent) {
        let channel = non_empty(event.channel.as_deref());
        let thread_ts = event.reply_thread_ts();
        let text = non_empty(event.text.as_deref());
        let (Some(channel), Some(thread_ts), Some(text)) = (channel, thread_ts, text) else {
            error!(
                channel = ?event.channel,
                thread_ts = ?event.reply_thread_ts(),
                has_text = event.text.is_some(),
                "Missing or invalid required fields"
            );
            return;
        };

        let result = self
            .answer_mention(channel, thread_ts, text, &event)
            .await;
        if let Err(e) = result {
            error!(channel, thread_ts, error = %e, "Failed to handle app mention");
            self.say(channel, thread_ts, &failure_warning(&e)).await;
        }
    }

    async fn answer_mention(
        &self,
        channel: &str,
        thread_ts: &str,
        text: &str,
        event: &MessageEvent,
    ) -> Result<()> {
        self.client
            .set_thread_status(channel, thread_ts, THINKING_STATUS, &LOADING_MESSAGES)
            .await?;

        let team = non_empty(event.team.as_deref());
        let user = non_empty(event.user.as_deref());
        let (Some(team), Some(user)) = (team, user) else {
            error!(team = ?event.team, user = ?event.user, "Missing recipient fields");
            self.say(channel, thread_ts, MISSING_INFO_WARNING).await;
            return Ok(());
        };

        let target = StreamTarget::new(channel, thread_ts).with_recipient(team, user);
        self.answer(target, text).await
    }

    async fn on_assistant_message(&self, event: MessageEvent) {
        let channel = non_empty(event.channel.as_deref());
        let thread_ts = non_empty(event.thread_ts.as_deref());
        let (Some(channel), Some(thread_ts)) = (channel, thread_ts) else {
            error!(channel = ?event.channel, thread_ts = ?event.thread_ts, "Missing required fields");
            return;
        };

        let team = non_empty(event.team.as_deref());
        let user = non_empty(event.user.as_deref());
        let (Some(team), Some(user)) = (team, user) else {
            error!(team = ?event.team, user = ?event.user, "Missing required fields");
            self.say(channel, thread_ts, MISSING_INFO_WARNING).await;
            return;
        };

        let text = event.text.as_deref().unwrap_or_default();
        let target = StreamTarget::new(channel, thread_ts).with_recipient(team, user);

        let result = if text == DEMO_TRIGGER {
            self.play_plan_demo(target).await
        } else {
            self.answer_in_timeline(target, text).await
        };

        if let Err(e) = result {
            error!(channel, thread_ts, error = %e, "Failed to handle assistant message");
            self.say(channel, thread_ts, &failure_warning(&e)).await;
        }
    }

    async fn answer_in_timeline(&self, target: StreamTarget, text: &str) -> Result<()> {
        self.client
            .set_thread_status(
                &target.channel,
                &target.thread_ts,
                THINKING_STATUS,
                &LOADING_MESSAGES,
            )
            .await?;
        let target = target.with_task_display_mode(TaskDisplayMode::Timeline);
        self.answer(target, text).await
    }

    /// Stream a model answer to `text` into `target` and close it with the
    /// feedback block.
    async fn answer(&self, target: StreamTarget, text: &str) -> Result<()> {
        let mut stream = SlackChatStream::new(Arc::clone(&self.client), target);
        let mut history = PromptHistory::from_user_message(text);

        self.orchestrator.call_llm(&mut stream, &mut history).await;

        stream.stop(Vec::new(), Some(feedback_block())).await?;
        Ok(())
    }

    async fn play_plan_demo(&self, target: StreamTarget) -> Result<()> {
        self.client
            .set_thread_status(
                &target.channel,
                &target.thread_ts,
                THINKING_STATUS,
                &LOADING_MESSAGES,
            )
            .await?;
        tokio::time::sleep(self.demo_step_delay).await;

        let target = target.with_task_display_mode(TaskDisplayMode::Plan);
        let mut stream = SlackChatStream::new(Arc::clone(&self.client), target);

        stream
            .append_chunks(vec![
                Chunk::markdown("Hello.\nI got your task."),
                Chunk::markdown("This task looks manageable.\nThat's a good thing."),
                Chunk::task("001", "Understanding the task...", TaskStatus::InProgress)
                    .with_details("- Identifying the goal\n- Identifying the constraints"),
                Chunk::task("002", "Performing acrobatics...", TaskStatus::Pending),
            ])
            .await?;
        tokio::time::sleep(self.demo_step_delay).await;

        stream
            .append_chunks(vec![
                Chunk::plan("Adding the final touches..."),
                Chunk::task("001", "Understanding the task...", TaskStatus::Complete)
                    .with_details("\n- Pretending this was obvious")
                    .with_output("Moving on to some rambling"),
                Chunk::task("002", "Performing acrobatics...", TaskStatus::InProgress),
            ])
            .await?;
        tokio::time::sleep(self.demo_step_delay).await;

        stream
            .stop(
                vec![
                    Chunk::plan("Decided to put on a show"),
                    Chunk::task("002", "Performing acrobatics...", TaskStatus::Complete)
                        .with_details(
                            "- Jumped onto the rope\n- Juggled bowling pins\n- Rode a unicycle too",
                        ),
                    Chunk::markdown("The audience seems amazed and is applauding :popcorn:"),
                ],
                Some(feedback_block()),
            )
            .await?;
        Ok(())
    }

    async fn on_thread_started(&self, thread: ThreadStarted) {
        let result: Result<()> = async {
            self.client
                .post_message(&thread.channel, Some(&thread.thread_ts), GREETING)
                .await?;
            self.client
                .set_suggested_prompts(&thread.channel, &thread.thread_ts, &suggested_prompts())
                .await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            error!(channel = %thread.channel, error = %e, "Failed to handle assistant_thread_started");
            self.say(&thread.channel, &thread.thread_ts, &failure_warning(&e))
                .await;
        }
    }

    /// Post `text` into the thread, logging rather than propagating failures.
    async fn say(&self, channel: &str, thread_ts: &str, text: &str) {
        if let Err(e) = self
            .client
            .post_message(channel, Some(thread_ts), text)
            .await
        {
            warn!(channel, error = %e, "Could not post message");
        }
    }
}
