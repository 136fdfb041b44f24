use async_trait::async_trait;
use kfc_api::mock::SharedFixtures;
use kfc_api::MockFixtures;
use kfc_core::{Error, Result, SourceCitation};
use rand::Rng;
use std::time::Duration;

use super::{MessageSink, RagStreamService};
use crate::message::{StreamMessage, StreamRequest};

/// Characters typed between two token events.
const TOKEN_INTERVAL: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockStreamDelays {
    pub initial: Duration,
    pub char_min: Duration,
    pub char_max: Duration,
    pub before_sources: Duration,
    pub before_end: Duration,
}

impl Default for MockStreamDelays {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            char_min: Duration::from_millis(20),
            char_max: Duration::from_millis(100),
            before_sources: Duration::from_millis(300),
            before_end: Duration::from_millis(200),
        }
    }
}

impl MockStreamDelays {
    pub fn none() -> Self {
        Self {
            initial: Duration::ZERO,
            char_min: Duration::ZERO,
            char_max: Duration::ZERO,
            before_sources: Duration::ZERO,
            before_end: Duration::ZERO,
        }
    }

    fn per_char(&self) -> Duration {
        let min = self.char_min.as_millis() as u64;
        let max = self.char_max.as_millis() as u64;
        if max <= min {
            return self.char_min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..max))
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Types out an answer generated from the fixtures, like a model would.
#[derive(Debug, Clone)]
pub struct MockRagStream {
    fixtures: SharedFixtures,
    delays: MockStreamDelays,
}

impl MockRagStream {
    pub fn new(fixtures: SharedFixtures) -> Self {
        Self {
            fixtures,
            delays: MockStreamDelays::default(),
        }
    }

    pub fn with_delays(mut self, delays: MockStreamDelays) -> Self {
        self.delays = delays;
        self
    }

    fn answer(&self, request: &StreamRequest) -> Result<String> {
        let fixtures = self
            .fixtures
            .read()
            .map_err(|_| Error::Storage("Mock fixtures lock poisoned".to_string()))?;
        Ok(fixtures.generate_answer_for(&request.query, &request.articles))
    }
}

#[async_trait]
impl RagStreamService for MockRagStream {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit_stream_query(
        &self,
        request: &StreamRequest,
        on_message: MessageSink<'_>,
    ) -> Result<()> {
        if request.articles.is_empty() {
            on_message(StreamMessage::error("The shelf is empty. Add articles first."));
            return Ok(());
        }

        let answer = self.answer(request)?;
        pause(self.delays.initial).await;

        let total = answer.chars().count();
        let mut typed = String::with_capacity(answer.len());
        for (i, ch) in answer.chars().enumerate() {
            pause(self.delays.per_char()).await;
            typed.push(ch);
            if (i + 1) % TOKEN_INTERVAL == 0 || i + 1 == total {
                on_message(StreamMessage::token(typed.clone()));
            }
        }

        pause(self.delays.before_sources).await;
        let sources = MockFixtures::source_extraction(&request.query, &request.articles)
            .into_iter()
            .map(SourceCitation::from)
            .collect();
        on_message(StreamMessage::Sources {
            sources,
            content: Some(typed),
        });

        pause(self.delays.before_end).await;
        on_message(StreamMessage::End);
        Ok(())
    }
}
