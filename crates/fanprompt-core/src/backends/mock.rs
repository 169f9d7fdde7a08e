//! In-memory backend used by unit tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::ModelBackend;

pub(crate) struct MockBackend {
    models: Vec<String>,
    reply: String,
    delay: Duration,
    fail_prompt: Option<String>,
    fail_list: bool,
    panic_prompt: bool,
    pub prompt_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl MockBackend {
    pub fn new(models: &[&str], reply: &str) -> Self {
        Self {
            models: models.iter().map(|m| m.to_string()).collect(),
            reply: reply.to_string(),
            delay: Duration::ZERO,
            fail_prompt: None,
            fail_list: false,
            panic_prompt: false,
            prompt_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_prompt(mut self, error: &str) -> Self {
        self.fail_prompt = Some(error.to_string());
        self
    }

    pub fn panicking_prompt(mut self) -> Self {
        self.panic_prompt = true;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn prompt_count(&self) -> usize {
        self.prompt_calls.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Models that `prompt` was called with, in call order
    pub fn prompted_models(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, model)| model.clone())
            .collect()
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn prompt(&self, text: &str, model: &str) -> Result<String> {
        self.prompt_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((text.to_string(), model.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panic_prompt {
            panic!("backend exploded");
        }
        match &self.fail_prompt {
            Some(error) => Err(anyhow!("{}", error)),
            None => Ok(self.reply.clone()),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list {
            return Err(anyhow!("catalog unreachable"));
        }
        Ok(self.models.clone())
    }
}
