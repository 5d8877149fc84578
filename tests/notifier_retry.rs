// tests/notifier_retry.rs
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use feed_sentinel::notify::{DeliveryError, Notifier, SendOutcome, Transport};

/// Answers with a scripted sequence, then `Sent` forever.
struct Scripted {
    script: Mutex<VecDeque<SendOutcome>>,
    calls: Mutex<u32>,
}

impl Scripted {
    fn new(script: Vec<SendOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn send(&self, _text: &str) -> SendOutcome {
        *self.calls.lock().unwrap() += 1;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SendOutcome::Sent)
    }
    fn max_len(&self) -> usize {
        2000
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn limited(secs: u64) -> SendOutcome {
    SendOutcome::RateLimited {
        retry_after: Duration::from_secs(secs),
    }
}

#[tokio::test(start_paused = true)]
async fn waits_at_least_retry_after_then_succeeds() {
    let notifier = Notifier::new(Scripted::new(vec![limited(2)]))
        .with_retry_margin(Duration::from_millis(250));

    let started = Instant::now();
    notifier.deliver("hello").await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(2_250));
    assert_eq!(notifier.transport().calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_attempts() {
    let notifier = Notifier::new(Scripted::new(vec![limited(1), limited(1), limited(1), limited(1)]))
        .with_max_attempts(3);

    let err = notifier.deliver("hello").await.unwrap_err();
    assert_eq!(err, DeliveryError::RateLimitExhausted { attempts: 3 });
    assert_eq!(notifier.transport().calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn other_failures_are_not_retried() {
    let notifier = Notifier::new(Scripted::new(vec![SendOutcome::Failed("HTTP 400".into())]));

    let started = Instant::now();
    let err = notifier.deliver("hello").await.unwrap_err();
    assert_eq!(err, DeliveryError::Failed("HTTP 400".into()));
    assert_eq!(notifier.transport().calls(), 1);
    assert!(started.elapsed() < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn single_attempt_setting_never_sleeps() {
    let notifier = Notifier::new(Scripted::new(vec![limited(30)])).with_max_attempts(1);
    let started = Instant::now();
    assert!(notifier.deliver("hello").await.is_err());
    assert!(started.elapsed() < Duration::from_secs(1));
}
