use std::time::Duration;
use tokio::sync::mpsc;

use crate::services::mailer::{EmailMessage, Mailer};

const QUEUE_CAPACITY: usize = 256;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Producer side of the background email queue
#[derive(Debug, Clone)]
pub struct EmailQueue {
    sender: mpsc::Sender<EmailMessage>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: usize,
    pub failed: usize,
}

impl EmailQueue {
    /// Creates the queue and the receiver the worker drains
    pub fn new() -> (Self, mpsc::Receiver<EmailMessage>) {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        (Self { sender }, receiver)
    }

    /// Enqueues a message. A full or closed queue drops the message with a log line.
    pub fn enqueue(&self, message: EmailMessage) {
        if let Err(e) = self.sender.try_send(message) {
            let (reason, message) = match e {
                mpsc::error::TrySendError::Full(m) => ("queue full", m),
                mpsc::error::TrySendError::Closed(m) => ("queue closed", m),
            };
            tracing::error!(
                to = %message.to,
                subject = %message.subject,
                reason,
                "Dropping email"
            );
        }
    }
}

/// Starts the worker on the runtime
pub fn spawn_worker(
    mailer: Mailer,
    receiver: mpsc::Receiver<EmailMessage>,
) -> tokio::task::JoinHandle<DispatchStats> {
    tokio::spawn(run_worker(mailer, receiver, RETRY_BASE_DELAY))
}

/// Drains the queue until every sender is dropped
pub async fn run_worker(
    mailer: Mailer,
    mut receiver: mpsc::Receiver<EmailMessage>,
    retry_base_delay: Duration,
) -> DispatchStats {
    let mut stats = DispatchStats::default();

    tracing::info!(transport = mailer.transport_name(), "Email worker started");

    while let Some(message) = receiver.recv().await {
        if deliver_with_retry(&mailer, &message, retry_base_delay).await {
            stats.delivered += 1;
        } else {
            stats.failed += 1;
        }
    }

    tracing::info!(?stats, "Email worker stopped");

    stats
}

async fn deliver_with_retry(mailer: &Mailer, message: &EmailMessage, base_delay: Duration) -> bool {
    for attempt in 1..=MAX_ATTEMPTS {
        match mailer.send(message).await {
            Ok(()) => return true,
            Err(e) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    to = %message.to,
                    attempt,
                    error = %e,
                    "Email delivery failed, retrying"
                );
                tokio::time::sleep(base_delay * attempt).await;
            }
            Err(e) => {
                tracing::error!(
                    to = %message.to,
                    subject = %message.subject,
                    error = %e,
                    "Email delivery failed permanently"
                );
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Subject".to_string(),
            html: "<p>Body</p>".to_string(),
        }
    }

    fn http_mailer(endpoint: String) -> Mailer {
        Mailer::Http {
            client: reqwest::Client::new(),
            endpoint,
            api_key: None,
            from: "noreply@example.com".to_string(),
            timeout: crate::services::mailer::MAIL_API_TIMEOUT,
        }
    }

    #[tokio::test]
    async fn test_worker_drains_queue() {
        let (queue, receiver) = EmailQueue::new();
        let mailer = Mailer::Log {
            from: "noreply@example.com".to_string(),
        };

        queue.enqueue(message("a@example.com"));
        queue.enqueue(message("b@example.com"));
        drop(queue);

        let stats = run_worker(mailer, receiver, Duration::from_millis(1)).await;
        assert_eq!(
            stats,
            DispatchStats {
                delivered: 2,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried_then_counted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(u64::from(MAX_ATTEMPTS))
            .mount(&server)
            .await;

        let (queue, receiver) = EmailQueue::new();
        queue.enqueue(message("a@example.com"));
        drop(queue);

        let stats = run_worker(
            http_mailer(server.uri()),
            receiver,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivered, 0);
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_gone_does_not_panic() {
        let (queue, receiver) = EmailQueue::new();
        drop(receiver);

        queue.enqueue(message("a@example.com"));
    }
}
