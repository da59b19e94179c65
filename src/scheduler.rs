//! Background digest scheduler.
//!
//! One [`SchedulerTask`] runs next to the HTTP server. On every tick it claims
//! the subscriptions that fell due from the [`SubscriptionStore`], fetches a
//! fresh listing for each and hands the composed digest to a
//! [`DigestMailer`].
//!
//! Failures are logged and skipped. A subscription whose fetch or delivery
//! fails is not retried; it waits for its next slot. Slots missed while the
//! process was down are not made up.

use crate::fetcher::ListingFetcher;
use crate::mailer::DigestMailer;
use crate::outputs::email::compose_digest;
use crate::subscriptions::SubscriptionStore;
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

/// Periodically sends due digests.
pub struct SchedulerTask<M: DigestMailer> {
    fetcher: Arc<ListingFetcher>,
    store: Arc<SubscriptionStore>,
    mailer: M,
    poll_interval: Duration,
}

impl<M: DigestMailer> SchedulerTask<M> {
    pub fn new(
        fetcher: Arc<ListingFetcher>,
        store: Arc<SubscriptionStore>,
        mailer: M,
        poll_interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            mailer,
            poll_interval,
        }
    }

    /// Check for due subscriptions forever, once per poll interval.
    ///
    /// The caller stops the task by dropping or aborting it.
    pub async fn run(self) {
        info!(poll_interval = ?self.poll_interval, "Scheduler task started");
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let sent = self.run_once(Local::now().naive_local()).await;
            if sent > 0 {
                info!(sent, "Scheduler pass delivered digests");
            }
        }
    }

    /// Send every digest due at `now`.
    ///
    /// # Returns
    ///
    /// The number of digests handed to the mailer successfully.
    #[instrument(level = "info", skip(self))]
    pub async fn run_once(&self, now: NaiveDateTime) -> usize {
        let due = self.store.list_due(now).await;
        if due.is_empty() {
            let total = self.store.len().await;
            debug!(total, "No subscriptions due");
            return 0;
        }
        info!(count = due.len(), "Subscriptions due");

        let generated_at = now.format("%Y-%m-%d %H:%M").to_string();
        let mut sent = 0usize;

        for sub in &due {
            let query = match sub.query() {
                Ok(q) => q,
                Err(e) => {
                    warn!(email = %sub.email, subreddit = %sub.subreddit, error = %e, "Stored subscription has an unusable query; skipping");
                    continue;
                }
            };

            let records = match self.fetcher.fetch_with_fallback(&query).await {
                Ok(records) => records,
                Err(e) => {
                    error!(
                        email = %sub.email,
                        subreddit = %sub.subreddit,
                        code = e.error_code(),
                        error = %e,
                        "Digest fetch failed; waiting for next slot"
                    );
                    continue;
                }
            };

            let email = compose_digest(sub, &records, &generated_at);
            match self.mailer.send_digest(&email).await {
                Ok(()) => {
                    sent += 1;
                    info!(email = %sub.email, subreddit = %sub.subreddit, posts = records.len(), "Digest delivered");
                }
                Err(e) => {
                    error!(email = %sub.email, subreddit = %sub.subreddit, error = %e, "Digest delivery failed");
                }
            }
        }

        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MailError;
    use crate::fetcher::tests::{listing_body, test_config};
    use crate::models::{Frequency, SortMode, Subscription, TimeWindow};
    use crate::outputs::email::DigestEmail;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<DigestEmail>>,
        fail: bool,
    }

    impl DigestMailer for Arc<RecordingMailer> {
        async fn send_digest(&self, email: &DigestEmail) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Transport("relay down".to_string()));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn sub(email: &str, subreddit: &str, next_send: NaiveDateTime) -> Subscription {
        Subscription {
            email: email.to_string(),
            subreddit: subreddit.to_string(),
            sort: SortMode::Top,
            time_filter: TimeWindow::Week,
            frequency: Frequency::Weekly,
            posts: 3,
            next_send,
        }
    }

    async fn setup(
        server: &MockServer,
        fail: bool,
    ) -> (SchedulerTask<Arc<RecordingMailer>>, Arc<SubscriptionStore>, Arc<RecordingMailer>) {
        let fetcher = Arc::new(ListingFetcher::new(test_config(&server.uri())).unwrap());
        let store = Arc::new(SubscriptionStore::new());
        let mailer = Arc::new(RecordingMailer {
            fail,
            ..Default::default()
        });
        let task = SchedulerTask::new(fetcher, store.clone(), mailer.clone(), Duration::from_secs(60));
        (task, store, mailer)
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_run_future_can_be_spawned() {
        let server = MockServer::start().await;
        let (task, _store, _mailer) = setup(&server, false).await;
        let fut = task.run();
        assert_send(&fut);
        let handle = tokio::spawn(fut);
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();
    }

    #[tokio::test]
    async fn test_due_subscription_is_mailed_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/rust/top.json"))
            .and(query_param("limit", "3"))
            .and(query_param("t", "week"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(&["one", "two", "three"])))
            .expect(1)
            .mount(&server)
            .await;

        let (task, store, mailer) = setup(&server, false).await;
        store.add(sub("reader@example.com", "rust", at(12, 9))).await;
        store.add(sub("later@example.com", "rust", at(19, 9))).await;

        assert_eq!(task.run_once(at(12, 10)).await, 1);
        // Same slot again: nothing left to send
        assert_eq!(task.run_once(at(12, 11)).await, 0);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "reader@example.com");
        assert!(sent[0].text_body.contains("three"));
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_to_next_slot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/gone/top.json"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/rust/top.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(&["ok"])))
            .expect(1)
            .mount(&server)
            .await;

        let (task, store, mailer) = setup(&server, false).await;
        store.add(sub("a@example.com", "gone", at(12, 9))).await;
        store.add(sub("b@example.com", "rust", at(12, 9))).await;

        assert_eq!(task.run_once(at(12, 9)).await, 1);
        assert_eq!(mailer.sent.lock().unwrap()[0].to, "b@example.com");
        // The failed one was still moved to its next slot
        assert!(store.list_due(at(12, 12)).await.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_not_counted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(&["x"])))
            .mount(&server)
            .await;

        let (task, store, mailer) = setup(&server, true).await;
        store.add(sub("a@example.com", "rust", at(12, 9))).await;

        assert_eq!(task.run_once(at(12, 9)).await, 0);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_due_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(&["x"])))
            .expect(0)
            .mount(&server)
            .await;

        let (task, store, _mailer) = setup(&server, false).await;
        store.add(sub("a@example.com", "rust", at(19, 9))).await;
        assert_eq!(task.run_once(at(12, 9)).await, 0);
    }
}
