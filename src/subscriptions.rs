//! In-memory subscription store and next-send scheduling.
//!
//! The store owns the subscription list behind a mutex. Its only mutation
//! points are [`SubscriptionStore::add`], [`SubscriptionStore::remove`] and
//! [`SubscriptionStore::list_due`]; the latter advances `next_send` while
//! still holding the lock, so two pollers can never both claim the same slot.
//!
//! Nothing is persisted: a restart drops every subscription.
//!
//! # Delivery slots
//!
//! | Frequency | Next send |
//! |-----------|-----------|
//! | weekly | next Monday 09:00, never today |
//! | monthly | the 1st of next month 09:00 |

use crate::models::{Frequency, Subscription};
use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Hour of day at which digests go out.
pub const SEND_HOUR: u32 = 9;

/// Compute the next delivery slot strictly after `now`.
///
/// Weekly digests go out on the next Monday at 09:00. Today never counts,
/// even on a Monday before 09:00: that week's slot is treated as already
/// taken. Monthly digests go out on the 1st of the following month at 09:00.
pub fn calculate_next_send(frequency: Frequency, now: NaiveDateTime) -> NaiveDateTime {
    let send_time = NaiveTime::from_hms_opt(SEND_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date();

    let date = match frequency {
        Frequency::Weekly => {
            let days_ahead = 7 - u64::from(today.weekday().num_days_from_monday());
            today + Days::new(days_ahead)
        }
        Frequency::Monthly => first_of_next_month(today),
    };

    date.and_time(send_time)
}

/// [`calculate_next_send`] against the local wall clock.
pub fn next_send_from_now(frequency: Frequency) -> NaiveDateTime {
    calculate_next_send(frequency, Local::now().naive_local())
}

fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// Outcome of [`SubscriptionStore::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    Replaced,
}

/// Mutex-guarded list of subscriptions.
#[derive(Debug, Default)]
pub struct SubscriptionStore {
    inner: Mutex<Vec<Subscription>>,
}

impl SubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `subscription`, replacing any existing one for the same
    /// (email, subreddit) pair.
    pub async fn add(&self, subscription: Subscription) -> AddOutcome {
        let mut subs = self.inner.lock().await;
        let outcome = match subs
            .iter_mut()
            .find(|s| s.same_target(&subscription.email, &subscription.subreddit))
        {
            Some(existing) => {
                *existing = subscription.clone();
                AddOutcome::Replaced
            }
            None => {
                subs.push(subscription.clone());
                AddOutcome::Created
            }
        };
        info!(
            email = %subscription.email,
            subreddit = %subscription.subreddit,
            frequency = %subscription.frequency,
            next_send = %subscription.next_send,
            ?outcome,
            total = subs.len(),
            "Stored subscription"
        );
        outcome
    }

    /// Remove subscriptions for `email`.
    ///
    /// With a subreddit only that pair is removed; without one every
    /// subscription of the address goes.
    ///
    /// # Returns
    ///
    /// How many subscriptions were removed.
    pub async fn remove(&self, email: &str, subreddit: Option<&str>) -> usize {
        let mut subs = self.inner.lock().await;
        let before = subs.len();
        subs.retain(|s| match subreddit {
            Some(sub) => !s.same_target(email, sub),
            None => !s.email.eq_ignore_ascii_case(email),
        });
        let removed = before - subs.len();
        info!(%email, subreddit = ?subreddit, removed, total = subs.len(), "Removed subscriptions");
        removed
    }

    /// Claim every subscription due at `now`.
    ///
    /// Returned copies carry the slot that fell due; the stored entries are
    /// already moved on to their next slot.
    pub async fn list_due(&self, now: NaiveDateTime) -> Vec<Subscription> {
        let mut subs = self.inner.lock().await;
        let mut due = Vec::new();
        for sub in subs.iter_mut().filter(|s| s.next_send <= now) {
            due.push(sub.clone());
            sub.next_send = calculate_next_send(sub.frequency, now);
            debug!(email = %sub.email, subreddit = %sub.subreddit, next_send = %sub.next_send, "Advanced subscription");
        }
        due
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
