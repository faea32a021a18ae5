//! Background dispatch schedule.
//!
//! One task per cadence. A pass is awaited before the next tick is taken,
//! so passes of the same cadence never overlap, and ticks missed while a
//! pass runs long are dropped.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use skymail_core::subscription::Cadence;

use crate::services::NotificationDispatcher;

const HOUR: StdDuration = StdDuration::from_secs(60 * 60);
const DAY: StdDuration = StdDuration::from_secs(24 * 60 * 60);

/// Spawns the hourly and daily dispatch tasks.
///
/// The first hourly pass runs one hour after startup; daily passes run at
/// `daily_hour`:00 UTC. Both tasks exit when `shutdown` fires.
pub fn spawn(
    dispatcher: Arc<NotificationDispatcher>,
    daily_hour: u32,
    shutdown: &broadcast::Sender<()>,
) -> Vec<JoinHandle<()>> {
    let until_daily = delay_until_hour(Utc::now(), daily_hour)
        .to_std()
        .unwrap_or(StdDuration::ZERO);

    tracing::info!(
        daily_hour,
        next_daily_in_secs = until_daily.as_secs(),
        "Starting dispatch scheduler"
    );

    vec![
        tokio::spawn(run_every(
            dispatcher.clone(),
            Cadence::Hourly,
            Instant::now() + HOUR,
            HOUR,
            shutdown.subscribe(),
        )),
        tokio::spawn(run_every(
            dispatcher,
            Cadence::Daily,
            Instant::now() + until_daily,
            DAY,
            shutdown.subscribe(),
        )),
    ]
}

async fn run_every(
    dispatcher: Arc<NotificationDispatcher>,
    cadence: Cadence,
    start: Instant,
    period: StdDuration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::debug!(%cadence, "Dispatch task stopping");
                break;
            }
            _ = ticker.tick() => {
                let pass = match cadence {
                    Cadence::Hourly => dispatcher.run_hourly().await,
                    Cadence::Daily => dispatcher.run_daily().await,
                };
                if let Err(err) = pass {
                    tracing::error!(%cadence, error = %err, "Dispatch pass failed");
                }
            }
        }
    }
}

/// Time from `now` until the next `hour`:00 UTC, strictly in the future.
///
/// Hours past 23 are clamped to 23.
pub fn delay_until_hour(now: DateTime<Utc>, hour: u32) -> Duration {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    let next = if today > now {
        today
    } else {
        today + Duration::days(1)
    };
    next - now
}
