//! Daily scheduling loop.
//!
//! Runs a job once a day at a fixed local time until Ctrl-C.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};
use std::future::Future;
use std::pin::Pin;
use tracing::{error, info};

/// Parse an `HH:MM` time of day.
pub fn parse_schedule_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("expected HH:MM, got '{}'", value))
}

/// The next moment at `at` strictly after `now`.
///
/// Today if that time has not passed yet, otherwise tomorrow. On a DST gap
/// the first valid instant after the gap is used.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();

    loop {
        let local = date.and_time(at);
        let candidate = tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest());

        if let Some(candidate) = candidate {
            if candidate > *now {
                return candidate;
            }
        }

        date = match date.succ_opt() {
            Some(next) => next,
            None => return now.clone() + Duration::days(1),
        };
    }
}

/// Run `job` every day at `at` (local time) until Ctrl-C.
///
/// With `run_now` the job also runs once at startup. A failing run is logged
/// and the loop keeps going. Ctrl-C also interrupts a run in progress.
pub async fn run_daily<F, Fut>(at: NaiveTime, run_now: bool, job: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    run_until(at, run_now, job, ctrl_c).await
}

/// The scheduling loop, stopped when `shutdown` completes.
async fn run_until<F, Fut, S>(
    at: NaiveTime,
    run_now: bool,
    mut job: F,
    mut shutdown: Pin<&mut S>,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
    S: Future<Output = std::io::Result<()>>,
{
    info!("Scheduler started, reports run daily at {}", at.format("%H:%M"));

    let mut due_now = run_now;
    loop {
        if due_now {
            tokio::select! {
                _ = run_job(&mut job) => {}
                result = &mut shutdown => return stopped(result),
            }
        }

        let now = Local::now();
        let next = next_run_after(&now, at);
        let wait = (next.clone() - now).to_std().unwrap_or_default();
        info!("Next report at {}", next.format("%Y-%m-%d %H:%M %Z"));

        tokio::select! {
            _ = tokio::time::sleep(wait) => due_now = true,
            result = &mut shutdown => return stopped(result),
        }
    }
}

fn stopped(result: std::io::Result<()>) -> Result<()> {
    result.context("Failed to listen for Ctrl-C")?;
    info!("Scheduler stopped by user");
    Ok(())
}

async fn run_job<F, Fut>(job: &mut F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    info!("Scheduled report triggered at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    match job().await {
        Ok(()) => info!("Scheduled report completed"),
        Err(e) => error!("Scheduled report failed: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, Utc};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_schedule_time() {
        assert_eq!(parse_schedule_time("09:00").unwrap(), at(9, 0));
        assert_eq!(parse_schedule_time(" 23:59 ").unwrap(), at(23, 59));
        assert!(parse_schedule_time("24:00").is_err());
        assert!(parse_schedule_time("9am").is_err());
    }

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 15, 0).unwrap();
        let next = next_run_after(&now, at(9, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_tomorrow_when_passed() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let next = next_run_after(&now, at(9, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_rolls_over_month_end() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 22, 0, 0).unwrap();
        let next = next_run_after(&now, at(6, 30));
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 1, 6, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn test_run_job_survives_failure() {
        let mut calls = 0;
        let mut job = || {
            calls += 1;
            async { Err::<(), _>(anyhow::anyhow!("jira unreachable")) }
        };
        run_job(&mut job).await;
        run_job(&mut job).await;
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_running_job() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut tx = Some(tx);
        let job = move || {
            if let Some(tx) = tx.take() {
                let _ = tx.send(());
            }
            async { std::future::pending::<Result<()>>().await }
        };
        let shutdown = async move {
            let _ = rx.await;
            Ok::<(), std::io::Error>(())
        };
        tokio::pin!(shutdown);

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            run_until(at(9, 0), true, job, shutdown),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_skips_job() {
        let mut calls = 0;
        let job = || {
            calls += 1;
            async { Ok::<(), anyhow::Error>(()) }
        };
        let shutdown = async { Ok::<(), std::io::Error>(()) };
        tokio::pin!(shutdown);

        run_until(at(9, 0), false, job, shutdown).await.unwrap();
        assert_eq!(calls, 0);
    }

    /// UTC+1, switching to UTC+2 at 02:00 local on 2024-03-31.
    /// Local times from 02:00 up to 03:00 that day do not exist.
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    #[derive(Debug, Clone, Copy)]
    struct SpringOffset(FixedOffset);

    impl Offset for SpringOffset {
        fn fix(&self) -> FixedOffset {
            self.0
        }
    }

    fn winter() -> SpringOffset {
        SpringOffset(FixedOffset::east_opt(3600).unwrap())
    }

    fn summer() -> SpringOffset {
        SpringOffset(FixedOffset::east_opt(7200).unwrap())
    }

    fn switch_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    impl TimeZone for SpringForward {
        type Offset = SpringOffset;

        fn from_offset(_: &SpringOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<SpringOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<SpringOffset> {
            let gap_start = switch_day().and_time(at(2, 0));
            let gap_end = switch_day().and_time(at(3, 0));
            if *local < gap_start {
                LocalResult::Single(winter())
            } else if *local >= gap_end {
                LocalResult::Single(summer())
            } else {
                LocalResult::None
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> SpringOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> SpringOffset {
            if *utc < switch_day().and_time(at(1, 0)) {
                winter()
            } else {
                summer()
            }
        }
    }

    #[test]
    fn test_next_run_inside_dst_gap_moves_past_it() {
        let now = SpringForward
            .from_local_datetime(&switch_day().and_time(at(0, 30)))
            .unwrap();
        let next = next_run_after(&now, at(2, 30));

        assert_eq!(next.naive_local(), switch_day().and_time(at(3, 30)));
        assert_eq!(
            next.naive_utc(),
            switch_day().and_time(at(1, 30))
        );
    }

    #[test]
    fn test_next_run_after_dst_gap_day_is_normal() {
        let now = SpringForward
            .from_local_datetime(&switch_day().and_time(at(4, 0)))
            .unwrap();
        let next = next_run_after(&now, at(2, 30));
        assert_eq!(
            next.naive_local(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_time(at(2, 30))
        );
    }
}
