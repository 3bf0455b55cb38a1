//! Integration tests for the dull ticker on a virtual clock.
//!
//! The mock clock fires the poll ticker one boundary at a time and yields to
//! the runtime around each firing, so on the current-thread runtime the
//! ticker loop sees every command and poll in order.

use std::time::{Duration, SystemTime};

use dull_ticker::{Clock, DullTicker, Error, MockClock, SystemClock, Ticks};

fn start() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// Reads whatever tick is waiting.
fn drain(ticks: &mut Ticks, seen: &mut Vec<SystemTime>) -> usize {
    let mut n = 0;
    while let Some(at) = ticks.try_recv() {
        seen.push(at);
        n += 1;
    }
    n
}

#[tokio::test]
async fn dull_step_then_reset_scenario() {
    let clock = MockClock::at(start());
    let (ticker, mut ticks) = DullTicker::builder()
        .clock(clock.clone())
        .reset_duration(secs(3))
        .min_interval(secs(9))
        .spawn()
        .unwrap();
    let mut seen = Vec::new();

    let mut count = 0;
    for _ in 0..70 {
        ticker.touch().await.unwrap();
        clock.add(secs(1)).await;
        count += drain(&mut ticks, &mut seen);
    }
    assert_eq!(count, 3, "dull step ticks: {:?}", seen);

    seen.clear();
    let mut count = 0;
    ticker.reset().await.unwrap();
    for _ in 0..40 {
        ticker.touch().await.unwrap();
        clock.add(secs(1)).await;
        count += drain(&mut ticks, &mut seen);
    }
    for _ in 0..10 {
        // Five quiet seconds exceed the reset duration.
        clock.add(secs(5)).await;
        ticker.touch().await.unwrap();
        count += drain(&mut ticks, &mut seen);
    }
    clock.add(Duration::ZERO).await;
    count += drain(&mut ticks, &mut seen);
    assert_eq!(count, 12, "reset ticks: {:?}", seen);

    ticker.stop();
}

#[tokio::test]
async fn idle_flush_fires_once_and_restores_min_interval() {
    let clock = MockClock::at(start());
    let (ticker, mut ticks) = DullTicker::builder()
        .clock(clock.clone())
        .min_interval(secs(10))
        .reset_duration(secs(3))
        .spawn()
        .unwrap();
    let mut seen = Vec::new();

    ticker.touch().await.unwrap();
    clock.add(secs(1)).await;
    assert_eq!(drain(&mut ticks, &mut seen), 1);
    assert_eq!(ticker.snapshot().await.unwrap().interval, secs(20));

    ticker.touch().await.unwrap();
    clock.add(secs(3)).await;
    assert_eq!(drain(&mut ticks, &mut seen), 0);

    clock.add(secs(60)).await;
    assert_eq!(drain(&mut ticks, &mut seen), 1);
    assert_eq!(seen[1], start() + secs(5));

    let snapshot = ticker.snapshot().await.unwrap();
    assert_eq!(snapshot.interval, secs(10));
    assert_eq!(snapshot.last_touch, None);
}

#[tokio::test]
async fn backoff_spacing_grows_until_max() {
    let clock = MockClock::at(start());
    let (ticker, mut ticks) = DullTicker::builder()
        .clock(clock.clone())
        .min_interval(secs(2))
        .max_interval(secs(20))
        .reset_duration(secs(3600))
        .spawn()
        .unwrap();
    let mut seen = Vec::new();

    for _ in 0..200 {
        ticker.touch().await.unwrap();
        clock.add(secs(1)).await;
        drain(&mut ticks, &mut seen);
    }

    let spacing: Vec<Duration> = seen
        .windows(2)
        .map(|w| w[1].duration_since(w[0]).unwrap())
        .collect();
    assert_eq!(&spacing[..4], &[secs(5), secs(9), secs(17), secs(21)]);
    assert!(spacing.windows(2).all(|w| w[0] <= w[1]), "{:?}", spacing);
    assert!(spacing.iter().all(|s| *s <= secs(21)));
    assert_eq!(ticker.snapshot().await.unwrap().interval, secs(20));
}

#[tokio::test]
async fn reset_drops_inflated_interval() {
    let clock = MockClock::at(start());
    let (ticker, mut ticks) = DullTicker::builder()
        .clock(clock.clone())
        .min_interval(secs(5))
        .reset_duration(secs(3600))
        .spawn()
        .unwrap();
    let mut seen = Vec::new();

    for _ in 0..60 {
        ticker.touch().await.unwrap();
        clock.add(secs(1)).await;
        drain(&mut ticks, &mut seen);
    }
    assert!(ticker.snapshot().await.unwrap().interval > secs(10));

    ticker.reset().await.unwrap();
    let reset_at = clock.now();
    ticker.touch().await.unwrap();
    seen.clear();
    clock.add(secs(5)).await;

    assert_eq!(drain(&mut ticks, &mut seen), 1);
    assert!(seen[0].duration_since(reset_at).unwrap() <= secs(5));
    assert_eq!(ticker.snapshot().await.unwrap().interval, secs(10));
}

#[tokio::test]
async fn misbehaving_backoff_stays_in_bounds() {
    let clock = MockClock::at(start());
    let (ticker, mut ticks) = DullTicker::builder()
        .clock(clock.clone())
        .min_interval(secs(4))
        .max_interval(secs(30))
        .reset_duration(secs(3600))
        .backoff(|d| {
            if d > secs(15) {
                Duration::from_millis(1)
            } else {
                d * 7
            }
        })
        .spawn()
        .unwrap();
    let mut seen = Vec::new();

    for _ in 0..120 {
        ticker.touch().await.unwrap();
        clock.add(secs(1)).await;
        drain(&mut ticks, &mut seen);

        let interval = ticker.snapshot().await.unwrap().interval;
        assert!(interval >= secs(4) && interval <= secs(30), "{:?}", interval);
    }
    assert!(seen.len() > 3);
}

#[tokio::test]
async fn concurrent_touches_coalesce_into_one_tick() {
    let clock = MockClock::at(start());
    let (ticker, mut ticks) = DullTicker::builder()
        .clock(clock.clone())
        .min_interval(secs(9))
        .reset_duration(secs(3))
        .spawn()
        .unwrap();

    let mut workers = Vec::new();
    for _ in 0..10 {
        let ticker = ticker.clone();
        workers.push(tokio::spawn(async move {
            for _ in 0..10 {
                ticker.touch().await.unwrap();
            }
        }));
    }
    for worker in workers {
        worker.await.unwrap();
    }

    clock.add(secs(2)).await;

    let mut seen = Vec::new();
    assert_eq!(drain(&mut ticks, &mut seen), 1);
}

#[tokio::test]
async fn commands_after_stop_fail() {
    let clock = MockClock::at(start());
    let (ticker, mut ticks) = DullTicker::builder().clock(clock.clone()).spawn().unwrap();

    ticker.stop();
    clock.add(secs(1)).await;

    assert!(matches!(ticker.touch().await, Err(Error::Stopped)));
    assert!(matches!(ticker.reset().await, Err(Error::Stopped)));
    assert_eq!(ticks.recv().await, None);
}

#[tokio::test]
async fn last_touch_is_ticked_before_stop() {
    let clock = MockClock::at(start());
    let (ticker, mut ticks) = DullTicker::builder()
        .clock(clock.clone())
        .min_interval(secs(9))
        .reset_duration(secs(3))
        .spawn()
        .unwrap();

    ticker.touch().await.unwrap();
    clock.add(secs(1)).await;
    ticker.touch().await.unwrap();

    // The CLI drains like this at end of input.
    let mut polls = 0;
    while ticker.snapshot().await.unwrap().last_touch.is_some() {
        clock.add(secs(1)).await;
        polls += 1;
    }
    assert_eq!(polls, 4);
    ticker.stop();

    assert_eq!(ticks.recv().await, Some(start() + secs(1)));
    assert_eq!(ticks.recv().await, None);
}

#[tokio::test]
async fn system_clock_ticker_delivers() {
    let (ticker, mut ticks) = DullTicker::builder()
        .clock(SystemClock::new())
        .min_interval(Duration::from_millis(200))
        .reset_duration(Duration::from_millis(300))
        .spawn()
        .unwrap();

    let before = SystemTime::now();
    ticker.touch().await.unwrap();
    let tick = tokio::time::timeout(secs(5), ticks.recv())
        .await
        .expect("tick within five seconds")
        .expect("ticker still running");

    assert!(tick >= before);
    ticker.stop();
}
