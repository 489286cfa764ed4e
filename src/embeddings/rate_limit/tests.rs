use super::*;

#[test]
fn allows_requests_under_the_limit() {
    let mut limiter = RateLimiter::new(3, Duration::from_secs(60));

    assert!(limiter.would_allow());
    limiter.acquire();
    limiter.acquire();
    assert_eq!(limiter.in_flight(), 2);
    assert!(limiter.would_allow());
}

#[test]
fn blocks_when_window_is_full() {
    let mut limiter = RateLimiter::new(2, Duration::from_secs(60));
    limiter.acquire();
    limiter.acquire();

    assert!(!limiter.would_allow());
    assert_eq!(limiter.in_flight(), 2);
}

#[test]
fn slots_free_up_as_the_window_slides() {
    let mut limiter = RateLimiter::new(2, Duration::from_millis(50));
    limiter.acquire();
    limiter.acquire();
    assert!(!limiter.would_allow());

    std::thread::sleep(Duration::from_millis(60));
    assert!(limiter.would_allow());
    assert_eq!(limiter.in_flight(), 0);
}

#[test]
fn acquire_waits_for_a_free_slot() {
    let mut limiter = RateLimiter::new(1, Duration::from_millis(50));
    limiter.acquire();

    let start = Instant::now();
    limiter.acquire();
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[test]
fn from_config_uses_configured_window() {
    let config = RateLimitConfig {
        max_requests: 5,
        window_seconds: 2,
    };
    let mut limiter = RateLimiter::from_config(&config);

    assert_eq!(limiter.max_requests, 5);
    assert_eq!(limiter.window, Duration::from_secs(2));
    assert!(limiter.would_allow());
}
