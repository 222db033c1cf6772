use std::time::Duration;

use shift_orchestrator::backend::breaker::CircuitBreaker;

#[test]
fn stays_closed_below_the_threshold() {
    let breaker = CircuitBreaker::with_policy("test", 3, Duration::from_secs(60));

    breaker.record_failure();
    breaker.record_failure();
    assert!(breaker.allow());
    assert!(!breaker.is_open());
}

#[test]
fn opens_at_the_failure_threshold() {
    let breaker = CircuitBreaker::with_policy("test", 3, Duration::from_secs(60));

    for _ in 0..3 {
        breaker.record_failure();
    }
    assert!(breaker.is_open());
    assert!(!breaker.allow());
}

#[test]
fn success_resets_the_failure_count() {
    let breaker = CircuitBreaker::with_policy("test", 3, Duration::from_secs(60));

    breaker.record_failure();
    breaker.record_failure();
    breaker.record_success();
    breaker.record_failure();
    breaker.record_failure();
    assert!(!breaker.is_open());
}

#[test]
fn half_open_admits_exactly_one_probe_after_cooldown() {
    let breaker = CircuitBreaker::with_policy("test", 1, Duration::from_millis(20));

    breaker.record_failure();
    assert!(!breaker.allow());

    std::thread::sleep(Duration::from_millis(30));
    assert!(breaker.allow(), "probe should be admitted");
    assert!(!breaker.allow(), "second caller must wait for the probe");
}

#[test]
fn successful_probe_closes_the_circuit() {
    let breaker = CircuitBreaker::with_policy("test", 1, Duration::from_millis(20));

    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(30));
    assert!(breaker.allow());
    breaker.record_success();

    assert!(!breaker.is_open());
    assert!(breaker.allow());
}

#[test]
fn failed_probe_reopens_the_circuit() {
    let breaker = CircuitBreaker::with_policy("test", 1, Duration::from_millis(20));

    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(30));
    assert!(breaker.allow());
    breaker.record_failure();

    assert!(breaker.is_open());
    assert!(!breaker.allow(), "cool-down restarts after a failed probe");
}
