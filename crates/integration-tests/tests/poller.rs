//! Threshold pollers gathered on one task

use asyncflow_core::application::{poll_all, poll_all_with, PollConfig};
use asyncflow_core::domain::DomainError;
use asyncflow_core::error::AppError;
use rand::rngs::mock::StepRng;
use std::time::Duration;

fn config(pollers: usize) -> PollConfig {
    PollConfig {
        pollers,
        time_unit: Duration::from_millis(1),
        seed: Some(444),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_every_poller_clears_its_threshold() {
    let outcomes = poll_all(&config(3)).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    for (idx, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.idx, idx);
        assert_eq!(outcome.threshold, 10 - idx as u32 - 1);
        assert!(outcome.value > outcome.threshold);
        assert!(outcome.value <= 10);
    }
}

#[tokio::test]
async fn test_same_seed_same_outcomes() {
    let first = poll_all(&config(3)).await.unwrap();
    let second = poll_all(&config(3)).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_no_pollers() {
    assert!(poll_all(&config(0)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_too_many_pollers_rejected() {
    let err = poll_all(&config(11)).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::ValidationError(_))));
}

#[tokio::test]
async fn test_zero_attempt_limit_rejected() {
    let cfg = PollConfig {
        max_attempts: Some(0),
        ..config(1)
    };
    assert!(poll_all(&cfg).await.is_err());
}

#[tokio::test]
async fn test_gather_fails_when_a_poller_runs_out_of_attempts() {
    let cfg = PollConfig {
        max_attempts: Some(1),
        ..config(3)
    };

    // Draws are always 0, below every threshold
    let err = poll_all_with(&cfg, |_| StepRng::new(0, 0)).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::PollExhausted { attempts: 1, .. })
    ));
}
