//! Fan-out integration tests
//!
//! Drive the coordinator through mock publishers: aggregation, alphabetical
//! status ordering, per-platform isolation, and retry of rate limits.

use libtricast::platforms::mock::MockPublisher;
use libtricast::{PlatformError, Publisher, SocialFanout};

fn three_mocks() -> (MockPublisher, MockPublisher, MockPublisher) {
    (
        MockPublisher::success("twitter", "X"),
        MockPublisher::success("farcaster", "Farcaster"),
        MockPublisher::success("bluesky", "Bluesky"),
    )
}

#[tokio::test]
async fn all_platforms_succeed() {
    let (twitter, farcaster, bluesky) = three_mocks();
    let fanout = SocialFanout::new(
        vec![Box::new(twitter), Box::new(farcaster), Box::new(bluesky)],
        3,
    );

    let outcome = fanout.post_to_social("hello", None).await;

    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.all_succeeded());
    assert_eq!(outcome.status_line(), "Posted: Bluesky, Farcaster, X");
    assert!(!outcome.status_line().contains("Failed"));
    assert!(outcome.results.iter().all(|r| r.reference.is_some()));
}

#[tokio::test]
async fn all_platforms_fail() {
    let fanout = SocialFanout::new(
        vec![
            Box::new(MockPublisher::failing(
                "twitter",
                "X",
                PlatformError::Posting("down".to_string()),
            )),
            Box::new(MockPublisher::failing(
                "farcaster",
                "Farcaster",
                PlatformError::Network("unreachable".to_string()),
            )),
            Box::new(MockPublisher::failing(
                "bluesky",
                "Bluesky",
                PlatformError::Auth("expired".to_string()),
            )),
        ],
        3,
    );

    let outcome = fanout.post_to_social("hello", None).await;

    let status = outcome.status_line();
    assert!(!status.contains("Posted:"));
    assert_eq!(status, "Failed: Bluesky, Farcaster, X");
    assert!(outcome.results.iter().all(|r| r.error.is_some()));
}

#[tokio::test]
async fn one_failure_does_not_block_the_others() {
    let twitter = MockPublisher::success("twitter", "X");
    let bluesky = MockPublisher::success("bluesky", "Bluesky");
    let (twitter_calls, twitter_published) = twitter.counters();
    let (bluesky_calls, _) = bluesky.counters();

    let fanout = SocialFanout::new(
        vec![
            Box::new(twitter),
            Box::new(MockPublisher::failing(
                "farcaster",
                "Farcaster",
                PlatformError::Auth("bad header".to_string()),
            )),
            Box::new(bluesky),
        ],
        3,
    );

    let outcome = fanout.post_to_social("still going", Some(b"jpeg")).await;

    assert_eq!(
        outcome.status_line(),
        "Posted: Bluesky, X / Failed: Farcaster"
    );
    assert_eq!(*twitter_calls.lock().unwrap(), 1);
    assert_eq!(*bluesky_calls.lock().unwrap(), 1);
    assert_eq!(
        twitter_published.lock().unwrap().as_slice(),
        &[("still going".to_string(), true)]
    );

    let farcaster = outcome
        .results
        .iter()
        .find(|r| r.platform == "farcaster")
        .unwrap();
    assert!(!farcaster.success);
    assert!(farcaster.error.as_ref().unwrap().contains("bad header"));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_platform_recovers_within_budget() {
    let flaky = MockPublisher::rate_limited("bluesky", "Bluesky", 2);
    let (calls, _) = flaky.counters();

    let fanout = SocialFanout::new(vec![Box::new(flaky)], 3);
    let outcome = fanout.post_to_social("retry me", None).await;

    assert!(outcome.all_succeeded());
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_platform_fails_past_budget() {
    let exhausted = MockPublisher::rate_limited("bluesky", "Bluesky", 10);
    let (calls, _) = exhausted.counters();

    let fanout = SocialFanout::new(vec![Box::new(exhausted)], 3);
    let outcome = fanout.post_to_social("retry me", None).await;

    assert!(!outcome.all_succeeded());
    assert_eq!(*calls.lock().unwrap(), 3);
    assert_eq!(outcome.status_line(), "Failed: Bluesky");
}

#[tokio::test]
async fn mock_publisher_reports_names() {
    let mock = MockPublisher::success("twitter", "X");
    assert_eq!(mock.name(), "twitter");
    assert_eq!(mock.display_name(), "X");
}
