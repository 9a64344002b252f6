//! Domain-specific assertion macros for chatwatch harnesses.
//!
//! These add context to failures so it is clear which pipeline invariant was
//! violated.

/// Assert the disposition of `text` on `channel` under `rules`.
///
/// ```rust
/// assert_disposition!(rules, ChannelKind::Team, "spam", Disposition::Suppressed);
/// ```
#[macro_export]
macro_rules! assert_disposition {
    ($rules:expr, $channel:expr, $text:expr, $expected:expr) => {{
        let event = chatwatch_core::RawEvent::new($channel, "00:00:00", $text);
        let actual = chatwatch_core::classify(&event, &$rules);
        if actual != $expected {
            panic!(
                "assert_disposition! failed for {:?} on {}:\n  expected: {:?}\n  actual:   {:?}\n  rules:    {:?}",
                $text, $channel, $expected, actual, $rules
            );
        }
    }};
}

/// Assert that events appear in the given text order.
#[macro_export]
macro_rules! assert_texts {
    ($events:expr, [$($text:expr),* $(,)?]) => {{
        let events = &$events;
        let actual: Vec<&str> = events.iter().map(|e| e.text.as_str()).collect();
        let expected: Vec<&str> = vec![$($text),*];
        pretty_assertions::assert_eq!(actual, expected, "event texts differ");
    }};
}

/// Wait (polling every 5ms, up to 5s) until `$cond` holds.
#[macro_export]
macro_rules! wait_until {
    ($cond:expr) => {{
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            if $cond {
                break;
            }
            if std::time::Instant::now() > deadline {
                panic!("wait_until! timed out waiting for {}", stringify!($cond));
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }};
}
