use tokio_stream::Stream;

use crate::OutcomeRecord;

/// Waits for the next outcome record and returns it.
///
/// # Panics
///
/// Panics if the stream closes or nothing arrives within the timeout (default 5 seconds).
#[macro_export]
macro_rules! assert_next {
    ($stream: expr) => {
        $crate::assert_next!($stream, timeout = 5)
    };
    ($stream: expr, timeout = $secs: expr) => {
        tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out waiting for outcome")
        .expect("outcome stream closed")
    };
}

#[macro_export]
macro_rules! assert_closed {
    ($stream: expr) => {
        $crate::assert_closed!($stream, timeout = 5)
    };
    ($stream: expr, timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        assert!(message.is_none(), "expected closed stream, got {message:?}")
    };
}

/// Asserts no outcome is buffered, handing back a usable stream.
#[macro_export]
macro_rules! assert_empty {
    ($stream: expr) => {{
        let inner = $stream.into_inner();
        assert!(inner.is_empty(), "Stream should have no pending outcomes");
        tokio_stream::wrappers::ReceiverStream::new(inner)
    }};
}

/// Asserts the stream yields outcomes with the given tags, in order.
///
/// ```no_run
/// # use bridge_listener::assert_outcome_sequence;
/// # async fn check(mut stream: tokio_stream::wrappers::ReceiverStream<bridge_listener::OutcomeRecord>) {
/// assert_outcome_sequence!(stream, ["simulated", "rejected", "dropped"]);
/// # }
/// ```
#[macro_export]
macro_rules! assert_outcome_sequence {
    ($stream: expr, [$($tag:expr),+ $(,)?]) => {
        $crate::assert_outcome_sequence!($stream, [$($tag),+], timeout = 5)
    };
    ($stream: expr, [$($tag:expr),+ $(,)?], timeout = $secs: expr) => {
        $crate::test_utils::macros::assert_outcome_sequence(&mut $stream, &[$($tag),+], $secs).await
    };
}

#[allow(clippy::missing_panics_doc)]
pub async fn assert_outcome_sequence<S: Stream<Item = OutcomeRecord> + Unpin>(
    stream: &mut S,
    expected: &[&str],
    timeout_secs: u64,
) -> Vec<OutcomeRecord> {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(timeout_secs);
    let mut received = Vec::with_capacity(expected.len());

    for (position, tag) in expected.iter().enumerate() {
        let record = tokio::time::timeout_at(deadline, tokio_stream::StreamExt::next(stream))
            .await
            .unwrap_or_else(|_| {
                panic!("timed out waiting for outcome #{position} ({tag}), received: {received:#?}")
            })
            .unwrap_or_else(|| {
                panic!("stream closed while expecting outcome #{position} ({tag}), received: {received:#?}")
            });

        assert_eq!(
            record.outcome.tag(),
            *tag,
            "unexpected outcome #{position}: {record}\nremaining: {:?}",
            &expected[position..]
        );
        received.push(record);
    }

    received
}
