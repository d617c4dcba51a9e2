//! Acknowledgement counting under concurrent finishers.

use std::sync::Arc;

use futures::future::join_all;
use herald_binding::{BindingError, Message, acks_before_finish};
use herald_test::{MockMessage, test_event_v1};
use tokio::sync::Barrier;

const CALLERS: usize = 1000;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_thousand_concurrent_acks_finish_once() {
    let inner = Arc::new(MockMessage::binary(test_event_v1()));
    let message = Arc::new(acks_before_finish(inner.clone(), CALLERS));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let message = message.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                message.finish(None)
            })
        })
        .collect();

    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(inner.finish_count(), 1);
    assert_eq!(message.remaining(), 0);
}

#[tokio::test]
async fn test_underlying_finish_waits_for_last_ack() {
    let inner = Arc::new(MockMessage::binary(test_event_v1()));
    let message = acks_before_finish(inner.clone(), 3);

    message.finish(Some(BindingError::NotStructured)).unwrap();
    message.finish(None).unwrap();
    assert_eq!(inner.finish_count(), 0);

    message.finish(Some(BindingError::NotBinary)).unwrap();
    assert_eq!(inner.finish_count(), 1);
    assert_eq!(
        inner.finish_errors(),
        vec!["message is not in structured mode"]
    );

    // Extra acks past zero never reach the inner message.
    message.finish(None).unwrap();
    assert_eq!(inner.finish_count(), 1);
}
