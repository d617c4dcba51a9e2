//! Encoding router behavior against mock transports.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use herald_binding::transformer::{add_time_now, convert_version};
use herald_binding::{
    Affinity, BinaryWriter, BindingError, BindingResult, Encoding, HeaderWriter, Message,
    StructuredBuffer, StructuredWriter, Transformers, WriteContext, buffer_message,
    copy_message, direct_write, to_event, write,
};
use herald_core::content_type::APPLICATION_CLOUDEVENTS_JSON;
use herald_core::{Event, SpecVersion, Value};
use herald_test::{
    CountingTransformer, HOPS_EXTENSION, MockMessage, RecordingWriter, WriterCall,
    test_event_full_v1, test_event_v03, test_event_v1,
};
use tokio_util::sync::CancellationToken;

fn counting(affinity: Affinity) -> (CountingTransformer, Transformers) {
    let counter = CountingTransformer::new(affinity);
    let list = Transformers::new().with(counter.clone());
    (counter, list)
}

#[tokio::test]
async fn test_structured_passthrough_is_verbatim() {
    let body = br#"{"specversion":"1.0","id":"1","type":"t","source":"/s","weird":  true}"#;
    let message = MockMessage::structured(APPLICATION_CLOUDEVENTS_JSON, body.to_vec());
    let mut writer = RecordingWriter::new();

    let written = write(
        &WriteContext::new(),
        &message,
        Some(&mut writer),
        None,
        &Transformers::new(),
    )
    .await
    .unwrap();

    assert_eq!(written, Encoding::Structured);
    assert_eq!(
        writer.structured(),
        Some((APPLICATION_CLOUDEVENTS_JSON, body.as_slice()))
    );
    assert_eq!(message.finish_count(), 0);
}

#[tokio::test]
async fn test_structured_transformer_runs_on_passthrough() {
    let (counter, transformers) = counting(Affinity::ALL);
    let message = MockMessage::json(&test_event_v1());
    let mut writer = RecordingWriter::new();

    let written = write(&WriteContext::new(), &message, Some(&mut writer), None, &transformers)
        .await
        .unwrap();

    assert_eq!(written, Encoding::Structured);
    assert_eq!(counter.calls(), 1);
}

#[tokio::test]
async fn test_structured_with_metadata_transformer_goes_through_event() {
    let (counter, transformers) = counting(Affinity::METADATA);
    let message = MockMessage::json(&test_event_v1());
    let mut structured = RecordingWriter::new();
    let mut binary = RecordingWriter::new();

    let written = write(
        &WriteContext::new(),
        &message,
        Some(&mut structured),
        Some(&mut binary),
        &transformers,
    )
    .await
    .unwrap();

    assert_eq!(written, Encoding::Binary);
    assert!(structured.calls().is_empty());
    assert_eq!(counter.calls(), 1);
    assert_eq!(binary.extension(HOPS_EXTENSION), Some(&Value::Integer(1)));
}

#[tokio::test]
async fn test_binary_direct_frames_and_orders_callbacks() {
    for message in [
        MockMessage::binary(test_event_full_v1()),
        MockMessage::binary(test_event_full_v1()).with_metadata_reader(),
    ] {
        let (counter, transformers) = counting(Affinity::METADATA);
        let mut writer = RecordingWriter::new();

        let written = write(&WriteContext::new(), &message, None, Some(&mut writer), &transformers)
            .await
            .unwrap();

        assert_eq!(written, Encoding::Binary);
        assert_eq!(counter.calls(), 1);
        let calls = writer.calls();
        assert_eq!(calls.first(), Some(&WriterCall::Start));
        assert_eq!(calls.last(), Some(&WriterCall::End));
        assert_eq!(writer.attribute_names()[0], "specversion");
        assert_eq!(writer.extension(HOPS_EXTENSION), Some(&Value::Integer(1)));
        assert_eq!(writer.data(), Some(br#"{"a":42}"#.as_slice()));
    }
}

#[tokio::test]
async fn test_skip_direct_binary_materializes() {
    let message = MockMessage::binary(test_event_v1());
    let mut writer = RecordingWriter::new();
    let ctx = WriteContext::new().skip_direct_binary();
    let (counter, transformers) = counting(Affinity::EVENT);

    assert_eq!(
        direct_write(&ctx, &message, None, Some(&mut writer), &transformers)
            .await
            .unwrap(),
        Encoding::Unknown
    );
    assert!(writer.calls().is_empty());

    let written = write(&ctx, &message, None, Some(&mut writer), &transformers)
        .await
        .unwrap();
    assert_eq!(written, Encoding::Binary);
    assert_eq!(counter.calls(), 1);
}

#[tokio::test]
async fn test_event_only_transformer_on_binary() {
    let message = MockMessage::binary(test_event_v1());
    let transformers = Transformers::new().with(convert_version(SpecVersion::V03));
    let mut structured = StructuredBuffer::default();

    let ctx = WriteContext::new().with_preferred_encoding(Encoding::Structured);
    write(&ctx, &message, Some(&mut structured), None, &transformers)
        .await
        .unwrap();

    let event = structured.into_event().unwrap();
    assert_eq!(event.spec_version(), SpecVersion::V03);
}

#[tokio::test]
async fn test_structured_only_transformer_cannot_touch_binary() {
    let message = MockMessage::binary(test_event_v1());
    let (counter, transformers) = counting(Affinity::STRUCTURED);
    let mut writer = RecordingWriter::new();

    let err = write(&WriteContext::new(), &message, None, Some(&mut writer), &transformers)
        .await
        .unwrap_err();

    assert!(matches!(err, BindingError::Affinity { mode: "event", .. }));
    assert_eq!(counter.calls(), 0);
}

#[tokio::test]
async fn test_unknown_encoding() {
    let mut writer = RecordingWriter::new();
    let err = write(
        &WriteContext::new(),
        &MockMessage::unknown(),
        Some(&mut writer),
        None,
        &Transformers::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BindingError::UnknownEncoding));
}

#[tokio::test]
async fn test_header_round_trip() {
    let mut event = test_event_full_v1();
    event.remove_extension("count");
    let mut writer = HeaderWriter::new();
    write(
        &WriteContext::new(),
        &event,
        None,
        Some(&mut writer),
        &Transformers::new(),
    )
    .await
    .unwrap();
    assert_eq!(
        writer.headers().get("content-type").map(String::as_str),
        Some("application/json")
    );

    let received = writer.into_message();
    assert_eq!(received.encoding(), Encoding::Binary);
    let back = to_event(&received, &Transformers::new()).await.unwrap();
    assert_eq!(back.context(), event.context());
    assert_eq!(back.data(), event.data());

    let mut typed = test_event_v1();
    typed.set_extension("count", 3);
    let mut writer = HeaderWriter::new();
    write(&WriteContext::new(), &typed, None, Some(&mut writer), &Transformers::new())
        .await
        .unwrap();
    let back = to_event(&writer.into_message(), &Transformers::new())
        .await
        .unwrap();
    assert_eq!(back.extension("count"), Some(&Value::from("3")));
}

#[tokio::test]
async fn test_copy_survives_single_read_message() {
    let message = MockMessage::binary(test_event_v03()).read_once();
    let transformers = Transformers::new().with(add_time_now());
    let copy = copy_message(&message, &transformers).await.unwrap();
    assert_eq!(copy.encoding(), Encoding::Binary);

    assert!(
        message
            .read_binary(&mut Event::default())
            .await
            .is_err()
    );

    for _ in 0..2 {
        let mut event = Event::default();
        copy.read_binary(&mut event).await.unwrap();
        assert_eq!(event.spec_version(), SpecVersion::V03);
        assert!(event.time().is_some());
    }
}

#[tokio::test]
async fn test_buffered_message_forwards_finish() {
    let message = Arc::new(MockMessage::json(&test_event_v1()));
    let copy = buffer_message(message.clone(), &Transformers::new())
        .await
        .unwrap();
    assert!(copy.structured().is_some());

    copy.finish(Some(BindingError::NotBinary)).unwrap();
    assert_eq!(message.finish_count(), 1);
    assert_eq!(message.finish_errors(), vec!["message is not in binary mode"]);
}

struct Stalled {
    finishes: AtomicUsize,
}

#[async_trait]
impl Message for Stalled {
    fn encoding(&self) -> Encoding {
        Encoding::Binary
    }

    async fn read_structured(&self, _: &mut dyn StructuredWriter) -> BindingResult<()> {
        Err(BindingError::NotStructured)
    }

    async fn read_binary(&self, _: &mut dyn BinaryWriter) -> BindingResult<()> {
        std::future::pending().await
    }

    fn finish(&self, error: Option<BindingError>) -> BindingResult<()> {
        assert!(error.is_some_and(|e| e.is_cancelled()));
        self.finishes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_cancellation_finishes_message() {
    let token = CancellationToken::new();
    let ctx = WriteContext::new().with_cancellation(token.clone());
    let message = Stalled {
        finishes: AtomicUsize::new(0),
    };

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let mut writer = RecordingWriter::new();
    let err = write(&ctx, &message, None, Some(&mut writer), &Transformers::new())
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(message.finishes.load(Ordering::SeqCst), 1);
}
