//! Pump-loop tests against a scripted transport.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;

use classcast_adapters::{pump, Transport};
use classcast_core::{DispatchContext, DispatchError, LabelSet};
use classcast_test_support::{png_bytes, MockClassifier, SyntheticImage};

/// Feeds a fixed script of inbound payloads, then fails like a dropped
/// connection. Captures everything published.
struct ScriptedTransport {
    inbound: VecDeque<Vec<u8>>,
    published: Vec<Vec<u8>>,
}

impl ScriptedTransport {
    fn new(inbound: Vec<Vec<u8>>) -> Self {
        Self {
            inbound: inbound.into(),
            published: Vec::new(),
        }
    }
}

impl Transport for ScriptedTransport {
    fn next_message(&mut self) -> Result<Vec<u8>, DispatchError> {
        self.inbound
            .pop_front()
            .ok_or_else(|| DispatchError::broker(anyhow::anyhow!("connection closed")))
    }

    fn publish(&mut self, payload: &[u8]) -> Result<(), DispatchError> {
        self.published.push(payload.to_vec());
        Ok(())
    }
}

/// Hands out one payload, then refuses to publish.
struct BrokenPublisher {
    sent: bool,
}

impl Transport for BrokenPublisher {
    fn next_message(&mut self) -> Result<Vec<u8>, DispatchError> {
        if self.sent {
            return Err(DispatchError::broker(anyhow::anyhow!("connection closed")));
        }
        self.sent = true;
        Ok(png_bytes(&SyntheticImage::checkerboard(16, 16)).unwrap())
    }

    fn publish(&mut self, _payload: &[u8]) -> Result<(), DispatchError> {
        Err(DispatchError::broker(anyhow::anyhow!("publish down")))
    }
}

fn context() -> DispatchContext {
    DispatchContext::new(
        Box::new(MockClassifier::with_scores(vec![0.25, 0.25, 0.5])),
        LabelSet::from_inline("bird,cat,dog").unwrap(),
        None,
    )
}

#[test]
fn test_every_payload_gets_one_reply() {
    let image = png_bytes(&SyntheticImage::checkerboard(16, 16)).unwrap();
    let mut transport = ScriptedTransport::new(vec![image.clone(), image]);

    let err = pump(&mut transport, &context());
    assert!(matches!(err, DispatchError::BrokerConnection { .. }));
    assert_eq!(transport.published.len(), 2);

    let reply: serde_json::Value = serde_json::from_slice(&transport.published[0]).unwrap();
    let object = reply.as_object().unwrap();
    assert_eq!(object.len(), 3);
    assert!(object.contains_key("dog"));

    // Descending score order is preserved in the object itself.
    let raw = String::from_utf8(transport.published[0].clone()).unwrap();
    assert!(raw.starts_with("{\"dog\""), "got: {raw}");
}

#[test]
fn test_bad_payload_is_skipped_without_a_reply() {
    let image = png_bytes(&SyntheticImage::uniform_gray(16, 16, 42)).unwrap();
    let mut transport =
        ScriptedTransport::new(vec![b"definitely not an image".to_vec(), image]);

    let err = pump(&mut transport, &context());
    assert!(matches!(err, DispatchError::BrokerConnection { .. }));
    assert_eq!(transport.published.len(), 1);
}

#[test]
fn test_inference_failure_is_skipped_without_a_reply() {
    let image = png_bytes(&SyntheticImage::checkerboard(16, 16)).unwrap();
    let mut transport = ScriptedTransport::new(vec![image]);

    let ctx = DispatchContext::new(
        Box::new(MockClassifier::always_failing()),
        LabelSet::from_inline("a,b").unwrap(),
        None,
    );

    let err = pump(&mut transport, &ctx);
    assert!(matches!(err, DispatchError::BrokerConnection { .. }));
    assert!(transport.published.is_empty());
}

#[test]
fn test_publish_failure_ends_the_session() {
    let mut transport = BrokenPublisher { sent: false };
    let err = pump(&mut transport, &context());
    assert!(matches!(err, DispatchError::BrokerConnection { .. }));
    assert!(err.to_string().contains("publish down"));
}
