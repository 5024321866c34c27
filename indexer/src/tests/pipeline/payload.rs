use rstest::*;
use uuid::Uuid;

use crate::core::client::chain::types::HeightMeta;
use crate::pipeline::payload::{Payload, PayloadPool};
use crate::pipeline::task::TaskOutput;
use crate::tests::common::height_time;
use crate::types::event::{SystemEvent, SystemEventKind};

fn filled_payload() -> Payload {
    let mut payload = Payload::new(3, Uuid::new_v4(), 2);
    TaskOutput::HeightMeta(HeightMeta { height: 3, time: height_time(3), app_version: 1 }).apply(&mut payload);
    TaskOutput::Validators(Vec::new()).apply(&mut payload);
    TaskOutput::SystemEvents(vec![SystemEvent::new(3, height_time(3), "addr-a", SystemEventKind::LeftActiveSet)])
        .apply(&mut payload);
    payload
}

#[rstest]
fn reset_clears_every_field() {
    let mut payload = filled_payload();

    payload.reset();

    assert_eq!(payload.current_height, 0);
    assert!(payload.report_id.is_nil());
    assert!(payload.height_meta.is_none());
    assert!(payload.raw_validators.is_none());
    assert!(payload.system_events.is_empty());
}

/// Analyzer outputs accumulate instead of replacing each other.
#[rstest]
fn system_event_outputs_accumulate() {
    let mut payload = filled_payload();

    TaskOutput::SystemEvents(vec![SystemEvent::new(3, height_time(3), "addr-b", SystemEventKind::JoinedActiveSet)])
        .apply(&mut payload);

    assert_eq!(payload.system_events.len(), 2);
}

#[rstest]
fn pool_hands_out_clean_payloads() {
    let mut pool = PayloadPool::default();
    let report_id = Uuid::new_v4();

    let first = pool.acquire(1, report_id, 2);
    assert_eq!(first.current_height, 1);
    pool.release(filled_payload());
    pool.release(first);
    assert_eq!(pool.available(), 2);

    let reused = pool.acquire(2, report_id, 2);
    let other = pool.acquire(3, report_id, 2);
    for (payload, height) in [(&reused, 2), (&other, 3)] {
        assert_eq!(payload.current_height, height);
        assert_eq!(payload.report_id, report_id);
        assert_eq!(payload.index_version, 2);
        assert!(payload.height_meta.is_none());
        assert!(payload.system_events.is_empty());
    }
    assert_eq!(pool.available(), 0);
}
