//! Fan-out sink bank: every event reaches the primary sink and all bank
//! sinks; the bank is fixed-size and rejects registrations past capacity.
//! Isolated in its own binary because filling the bank is irreversible for
//! the process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tether_engine::{host, CallbackBridge, Envelope, HostError, SINK_BANK_CAPACITY};

#[test]
fn bank_fans_out_and_enforces_capacity() {
    let primary_hits = Arc::new(AtomicUsize::new(0));
    let bank_hits = Arc::new(AtomicUsize::new(0));

    let hits = Arc::clone(&primary_hits);
    host::on_callback(move |_| {
        hits.fetch_add(1, Ordering::SeqCst);
    });

    for _ in 0..SINK_BANK_CAPACITY {
        let hits = Arc::clone(&bank_hits);
        host::add_callback_sink(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
        .expect("bank has room");
    }

    let overflow = host::add_callback_sink(|_| {});
    match overflow {
        Err(HostError::SinkBankFull { capacity }) => assert_eq!(capacity, SINK_BANK_CAPACITY),
        other => panic!("expected SinkBankFull, got {other:?}"),
    }

    // One event reaches the primary sink once and every bank sink once.
    let mut event = Envelope::new("bar1", "onAdd", vec![json!({"name": "gin"})]);
    event.callback_id = Some("cb-1".into());
    CallbackBridge::global().emit(event);
    host::drain_callbacks();

    assert_eq!(primary_hits.load(Ordering::SeqCst), 1);
    assert_eq!(bank_hits.load(Ordering::SeqCst), SINK_BANK_CAPACITY);
}
