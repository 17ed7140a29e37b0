use std::sync::Arc;

use switchback::runtime_config::RuntimeConfig;
use switchback::stream::{self, StreamError};

#[test]
fn frames_arrive_in_send_order() {
    let (tx, rx) = stream::channel(8);
    let handle = stream::spawn_producer(&RuntimeConfig::default(), move || {
        for n in 0..5 {
            tx.send(format!("frame-{n}")).unwrap();
        }
    })
    .unwrap();

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv() {
        frames.push(frame);
    }
    handle.join().unwrap();
    assert_eq!(frames, ["frame-0", "frame-1", "frame-2", "frame-3", "frame-4"]);
}

#[test]
fn dropping_the_receiver_releases_producer_resources() {
    // Resource whose lifetime we can observe from outside the producer.
    let resource = Arc::new(());
    let observed = resource.clone();

    let (tx, rx) = stream::channel(1);
    let handle = stream::spawn_producer(&RuntimeConfig::default(), move || {
        let _held = resource;
        loop {
            if tx.send("tick").is_err() {
                return;
            }
        }
    })
    .unwrap();

    assert_eq!(rx.recv().as_deref(), Some("tick"));
    drop(rx);

    // Credit channel is gone: the blocked producer fails its next send and
    // unwinds, dropping everything it held.
    handle.join().unwrap();
    assert_eq!(Arc::strong_count(&observed), 1);
}

#[test]
fn explicit_cancellation_fails_pending_sends() {
    let (tx, _rx) = stream::channel(4);
    tx.cancel_token().cancel();
    assert_eq!(tx.send("late"), Err(StreamError::Cancelled));
}

#[test]
fn event_framing_terminates_each_frame() {
    let (tx, rx) = stream::channel(4);
    tx.send_event("hello").unwrap();
    tx.send_event("world").unwrap();
    drop(tx);
    assert_eq!(rx.collect(), "data: hello\n\ndata: world\n\n");
}
