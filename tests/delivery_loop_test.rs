mod common;

use std::sync::Arc;

use common::RecordingSink;
use lapin::acker::Acker;
use lapin::message::Delivery;
use lapin::types::ShortString;
use lapin::BasicProperties;
use mongodb::bson::oid::ObjectId;
use postbox::broker::process_deliveries;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;

fn make_delivery(tag: u64, payload: &str) -> Delivery {
    Delivery {
        delivery_tag: tag,
        exchange: ShortString::from("logs"),
        routing_key: ShortString::from("activity-logs"),
        redelivered: false,
        properties: BasicProperties::default(),
        data: payload.as_bytes().to_vec(),
        acker: Acker::default(),
    }
}

#[tokio::test]
async fn deliveries_are_processed_in_order_until_stream_close() {
    let sink = Arc::new(RecordingSink::new());
    let (tx, rx) = mpsc::channel(8);
    let (drained_tx, mut drained_rx) = watch::channel(false);

    let loop_task = tokio::spawn(process_deliveries(
        ReceiverStream::new(rx),
        sink.clone(),
        true,
        drained_tx,
    ));

    for i in 0..3u64 {
        let payload = format!(
            r#"{{"data":"entry-{}","action":"created","creator":"worker-7"}}"#,
            i
        );
        tx.send(Ok(make_delivery(i + 1, &payload))).await.unwrap();
    }
    drop(tx);

    drained_rx.wait_for(|drained| *drained).await.unwrap();
    loop_task.await.unwrap();

    let drafts = sink.drafts();
    assert_eq!(drafts.len(), 3);
    for (i, draft) in drafts.iter().enumerate() {
        assert_eq!(draft.data, format!("entry-{}", i));
        assert_eq!(draft.action, "created");
        assert_eq!(draft.creator, "worker-7");
    }
}

#[tokio::test]
async fn malformed_payload_is_logged_and_skipped() {
    let sink = Arc::new(RecordingSink::new());
    let (tx, rx) = mpsc::channel(8);
    let (drained_tx, mut drained_rx) = watch::channel(false);

    let loop_task = tokio::spawn(process_deliveries(
        ReceiverStream::new(rx),
        sink.clone(),
        true,
        drained_tx,
    ));

    tx.send(Ok(make_delivery(1, "not json at all")))
        .await
        .unwrap();
    tx.send(Ok(make_delivery(2, r#"{"data":"after the bad one"}"#)))
        .await
        .unwrap();
    drop(tx);

    drained_rx.wait_for(|drained| *drained).await.unwrap();
    loop_task.await.unwrap();

    let drafts = sink.drafts();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].data, "after the bad one");
}

#[tokio::test]
async fn sink_failure_does_not_halt_the_loop() {
    let sink = Arc::new(RecordingSink::new());
    sink.fail_next();

    let (tx, rx) = mpsc::channel(8);
    let (drained_tx, mut drained_rx) = watch::channel(false);

    let loop_task = tokio::spawn(process_deliveries(
        ReceiverStream::new(rx),
        sink.clone(),
        true,
        drained_tx,
    ));

    tx.send(Ok(make_delivery(1, r#"{"data":"dropped by the sink"}"#)))
        .await
        .unwrap();
    tx.send(Ok(make_delivery(2, r#"{"data":"stored"}"#)))
        .await
        .unwrap();
    drop(tx);

    drained_rx.wait_for(|drained| *drained).await.unwrap();
    loop_task.await.unwrap();

    let drafts = sink.drafts();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].data, "stored");
}

#[tokio::test]
async fn missing_payload_fields_take_zero_values() {
    let sink = Arc::new(RecordingSink::new());
    let (tx, rx) = mpsc::channel(8);
    let (drained_tx, mut drained_rx) = watch::channel(false);

    let loop_task = tokio::spawn(process_deliveries(
        ReceiverStream::new(rx),
        sink.clone(),
        true,
        drained_tx,
    ));

    tx.send(Ok(make_delivery(1, r#"{"data":"only data"}"#)))
        .await
        .unwrap();
    tx.send(Ok(make_delivery(
        2,
        r#"{"data":"full","domain_id":"507f1f77bcf86cd799439011","action":"created","creator":"w","extra":42}"#,
    )))
    .await
    .unwrap();
    drop(tx);

    drained_rx.wait_for(|drained| *drained).await.unwrap();
    loop_task.await.unwrap();

    let drafts = sink.drafts();
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0].domain, ObjectId::from_bytes([0; 12]));
    assert_eq!(drafts[0].action, "");
    assert_eq!(drafts[0].creator, "");
    assert_eq!(drafts[1].domain.to_hex(), "507f1f77bcf86cd799439011");
}

#[tokio::test]
async fn drain_flag_is_terminal_and_fires_once() {
    let sink = Arc::new(RecordingSink::new());
    let (tx, rx) = mpsc::channel(8);
    let (drained_tx, mut drained_rx) = watch::channel(false);

    let loop_task = tokio::spawn(process_deliveries(
        ReceiverStream::new(rx),
        sink.clone(),
        true,
        drained_tx,
    ));

    tx.send(Ok(make_delivery(1, r#"{"data":"first"}"#)))
        .await
        .unwrap();
    tx.send(Ok(make_delivery(2, r#"{"data":"second"}"#)))
        .await
        .unwrap();
    drop(tx);

    drained_rx.wait_for(|drained| *drained).await.unwrap();
    loop_task.await.unwrap();

    // Once closed the loop is gone: exactly the pre-close deliveries were
    // handled, and no further write to the drain flag can ever happen.
    assert_eq!(sink.len(), 2);
    assert!(*drained_rx.borrow());
    assert!(drained_rx.has_changed().is_err());
}
