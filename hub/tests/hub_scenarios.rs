//! End-to-end hub scenarios driven through the public API.

use bytes::Bytes;
use serde_json::{json, Value};
use tickcast_hub::{Client, Event, Hub, HubConfig, Topic};

fn topic(name: &str) -> Topic {
    Topic::parse(name).expect("topic")
}

fn decode(frame: &Bytes) -> Value {
    serde_json::from_slice(frame).expect("json frame")
}

fn payloads(frames: &[Bytes]) -> Vec<Value> {
    frames.iter().map(|f| decode(f)["payload"].clone()).collect()
}

#[tokio::test]
async fn test_topic_routing_and_global_broadcast() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");

    let (a, mut rx_a) = hub.new_client(None);
    a.subscribe(topic("stocks"));
    let (b, mut rx_b) = hub.new_client(None);
    b.subscribe(topic("odds"));
    let (c, mut rx_c) = hub.new_client(None);
    hub.register(a).expect("register a");
    hub.register(b).expect("register b");
    hub.register(c).expect("register c");

    let tick = Event::new("price_update", json!({"symbol": "AAPL"}));
    hub.broadcast_to_topic(&topic("stocks"), &tick)
        .await
        .expect("topic broadcast");

    let notice = Event::new("notification", json!({"title": "maintenance"}));
    hub.broadcast(&notice).await.expect("global broadcast");
    hub.client_count().await.expect("settle");

    let a_frames = rx_a.drain();
    assert_eq!(a_frames.len(), 2);
    assert_eq!(decode(&a_frames[0])["type"], "price_update");
    assert_eq!(decode(&a_frames[1])["type"], "notification");

    let b_frames = rx_b.drain();
    assert_eq!(b_frames.len(), 1);
    assert_eq!(decode(&b_frames[0])["type"], "notification");

    let c_frames = rx_c.drain();
    assert_eq!(c_frames.len(), 1);
    assert_eq!(decode(&c_frames[0])["type"], "notification");
}

#[tokio::test]
async fn test_wire_frame_shape() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");
    let (client, mut rx) = hub.new_client(None);
    hub.register(client).expect("register");

    hub.broadcast(&Event::new("alert", json!({"level": 3})))
        .await
        .expect("broadcast");
    hub.client_count().await.expect("settle");

    let frames = rx.drain();
    let value = decode(&frames[0]);
    let object = value.as_object().expect("object");
    assert_eq!(object.len(), 3);
    assert_eq!(value["type"], "alert");
    assert_eq!(value["payload"], json!({"level": 3}));

    let timestamp = value["timestamp"].as_str().expect("timestamp");
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_slow_consumer_evicted_without_affecting_others() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");

    let (slow, mut rx_slow) = Client::new(None, 2);
    let slow_id = slow.id().clone();
    let (fast, mut rx_fast) = Client::new(None, 2);
    hub.register(slow).expect("register slow");
    hub.register(fast).expect("register fast");

    let mut fast_seen = Vec::new();
    for i in 0..5 {
        hub.broadcast(&Event::new("tick", json!({"seq": i})))
            .await
            .expect("broadcast");
        hub.client_count().await.expect("settle");
        fast_seen.extend(rx_fast.drain());
    }

    assert_eq!(
        payloads(&fast_seen),
        (0..5).map(|i| json!({"seq": i})).collect::<Vec<_>>()
    );

    // The slow client got what fit, then its mailbox was closed.
    let slow_frames = rx_slow.drain();
    assert_eq!(payloads(&slow_frames), vec![json!({"seq": 0}), json!({"seq": 1})]);
    assert!(rx_slow.recv().await.is_none());
    assert_eq!(rx_slow.close_reason().code(), 1013);

    assert_eq!(hub.client_count().await.expect("count"), 1);
    assert_eq!(hub.metrics().clients_evicted(), 1);

    // Unregistering an already evicted client is harmless.
    hub.unregister(&slow_id);
    assert_eq!(hub.client_count().await.expect("count"), 1);
}

#[tokio::test]
async fn test_per_client_fifo_order() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");
    let (client, mut rx) = hub.new_client(None);
    client.subscribe(topic("matches"));
    hub.register(client).expect("register");

    for i in 0..20 {
        let event = Event::new("match_update", json!({"minute": i}));
        if i % 2 == 0 {
            hub.broadcast_to_topic(&topic("matches"), &event)
                .await
                .expect("topic broadcast");
        } else {
            hub.broadcast(&event).await.expect("global broadcast");
        }
    }
    hub.client_count().await.expect("settle");

    let minutes: Vec<i64> = rx
        .drain()
        .iter()
        .filter_map(|f| decode(f)["payload"]["minute"].as_i64())
        .collect();
    assert_eq!(minutes, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_no_retroactive_delivery() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");
    let (client, mut rx) = hub.new_client(None);
    let subscriptions = client.subscriptions();
    hub.register(client).expect("register");

    hub.broadcast_to_topic(&topic("alerts"), &Event::new("alert", json!({"n": 1})))
        .await
        .expect("broadcast");
    hub.client_count().await.expect("settle");

    subscriptions.subscribe(topic("alerts"));
    hub.broadcast_to_topic(&topic("alerts"), &Event::new("alert", json!({"n": 2})))
        .await
        .expect("broadcast");
    hub.client_count().await.expect("settle");

    assert_eq!(payloads(&rx.drain()), vec![json!({"n": 2})]);
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");
    let (client, mut rx) = hub.new_client(None);
    let subscriptions = client.subscriptions();
    subscriptions.subscribe(topic("odds"));
    hub.register(client).expect("register");

    hub.broadcast_to_topic(&topic("odds"), &Event::new("odds_update", json!({"n": 1})))
        .await
        .expect("broadcast");
    hub.client_count().await.expect("settle");

    subscriptions.unsubscribe("odds");
    hub.broadcast_to_topic(&topic("odds"), &Event::new("odds_update", json!({"n": 2})))
        .await
        .expect("broadcast");
    hub.client_count().await.expect("settle");

    assert_eq!(payloads(&rx.drain()), vec![json!({"n": 1})]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_see_one_order() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");

    let mut registrars = Vec::new();
    for _ in 0..5 {
        let hub = hub.clone();
        registrars.push(tokio::spawn(async move {
            let mut receivers = Vec::new();
            for _ in 0..20 {
                let (client, rx) = hub.new_client(None);
                hub.register(client).expect("register");
                receivers.push(rx);
            }
            receivers
        }));
    }

    let mut receivers = Vec::new();
    for registrar in registrars {
        receivers.extend(registrar.await.expect("join"));
    }
    assert_eq!(hub.client_count().await.expect("count"), 100);

    let mut producers = Vec::new();
    for producer in 0..5 {
        let hub = hub.clone();
        producers.push(tokio::spawn(async move {
            for seq in 0..10 {
                let event = Event::new("tick", json!({"producer": producer, "seq": seq}));
                hub.broadcast(&event).await.expect("broadcast");
            }
        }));
    }
    for producer in producers {
        producer.await.expect("join");
    }
    hub.client_count().await.expect("settle");

    let sequences: Vec<Vec<Value>> = receivers
        .iter_mut()
        .map(|rx| payloads(&rx.drain()))
        .collect();

    let first = &sequences[0];
    assert_eq!(first.len(), 50);
    assert!(sequences.iter().all(|seq| seq == first));

    // Each producer's own events arrive in the order it sent them.
    for producer in 0..5 {
        let seqs: Vec<i64> = first
            .iter()
            .filter(|p| p["producer"] == producer)
            .filter_map(|p| p["seq"].as_i64())
            .collect();
        assert_eq!(seqs, (0..10).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_registry_count_tracks_membership() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");

    let mut ids = Vec::new();
    let mut receivers = Vec::new();
    for _ in 0..10 {
        let (client, rx) = hub.new_client(None);
        ids.push(client.id().clone());
        receivers.push(rx);
        hub.register(client).expect("register");
    }
    assert_eq!(hub.client_count().await.expect("count"), 10);

    for id in ids.iter().take(4) {
        hub.unregister(id);
    }
    hub.unregister(&ids[0]);
    assert_eq!(hub.client_count().await.expect("count"), 6);

    let closed = receivers.iter().filter(|rx| rx.is_closed()).count();
    assert_eq!(closed, 4);

    let snapshot = hub.metrics().snapshot();
    assert_eq!(snapshot.clients_registered, 10);
    assert_eq!(snapshot.active_clients, 6);
}

#[tokio::test]
async fn test_shutdown_closes_every_mailbox() {
    let (hub, handle) = Hub::spawn(HubConfig::default()).expect("hub");

    let mut receivers = Vec::new();
    for _ in 0..3 {
        let (client, rx) = hub.new_client(None);
        hub.register(client).expect("register");
        receivers.push(rx);
    }
    hub.client_count().await.expect("settle");

    hub.shutdown().await;
    handle.await.expect("loop exits");

    for rx in &mut receivers {
        assert!(rx.recv().await.is_none());
        assert_eq!(rx.close_reason().code(), 1001);
    }
    assert!(hub.is_closed());
    assert!(hub.client_count().await.is_err());
}
