//! Roster lifecycle: welcome snapshots, arrival and departure broadcasts,
//! registry consistency under concurrent joins.

use serde_json::json;

use crate::infra::{join, join_url, start_hub};

#[tokio::test]
async fn two_peer_roundtrip_roster() {
    let hub = start_hub().await.unwrap();

    let (mut alice, registered_a) = join(&hub, "Alice").await.unwrap();
    assert_eq!(alice.name, "Alice");
    assert_eq!(registered_a["yourName"], "Alice");
    assert_eq!(registered_a["peers"], json!([]));

    let (bob, registered_b) = join(&hub, "Bob").await.unwrap();
    assert_eq!(registered_b["yourName"], "Bob");
    assert_eq!(
        registered_b["peers"],
        json!([{"id": alice.id, "name": "Alice"}])
    );

    // Alice hears about Bob exactly once
    let arrival = alice.recv().await.unwrap();
    assert_eq!(arrival["type"], "new-peer");
    assert_eq!(arrival["peer"]["id"], bob.id.as_str());
    assert_eq!(arrival["peer"]["name"], "Bob");
    alice.expect_silence().await.unwrap();
}

#[tokio::test]
async fn departure_broadcast_and_fresh_roster() {
    let hub = start_hub().await.unwrap();

    let (mut alice, _) = join(&hub, "Alice").await.unwrap();
    let (bob, _) = join(&hub, "Bob").await.unwrap();
    let bob_id = bob.id.clone();
    let _ = alice.recv().await.unwrap(); // new-peer for Bob

    bob.close().await.unwrap();

    let gone = alice.recv().await.unwrap();
    assert_eq!(gone["type"], "peer-disconnected");
    assert_eq!(gone["peerId"], bob_id.as_str());
    alice.expect_silence().await.unwrap();

    // A fresh roster no longer contains Bob
    alice.send(json!({"type": "get-peers"})).await.unwrap();
    let roster = alice.recv().await.unwrap();
    assert_eq!(roster["type"], "peer-list");
    assert_eq!(roster["peers"], json!([]));
}

#[tokio::test]
async fn registry_tracks_active_sessions() {
    let hub = start_hub().await.unwrap();

    let (alice, _) = join(&hub, "Alice").await.unwrap();
    let (bob, _) = join(&hub, "Bob").await.unwrap();
    let (carol, _) = join(&hub, "Carol").await.unwrap();
    hub.wait_for_peer_count(3).await.unwrap();

    bob.close().await.unwrap();
    hub.wait_for_peer_count(2).await.unwrap();

    drop(alice);
    drop(carol);
    hub.wait_for_peer_count(0).await.unwrap();
}

#[tokio::test]
async fn exactly_one_arrival_then_one_departure() {
    let hub = start_hub().await.unwrap();

    let (mut watcher, _) = join(&hub, "Watcher").await.unwrap();
    let (transient, _) = join(&hub, "Transient").await.unwrap();
    let transient_id = transient.id.clone();
    transient.close().await.unwrap();

    let first = watcher.recv().await.unwrap();
    assert_eq!(first["type"], "new-peer");
    assert_eq!(first["peer"]["id"], transient_id.as_str());

    let second = watcher.recv().await.unwrap();
    assert_eq!(second["type"], "peer-disconnected");
    assert_eq!(second["peerId"], transient_id.as_str());

    watcher.expect_silence().await.unwrap();
}

#[tokio::test]
async fn concurrent_joins_assign_unique_ids() {
    let hub = start_hub().await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..32 {
        let url = hub.ws_url(&format!("peer{i}"));
        tasks.push(tokio::spawn(async move { join_url(&url).await }));
    }

    let mut clients = Vec::new();
    for task in tasks {
        let (client, registered) = task.await.unwrap().unwrap();
        // Welcome snapshots are internally consistent: no duplicates, no
        // self entry
        let peers = registered["peers"].as_array().unwrap();
        let mut seen: Vec<&str> = peers.iter().map(|p| p["id"].as_str().unwrap()).collect();
        assert!(!seen.contains(&client.id.as_str()));
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), peers.len());
        clients.push(client);
    }

    let mut ids: Vec<String> = clients.iter().map(|c| c.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 32, "every session must get a unique id");

    hub.wait_for_peer_count(32).await.unwrap();
}

#[tokio::test]
async fn missing_name_falls_back_to_id_prefix() {
    let hub = start_hub().await.unwrap();

    let (client, registered) = join_url(&hub.ws_url_bare()).await.unwrap();
    assert_eq!(registered["yourName"], format!("peer-{}", &client.id[..4]));
}

#[tokio::test]
async fn long_names_are_truncated() {
    let hub = start_hub().await.unwrap();

    let long = "x".repeat(100);
    let (_client, registered) = join(&hub, &long).await.unwrap();
    assert_eq!(
        registered["yourName"].as_str().unwrap(),
        "x".repeat(32),
        "names are bounded at the configured maximum"
    );
}
