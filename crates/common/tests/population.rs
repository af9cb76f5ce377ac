//! Population broadcasts and message relay through the lobby

mod common;

use ::common::events::OutboundEvent;

use crate::common::{names, setup_lobby, TestClient};

#[tokio::test(start_paused = true)]
async fn test_user_list_follows_join_order() {
    let lobby = setup_lobby();
    let a = TestClient::join(&lobby, "alice").await;
    let b = TestClient::join(&lobby, "bob").await;
    let c = TestClient::join(&lobby, "carol").await;

    assert_eq!(
        a.user_lists(),
        vec![
            names(&["alice"]),
            names(&["alice", "bob"]),
            names(&["alice", "bob", "carol"]),
        ]
    );
    assert_eq!(
        b.user_lists(),
        vec![names(&["alice", "bob"]), names(&["alice", "bob", "carol"])]
    );
    assert_eq!(c.user_lists(), vec![names(&["alice", "bob", "carol"])]);

    lobby.disconnect(b.id);
    let d = TestClient::join(&lobby, "dave").await;

    let expected = vec![names(&["alice", "carol"]), names(&["alice", "carol", "dave"])];
    assert_eq!(a.user_lists(), expected);
    assert_eq!(c.user_lists(), expected);
    assert_eq!(d.user_lists(), vec![names(&["alice", "carol", "dave"])]);
}

#[tokio::test(start_paused = true)]
async fn test_user_list_never_contains_private_material() {
    let lobby = setup_lobby();
    let a = TestClient::join(&lobby, "alice").await;
    let private_key = lobby.sessions().get(a.id).unwrap().key_pair.private_key();

    for event in a.drain() {
        let json = serde_json::to_value(&event).unwrap();
        if let OutboundEvent::UserListUpdate(_) = event {
            for user in json["data"].as_array().unwrap() {
                let mut keys: Vec<_> = user.as_object().unwrap().keys().cloned().collect();
                keys.sort();
                assert_eq!(keys, vec!["publicKey", "username"]);
                assert_ne!(user["publicKey"].as_u64(), Some(private_key));
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_relay_reaches_everyone_but_sender() {
    let lobby = setup_lobby();
    let a = TestClient::join(&lobby, "alice").await;
    let b = TestClient::join(&lobby, "bob").await;
    let c = TestClient::join(&lobby, "carol").await;
    let lurker = TestClient::connect(&lobby);
    for client in [&a, &b, &c, &lurker] {
        client.drain();
    }

    assert_eq!(lobby.send_message(a.id, "hi"), 2);

    let messages = |client: &TestClient| -> Vec<(String, String)> {
        client
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                OutboundEvent::MessageReceived(m) => Some((m.from, m.content)),
                _ => None,
            })
            .collect()
    };
    let expected = vec![("alice".to_string(), "hi".to_string())];
    assert!(messages(&a).is_empty());
    assert_eq!(messages(&b), expected);
    assert_eq!(messages(&c), expected);
    assert!(messages(&lurker).is_empty());

    // unauthenticated senders are ignored
    assert_eq!(lobby.send_message(lurker.id, "boo"), 0);
    assert!(messages(&a).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_live_count_tracks_sessions() {
    let lobby = setup_lobby();
    assert_eq!(lobby.live_count(), 0);

    let a = TestClient::join(&lobby, "alice").await;
    let _pending = TestClient::connect(&lobby);
    assert_eq!(lobby.live_count(), 1);

    lobby.disconnect(a.id);
    lobby.disconnect(a.id);
    assert_eq!(lobby.live_count(), 0);
}
