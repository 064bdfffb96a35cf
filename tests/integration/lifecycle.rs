//! A hub's life from the first join to shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use hub_core::Sid;
use hub_services::{Credentials, HubError, QuitReason, UserState, FLAG_USER_LIST};

use crate::*;

#[tokio::test]
async fn newcomer_receives_everyone_in_join_order() -> Result<()> {
    let router = Arc::new(InboxRouter::default());
    let (_net, hub) = start_hub(router.clone());

    let alice = login(&hub, "alice", 1 << 20).await;
    let bob = login(&hub, "bob", 2048).await;
    let carol = login(&hub, "carol", 0).await;

    let delivered = hub.dispatcher().send_session_list(&carol).await?;
    assert_eq!(delivered, 3);
    assert_eq!(
        router.inbox(carol.sid()),
        vec![alice.info().clone(), bob.info().clone(), carol.info().clone()]
    );
    assert!(!carol.has_flag(FLAG_USER_LIST));

    hub.shutdown(|_| {}).await;
    Ok(())
}

#[tokio::test]
async fn backpressured_newcomer_gets_partial_list() -> Result<()> {
    let router = Arc::new(InboxRouter::with_capacity(2));
    let (_net, hub) = start_hub(router.clone());

    for nick in ["a", "b", "c", "d"] {
        login(&hub, nick, 0).await;
    }
    let late = login(&hub, "late", 0).await;
    late.set_send_queue_size(2);

    let err = hub.dispatcher().send_session_list(&late).await.unwrap_err();
    assert!(matches!(err, HubError::DeliveryFailed { sid } if sid == late.sid()));
    assert_eq!(router.inbox(late.sid()).len(), 2);
    // still draining, so the list flag stays up
    assert!(late.has_flag(FLAG_USER_LIST));

    hub.shutdown(|_| {}).await;
    Ok(())
}

#[tokio::test]
async fn kicked_user_is_announced_with_disconnect_flag() -> Result<()> {
    let router = Arc::new(InboxRouter::default());
    let (_net, hub) = start_hub(router.clone());

    let alice = login(&hub, "alice", 100).await;
    let bob = login(&hub, "bob", 200).await;
    let mallory = login(&hub, "mallory", 300).await;

    mallory.set_quit_reason(QuitReason::Kicked);
    assert!(hub.leave(&mallory).await);

    let expected = Bytes::from(format!("IQUI {} DI1\n", mallory.sid()));
    assert_eq!(router.inbox(alice.sid()), vec![expected.clone()]);
    assert_eq!(router.inbox(bob.sid()), vec![expected]);
    assert_eq!(mallory.state(), UserState::Disconnected);

    assert!(hub.registry().find_by_nick("mallory").await.is_none());
    let snap = hub.snapshot().await;
    assert_eq!(snap.users, 2);
    assert_eq!(snap.peak_users, 3);
    assert_eq!(snap.shared_size, 300);

    alice.set_quit_reason(QuitReason::Normal);
    hub.leave(&alice).await;
    assert_eq!(
        router.inbox(bob.sid()).last().cloned(),
        Some(Bytes::from(format!("IQUI {}\n", alice.sid())))
    );

    hub.shutdown(|_| {}).await;
    Ok(())
}

#[tokio::test]
async fn shutdown_destroys_each_remaining_user_once_and_silently() -> Result<()> {
    let router = Arc::new(InboxRouter::default());
    let (_net, hub) = start_hub(router.clone());

    let users = vec![
        login(&hub, "a", 1).await,
        login(&hub, "b", 2).await,
        login(&hub, "c", 3).await,
    ];
    let registry = hub.registry().clone();

    let mut destroyed: Vec<Sid> = Vec::new();
    hub.shutdown(|u| {
        assert_eq!(u.credentials(), Credentials::None);
        destroyed.push(u.sid());
    })
    .await;

    let mut expected: Vec<Sid> = users.iter().map(|u| u.sid()).collect();
    expected.sort();
    destroyed.sort();
    assert_eq!(destroyed, expected);
    assert!(registry.sessions().await.is_empty());
    for u in &users {
        assert!(router.inbox(u.sid()).is_empty(), "no quit notices on shutdown");
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn traffic_is_sampled_until_shutdown() -> Result<()> {
    let router = Arc::new(InboxRouter::default());
    let (net, hub) = start_hub(router);
    let stats = hub.statistics();

    net.record_tx(5120);
    net.record_rx(1024);
    tokio::time::sleep(Duration::from_secs(6)).await;

    let snap = hub.snapshot().await;
    assert_eq!(snap.net.net_tx_rate, 1024);
    assert_eq!(snap.net.net_rx_rate, 204);
    assert_eq!(snap.net.net_rx_peak, 204);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snap = hub.snapshot().await;
    assert_eq!(snap.net.net_tx_rate, 0);
    assert_eq!(snap.net.net_tx_peak, 1024);

    hub.shutdown(|_| {}).await;
    net.record_rx(1 << 30);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(stats.snapshot().net_rx_total, 1024);
    Ok(())
}
