//! Joins and leaves from many tasks at once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use hub_services::{QuitReason, Router, User};

use crate::*;

/// Holds every broadcast open for a while, so other tasks pile up behind
/// the registry lock.
#[derive(Default)]
struct SlowBroadcastRouter {
    inbox: InboxRouter,
    broadcasting: AtomicBool,
}

impl Router for SlowBroadcastRouter {
    fn route_to_user(&self, target: &User, payload: Bytes) -> bool {
        self.inbox.route_to_user(target, payload)
    }

    fn route_to_all(&self, recipients: &[Arc<User>], payload: Bytes) {
        self.broadcasting.store(true, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(200));
        self.inbox.route_to_all(recipients, payload);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_joins_get_distinct_sids_and_exact_totals() -> Result<()> {
    let router = Arc::new(InboxRouter::default());
    let (_net, hub) = start_hub(router);
    let hub = Arc::new(hub);

    let mut tasks = Vec::new();
    for i in 0..32u64 {
        let hub = hub.clone();
        tasks.push(tokio::spawn(async move {
            login(&hub, &format!("user{i}"), i * 1024).await
        }));
    }
    let mut users = Vec::new();
    for task in tasks {
        users.push(task.await?);
    }

    let sids: HashSet<_> = users.iter().map(|u| u.sid()).collect();
    assert_eq!(sids.len(), 32);

    let expected_size: u64 = (0..32u64).map(|i| i * 1024).sum();
    let totals = hub.registry().totals().await;
    assert_eq!(totals.count, 32);
    assert_eq!(totals.count_peak, 32);
    assert_eq!(totals.shared_size, expected_size);

    let mut tasks = Vec::new();
    for user in users.iter().filter(|u| u.sid().get() % 2 == 0).cloned() {
        let hub = hub.clone();
        tasks.push(tokio::spawn(async move {
            user.set_quit_reason(QuitReason::Normal);
            hub.leave(&user).await
        }));
    }
    for task in tasks {
        assert!(task.await?);
    }

    let remaining: u64 = users
        .iter()
        .filter(|u| u.sid().get() % 2 == 1)
        .map(|u| u.limits().shared_size)
        .sum();
    let totals = hub.registry().totals().await;
    assert_eq!(totals.count, 16);
    assert_eq!(totals.count_peak, 32);
    assert_eq!(totals.shared_size, remaining);

    let hub = Arc::try_unwrap(hub).map_err(|_| anyhow::anyhow!("hub still shared"))?;
    hub.shutdown(|_| {}).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn user_list_during_leave_never_lists_the_leaver() -> Result<()> {
    let router = Arc::new(SlowBroadcastRouter::default());
    let (_net, hub) = start_hub(router.clone());
    let hub = Arc::new(hub);

    let alice = login(&hub, "alice", 0).await;
    let mallory = login(&hub, "mallory", 0).await;
    let newcomer = login(&hub, "newcomer", 0).await;
    mallory.set_quit_reason(QuitReason::Kicked);

    let leaving = {
        let hub = hub.clone();
        let mallory = mallory.clone();
        tokio::spawn(async move { hub.leave(&mallory).await })
    };
    while !router.broadcasting.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    let delivered = hub.dispatcher().send_session_list(&newcomer).await?;
    assert!(leaving.await?);

    let quit = Bytes::from(format!("IQUI {} DI1\n", mallory.sid()));
    assert_eq!(delivered, 2);
    assert_eq!(
        router.inbox.inbox(newcomer.sid()),
        vec![quit.clone(), alice.info().clone(), newcomer.info().clone()]
    );
    assert_eq!(router.inbox.inbox(alice.sid()), vec![quit]);
    assert!(router.inbox.inbox(mallory.sid()).is_empty());

    let hub = Arc::try_unwrap(hub).map_err(|_| anyhow::anyhow!("hub still shared"))?;
    hub.shutdown(|_| {}).await;
    Ok(())
}
