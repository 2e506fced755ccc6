//! Concurrent store access: same-customer serialisation and cross-key
//! connect races.

use std::collections::HashSet;

use rstest::rstest;
use switchboard::handoff::{
    adapters::memory::InMemoryConversationStore,
    domain::{ConversationState, HandoffErrorKind},
    ports::ConversationStore,
};
use tokio::task::JoinSet;

use super::harness::{TestResult, agent, customer, store};

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_one_concurrent_queue_wins(store: InMemoryConversationStore) -> TestResult {
    let alice = customer("alice");
    let mut tasks = JoinSet::new();
    for _ in 0..32 {
        let shared = store.clone();
        let address = alice.clone();
        tasks.spawn(async move { shared.queue(&address).await });
    }

    let mut accepted = 0;
    let mut already_queued = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(_) => accepted += 1,
            Err(err) => {
                let kind = err.as_rejection().map(|rejection| rejection.kind());
                assert_eq!(kind, Some(HandoffErrorKind::CustomerAlreadyQueued));
                already_queued += 1;
            }
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(already_queued, 31);
    let conversation = store.get_or_create(&alice).await?;
    assert_eq!(conversation.state(), ConversationState::Wait);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_one_agent_connects_to_a_customer(store: InMemoryConversationStore) -> TestResult {
    let alice = customer("alice");
    let mut tasks = JoinSet::new();
    for index in 0..16 {
        let shared = store.clone();
        let address = alice.clone();
        let agent_address = agent(&format!("a{index}"));
        tasks.spawn(async move { shared.connect(&address, &agent_address).await });
    }

    let mut winners = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        if let Ok(conversation) = joined? {
            winners.push(conversation);
        }
    }

    assert_eq!(winners.len(), 1);
    let conversation = store.get_or_create(&alice).await?;
    assert_eq!(conversation.watching_agents().len(), 1);
    assert_eq!(
        conversation.connected_agent(),
        winners.first().and_then(|winner| winner.connected_agent())
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposite_direction_connects_do_not_deadlock(
    store: InMemoryConversationStore,
) -> TestResult {
    let (x, y) = (customer("x"), customer("y"));
    let (a, b) = (agent("a"), agent("b"));
    let customers = [x.clone(), y.clone()];
    let pairs = [(x.clone(), a.clone()), (y.clone(), b.clone()), (x, b), (y, a)];

    for release in [true, false].into_iter().cycle().take(50) {
        let mut tasks = JoinSet::new();
        for (customer_address, agent_address) in pairs.clone() {
            let shared = store.clone();
            tasks.spawn(async move {
                let connected = shared.connect(&customer_address, &agent_address).await;
                if connected.is_ok() && release {
                    shared
                        .disconnect(&customer_address, Some(&agent_address))
                        .await
                        .map(|_| ())
                } else {
                    Ok(())
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined??;
        }

        let mut connected = HashSet::new();
        for conversation in store.list_all().await? {
            if let Some(agent_address) = conversation.connected_agent() {
                assert!(
                    connected.insert(agent_address.clone()),
                    "agent {agent_address} connected to two customers"
                );
                assert_eq!(conversation.state(), ConversationState::Agent);
            }
        }

        for customer_address in &customers {
            let conversation = store.get_or_create(customer_address).await?;
            if conversation.state() == ConversationState::Agent {
                store.disconnect(customer_address, None).await?;
            }
        }
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_customers_progress_independently(
    store: InMemoryConversationStore,
) -> TestResult {
    let mut tasks = JoinSet::new();
    for index in 0..64 {
        let shared = store.clone();
        tasks.spawn(async move {
            let address = customer(&format!("c{index}"));
            shared.queue(&address).await?;
            shared.watch(&address, &agent("observer")).await?;
            shared.dequeue(&address).await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let conversation = joined??;
        assert_eq!(conversation.state(), ConversationState::Watch);
    }
    assert_eq!(store.len()?, 64);
    Ok(())
}
