//! End-to-end routing through wire activities and channel adapters.

use std::sync::{Arc, Mutex};

use rstest::rstest;
use switchboard::handoff::{
    config::HandoffConfig,
    domain::{CommandKind, ConversationState, HandoffErrorKind, OutboundMessage, TranscriptLine},
    services::{RouteOutcome, SuccessHandlers},
};

use super::harness::{RouterHarness, TestResult, agent, command_activity, customer, harness};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn full_handoff_round_trip(mut harness: RouterHarness) -> TestResult {
    let alice = customer("alice");
    let smith = agent("smith");

    harness.say(&alice, "hi bot").await;
    assert_eq!(harness.forwarded_to_bot().len(), 1);

    harness
        .receive(&alice, command_activity(CommandKind::Queue.wire_name(), &alice, None))
        .await;
    harness.say(&alice, "is anyone there?").await;
    assert!(harness.forwarded_to_bot().is_empty());

    let connected = harness
        .receive(
            &smith,
            command_activity(CommandKind::Connect.wire_name(), &alice, Some(&smith)),
        )
        .await;
    let conversation = connected
        .conversation()
        .ok_or_else(|| eyre::eyre!("connect produced no conversation: {connected:?}"))?;
    assert_eq!(conversation.state(), ConversationState::Agent);

    harness.say(&alice, "thanks").await;
    harness.say(&smith, "you're welcome").await;
    harness
        .receive(
            &smith,
            command_activity(CommandKind::Disconnect.wire_name(), &alice, Some(&smith)),
        )
        .await;
    harness.say(&alice, "bye bot").await;

    assert_eq!(harness.forwarded_to_bot().len(), 1);
    let delivered: Vec<(String, Option<String>)> = harness
        .delivered()
        .into_iter()
        .map(|message| {
            (
                message.recipient().user().to_owned(),
                message.text().map(str::to_owned),
            )
        })
        .collect();
    assert_eq!(
        delivered,
        vec![
            (
                "alice".to_owned(),
                Some("you're all set to talk to an agent. One will be with you as soon as they become available".to_owned())
            ),
            (
                "alice".to_owned(),
                Some("please hold on while we connect you to an agent".to_owned())
            ),
            ("alice".to_owned(), Some("you're now connected to an agent".to_owned())),
            ("agent-smith".to_owned(), Some("thanks".to_owned())),
            ("alice".to_owned(), Some("you're welcome".to_owned())),
            ("alice".to_owned(), Some("you're no longer connected to the agent".to_owned())),
        ]
    );

    let stored = harness
        .router
        .find_by_customer(&alice)
        .await?
        .ok_or_else(|| eyre::eyre!("conversation missing"))?;
    assert_eq!(stored.state(), ConversationState::Bot);
    assert_eq!(stored.transcript().len(), 5);
    Ok(())
}

#[rstest]
#[case::bot_owned(false)]
#[case::agent_owned(true)]
#[tokio::test(flavor = "multi_thread")]
async fn watcher_messages_stay_in_the_transcript(
    mut harness: RouterHarness,
    #[case] owner_connected: bool,
) -> TestResult {
    let alice = customer("alice");
    let smith = agent("smith");
    let jones = agent("jones");
    if owner_connected {
        harness
            .receive(
                &smith,
                command_activity(CommandKind::Connect.wire_name(), &alice, Some(&smith)),
            )
            .await;
    }
    harness
        .receive(
            &jones,
            command_activity(CommandKind::Watch.wire_name(), &alice, Some(&jones)),
        )
        .await;
    harness.delivered();

    let outcome = harness.say(&jones, "just watching").await;

    let RouteOutcome::Observed(conversation) = outcome else {
        return Err(eyre::eyre!("expected watcher message to be observed, got {outcome:?}"));
    };
    assert_eq!(
        conversation.transcript().last().map(TranscriptLine::text),
        Some("just watching")
    );
    assert!(harness.delivered().is_empty());
    assert!(harness.forwarded_to_bot().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connected_agent_messages_reach_the_customer(mut harness: RouterHarness) -> TestResult {
    let alice = customer("alice");
    let smith = agent("smith");
    let jones = agent("jones");
    harness
        .receive(
            &jones,
            command_activity(CommandKind::Watch.wire_name(), &alice, Some(&jones)),
        )
        .await;
    harness
        .receive(
            &smith,
            command_activity(CommandKind::Connect.wire_name(), &alice, Some(&smith)),
        )
        .await;
    harness.delivered();

    let outcome = harness.say(&smith, "how can I help?").await;

    assert!(matches!(outcome, RouteOutcome::MirroredToCustomer(_)));
    assert_eq!(
        harness.delivered(),
        vec![OutboundMessage::mirror(alice, smith, "how can I help?")]
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connect_callbacks_see_both_parties() -> TestResult {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handlers = SuccessHandlers::new().on(CommandKind::Connect, move |handle, command| {
        if let Ok(mut calls) = sink.lock() {
            calls.push((
                handle.conversation().customer_address().clone(),
                command.agent_address().cloned(),
            ));
        }
    });
    let harness = RouterHarness::new(HandoffConfig::default(), handlers);
    let alice = customer("alice");
    let smith = agent("smith");

    harness
        .receive(
            &smith,
            command_activity(CommandKind::Connect.wire_name(), &alice, Some(&smith)),
        )
        .await;
    harness
        .receive(
            &agent("jones"),
            command_activity(CommandKind::Connect.wire_name(), &alice, Some(&agent("jones"))),
        )
        .await;

    let calls = seen
        .lock()
        .map_err(|err| eyre::eyre!("callback log poisoned: {err}"))?
        .clone();
    assert_eq!(calls, vec![(alice, Some(smith))]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn strict_configuration_rejects_repeat_watch(mut harness: RouterHarness) -> TestResult {
    let strict = RouterHarness::new(HandoffConfig::strict(), SuccessHandlers::new());
    let alice = customer("alice");
    let jones = agent("jones");
    let watch = command_activity(CommandKind::Watch.wire_name(), &alice, Some(&jones));

    strict.receive(&jones, watch.clone()).await;
    let repeat = strict.receive(&jones, watch.clone()).await;
    let RouteOutcome::Rejected(event) = repeat else {
        return Err(eyre::eyre!("expected rejection, got {repeat:?}"));
    };
    assert_eq!(event.kind, HandoffErrorKind::ConversationStateUnchanged);
    assert_eq!(event.recipient, jones);

    harness.receive(&jones, watch.clone()).await;
    let lenient = harness.receive(&jones, watch).await;
    assert!(matches!(lenient, RouteOutcome::Applied { .. }));
    assert!(
        harness
            .delivered()
            .iter()
            .all(|message| !matches!(message, OutboundMessage::Error(_)))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn error_events_serialise_for_the_transport(mut harness: RouterHarness) -> TestResult {
    let alice = customer("alice");
    harness
        .receive(&alice, command_activity(CommandKind::Dequeue.wire_name(), &alice, None))
        .await;

    let delivered = harness.delivered();
    let event = delivered
        .first()
        .ok_or_else(|| eyre::eyre!("no error event delivered"))?;
    let json = serde_json::to_value(event)?;

    let field = |pointer: &str| json.pointer(pointer).and_then(serde_json::Value::as_str);
    assert_eq!(field("/type"), Some("error"));
    assert_eq!(field("/kind"), Some("customer_not_queued"));
    assert_eq!(field("/recipient/user"), Some("alice"));
    assert_eq!(field("/command/kind"), Some("dequeue"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_all_reports_every_customer(harness: RouterHarness) -> TestResult {
    harness.say(&customer("alice"), "hello").await;
    harness.say(&customer("bob"), "hello").await;

    let mut customers: Vec<String> = harness
        .router
        .list_all()
        .await?
        .iter()
        .map(|conversation| conversation.customer_address().user().to_owned())
        .collect();
    customers.sort();

    assert_eq!(customers, vec!["alice".to_owned(), "bob".to_owned()]);
    assert_eq!(harness.store.len()?, 2);
    Ok(())
}
