//! Then steps for conversation handoff BDD scenarios.

use super::world::{HandoffWorld, agent, customer};
use switchboard::handoff::{
    adapters::memory::drain_pending,
    domain::TranscriptSource,
    services::RouteOutcome,
};
use rstest_bdd_macros::then;

#[then(r#"the transcript for customer "{customer_name}" has {count:usize} line"#)]
fn transcript_has_lines(
    world: &HandoffWorld,
    customer_name: String,
    count: usize,
) -> Result<(), eyre::Report> {
    let conversation = world.conversation(&customer_name)?;
    let actual = conversation.transcript().len();
    if actual != count {
        return Err(eyre::eyre!("expected {count} transcript lines, found {actual}"));
    }
    Ok(())
}

#[then(r#"the last transcript line for customer "{customer_name}" reads "{text}" from customer "{sender_name}""#)]
fn last_transcript_line(
    world: &HandoffWorld,
    customer_name: String,
    text: String,
    sender_name: String,
) -> Result<(), eyre::Report> {
    let conversation = world.conversation(&customer_name)?;
    let line = conversation
        .transcript()
        .last()
        .ok_or_else(|| eyre::eyre!("transcript is empty"))?;
    if line.text() != text {
        return Err(eyre::eyre!("expected text {text:?}, found {:?}", line.text()));
    }
    let expected_source = TranscriptSource::Customer(customer(&sender_name));
    if line.from() != &expected_source {
        return Err(eyre::eyre!("expected sender {expected_source:?}, found {:?}", line.from()));
    }
    Ok(())
}

#[then(r#"the conversation for customer "{customer_name}" is in state "{state}""#)]
fn conversation_in_state(
    world: &HandoffWorld,
    customer_name: String,
    state: String,
) -> Result<(), eyre::Report> {
    let conversation = world.conversation(&customer_name)?;
    if conversation.state().as_str() != state {
        return Err(eyre::eyre!(
            "expected state {state}, found {}",
            conversation.state()
        ));
    }
    Ok(())
}

#[then(r#"customer "{customer_name}" is connected to agent "{agent_name}""#)]
fn customer_connected_to(
    world: &HandoffWorld,
    customer_name: String,
    agent_name: String,
) -> Result<(), eyre::Report> {
    let conversation = world.conversation(&customer_name)?;
    let expected = agent(&agent_name);
    if conversation.connected_agent() != Some(&expected) {
        return Err(eyre::eyre!(
            "expected connected agent {expected}, found {:?}",
            conversation.connected_agent()
        ));
    }
    Ok(())
}

#[then(r#"the watchers of customer "{customer_name}" are "{agent_names}""#)]
fn watchers_are(
    world: &HandoffWorld,
    customer_name: String,
    agent_names: String,
) -> Result<(), eyre::Report> {
    let conversation = world.conversation(&customer_name)?;
    let expected: Vec<_> = agent_names
        .split(',')
        .map(|name| agent(name.trim()))
        .collect();
    let actual: Vec<_> = conversation.watching_agents().iter().cloned().collect();
    if actual != expected {
        return Err(eyre::eyre!("expected watchers {expected:?}, found {actual:?}"));
    }
    Ok(())
}

#[then(r#"the connect handler ran once for customer "{customer_name}" and agent "{agent_name}""#)]
fn connect_handler_ran_once(
    world: &HandoffWorld,
    customer_name: String,
    agent_name: String,
) -> Result<(), eyre::Report> {
    let entries = world
        .connects
        .lock()
        .map_err(|err| eyre::eyre!("connect log poisoned: {err}"))?;
    let expected = vec![(customer(&customer_name), agent(&agent_name))];
    if *entries != expected {
        return Err(eyre::eyre!("expected connect calls {expected:?}, found {:?}", *entries));
    }
    Ok(())
}

#[then(r#"the command is rejected with "{kind}""#)]
fn command_rejected_with(world: &HandoffWorld, kind: String) -> Result<(), eyre::Report> {
    match world.last_outcome.as_ref() {
        Some(RouteOutcome::Rejected(event)) if event.kind.as_str() == kind => Ok(()),
        other => Err(eyre::eyre!("expected rejection {kind}, got {other:?}")),
    }
}

#[then(r#"the error is reported to agent "{agent_name}""#)]
fn error_reported_to(world: &HandoffWorld, agent_name: String) -> Result<(), eyre::Report> {
    let expected = agent(&agent_name);
    match world.last_outcome.as_ref() {
        Some(RouteOutcome::Rejected(event)) if event.recipient == expected => Ok(()),
        other => Err(eyre::eyre!("expected error for {expected}, got {other:?}")),
    }
}

#[then("the bot received {count:usize} message")]
fn bot_received(world: &mut HandoffWorld, count: usize) -> Result<(), eyre::Report> {
    let forwarded = drain_pending(&mut world.bot_inbox);
    if forwarded.len() != count {
        return Err(eyre::eyre!(
            "expected {count} bot messages, found {}",
            forwarded.len()
        ));
    }
    Ok(())
}
