//! Pieces declared with the attribute macros.

#![cfg(feature = "macros")]

use piecework::{
    BoxError, ChannelScope, Command, CommandPiece, EventKind, Guard, GuardResult, Message,
    Response, Runtime, RuntimeEvent,
    testing::{EchoCommand, message},
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

mod common;
use common::{send, started};

#[piecework::command(
    aliases = ["p"],
    description = "Replies with pong",
    cooldown = 1500,
    bucket = 2,
    run_in = ["guild", "dm"],
)]
async fn ping(message: Arc<Message>, _params: Vec<String>) -> Result<&'static str, BoxError> {
    message.send("pong").await?;
    Ok("pong")
}

#[piecework::command(name = "say", subcommands = true, permission_level = 3)]
async fn say_loud(_message: Arc<Message>, params: Vec<String>) -> Result<String, BoxError> {
    Ok(params.join(" ").to_uppercase())
}

#[piecework::guard(spam_protection = true)]
async fn no_shouting(message: Arc<Message>, _command: Arc<CommandPiece>) -> Result<Option<String>, BoxError> {
    Ok(message
        .content
        .chars()
        .filter(char::is_ascii_alphabetic)
        .all(|c| c.is_ascii_uppercase())
        .then(|| "Please do not shout.".to_string()))
}

static READY_CALLS: AtomicUsize = AtomicUsize::new(0);

#[piecework::event(once = true)]
async fn ready(_event: RuntimeEvent) -> Result<(), BoxError> {
    READY_CALLS.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

static SUCCESSES: AtomicUsize = AtomicUsize::new(0);

#[piecework::event(name = "count_successes", event = "commandSuccess")]
async fn count_successes(event: RuntimeEvent) -> Result<(), BoxError> {
    if let RuntimeEvent::CommandSuccess { .. } = event {
        SUCCESSES.fetch_add(1, Ordering::SeqCst);
    }
    Ok(())
}

#[test]
fn test_command_options_from_attribute() {
    let options = ping::options();
    assert_eq!(ping::NAME, "ping");
    assert_eq!(options.aliases, ["p"]);
    assert_eq!(options.description, "Replies with pong");
    assert_eq!(options.cooldown_ms, 1500);
    assert_eq!(options.bucket, 2);
    assert_eq!(options.run_in, [ChannelScope::Guild, ChannelScope::Direct]);

    let say = say_loud::piece();
    assert_eq!(say.name(), "say");
    assert!(say.options().subcommands);
    assert_eq!(say.options().permission_level, 3);
}

#[tokio::test]
async fn test_command_macro_runs() {
    let response = Command::run(&say_loud, message("!say"), vec!["hi".into(), "there".into()])
        .await
        .unwrap();
    assert_eq!(response, Response::Text("HI THERE".into()));
}

#[tokio::test]
async fn test_guard_macro_converts_result() {
    let command = Arc::new(CommandPiece::new("echo", EchoCommand));
    assert!(no_shouting::piece().options().spam_protection);
    assert_eq!(
        Guard::run(&no_shouting, message("!ECHO HI"), command.clone())
            .await
            .unwrap(),
        GuardResult::Reason("Please do not shout.".into())
    );
    assert_eq!(
        Guard::run(&no_shouting, message("!echo hi"), command)
            .await
            .unwrap(),
        GuardResult::Pass
    );
}

#[tokio::test]
async fn test_macro_pieces_in_a_runtime() {
    let runtime = started(|runtime: &Runtime| {
        runtime.commands().register(ping::piece())?;
        runtime.events().register(ready::piece())?;
        runtime.events().register(count_successes::piece())?;
        Ok(())
    })
    .await;

    let channel = send(&runtime, "!p").await;
    assert_eq!(channel.sent(), ["pong"]);
    assert_eq!(SUCCESSES.load(Ordering::SeqCst), 1);

    let ready_listener = runtime.events().get("ready").unwrap();
    assert_eq!(ready_listener.listens_to(), Some(EventKind::Ready));
    assert_eq!(READY_CALLS.load(Ordering::SeqCst), 1);
    assert!(!ready_listener.is_enabled());
    runtime.emit(RuntimeEvent::Ready).await;
    assert_eq!(READY_CALLS.load(Ordering::SeqCst), 1);
}
