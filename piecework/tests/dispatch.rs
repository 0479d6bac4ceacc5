//! End-to-end dispatch through a started runtime.

use piecework::{
    BoxError, CommandOptions, CommandPiece, EventKind, Runtime, RuntimeEvent, Subcommands,
    testing::{EchoCommand, FailingCommand},
};

mod common;
use common::{CountingCommand, MENTION, command_error_text, record, send, started};

#[tokio::test]
async fn test_unknown_command_reports_text_and_prefix() {
    let runtime = started(|_: &Runtime| Ok(())).await;
    let events = record(&runtime, &[EventKind::CommandUnknown, EventKind::CommandRun]);

    send(&runtime, "!foo bar").await;

    let received = events.events();
    assert_eq!(received.len(), 1);
    match &received[0] {
        RuntimeEvent::CommandUnknown {
            command_text,
            prefix,
            prefix_length,
            ..
        } => {
            assert_eq!(command_text, "foo");
            assert_eq!(prefix.as_str(), "!");
            assert_eq!(*prefix_length, 1);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_failing_command_does_not_stop_later_messages() {
    let ping = CountingCommand::default();
    let registered = ping.clone();
    let runtime = started(move |runtime: &Runtime| {
        runtime
            .commands()
            .register(CommandPiece::new("explode", FailingCommand::new("boom")))?;
        runtime
            .commands()
            .register(CommandPiece::new("ping", registered.clone()))?;
        Ok(())
    })
    .await;
    let events = record(
        &runtime,
        &[EventKind::CommandError, EventKind::CommandSuccess],
    );

    send(&runtime, "!explode now").await;
    let channel = send(&runtime, "!ping a b").await;

    assert_eq!(
        events.kinds(),
        [EventKind::CommandError, EventKind::CommandSuccess]
    );
    assert_eq!(
        command_error_text(&events.events()[0]).as_deref(),
        Some("boom")
    );
    assert_eq!(ping.runs(), 1);
    assert_eq!(channel.sent(), ["a b"]);
}

#[tokio::test]
async fn test_explained_inhibition_is_replied() {
    let runtime = started(|runtime: &Runtime| {
        runtime.commands().register(
            CommandPiece::new("ban", EchoCommand).with_options(CommandOptions {
                permission_level: 10,
                run_in: vec![piecework::ChannelScope::Guild],
                ..CommandOptions::default()
            }),
        )?;
        Ok(())
    })
    .await;
    let events = record(&runtime, &[EventKind::CommandInhibited]);

    let channel = send(&runtime, "!ban someone").await;

    assert_eq!(
        channel.sent(),
        ["You do not have permission to use this command.\nThis command is only available in guild channels."]
    );
    match &events.events()[0] {
        RuntimeEvent::CommandInhibited { reasons, .. } => assert_eq!(reasons.as_ref().map(Vec::len), Some(2)),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_aliases_resolve_case_insensitively() {
    let ping = CountingCommand::default();
    let registered = ping.clone();
    let runtime = started(move |runtime: &Runtime| {
        runtime.commands().register(
            CommandPiece::new("ping", registered.clone()).with_options(CommandOptions {
                aliases: vec!["p".into()],
                ..CommandOptions::default()
            }),
        )?;
        Ok(())
    })
    .await;

    send(&runtime, "!P").await;
    send(&runtime, "!PING").await;

    assert_eq!(ping.runs(), 2);
}

#[tokio::test]
async fn test_subcommands_through_runtime() {
    let add = CountingCommand::default();
    let registered = add.clone();
    let runtime = started(move |runtime: &Runtime| {
        runtime.commands().register(
            CommandPiece::new("tag", Subcommands::new().with("add", registered.clone()))
                .with_options(CommandOptions {
                    subcommands: true,
                    ..CommandOptions::default()
                }),
        )?;
        Ok(())
    })
    .await;
    let events = record(&runtime, &[EventKind::CommandError]);

    send(&runtime, "!tag add hello world").await;
    send(&runtime, "!tag remove hello").await;

    assert_eq!(*add.params.lock().unwrap(), [vec!["hello", "world"]]);
    assert_eq!(
        command_error_text(&events.events()[0]).as_deref(),
        Some("no subcommand named `remove`")
    );
}

#[tokio::test]
async fn test_bare_mention_gets_prefix_reminder() {
    let runtime = started(|_: &Runtime| Ok(())).await;

    let channel = send(&runtime, MENTION).await;

    assert_eq!(channel.sent(), ["The prefix here is set to: `!`"]);
}

#[tokio::test]
async fn test_mention_prefix_invokes_commands() {
    let ping = CountingCommand::default();
    let registered = ping.clone();
    let runtime = started(move |runtime: &Runtime| {
        runtime
            .commands()
            .register(CommandPiece::new("ping", registered.clone()))?;
        Ok(())
    })
    .await;

    send(&runtime, &format!("{MENTION} ping x")).await;

    assert_eq!(*ping.params.lock().unwrap(), [vec!["x"]]);
}

#[tokio::test]
async fn test_messages_before_start_are_dropped() {
    let ping = CountingCommand::default();
    let registered = ping.clone();
    let runtime = piecework::RuntimeBuilder::new(common::config())
        .plugin(move |runtime: &Runtime| {
            runtime
                .commands()
                .register(CommandPiece::new("ping", registered.clone()))?;
            Ok::<_, BoxError>(())
        })
        .build()
        .unwrap();

    let (message, _) = common::message_from(&runtime, common::user(), "!ping");
    assert!(runtime.handle_message(message).await.is_none());

    runtime.start().await;
    let (message, _) = common::message_from(&runtime, common::user(), "!ping");
    let report = runtime.handle_message(message).await.unwrap();
    assert_eq!(report.ran, ["commandHandler"]);
    assert_eq!(ping.runs(), 1);
}

#[tokio::test]
async fn test_bot_messages_are_ignored() {
    let ping = CountingCommand::default();
    let registered = ping.clone();
    let runtime = started(move |runtime: &Runtime| {
        runtime
            .commands()
            .register(CommandPiece::new("ping", registered.clone()))?;
        Ok(())
    })
    .await;

    let (message, _) =
        common::message_from(&runtime, piecework::Author::bot("7", "other bot"), "!ping");
    let report = runtime.handle_message(message).await.unwrap();

    assert!(report.ran.is_empty());
    assert_eq!(ping.runs(), 0);
}
