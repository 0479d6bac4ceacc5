//! Pieces every runtime ships with.
//!
//! They are installed as sources, so they show up in the startup counts and
//! can be reloaded like any other piece. A kind listed in the configuration's
//! `disabled_core_pieces` gets none of its built-ins.
//!
//! | store | pieces |
//! |---|---|
//! | filters | `commandHandler` |
//! | guards | `disabled`, `permissions`, `runIn`, `cooldown` |
//! | finalizers | `commandCooldown` |
//! | events | `commandInhibited`, `commandError`, console events |

mod cooldown;
mod events;
mod guards;

pub use cooldown::{CooldownFinalizer, CooldownGuard, Cooldowns};
pub use events::{CommandErrorLog, ConsoleEvent, InhibitedReply};
pub use guards::{DisabledGuard, PermissionsGuard, RunInGuard};

use crate::{dispatcher::CommandHandler, runtime::Runtime};
use piecework_core::{
    Emitter, EventKind, EventPiece, FilterPiece, FinalizerPiece, GuardPiece, IgnoreFlags,
    PieceKind,
};
use std::sync::Arc;

const ORIGIN: &str = "core";

fn origin(name: &str) -> String {
    format!("{ORIGIN}:{name}")
}

pub(crate) fn install(runtime: &Runtime) {
    let config = runtime.config();
    if config.core_pieces_enabled(PieceKind::Filter) {
        install_filters(runtime);
    }
    if config.core_pieces_enabled(PieceKind::Guard) {
        install_guards(runtime);
    }
    if config.core_pieces_enabled(PieceKind::Finalizer) {
        install_finalizers(runtime);
    }
    if config.core_pieces_enabled(PieceKind::Event) {
        install_events(runtime);
    }
}

fn install_filters(runtime: &Runtime) {
    let commands = runtime.commands().clone();
    let guards = runtime.guards().clone();
    let finalizers = runtime.finalizers().clone();
    let events: Arc<dyn Emitter> = runtime.events().clone();
    let parser = runtime.parser().clone();
    let command_logging = runtime.config().command_logging;

    runtime
        .filters()
        .add_source_fn(origin("commandHandler"), move |defaults| {
            let mut options = defaults.clone();
            options.ignore.remove(IgnoreFlags::OTHERS);
            let handler = CommandHandler::new(
                commands.clone(),
                guards.clone(),
                finalizers.clone(),
                events.clone(),
                parser.clone(),
            )
            .command_logging(command_logging);
            Ok(FilterPiece::new("commandHandler", handler).with_options(options))
        });
}

fn install_guards(runtime: &Runtime) {
    let guards = runtime.guards();
    guards.add_source_fn(origin("disabled"), |defaults| {
        Ok(GuardPiece::new("disabled", DisabledGuard).with_options(defaults.clone()))
    });

    let levels = runtime.permission_levels().clone();
    let owners = runtime.owners().clone();
    guards.add_source_fn(origin("permissions"), move |defaults| {
        Ok(
            GuardPiece::new("permissions", PermissionsGuard::new(levels.clone(), owners.clone()))
                .with_options(defaults.clone()),
        )
    });

    guards.add_source_fn(origin("runIn"), |defaults| {
        Ok(GuardPiece::new("runIn", RunInGuard).with_options(defaults.clone()))
    });

    let cooldowns = runtime.cooldowns().clone();
    let owners = runtime.owners().clone();
    guards.add_source_fn(origin("cooldown"), move |_defaults| {
        Ok(
            GuardPiece::new("cooldown", CooldownGuard::new(cooldowns.clone(), owners.clone()))
                .spam_protection(),
        )
    });
}

fn install_finalizers(runtime: &Runtime) {
    let cooldowns = runtime.cooldowns().clone();
    runtime
        .finalizers()
        .add_source_fn(origin("commandCooldown"), move |_defaults| {
            Ok(FinalizerPiece::new(
                "commandCooldown",
                CooldownFinalizer::new(cooldowns.clone()),
            ))
        });
}

fn install_events(runtime: &Runtime) {
    let events = runtime.events();
    events.add_source_fn(origin("commandInhibited"), |_defaults| {
        Ok(EventPiece::on(
            "commandInhibited",
            EventKind::CommandInhibited,
            InhibitedReply,
        ))
    });
    events.add_source_fn(origin("commandError"), |_defaults| {
        Ok(EventPiece::on(
            "commandError",
            EventKind::CommandError,
            CommandErrorLog,
        ))
    });

    let switches = runtime.config().console_events;
    for kind in ConsoleEvent::KINDS {
        events.add_source_fn(origin(kind.name()), move |_defaults| {
            Ok(EventPiece::on(
                kind.name(),
                kind,
                ConsoleEvent::new(kind, switches.enabled(kind)),
            ))
        });
    }
}
