//! Per-user command cooldowns.
//!
//! The `cooldown` guard checks the bucket before a command runs and the
//! `commandCooldown` finalizer charges it after the command succeeded, so
//! failed or blocked runs are free.

use crate::permissions::OwnerSet;
use piecework_core::{
    BoxError, CommandPiece, Finalizer, Guard, GuardResult, Message, Response, Stopwatch,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

/// Bucket count above which recording a use sweeps out expired buckets.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    uses: u32,
    resets_at: Instant,
}

/// Shared cooldown buckets keyed by command and user.
#[derive(Debug, Clone, Default)]
pub struct Cooldowns {
    buckets: Arc<Mutex<HashMap<(String, String), Bucket>>>,
}

impl Cooldowns {
    /// Empty buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left before `user` may run `command` again, if they are
    /// currently rate limited.
    pub fn remaining(&self, command: &CommandPiece, user: &str) -> Option<Duration> {
        self.remaining_at(command, user, Instant::now())
    }

    /// Charge one use of `command` to `user`.
    pub fn record(&self, command: &CommandPiece, user: &str) {
        self.record_at(command, user, Instant::now());
    }

    /// Forget every bucket.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn remaining_at(&self, command: &CommandPiece, user: &str, now: Instant) -> Option<Duration> {
        let options = command.options();
        if options.cooldown_ms == 0 {
            return None;
        }
        let mut buckets = self.lock();
        let key = (command.name().to_string(), user.to_string());
        let bucket = *buckets.get(&key)?;
        if now >= bucket.resets_at {
            buckets.remove(&key);
            return None;
        }
        (bucket.uses >= options.bucket.max(1)).then(|| bucket.resets_at - now)
    }

    fn record_at(&self, command: &CommandPiece, user: &str, now: Instant) {
        let window = Duration::from_millis(command.options().cooldown_ms);
        if window.is_zero() {
            return;
        }
        let mut buckets = self.lock();
        if buckets.len() >= PRUNE_THRESHOLD {
            buckets.retain(|_, bucket| now < bucket.resets_at);
        }
        let bucket = buckets
            .entry((command.name().to_string(), user.to_string()))
            .or_insert(Bucket {
                uses: 0,
                resets_at: now + window,
            });
        if now >= bucket.resets_at {
            *bucket = Bucket {
                uses: 0,
                resets_at: now + window,
            };
        }
        bucket.uses += 1;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Blocks users who exhausted a command's bucket. Owners are exempt.
pub struct CooldownGuard {
    cooldowns: Cooldowns,
    owners: OwnerSet,
}

impl CooldownGuard {
    /// Guard backed by `cooldowns`.
    pub fn new(cooldowns: Cooldowns, owners: OwnerSet) -> Self {
        Self { cooldowns, owners }
    }
}

impl Guard for CooldownGuard {
    async fn run(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
    ) -> Result<GuardResult, BoxError> {
        if self.owners.contains(&message.author.id) {
            return Ok(GuardResult::Pass);
        }
        Ok(match self.cooldowns.remaining(&command, &message.author.id) {
            Some(left) => {
                let seconds = left.as_secs_f64().ceil() as u64;
                let unit = if seconds == 1 { "second" } else { "seconds" };
                GuardResult::Reason(format!(
                    "You have just used this command. You can use this command again in {seconds} {unit}."
                ))
            }
            None => GuardResult::Pass,
        })
    }
}

/// Charges a use after a command succeeds.
pub struct CooldownFinalizer {
    cooldowns: Cooldowns,
}

impl CooldownFinalizer {
    /// Finalizer charging `cooldowns`.
    pub fn new(cooldowns: Cooldowns) -> Self {
        Self { cooldowns }
    }
}

impl Finalizer for CooldownFinalizer {
    async fn run(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
        _response: Response,
        _timer: Stopwatch,
    ) -> Result<(), BoxError> {
        self.cooldowns.record(&command, &message.author.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piecework_core::CommandOptions;
    use piecework_std::testing::{EchoCommand, message};

    fn limited(cooldown_ms: u64, bucket: u32) -> CommandPiece {
        CommandPiece::new("daily", EchoCommand).with_options(CommandOptions {
            cooldown_ms,
            bucket,
            ..CommandOptions::default()
        })
    }

    #[test]
    fn test_bucket_fills_then_resets() {
        let cooldowns = Cooldowns::new();
        let command = limited(1000, 2);
        let start = Instant::now();

        cooldowns.record_at(&command, "u", start);
        assert_eq!(cooldowns.remaining_at(&command, "u", start), None);
        cooldowns.record_at(&command, "u", start);
        assert_eq!(
            cooldowns.remaining_at(&command, "u", start + Duration::from_millis(400)),
            Some(Duration::from_millis(600))
        );
        assert_eq!(cooldowns.remaining_at(&command, "other", start), None);
        assert_eq!(
            cooldowns.remaining_at(&command, "u", start + Duration::from_millis(1000)),
            None
        );
    }

    #[test]
    fn test_expired_buckets_are_swept() {
        let cooldowns = Cooldowns::new();
        let command = limited(1000, 1);
        let start = Instant::now();
        for user in 0..PRUNE_THRESHOLD {
            cooldowns.record_at(&command, &user.to_string(), start);
        }
        assert_eq!(cooldowns.lock().len(), PRUNE_THRESHOLD);

        let later = start + Duration::from_millis(1500);
        cooldowns.record_at(&command, "late", later);
        assert_eq!(cooldowns.lock().len(), 1);
        assert_eq!(
            cooldowns.remaining_at(&command, "late", later),
            Some(Duration::from_millis(1000))
        );
    }

    #[test]
    fn test_live_buckets_survive_a_sweep() {
        let cooldowns = Cooldowns::new();
        let command = limited(1000, 1);
        let start = Instant::now();
        for user in 0..PRUNE_THRESHOLD {
            cooldowns.record_at(&command, &user.to_string(), start);
        }
        cooldowns.record_at(&command, "late", start + Duration::from_millis(500));
        assert_eq!(cooldowns.lock().len(), PRUNE_THRESHOLD + 1);
    }

    #[test]
    fn test_no_cooldown_never_limits() {
        let cooldowns = Cooldowns::new();
        let command = limited(0, 1);
        cooldowns.record(&command, "u");
        assert_eq!(cooldowns.remaining(&command, "u"), None);
    }

    #[tokio::test]
    async fn test_guard_reports_seconds_left() {
        let cooldowns = Cooldowns::new();
        let command = Arc::new(limited(5000, 1));
        let msg = message("!daily");
        cooldowns.record(&command, &msg.author.id);

        let guard = CooldownGuard::new(cooldowns.clone(), OwnerSet::default());
        let result = guard.run(msg.clone(), command.clone()).await.unwrap();
        assert_eq!(
            result,
            GuardResult::Reason(
                "You have just used this command. You can use this command again in 5 seconds."
                    .into()
            )
        );

        let exempt = CooldownGuard::new(cooldowns, OwnerSet::new([msg.author.id.clone()]));
        assert_eq!(
            exempt.run(msg, command).await.unwrap(),
            GuardResult::Pass
        );
    }
}
