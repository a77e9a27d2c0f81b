//! Time-ordered action scheduler
//!
//! The session loop drives this by calling [`ActionScheduler::tick`] with
//! the current time; everything due by then runs, in due order. A repeating
//! action is re-queued for its next slot before it executes, so a bulk
//! cancellation issued by the current batch also reaches the follow-up
//! instance. Actions can be tagged with flags and cancelled or disabled in
//! bulk by tag.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::Result;

// ----------------------------------------------------------------------------
// Identifiers and Flags
// ----------------------------------------------------------------------------

/// Ticket for one scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(u64);

impl ActionId {
    /// Returned when scheduling was refused; never matches a live action.
    pub const NONE: Self = Self(0);

    pub const fn is_scheduled(self) -> bool {
        self.0 != 0
    }
}

/// Tag bits for bulk operations on scheduled actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionFlags(u32);

impl ActionFlags {
    pub const NONE: Self = Self(0);

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// All of `other`'s bits are set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Any of `other`'s bits are set in `self`.
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

// ----------------------------------------------------------------------------
// Scheduler
// ----------------------------------------------------------------------------

/// A due action runs with mutable access to the session context only, never
/// to the scheduler itself; scheduling changes wanted from inside an action
/// go through the context.
pub type ActionFn<C> = Arc<Mutex<dyn FnMut(&mut C) -> Result<()> + Send>>;

/// Invoked when an action is cancelled in bulk before it could run.
pub type CancelFn<C> = Arc<dyn Fn(&mut C) + Send + Sync>;

struct ScheduledAction<C> {
    id: ActionId,
    interval: Option<Duration>,
    flags: ActionFlags,
    callback: ActionFn<C>,
    on_cancel: Option<CancelFn<C>>,
}

pub struct ActionScheduler<C> {
    // Keyed by due time with the id as tie-break, so equal times keep
    // scheduling order.
    actions: BTreeMap<(Instant, u64), ScheduledAction<C>>,
    next_id: u64,
    disabled: ActionFlags,
    running: bool,
}

impl<C> ActionScheduler<C> {
    pub fn new() -> Self {
        Self {
            actions: BTreeMap::new(),
            next_id: 0,
            disabled: ActionFlags::NONE,
            running: true,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Refuse all further scheduling. Already-queued actions stay until
    /// cancelled but repeats will not re-queue.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Queue an action for `due_at`. With an interval it re-queues itself
    /// after every run.
    ///
    /// Returns [`ActionId::NONE`] when the scheduler is stopped or the
    /// action's flags are currently disabled.
    pub fn schedule(
        &mut self,
        due_at: Instant,
        interval: Option<Duration>,
        flags: ActionFlags,
        action: impl FnMut(&mut C) -> Result<()> + Send + 'static,
    ) -> ActionId {
        self.insert(due_at, interval, flags, Arc::new(Mutex::new(action)), None)
    }

    /// Like [`ActionScheduler::schedule`], with a callback to run if the
    /// action is cancelled in bulk before firing.
    pub fn schedule_with_cancel(
        &mut self,
        due_at: Instant,
        interval: Option<Duration>,
        flags: ActionFlags,
        action: impl FnMut(&mut C) -> Result<()> + Send + 'static,
        on_cancel: impl Fn(&mut C) + Send + Sync + 'static,
    ) -> ActionId {
        self.insert(
            due_at,
            interval,
            flags,
            Arc::new(Mutex::new(action)),
            Some(Arc::new(on_cancel)),
        )
    }

    fn insert(
        &mut self,
        due_at: Instant,
        interval: Option<Duration>,
        flags: ActionFlags,
        callback: ActionFn<C>,
        on_cancel: Option<CancelFn<C>>,
    ) -> ActionId {
        if !self.running || (flags != ActionFlags::NONE && self.disabled.contains(flags)) {
            return ActionId::NONE;
        }

        self.next_id += 1;
        let id = ActionId(self.next_id);
        self.actions.insert(
            (due_at, self.next_id),
            ScheduledAction {
                id,
                interval: interval.filter(|i| !i.is_zero()),
                flags,
                callback,
                on_cancel,
            },
        );
        id
    }

    /// Run everything due by `now`, earliest first. A failing action is
    /// logged and the batch continues.
    pub fn tick(&mut self, now: Instant, context: &mut C) {
        while let Some((&(due_at, _), _)) = self.actions.first_key_value() {
            if due_at > now {
                break;
            }
            let Some((_, action)) = self.actions.pop_first() else {
                break;
            };

            // Re-queue first so bulk cancellations from this batch also
            // catch the follow-up instance.
            if let Some(interval) = action.interval {
                self.insert(
                    now + interval,
                    Some(interval),
                    action.flags,
                    Arc::clone(&action.callback),
                    action.on_cancel.clone(),
                );
            }

            let mut callback = action
                .callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Err(err) = callback(context) {
                warn!("Scheduled action failed: {}", err);
            }
        }
    }

    /// Remove one action by ticket. The cancel callback is not invoked.
    pub fn cancel(&mut self, id: ActionId) -> bool {
        if !id.is_scheduled() {
            return false;
        }
        let key = self
            .actions
            .iter()
            .find(|(_, action)| action.id == id)
            .map(|(&key, _)| key);
        match key {
            Some(key) => self.actions.remove(&key).is_some(),
            None => false,
        }
    }

    /// Remove every action tagged with any bit of `flag`, optionally
    /// running their cancel callbacks in due order.
    pub fn cancel_by_flag(&mut self, flag: ActionFlags, invoke_cancel: bool, context: &mut C) {
        self.actions.retain(|_, action| {
            if !action.flags.intersects(flag) {
                return true;
            }
            if invoke_cancel {
                if let Some(on_cancel) = &action.on_cancel {
                    on_cancel(context);
                }
            }
            false
        });
    }

    /// Cancel everything tagged with `flag` and refuse matching schedules
    /// until the flag is enabled again.
    pub fn disable_by_flag(&mut self, flag: ActionFlags, context: &mut C) {
        self.disabled = self.disabled.union(flag);
        self.cancel_by_flag(flag, true, context);
    }

    /// Allow schedules tagged with `flag` again. Nothing is restored.
    pub fn enable_by_flag(&mut self, flag: ActionFlags) {
        self.disabled = self.disabled.without(flag);
    }
}

impl<C> Default for ActionScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorldlinkError;
    use crate::types::OpCode;

    type Log = Vec<&'static str>;

    const PERIODIC: ActionFlags = ActionFlags::new(0x1);
    const CLEANUP: ActionFlags = ActionFlags::new(0x2);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn one_shot_runs_once_when_due() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        let mut log = Log::new();

        let id = scheduler.schedule(start + ms(50), None, ActionFlags::NONE, |log: &mut Log| {
            log.push("fired");
            Ok(())
        });
        assert!(id.is_scheduled());

        scheduler.tick(start + ms(49), &mut log);
        assert!(log.is_empty());

        scheduler.tick(start + ms(50), &mut log);
        assert_eq!(log, vec!["fired"]);
        assert!(scheduler.is_empty());

        scheduler.tick(start + ms(500), &mut log);
        assert_eq!(log, vec!["fired"]);
    }

    #[test]
    fn repeating_action_requeues_from_the_tick_time() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        let mut log = Log::new();

        scheduler.schedule(start + ms(100), Some(ms(100)), PERIODIC, |log: &mut Log| {
            log.push("beat");
            Ok(())
        });

        scheduler.tick(start + ms(100), &mut log);
        assert_eq!(log.len(), 1);
        assert_eq!(scheduler.len(), 1);

        scheduler.tick(start + ms(199), &mut log);
        assert_eq!(log.len(), 1);

        scheduler.tick(start + ms(200), &mut log);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn due_actions_run_earliest_first() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        let mut log = Log::new();

        scheduler.schedule(start + ms(20), None, ActionFlags::NONE, |log: &mut Log| {
            log.push("later");
            Ok(())
        });
        scheduler.schedule(start + ms(10), None, ActionFlags::NONE, |log: &mut Log| {
            log.push("sooner");
            Ok(())
        });
        scheduler.schedule(start + ms(10), None, ActionFlags::NONE, |log: &mut Log| {
            log.push("sooner-second");
            Ok(())
        });

        scheduler.tick(start + ms(30), &mut log);
        assert_eq!(log, vec!["sooner", "sooner-second", "later"]);
    }

    #[test]
    fn cancel_by_ticket() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        let mut log = Log::new();

        let id = scheduler.schedule(start, None, ActionFlags::NONE, |log: &mut Log| {
            log.push("should not run");
            Ok(())
        });
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert!(!scheduler.cancel(ActionId::NONE));

        scheduler.tick(start + ms(10), &mut log);
        assert!(log.is_empty());
    }

    #[test]
    fn flag_cancel_runs_cancel_callbacks_on_request() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        let mut log = Log::new();

        scheduler.schedule_with_cancel(
            start + ms(10),
            None,
            CLEANUP,
            |log: &mut Log| {
                log.push("ran");
                Ok(())
            },
            |log: &mut Log| log.push("cancelled"),
        );
        scheduler.schedule(start + ms(10), None, PERIODIC, |log: &mut Log| {
            log.push("survivor");
            Ok(())
        });

        scheduler.cancel_by_flag(CLEANUP, true, &mut log);
        assert_eq!(log, vec!["cancelled"]);

        scheduler.tick(start + ms(10), &mut log);
        assert_eq!(log, vec!["cancelled", "survivor"]);
    }

    #[test]
    fn flag_cancel_can_skip_cancel_callbacks() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        let mut log = Log::new();

        scheduler.schedule_with_cancel(
            start,
            None,
            CLEANUP,
            |_: &mut Log| Ok(()),
            |log: &mut Log| log.push("cancelled"),
        );
        scheduler.cancel_by_flag(CLEANUP, false, &mut log);
        assert!(log.is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn disabling_a_flag_cancels_and_blocks() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        let mut log = Log::new();

        scheduler.schedule_with_cancel(
            start + ms(10),
            Some(ms(10)),
            PERIODIC,
            |_: &mut Log| Ok(()),
            |log: &mut Log| log.push("cancelled"),
        );
        scheduler.disable_by_flag(PERIODIC, &mut log);
        assert_eq!(log, vec!["cancelled"]);
        assert!(scheduler.is_empty());

        let refused = scheduler.schedule(start, None, PERIODIC, |_: &mut Log| Ok(()));
        assert_eq!(refused, ActionId::NONE);

        // Untagged actions are unaffected.
        let untagged = scheduler.schedule(start, None, ActionFlags::NONE, |_: &mut Log| Ok(()));
        assert!(untagged.is_scheduled());

        scheduler.enable_by_flag(PERIODIC);
        let restored = scheduler.schedule(start, None, PERIODIC, |_: &mut Log| Ok(()));
        assert!(restored.is_scheduled());
    }

    #[test]
    fn stopped_scheduler_refuses_new_work() {
        let start = Instant::now();
        let mut scheduler: ActionScheduler<Log> = ActionScheduler::new();
        scheduler.stop();
        let id = scheduler.schedule(start, None, ActionFlags::NONE, |_: &mut Log| Ok(()));
        assert_eq!(id, ActionId::NONE);
    }

    #[test]
    fn failing_action_does_not_stop_the_batch() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        let mut log = Log::new();

        scheduler.schedule(start, None, ActionFlags::NONE, |_: &mut Log| {
            Err(WorldlinkError::handler(OpCode::new(0), "deliberate"))
        });
        scheduler.schedule(start + ms(1), None, ActionFlags::NONE, |log: &mut Log| {
            log.push("after failure");
            Ok(())
        });

        scheduler.tick(start + ms(5), &mut log);
        assert_eq!(log, vec!["after failure"]);
    }
}
