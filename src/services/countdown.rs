use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    /// Not seeded yet.
    Idle,
    Running,
    /// Paused while a submission is in flight.
    Frozen,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// The countdown is not running.
    Idle,
    /// One second elapsed; carries what is left.
    Elapsed(u64),
    /// Already at zero.
    AtZero,
}

/// Remaining-time counter for one attempt. Cancellation is terminal and observable through
/// [`Countdown::subscribe`], which is what stops the timer task.
#[derive(Debug)]
pub struct Countdown {
    remaining: u64,
    state: CountdownState,
    cancel_tx: watch::Sender<bool>,
}

impl Countdown {
    pub fn new() -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self { remaining: 0, state: CountdownState::Idle, cancel_tx }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == CountdownState::Cancelled
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.cancel_tx.subscribe()
    }

    pub(crate) fn seed(&mut self, seconds: u64) {
        if self.is_cancelled() {
            return;
        }
        self.remaining = seconds;
        self.state = CountdownState::Running;
    }

    pub(crate) fn tick(&mut self) -> Tick {
        if self.state != CountdownState::Running {
            return Tick::Idle;
        }
        if self.remaining == 0 {
            return Tick::AtZero;
        }
        self.remaining -= 1;
        Tick::Elapsed(self.remaining)
    }

    pub(crate) fn freeze(&mut self) {
        if self.state == CountdownState::Running {
            self.state = CountdownState::Frozen;
        }
    }

    pub(crate) fn resume(&mut self) {
        if self.state == CountdownState::Frozen {
            self.state = CountdownState::Running;
        }
    }

    pub fn cancel(&mut self) {
        if self.is_cancelled() {
            return;
        }
        self.state = CountdownState::Cancelled;
        self.cancel_tx.send_replace(true);
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_countdown_does_not_tick() {
        let mut countdown = Countdown::new();
        assert_eq!(countdown.tick(), Tick::Idle);
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn ticks_down_to_zero_and_stays_there() {
        let mut countdown = Countdown::new();
        countdown.seed(2);
        assert_eq!(countdown.tick(), Tick::Elapsed(1));
        assert_eq!(countdown.tick(), Tick::Elapsed(0));
        assert_eq!(countdown.tick(), Tick::AtZero);
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn frozen_countdown_keeps_its_value() {
        let mut countdown = Countdown::new();
        countdown.seed(10);
        countdown.freeze();
        assert_eq!(countdown.tick(), Tick::Idle);
        assert_eq!(countdown.remaining(), 10);
        countdown.resume();
        assert_eq!(countdown.tick(), Tick::Elapsed(9));
    }

    #[test]
    fn cancel_is_terminal_and_signalled() {
        let mut countdown = Countdown::new();
        let rx = countdown.subscribe();
        countdown.seed(5);
        countdown.cancel();
        assert!(*rx.borrow());
        countdown.resume();
        countdown.seed(30);
        assert_eq!(countdown.state(), CountdownState::Cancelled);
        assert_eq!(countdown.tick(), Tick::Idle);
    }
}
