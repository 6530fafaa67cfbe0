use std::time::{Duration, Instant};

/// Delay before a held key starts repeating.
pub const NUDGE_DELAY: Duration = Duration::from_millis(120);
/// Wall-clock period of one repeat step once the ticker is running.
pub const NUDGE_TICK: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Left,
    Down,
    Right,
}

impl Direction {
    fn bit(self) -> u8 {
        match self {
            Direction::Up => 1 << 0,
            Direction::Left => 1 << 1,
            Direction::Down => 1 << 2,
            Direction::Right => 1 << 3,
        }
    }

    /// World-space unit step: up is +y.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Down => (0, -1),
            Direction::Right => (1, 0),
        }
    }

    const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];
}

/// Keyboard nudge scheduler. A fresh key-down produces one immediate step
/// (key repeats are debounced through the held bitmask); once `NUDGE_DELAY`
/// has passed, `poll` hands out steps at a fixed wall-clock rate computed
/// from elapsed time over `NUDGE_TICK`, so nudge speed does not depend on
/// how often the caller polls. Releasing the last held key cancels both the
/// pending delayed start and the running ticker; cancelling twice is safe
/// because key-up can race the delayed start.
#[derive(Clone, Debug, Default)]
pub struct Nudge {
    held: u8,
    anchor: Option<Instant>,
    ticks: u32,
}

impl Nudge {
    pub fn new() -> Nudge {
        Default::default()
    }

    /// Registers a key-down. Returns the immediate unit step for a fresh
    /// press, or `None` for an auto-repeat of an already held key.
    pub fn press(&mut self, direction: Direction, now: Instant) -> Option<(i32, i32)> {
        if self.held & direction.bit() != 0 {
            return None;
        }
        self.held |= direction.bit();
        if self.anchor.is_none() {
            self.anchor = Some(now + NUDGE_DELAY);
            self.ticks = 0;
        }
        Some(direction.delta())
    }

    pub fn release(&mut self, direction: Direction) {
        self.held &= !direction.bit();
        if self.held == 0 {
            self.cancel();
        }
    }

    pub fn cancel(&mut self) {
        self.anchor = None;
        self.ticks = 0;
    }

    pub fn is_armed(&self) -> bool {
        self.anchor.is_some()
    }

    /// Accumulated step for all repeat ticks that have become due since the
    /// last poll. (0, 0) while idle or still inside the start delay.
    pub fn poll(&mut self, now: Instant) -> (i32, i32) {
        let anchor = match self.anchor {
            Some(anchor) => anchor,
            None => return (0, 0),
        };
        if now < anchor {
            return (0, 0);
        }
        let due = ((now - anchor).as_millis() / NUDGE_TICK.as_millis()) as u32;
        let pending = due.saturating_sub(self.ticks);
        self.ticks = due;
        if pending == 0 {
            return (0, 0);
        }

        let mut dx = 0;
        let mut dy = 0;
        for direction in &Direction::ALL {
            if self.held & direction.bit() != 0 {
                let (sx, sy) = direction.delta();
                dx += sx;
                dy += sy;
            }
        }
        (dx * pending as i32, dy * pending as i32)
    }
}
