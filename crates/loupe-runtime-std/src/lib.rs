//! Wall-clock driver for the Loupe poll scheduler.
//!
//! The core [`Ticker`] is time-agnostic: something has to feed it elapsed
//! milliseconds. This crate does that with `std::time`, for hosts without
//! their own frame loop.

use std::time::{Duration, Instant};

use loupe_core::Ticker;

/// Pumps a [`Ticker`] from `std::time::Instant`.
pub struct TickerDriver {
    ticker: Ticker,
    last: Instant,
    /// Leftover sub-millisecond time carried into the next pump.
    carry: Duration,
}

impl TickerDriver {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            last: Instant::now(),
            carry: Duration::ZERO,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    /// Advances the ticker by the wall-clock time elapsed since the last
    /// pump. Call from the host's idle or frame callback.
    pub fn pump(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last) + self.carry;
        self.last = now;
        let millis = elapsed.as_millis() as u64;
        self.carry = elapsed - Duration::from_millis(millis);
        if millis > 0 {
            self.ticker.advance(millis);
        }
    }

    /// Sleeps and pumps on `interval` until `done` reports true. A simple
    /// foreground loop for hosts without an event loop of their own.
    pub fn run_until(&mut self, interval: Duration, mut done: impl FnMut() -> bool) {
        while !done() {
            std::thread::sleep(interval);
            self.pump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn pump_advances_by_elapsed_time() {
        let ticker = Ticker::new();
        let fired = Rc::new(Cell::new(0));
        let probe = Rc::clone(&fired);
        let _registration = ticker.register(5, move || probe.set(probe.get() + 1));
        let mut driver = TickerDriver::new(ticker.clone());
        driver.last = Instant::now() - Duration::from_millis(20);
        driver.pump();
        assert!(ticker.now() >= 20);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn run_until_stops_when_done() {
        let ticker = Ticker::new();
        let polls = Rc::new(Cell::new(0));
        let probe = Rc::clone(&polls);
        let _registration = ticker.register(0, move || probe.set(probe.get() + 1));
        let mut driver = TickerDriver::new(ticker);
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        driver.run_until(Duration::from_millis(1), move || {
            counter.set(counter.get() + 1);
            counter.get() > 3
        });
        assert!(polls.get() >= 1);
    }
}
