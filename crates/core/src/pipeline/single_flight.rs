use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
struct Flight {
    ticket: u64,
    started: Instant,
}

#[derive(Debug, Default)]
struct FlightState {
    next_ticket: u64,
    in_flight: Option<Flight>,
}

/// At most one detection in progress at a time.
///
/// Each admitted frame gets a fresh, strictly increasing ticket. A flight
/// that outlives `timeout` is abandoned: the next frame is admitted in its
/// place, and the abandoned ticket's eventual result no longer matches and
/// is treated as stale.
#[derive(Debug)]
pub struct SingleFlight {
    state: Mutex<FlightState>,
    timeout: Duration,
}

impl SingleFlight {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(FlightState::default()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn try_begin(&self) -> Option<u64> {
        self.begin_at(Instant::now())
    }

    /// Admits a new flight when idle or when the current one has expired.
    pub fn begin_at(&self, now: Instant) -> Option<u64> {
        let mut state = self.lock();
        if let Some(flight) = state.in_flight {
            if now.saturating_duration_since(flight.started) < self.timeout {
                return None;
            }
            log::warn!(
                "Detection {} exceeded {:?}; abandoning it",
                flight.ticket,
                self.timeout
            );
        }
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.in_flight = Some(Flight {
            ticket,
            started: now,
        });
        Some(ticket)
    }

    /// Ends the flight for `ticket`. Returns `false` when that ticket is no
    /// longer current, i.e. its result is stale.
    pub fn finish(&self, ticket: u64) -> bool {
        let mut state = self.lock();
        match state.in_flight {
            Some(flight) if flight.ticket == ticket => {
                state.in_flight = None;
                true
            }
            _ => false,
        }
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.lock().in_flight.map(|f| f.ticket)
    }

    /// Clears a flight that has run past the timeout and returns its ticket.
    pub fn expire_at(&self, now: Instant) -> Option<u64> {
        let mut state = self.lock();
        let flight = state.in_flight?;
        if now.saturating_duration_since(flight.started) < self.timeout {
            return None;
        }
        state.in_flight = None;
        Some(flight.ticket)
    }

    fn lock(&self) -> MutexGuard<'_, FlightState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
