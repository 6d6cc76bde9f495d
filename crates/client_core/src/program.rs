//! Ties the router to the backend worker.
//!
//! `Program` owns the state, applies messages in arrival order and queues
//! the resulting effects. Effects that cannot be queued are answered
//! immediately with a transport failure so no guard or cell stays stuck.

use std::{
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, warn};

use crate::{
    bridge::{spawn_backend_thread, EffectRunner},
    effect::Effect,
    error::Failure,
    message::Msg,
    state::AppState,
    update::update,
};

pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 64;

pub struct Program {
    state: AppState,
    cmd_tx: Sender<Effect>,
    msg_tx: Sender<Msg>,
    msg_rx: Receiver<Msg>,
}

impl Program {
    /// Starts the backend worker and returns a program wired to it.
    pub fn launch(
        state: AppState,
        runner: EffectRunner,
        queue_capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = bounded(queue_capacity.max(1));
        let program = Self::new(state, cmd_tx);
        let worker = spawn_backend_thread(runner, cmd_rx, program.msg_tx.clone());
        (program, worker)
    }

    /// A program whose effects go to `cmd_tx`; whoever owns the receiving
    /// end is expected to post results through [`Program::sender`].
    pub fn new(state: AppState, cmd_tx: Sender<Effect>) -> Self {
        let (msg_tx, msg_rx) = unbounded();
        Self {
            state,
            cmd_tx,
            msg_tx,
            msg_rx,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn into_state(self) -> AppState {
        self.state
    }

    pub fn sender(&self) -> Sender<Msg> {
        self.msg_tx.clone()
    }

    /// Applies one message and queues whatever it produced.
    pub fn dispatch(&mut self, msg: Msg) {
        let effects = update(&mut self.state, msg);
        for effect in effects {
            self.queue_effect(effect);
        }
    }

    fn queue_effect(&mut self, effect: Effect) {
        let name = effect.name();
        let (effect, failure) = match self.cmd_tx.try_send(effect) {
            Ok(()) => {
                debug!(effect = name, "queued effect");
                return;
            }
            Err(TrySendError::Full(effect)) => {
                warn!(effect = name, "effect queue is full");
                (effect, "command queue is full; please retry")
            }
            Err(TrySendError::Disconnected(effect)) => {
                warn!(effect = name, "backend worker disconnected");
                (effect, "backend worker is not running")
            }
        };
        // The receiver lives in `self`, so this send cannot fail.
        let _ = self
            .msg_tx
            .send(effect.fail(Failure::Transport(failure.to_string())));
    }

    /// Applies every result that has already arrived. Returns how many
    /// messages were processed.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.dispatch(msg);
            processed += 1;
        }
        processed
    }

    /// Processes results until `done` holds or `timeout` passes. Returns
    /// whether the condition was met.
    pub fn run_until(
        &mut self,
        timeout: Duration,
        mut done: impl FnMut(&AppState) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if done(&self.state) {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.msg_rx.recv_timeout(remaining) {
                Ok(msg) => self.dispatch(msg),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    return done(&self.state)
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/program_tests.rs"]
mod tests;
