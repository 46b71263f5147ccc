//! Four-state lifecycle of the on-screen companion.
//!
//! Legal moves are fixed by [`EntityState::can_transition_to`]. A successful transition
//! runs the exit hooks of the old state, swaps the state, runs the enter hooks of the new
//! state, and finally notifies listeners, always in that order. Hooks receive a mutable
//! context owned by the caller so the machine never holds a back-reference to its owner.

#[cfg(test)]
mod tests;

use std::fmt;

use crate::error::CompanionError;
use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    Hidden,
    Peeking,
    Engaged,
    Fleeing,
}

impl EntityState {
    pub const ALL: [EntityState; 4] = [
        EntityState::Hidden,
        EntityState::Peeking,
        EntityState::Engaged,
        EntityState::Fleeing,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EntityState::Hidden => "HIDDEN",
            EntityState::Peeking => "PEEKING",
            EntityState::Engaged => "ENGAGED",
            EntityState::Fleeing => "FLEEING",
        }
    }

    pub fn can_transition_to(self, next: EntityState) -> bool {
        use EntityState::*;
        matches!(
            (self, next),
            (Hidden, Peeking)
                | (Hidden, Engaged)
                | (Peeking, Engaged)
                | (Peeking, Fleeing)
                | (Peeking, Hidden)
                | (Engaged, Fleeing)
                | (Engaged, Hidden)
                | (Fleeing, Hidden)
        )
    }

    /// Whether the companion is on screen in this state.
    pub fn is_visible(self) -> bool {
        !matches!(self, EntityState::Hidden)
    }

    fn index(self) -> usize {
        match self {
            EntityState::Hidden => 0,
            EntityState::Peeking => 1,
            EntityState::Engaged => 2,
            EntityState::Fleeing => 3,
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: EntityState,
    pub to: EntityState,
}

pub type Hook<C> = fn(&mut C, Transition);
pub type Listener = Box<dyn FnMut(Transition) + Send>;

pub struct StateMachine<C> {
    state: EntityState,
    enter_hooks: [Vec<Hook<C>>; 4],
    exit_hooks: [Vec<Hook<C>>; 4],
    listeners: Vec<Listener>,
}

impl<C> StateMachine<C> {
    pub fn new(initial: EntityState) -> Self {
        Self {
            state: initial,
            enter_hooks: Default::default(),
            exit_hooks: Default::default(),
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn can_transition(&self, next: EntityState) -> bool {
        self.state.can_transition_to(next)
    }

    pub fn on_enter(&mut self, state: EntityState, hook: Hook<C>) {
        self.enter_hooks[state.index()].push(hook);
    }

    pub fn on_exit(&mut self, state: EntityState, hook: Hook<C>) {
        self.exit_hooks[state.index()].push(hook);
    }

    /// Register a listener called with every completed (old, new) transition.
    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Attempt a transition; illegal requests are logged and leave the machine untouched.
    pub fn transition_to(&mut self, ctx: &mut C, next: EntityState) -> bool {
        match self.try_transition(ctx, next) {
            Ok(_) => true,
            Err(err) => {
                log_debug(&format!("state machine: {err}"));
                tracing::warn!(from = %self.state, to = %next, "illegal transition rejected");
                false
            }
        }
    }

    pub fn try_transition(
        &mut self,
        ctx: &mut C,
        next: EntityState,
    ) -> Result<Transition, CompanionError> {
        let from = self.state;
        if !from.can_transition_to(next) {
            return Err(CompanionError::IllegalTransition { from, to: next });
        }
        let transition = Transition { from, to: next };

        for hook in &self.exit_hooks[from.index()] {
            hook(ctx, transition);
        }
        self.state = next;
        for hook in &self.enter_hooks[next.index()] {
            hook(ctx, transition);
        }
        for listener in self.listeners.iter_mut() {
            listener(transition);
        }
        tracing::info!(from = %from, to = %next, "state transition");
        Ok(transition)
    }
}
