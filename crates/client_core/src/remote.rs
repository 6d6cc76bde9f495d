//! Four-state container for anything fetched over the network.

use crate::error::Failure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remote<T> {
    NotAsked,
    Loading,
    Loaded(T),
    Failed(Failure),
}

impl<T> Default for Remote<T> {
    fn default() -> Self {
        Self::NotAsked
    }
}

impl<T> Remote<T> {
    /// Moves the cell to `Loading`. Returns `false` (and leaves the cell
    /// untouched) when a load is already in flight; callers must not
    /// dispatch a second fetch in that case.
    pub fn begin_load(&mut self) -> bool {
        if self.is_loading() {
            return false;
        }
        *self = Self::Loading;
        true
    }

    /// Applies a fetch result. Only a `Loading` cell accepts one: a result
    /// for a cell that was reset meanwhile is dropped and `false` returned.
    pub fn complete(&mut self, result: Result<T, Failure>) -> bool {
        if !self.is_loading() {
            return false;
        }
        *self = match result {
            Ok(value) => Self::Loaded(value),
            Err(failure) => Self::Failed(failure),
        };
        true
    }

    pub fn reset(&mut self) {
        *self = Self::NotAsked;
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Message a renderer shows next to the resource. Auth failures never
    /// render inline; the session guard routes them to the login surface.
    pub fn inline_error(&self) -> Option<String> {
        self.failure()
            .filter(|failure| !failure.requires_reauth())
            .map(ToString::to_string)
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
