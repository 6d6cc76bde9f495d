//! Pointer-drag sessions for positioning tasks on the board canvas.
//!
//! Coordinates are integer CSS pixels. A session converts client-space
//! pointer positions into container-local positions:
//! `local = pointer - container_origin - grab_offset`.

use serde::{Deserialize, Serialize};
use shared::domain::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

pub fn local_position(client: Point, container_origin: Point, grab_offset: Point) -> Point {
    Point {
        x: client.x - container_origin.x - grab_offset.x,
        y: client.y - container_origin.y - grab_offset.y,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub subject: TaskId,
    pub grab_offset: Point,
    pub container_origin: Option<Point>,
    pub last_local: Option<Point>,
    /// The subject's cached position when the drag started.
    pub before_drag: Option<Point>,
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    /// Opens a session. A session left open by a missed pointer-up is
    /// replaced without being persisted and handed back to the caller.
    pub fn pointer_down(
        &mut self,
        subject: TaskId,
        grab_offset: Point,
        before_drag: Option<Point>,
    ) -> Option<DragSession> {
        let previous = self.session.take();
        if let Some(previous) = &previous {
            tracing::debug!(task_id = previous.subject.0, "replacing unfinished drag");
        }
        self.session = Some(DragSession {
            subject,
            grab_offset,
            container_origin: None,
            last_local: None,
            before_drag,
        });
        previous
    }

    /// Stores the measured container origin; ignored when it belongs to a
    /// session that is no longer active.
    pub fn container_measured(&mut self, subject: TaskId, origin: Point) -> bool {
        match self.session.as_mut() {
            Some(session) if session.subject == subject => {
                session.container_origin = Some(origin);
                true
            }
            _ => false,
        }
    }

    /// Returns the subject's new local position. Moves before the container
    /// origin is known produce nothing.
    pub fn pointer_move(&mut self, client: Point) -> Option<(TaskId, Point)> {
        let session = self.session.as_mut()?;
        let origin = session.container_origin?;
        let local = local_position(client, origin, session.grab_offset);
        session.last_local = Some(local);
        Some((session.subject, local))
    }

    /// Closes the session, yielding the position to persist: the last
    /// computed local position, or the origin if none was computed.
    pub fn release(&mut self) -> Option<(TaskId, Point)> {
        let session = self.session.take()?;
        Some((session.subject, session.last_local.unwrap_or(Point::ORIGIN)))
    }

    /// Replaces the position a rejected drop falls back to, e.g. after a
    /// fresh server snapshot arrived mid-drag.
    pub fn rebase(&mut self, before_drag: Option<Point>) {
        if let Some(session) = self.session.as_mut() {
            session.before_drag = before_drag;
        }
    }

    /// The subject and its live position, once the pointer has moved.
    pub fn live_position(&self) -> Option<(TaskId, Point)> {
        let session = self.session.as_ref()?;
        Some((session.subject, session.last_local?))
    }

    pub fn cancel(&mut self) {
        self.session = None;
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
#[path = "tests/drag_tests.rs"]
mod tests;
