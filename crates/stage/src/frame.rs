use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use crate::RootState;

/// Callback invoked once per frame with the root state and the frame delta
/// in seconds. Returning `Break` removes the callback after this frame's
/// callbacks have run.
pub type FrameCallback = Box<dyn FnMut(&mut RootState, f32) -> ControlFlow<()>>;

/// Handle returned by `FrameLoop::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    priority: i32,
    callback: FrameCallback,
}

/// Per-frame statistics for instrumentation.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub frame: u64,
    pub callbacks_run: usize,
    /// Whether the loop itself rendered the scene this frame.
    pub auto_rendered: bool,
    pub frame_time: Duration,
}

/// Ordered set of frame callbacks.
#[derive(Default)]
pub struct FrameLoop {
    subscribers: Vec<Subscriber>,
    next_id: u64,
    frame: u64,
    stats: FrameStats,
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("subscribers", &self.subscribers.len())
            .field("frame", &self.frame)
            .finish()
    }
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Lower priorities run first.
    pub fn subscribe(&mut self, priority: i32, callback: FrameCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let at = self
            .subscribers
            .iter()
            .position(|s| s.priority > priority)
            .unwrap_or(self.subscribers.len());
        self.subscribers.insert(
            at,
            Subscriber {
                id,
                priority,
                callback,
            },
        );
        tracing::debug!(?id, priority, "frame callback subscribed");
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        let removed = self.subscribers.len() != before;
        if removed {
            tracing::debug!(?id, "frame callback unsubscribed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Whether some subscriber has taken over rendering.
    pub fn renders_manually(&self) -> bool {
        self.subscribers.iter().any(|s| s.priority > 0)
    }

    /// Frames advanced so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Run one frame: refresh world matrices, run callbacks in order, then
    /// render unless a subscriber renders itself.
    pub fn advance(&mut self, state: &mut RootState, delta: f32) -> &FrameStats {
        let _span = tracing::trace_span!("frame", frame = self.frame + 1).entered();
        let frame_start = Instant::now();

        if state.scene.is_dirty() {
            state.scene.update_world_matrices();
        }
        let mut finished = Vec::new();
        for sub in &mut self.subscribers {
            if (sub.callback)(state, delta).is_break() {
                finished.push(sub.id);
            }
        }
        let callbacks_run = self.subscribers.len();
        for id in finished {
            self.unsubscribe(id);
        }
        let auto_rendered = !self.renders_manually();
        if auto_rendered {
            state.render();
        }

        self.frame += 1;
        self.stats = FrameStats {
            frame: self.frame,
            callbacks_run,
            auto_rendered,
            frame_time: frame_start.elapsed(),
        };
        &self.stats
    }
}
