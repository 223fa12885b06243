use std::rc::{Rc, Weak};

use crate::{
    driver::{GenerationStats, RunId},
    generators::{Generator, StepRecord},
    maze::Grid,
};

/// Events emitted by the [`Driver`](crate::driver::Driver) to its subscribers.
/// The grid is the live grid of the run, valid for the duration of the callback.
#[derive(Debug, Clone, Copy)]
pub enum GenerationEvent<'a> {
    /// A new run was built and initialized
    Started {
        run: RunId,
        generator: Generator,
        grid: &'a Grid,
    },
    /// One step was applied
    Progress {
        run: RunId,
        percentage: f64,
        record: StepRecord,
        grid: &'a Grid,
    },
    /// The run finished; sent once per run
    Completed {
        run: RunId,
        stats: &'a GenerationStats,
        grid: &'a Grid,
    },
    /// The run was dropped before completing
    Reset { run: RunId },
}

impl GenerationEvent<'_> {
    pub fn run(&self) -> RunId {
        match *self {
            GenerationEvent::Started { run, .. }
            | GenerationEvent::Progress { run, .. }
            | GenerationEvent::Completed { run, .. }
            | GenerationEvent::Reset { run } => run,
        }
    }
}

type Callback = Box<dyn FnMut(&GenerationEvent<'_>)>;

struct Listener {
    /// Dead once the matching [`Subscription`] is dropped
    alive: Weak<()>,
    callback: Callback,
}

impl Listener {
    fn is_alive(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// Keeps a callback registered. Dropping it unsubscribes, also from inside a callback.
#[must_use = "the callback is unsubscribed as soon as the subscription is dropped"]
pub struct Subscription {
    _token: Rc<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

/// Callback registry owned by the driver. Callbacks run in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn subscribe<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&GenerationEvent<'_>) + 'static,
    {
        let token = Rc::new(());
        self.listeners.push(Listener {
            alive: Rc::downgrade(&token),
            callback: Box::new(callback),
        });
        Subscription { _token: token }
    }

    pub fn emit(&mut self, event: &GenerationEvent<'_>) {
        self.listeners.retain(Listener::is_alive);
        for listener in &mut self.listeners {
            // An earlier callback may have dropped this subscription
            if listener.is_alive() {
                (listener.callback)(event);
            }
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.listeners.iter().filter(|l| l.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
