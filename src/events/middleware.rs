use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{GridError, GridResult};

/// Semantic event channel, set by the host adapter that translated the
/// raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Pointer,
    Keyboard,
    Wheel,
    Lifecycle,
}

/// Semantic table events, already hit-tested and translated by the host
/// adapter. The engine never sees raw DOM/terminal input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TableEvent {
    CellClick { row: u32, col: u32 },
    HeaderClick { col: u32 },
    Scroll { top: f64, left: f64 },
    Resize { width: f64, height: f64 },
    Key { code: String },
}

/// `next(channel, event)` continues the chain, possibly with a transformed
/// event. At most one call per middleware invocation.
pub type Next<'a> = dyn FnMut(Channel, &TableEvent) -> GridResult<()> + 'a;

/// A middleware: observe or transform, then call `next` to continue, or
/// skip `next` to swallow the event (the terminal never runs).
pub type Middleware = Box<dyn FnMut(Channel, &TableEvent, &mut Next) -> GridResult<()>>;

/// The handler at the end of the chain.
pub type Terminal = Box<dyn FnMut(Channel, &TableEvent)>;

/// Composed dispatch function: middlewares run in list order, each gating
/// the rest of the chain through its `next`.
pub struct Dispatcher {
    middlewares: Vec<Middleware>,
    terminal: Terminal,
}

/// Compose middlewares with a terminal handler into a dispatcher.
pub fn compose(middlewares: Vec<Middleware>, terminal: Terminal) -> Dispatcher {
    Dispatcher {
        middlewares,
        terminal,
    }
}

impl Dispatcher {
    /// Dispatch one event through the chain. A middleware calling `next`
    /// twice in the same invocation is reported as `StateMisuse`, even if
    /// the middleware swallowed the error itself.
    pub fn dispatch(&mut self, channel: Channel, event: &TableEvent) -> GridResult<()> {
        trace!(target: "event_dispatch", ?channel, "dispatching event");
        self.run_from(0, channel, event)
    }

    fn run_from(&mut self, index: usize, channel: Channel, event: &TableEvent) -> GridResult<()> {
        if index >= self.middlewares.len() {
            (self.terminal)(channel, event);
            return Ok(());
        }

        // take the middleware out so the chain can borrow self mutably
        let mut middleware = std::mem::replace(
            &mut self.middlewares[index],
            Box::new(|_, _, _: &mut Next| Ok(())),
        );
        let mut next_calls = 0u32;
        let result = {
            let mut next = |ch: Channel, ev: &TableEvent| -> GridResult<()> {
                next_calls += 1;
                if next_calls > 1 {
                    return Err(GridError::state_misuse(format!(
                        "middleware {} called next() more than once",
                        index
                    )));
                }
                self.run_from(index + 1, ch, ev)
            };
            middleware(channel, event, &mut next)
        };
        self.middlewares[index] = middleware;

        // the contract holds even when the middleware swallowed the error
        if next_calls > 1 {
            return Err(GridError::state_misuse(format!(
                "middleware {} called next() more than once",
                index
            )));
        }
        result
    }
}
