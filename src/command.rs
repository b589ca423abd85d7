//! Commands and the dispatcher that runs them.
//!
//! A [`Command`] describes side effects without performing them: nothing, a
//! pre-known event, one asynchronous operation that yields one event, or a
//! batch of those. The state machine returns commands from its transition
//! function; the [`Dispatcher`] turns them into spawned tokio tasks that each
//! deliver exactly one event into the event channel.
//!
//! # Delivery guarantees
//!
//! - Every leaf delivers at most one event, and exactly one unless the task
//!   panics or the receiver has been dropped.
//! - `dispatch` never blocks and never awaits. Batches are fanned out into
//!   independent tasks with no ordering between members.
//! - A panic inside a command is caught and logged; the rest of the batch is
//!   unaffected.

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// A description of work whose outcome is fed back as events of type `E`.
pub enum Command<E> {
    None,
    Msg(E),
    Async(BoxFuture<'static, E>),
    Batch(Vec<Command<E>>),
}

/// A single unit of work after a command tree has been flattened.
enum Leaf<E> {
    Msg(E),
    Async(BoxFuture<'static, E>),
}

impl<E: Send + 'static> Command<E> {
    /// The empty command.
    pub fn none() -> Self {
        Command::None
    }

    /// Deliver `event` without any asynchronous work.
    ///
    /// Used to kick off the first fetch at startup.
    pub fn of_msg(event: E) -> Self {
        Command::Msg(event)
    }

    /// Run `op` on the runtime and deliver its output as one event.
    ///
    /// `op` is polled by a spawned task and never restarted.
    pub fn from_async<F>(op: F) -> Self
    where
        F: Future<Output = E> + Send + 'static,
    {
        Command::Async(op.boxed())
    }

    /// Combine commands. Members run independently and in no particular order.
    pub fn batch<I>(commands: I) -> Self
    where
        I: IntoIterator<Item = Command<E>>,
    {
        Command::Batch(commands.into_iter().collect())
    }

    /// Number of events this command will deliver.
    pub fn len(&self) -> usize {
        match self {
            Command::None => 0,
            Command::Msg(_) | Command::Async(_) => 1,
            Command::Batch(commands) => commands.iter().map(Command::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every member on the current task and collect the resulting events.
    ///
    /// Async members are polled concurrently. Events come back in batch
    /// order, not completion order. Intended for headless drivers and tests;
    /// the interactive loop goes through [`Dispatcher::dispatch`].
    pub async fn into_events(self) -> Vec<E> {
        let futures = self.into_leaves().into_iter().map(|leaf| match leaf {
            Leaf::Msg(event) => future::ready(event).boxed(),
            Leaf::Async(op) => op,
        });
        future::join_all(futures).await
    }

    fn into_leaves(self) -> Vec<Leaf<E>> {
        let mut leaves = Vec::with_capacity(self.len());
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves(self, out: &mut Vec<Leaf<E>>) {
        match self {
            Command::None => {}
            Command::Msg(event) => out.push(Leaf::Msg(event)),
            Command::Async(op) => out.push(Leaf::Async(op)),
            Command::Batch(commands) => {
                for command in commands {
                    command.collect_leaves(out);
                }
            }
        }
    }
}

impl<E> fmt::Debug for Command<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::None => f.write_str("None"),
            Command::Msg(_) => f.write_str("Msg(..)"),
            Command::Async(_) => f.write_str("Async(..)"),
            Command::Batch(commands) => f.debug_tuple("Batch").field(commands).finish(),
        }
    }
}

/// Executes commands against an event channel.
///
/// Cheap to clone; every clone feeds the same receiver.
pub struct Dispatcher<E> {
    tx: mpsc::Sender<E>,
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E: Send + 'static> Dispatcher<E> {
    pub fn new(tx: mpsc::Sender<E>) -> Self {
        Self { tx }
    }

    /// Start every leaf of `command` and return immediately.
    ///
    /// Must be called from within a tokio runtime. Spawned tasks are detached:
    /// nothing is ever cancelled, late events are filtered by the receiver.
    pub fn dispatch(&self, command: Command<E>) {
        let leaves = command.into_leaves();
        if leaves.is_empty() {
            return;
        }

        tracing::debug!(count = leaves.len(), "Dispatching command");

        for leaf in leaves {
            let tx = self.tx.clone();
            match leaf {
                Leaf::Msg(event) => match tx.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(event)) => {
                        tokio::spawn(deliver(tx, event));
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::warn!("Event channel closed, dropping message");
                    }
                },
                Leaf::Async(op) => {
                    tokio::spawn(async move {
                        match catch_task_panic(op).await {
                            Ok(event) => deliver(tx, event).await,
                            Err(error) => {
                                tracing::error!(error = %error, "Command task panicked, no event delivered");
                            }
                        }
                    });
                }
            }
        }
    }
}

async fn deliver<E>(tx: mpsc::Sender<E>, event: E) {
    if tx.send(event).await.is_err() {
        tracing::warn!("Failed to deliver event (receiver dropped)");
    }
}

/// Wraps a future to catch panics and convert them to errors.
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(crate) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic payload".to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn explode() -> u32 {
        panic!("boom")
    }

    async fn recv_n(rx: &mut mpsc::Receiver<u32>, n: usize) -> Vec<u32> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for event")
                .expect("channel closed");
            out.push(event);
        }
        out
    }

    #[test]
    fn test_len_counts_leaves() {
        let cmd: Command<u32> = Command::batch([
            Command::none(),
            Command::of_msg(1),
            Command::batch([Command::of_msg(2), Command::from_async(async { 3 })]),
        ]);
        assert_eq!(cmd.len(), 3);
        assert!(Command::<u32>::none().is_empty());
        assert!(Command::<u32>::batch(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_of_msg_delivers_once() {
        let (tx, mut rx) = mpsc::channel(8);
        Dispatcher::new(tx).dispatch(Command::of_msg(42u32));

        assert_eq!(recv_n(&mut rx, 1).await, vec![42]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_from_async_delivers_exactly_one_event() {
        let (tx, mut rx) = mpsc::channel(8);
        Dispatcher::new(tx).dispatch(Command::from_async(async { 7u32 }));

        assert_eq!(recv_n(&mut rx, 1).await, vec![7]);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_batch_delivers_every_member() {
        let (tx, mut rx) = mpsc::channel(16);
        let cmd = Command::batch((1..=5u32).map(|n| Command::from_async(async move { n })));
        Dispatcher::new(tx).dispatch(cmd);

        let mut events = recv_n(&mut rx, 5).await;
        events.sort_unstable();
        assert_eq!(events, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_dispatch_does_not_wait_for_slow_member() {
        let (tx, mut rx) = mpsc::channel(8);
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        let slow = Command::from_async(async move {
            let _ = gate_rx.await;
            1u32
        });
        let fast = Command::from_async(async { 2u32 });
        Dispatcher::new(tx).dispatch(Command::batch([slow, fast]));

        // The fast member arrives while the slow one is still parked.
        assert_eq!(recv_n(&mut rx, 1).await, vec![2]);

        gate_tx.send(()).unwrap();
        assert_eq!(recv_n(&mut rx, 1).await, vec![1]);
    }

    #[tokio::test]
    async fn test_panicking_member_does_not_affect_siblings() {
        let (tx, mut rx) = mpsc::channel(8);
        let cmd = Command::batch([
            Command::from_async(async { explode() }),
            Command::from_async(async { 9u32 }),
        ]);
        Dispatcher::new(tx).dispatch(cmd);

        assert_eq!(recv_n(&mut rx, 1).await, vec![9]);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_after_receiver_dropped_is_harmless() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let dispatcher = Dispatcher::new(tx);
        dispatcher.dispatch(Command::of_msg(1u32));
        dispatcher.dispatch(Command::from_async(async { 2u32 }));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_into_events_keeps_batch_order() {
        let cmd = Command::batch([
            Command::from_async(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                1u32
            }),
            Command::of_msg(2),
            Command::none(),
            Command::from_async(async { 3 }),
        ]);
        assert_eq!(cmd.into_events().await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_catch_task_panic_reports_message() {
        let result = catch_task_panic(async { explode() }).await;
        assert_eq!(result, Err("boom".to_string()));

        let result = catch_task_panic(async { 5u32 }).await;
        assert_eq!(result, Ok(5));
    }
}
