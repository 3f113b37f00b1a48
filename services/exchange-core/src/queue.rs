//! Per-market command queues
//!
//! Every market gets one bounded mpsc channel and one consumer task, so all
//! commands for a symbol are processed strictly in admission order by a
//! single engine instance. The consumer parks on `recv().await` when the
//! queue is empty; there is no polling loop.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use types::errors::ExchangeError;
use types::ids::{OrderId, UserId};

use crate::engine::MatchEngine;

/// A command consumed by a market's engine task
#[derive(Debug)]
pub enum EngineCommand {
    /// Match an already-admitted order
    Submit { order_id: OrderId },
    /// Cancel inside the engine's serialization context; the result is
    /// reported back through `ack`
    Cancel {
        order_id: OrderId,
        user_id: UserId,
        ack: oneshot::Sender<Result<(), ExchangeError>>,
    },
}

/// Producer half of one market's command queue
#[derive(Debug, Clone)]
pub struct MarketQueue {
    tx: mpsc::Sender<EngineCommand>,
}

impl MarketQueue {
    pub fn new(depth: usize) -> (Self, mpsc::Receiver<EngineCommand>) {
        let (tx, rx) = mpsc::channel(depth);
        (Self { tx }, rx)
    }

    /// Hand an admitted order to the consumer without blocking
    ///
    /// Fails when the queue is full or the consumer is gone; admission rolls
    /// back its side effects on failure.
    pub fn enqueue_submit(&self, order_id: OrderId) -> Result<(), ExchangeError> {
        self.tx
            .try_send(EngineCommand::Submit { order_id })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    ExchangeError::Store("market queue is full".to_string())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    ExchangeError::Store("market consumer has stopped".to_string())
                }
            })
    }

    /// Request a cancel and wait for the engine's verdict
    pub async fn enqueue_cancel(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<(), ExchangeError> {
        let (ack, response) = oneshot::channel();
        self.tx
            .send(EngineCommand::Cancel {
                order_id,
                user_id,
                ack,
            })
            .await
            .map_err(|_| ExchangeError::Store("market consumer has stopped".to_string()))?;
        response
            .await
            .map_err(|_| ExchangeError::Store("market consumer dropped the request".to_string()))?
    }
}

/// Spawn the single consumer task for one market
///
/// The engine rebuilds its book from stored orders before consuming. The
/// task ends when every producer handle is dropped.
pub fn spawn_consumer(
    mut engine: MatchEngine,
    mut rx: mpsc::Receiver<EngineCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        engine.rebuild();
        while let Some(command) = rx.recv().await {
            match command {
                EngineCommand::Submit { order_id } => {
                    if let Err(err) = engine.process_submit(order_id) {
                        tracing::error!(
                            symbol = engine.symbol(),
                            %order_id,
                            %err,
                            "match pass failed"
                        );
                    }
                }
                EngineCommand::Cancel {
                    order_id,
                    user_id,
                    ack,
                } => {
                    let result = engine.process_cancel(order_id, user_id);
                    // The caller may have timed out; that is their problem
                    let _ = ack.send(result);
                }
            }
        }
        tracing::info!(symbol = engine.symbol(), "market consumer stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_submit_full_queue() {
        let (queue, _rx) = MarketQueue::new(1);
        queue.enqueue_submit(OrderId::new()).unwrap();

        let err = queue.enqueue_submit(OrderId::new()).unwrap_err();
        assert!(matches!(err, ExchangeError::Store(_)));
    }

    #[tokio::test]
    async fn test_enqueue_after_consumer_gone() {
        let (queue, rx) = MarketQueue::new(4);
        drop(rx);

        let err = queue.enqueue_submit(OrderId::new()).unwrap_err();
        assert!(matches!(err, ExchangeError::Store(_)));

        let err = queue
            .enqueue_cancel(OrderId::new(), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Store(_)));
    }
}
