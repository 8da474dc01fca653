use std::future::Future;

use tokio::{
    sync::{
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        oneshot,
    },
    task::JoinHandle,
};

/// Push notifications from a background producer. Dropping the handle (or
/// calling [`Subscription::unsubscribe`]) stops the producer.
pub struct Subscription<T> {
    updates: UnboundedReceiver<T>,
    failure: oneshot::Receiver<anyhow::Error>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Runs `producer` on the runtime. An error it returns is kept and can be
    /// read with [`Subscription::end_reason`] once `next` yields `None`.
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(UnboundedSender<T>) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (tx, updates) = unbounded_channel();
        let (failed, failure) = oneshot::channel();
        // The channel stays open until the failure is recorded.
        let keep_open = tx.clone();
        let producer = producer(tx);
        let task = tokio::spawn(async move {
            if let Err(err) = producer.await {
                tracing::warn!(err = %format!("{:#}", err), "subscription ended");
                let _ = failed.send(err);
            }
            drop(keep_open);
        });
        Self { updates, failure, task }
    }
}

impl<T> Subscription<T> {
    /// The next notification in emission order, or `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<T> {
        self.updates.recv().await
    }

    /// Why the producer stopped, if it failed.
    pub fn end_reason(&mut self) -> Option<anyhow::Error> {
        self.failure.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::time::Duration;

    #[tokio::test]
    async fn notifications_arrive_in_emission_order() {
        let mut sub = Subscription::spawn(|tx| async move {
            for i in 0..5 {
                if tx.send(i).is_err() {
                    break;
                }
            }
            Ok::<_, anyhow::Error>(())
        });
        let mut seen = Vec::new();
        while let Some(i) = sub.next().await {
            seen.push(i);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(sub.end_reason().is_none());
    }

    #[tokio::test]
    async fn failed_producer_reports_why_it_ended() {
        let mut sub = Subscription::spawn(|tx| async move {
            let _ = tx.send(1u128);
            Err::<(), _>(anyhow!("failed to query account"))
        });
        assert_eq!(sub.next().await, Some(1));
        assert_eq!(sub.next().await, None);
        let reason = sub.end_reason().expect("failure is recorded before the channel closes");
        assert!(reason.to_string().contains("failed to query account"));
    }

    #[tokio::test]
    async fn unsubscribe_stops_the_producer() {
        let (alive_tx, alive_rx) = oneshot::channel::<()>();
        let mut sub = Subscription::spawn(|tx| async move {
            let _alive = alive_tx;
            while tx.send(()).is_ok() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok::<_, anyhow::Error>(())
        });
        assert!(sub.next().await.is_some());
        sub.unsubscribe();
        // The guard is dropped with the aborted task.
        assert!(alive_rx.await.is_err());
    }
}
