use flume::{Receiver, RecvError, Sender};
use tokio::sync::oneshot;

/// Request/reply plumbing between the public handle and the command loop.
/// Requests travel over an unbounded flume channel; a request that expects
/// an answer carries a oneshot sender for the loop to reply on.
pub(crate) fn reply_channel<Req, Rep>() -> (RequestSender<Req, Rep>, RequestReceiver<Req, Rep>) {
    let (tx, rx) = flume::unbounded();
    (
        RequestSender { tx },
        RequestReceiver { rx, pending: None },
    )
}

type Envelope<Req, Rep> = (Req, Option<oneshot::Sender<Rep>>);

#[derive(Debug)]
pub(crate) struct RequestSender<Req, Rep> {
    tx: Sender<Envelope<Req, Rep>>,
}

// Derived Clone would require Req: Clone.
impl<Req, Rep> Clone for RequestSender<Req, Rep> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<Req, Rep> RequestSender<Req, Rep> {
    pub(crate) async fn send_async(&self, request: Req) -> Result<(), ChannelClosed> {
        self.tx
            .send_async((request, None))
            .await
            .map_err(|_| ChannelClosed)
    }

    /// Synchronous send, for callers without an async context such as the
    /// transport's finish callback.
    pub(crate) fn send(&self, request: Req) -> Result<(), ChannelClosed> {
        self.tx.send((request, None)).map_err(|_| ChannelClosed)
    }

    pub(crate) async fn request(&self, request: Req) -> Result<Rep, ChannelClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send_async((request, Some(reply_tx)))
            .await
            .map_err(|_| ChannelClosed)?;
        reply_rx.await.map_err(|_| ChannelClosed)
    }
}

#[derive(Debug)]
pub(crate) struct RequestReceiver<Req, Rep> {
    rx: Receiver<Envelope<Req, Rep>>,
    pending: Option<oneshot::Sender<Rep>>,
}

impl<Req, Rep> RequestReceiver<Req, Rep> {
    pub(crate) async fn recv_async(&mut self) -> Result<Req, RecvError> {
        let (request, reply) = self.rx.recv_async().await?;
        self.pending = reply;
        Ok(request)
    }

    /// Answers the most recently received request. A request sent without a
    /// reply slot ignores the answer.
    pub(crate) fn reply(&mut self, response: Rep) {
        if let Some(pending) = self.pending.take() {
            // The requester may have given up waiting; nothing to do then.
            let _ = pending.send(response);
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("session command loop has shut down")]
pub(crate) struct ChannelClosed;
