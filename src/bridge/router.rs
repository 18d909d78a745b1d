//! Inbound message routing.
//!
//! The router task is the transport's receive context: it drains the
//! transport's incoming handle, stages control payloads into the matching
//! inbound queue, and fires the host trigger so the staged work gets
//! drained. It never touches the live model.
//!
//! Messages on topics the bridge did not subscribe for are dropped with a
//! report.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::inbound::InboundQueue;
use crate::topics::TopicSet;
use crate::transport::IncomingMessage;

use super::trigger::SolveTrigger;

/// The inbound queues the router feeds.
#[derive(Debug, Clone)]
pub(crate) struct RouterQueues {
    /// Parameter-control staging queue.
    pub parameter_control: Arc<InboundQueue>,
    /// Position-control staging queue.
    pub position_control: Arc<InboundQueue>,
}

/// Spawn the router task on `handle`.
pub(crate) fn spawn(
    handle: &Handle,
    incoming: UnboundedReceiver<IncomingMessage>,
    topics: TopicSet,
    queues: RouterQueues,
    trigger: SolveTrigger,
) -> JoinHandle<()> {
    handle.spawn(run(incoming, topics, queues, trigger))
}

/// Drain the incoming handle until the transport closes it.
async fn run(
    mut incoming: UnboundedReceiver<IncomingMessage>,
    topics: TopicSet,
    queues: RouterQueues,
    trigger: SolveTrigger,
) {
    while let Some(message) = incoming.recv().await {
        route(&message, &topics, &queues, &trigger);
    }
    log::debug!("[Router] Incoming stream ended");
}

/// Stage one message and wake the host, or drop it with a report.
fn route(
    message: &IncomingMessage,
    topics: &TopicSet,
    queues: &RouterQueues,
    trigger: &SolveTrigger,
) {
    log::debug!(
        "[Router] Rcv[{}]: {} bytes",
        message.topic,
        message.payload.len()
    );

    if message.topic == topics.parameter_control {
        queues.parameter_control.enqueue(message.payload.clone());
    } else if message.topic == topics.position_control {
        queues.position_control.enqueue(message.payload.clone());
    } else {
        let error = crate::control::ControlError::UnexpectedTopic(message.topic.clone());
        log::warn!("[Router] Dropping message: {error}");
        return;
    }

    // Changes to live parameters have to happen on the host context, so
    // staging always ends with a wake request.
    trigger.request();
}
