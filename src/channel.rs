use crate::error::TransportError;
use crate::message::{OutboundMessage, PriorityDecision};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::time::Duration;

/// The coordinator's side of the link to the decision service: a bounded outbound stream
/// of events and an unbounded inbound stream of decisions. Neither side ever blocks.
pub struct PriorityChannel {
    outbound: Sender<OutboundMessage>,
    inbound: Receiver<PriorityDecision>,
    /// Kept so that [Self::decision_sender] works even if the service end is dropped.
    inbound_tx: Sender<PriorityDecision>,
}

/// The decision service's side of a [PriorityChannel].
#[derive(Clone)]
pub struct ServiceEndpoint {
    events: Receiver<OutboundMessage>,
    decisions: Sender<PriorityDecision>,
}

impl PriorityChannel {
    /// Creates a connected channel and service endpoint.
    /// At most `capacity` outbound messages wait for the service; further sends are dropped.
    pub fn pair(capacity: usize) -> (PriorityChannel, ServiceEndpoint) {
        let (outbound, events) = crossbeam_channel::bounded(capacity.max(1));
        let (decisions, inbound) = crossbeam_channel::unbounded();
        let channel = PriorityChannel {
            outbound,
            inbound,
            inbound_tx: decisions.clone(),
        };
        (channel, ServiceEndpoint { events, decisions })
    }

    /// Queues a message for the decision service without waiting.
    pub fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        self.outbound.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Disconnected(_) => TransportError::Disconnected,
        })
    }

    /// Takes every decision that has arrived so far, in arrival order.
    pub fn drain_decisions(&self) -> Vec<PriorityDecision> {
        self.inbound.try_iter().collect()
    }

    /// Gets a sender that asynchronous transports can use to deliver decisions.
    pub fn decision_sender(&self) -> Sender<PriorityDecision> {
        self.inbound_tx.clone()
    }
}

impl ServiceEndpoint {
    /// Takes the next outbound message if there is one.
    pub fn try_recv(&self) -> Result<Option<OutboundMessage>, TransportError> {
        match self.events.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    /// Waits up to `timeout` for the next outbound message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<OutboundMessage>, TransportError> {
        match self.events.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    /// Takes every outbound message queued so far.
    pub fn drain(&self) -> Vec<OutboundMessage> {
        self.events.try_iter().collect()
    }

    /// Delivers a decision to the coordinator.
    pub fn decide(&self, decision: PriorityDecision) -> Result<(), TransportError> {
        self.decisions
            .send(decision)
            .map_err(|_| TransportError::Disconnected)
    }
}
