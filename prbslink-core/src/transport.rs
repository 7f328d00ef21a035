//! Transport seam
//!
//! The engine never owns a socket or a device. Transports are supplied by
//! the embedding application and only see encoded bytes.

use crate::constants::TransportKind;
use crate::error::TransportError;
use crate::monitor::LinkMonitor;
use bytes::Bytes;
use std::collections::VecDeque;

#[cfg(feature = "logging")]
use tracing::warn;

/// Outbound half of a link
pub trait Transport {
    /// Hand one encoded frame to the link
    fn send(&mut self, frame: Bytes) -> Result<(), TransportError>;
}

/// Inbound half of a link
pub trait RxSink {
    /// Accept bytes received from the link
    fn deliver(&mut self, bytes: Bytes);
}

/// How received bytes map onto frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Each delivery holds exactly one encoded frame
    Datagram,
    /// Deliveries are arbitrary chunks of a byte stream
    Stream,
}

impl DeliveryMode {
    /// Natural delivery mode of a transport kind
    pub fn for_transport(kind: TransportKind) -> Self {
        match kind {
            TransportKind::Ethernet => DeliveryMode::Datagram,
            TransportKind::PointToPoint => DeliveryMode::Stream,
        }
    }
}

/// A monitor paired with the delivery mode of its link
#[derive(Debug)]
pub struct LinkEndpoint {
    monitor: LinkMonitor,
    mode: DeliveryMode,
}

impl LinkEndpoint {
    /// Wrap `monitor` using the natural mode of its transport
    pub fn new(monitor: LinkMonitor) -> Self {
        let mode = DeliveryMode::for_transport(monitor.link().transport);
        Self::with_mode(monitor, mode)
    }

    /// Wrap `monitor` with an explicit delivery mode
    pub fn with_mode(monitor: LinkMonitor, mode: DeliveryMode) -> Self {
        Self { monitor, mode }
    }

    /// Delivery mode in use
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// The wrapped monitor
    pub fn monitor(&self) -> &LinkMonitor {
        &self.monitor
    }

    /// The wrapped monitor, mutably
    pub fn monitor_mut(&mut self) -> &mut LinkMonitor {
        &mut self.monitor
    }

    /// Unwrap the monitor
    pub fn into_monitor(self) -> LinkMonitor {
        self.monitor
    }

    /// Generate and send up to `count` frames; returns how many were sent
    ///
    /// A transport error is counted as a link error and ends the burst.
    pub fn pump_tx<T: Transport + ?Sized>(&mut self, transport: &mut T, count: usize) -> usize {
        for sent in 0..count {
            let frame = self.monitor.next_tx_frame();
            if let Err(e) = transport.send(frame) {
                #[cfg(feature = "logging")]
                warn!("Link {} transmit failed: {}", self.monitor.link(), e);
                #[cfg(not(feature = "logging"))]
                let _ = e;
                self.monitor.record_link_error();
                return sent;
            }
        }
        count
    }
}

impl RxSink for LinkEndpoint {
    fn deliver(&mut self, bytes: Bytes) {
        match self.mode {
            DeliveryMode::Datagram => self.monitor.submit_rx(bytes),
            DeliveryMode::Stream => self.monitor.submit_rx_stream(&bytes),
        }
    }
}

/// In-memory transport that queues frames until drained
#[derive(Debug, Default)]
pub struct QueueTransport {
    queue: VecDeque<Bytes>,
    mtu: Option<usize>,
    capacity: Option<usize>,
}

impl QueueTransport {
    /// Unbounded queue without an MTU
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject frames larger than `mtu` bytes
    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Reject sends once `capacity` frames are queued
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Frames currently queued
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take every queued frame in send order
    pub fn drain(&mut self) -> Vec<Bytes> {
        self.queue.drain(..).collect()
    }
}

impl Transport for QueueTransport {
    fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        if let Some(mtu) = self.mtu {
            if frame.len() > mtu {
                return Err(TransportError::FrameTooLarge {
                    size: frame.len(),
                    mtu,
                });
            }
        }
        if self.capacity.is_some_and(|cap| self.queue.len() >= cap) {
            return Err(TransportError::Saturated);
        }
        self.queue.push_back(frame);
        Ok(())
    }
}
