//! Stream message envelope

use serde::{Deserialize, Serialize};

use super::{MediaSample, StreamDescriptor};

/// One message on the bidirectional stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Sender-assigned sequence number
    #[serde(default)]
    pub sequence_number: u64,

    /// Sequence number of the inbound message this one acknowledges (0 = none)
    #[serde(default)]
    pub ack_sequence_number: u64,

    pub payload: Payload,
}

impl StreamMessage {
    pub fn descriptor(sequence_number: u64, descriptor: StreamDescriptor) -> Self {
        Self { sequence_number, ack_sequence_number: 0, payload: Payload::Descriptor(descriptor) }
    }

    pub fn sample(sequence_number: u64, sample: MediaSample) -> Self {
        Self { sequence_number, ack_sequence_number: 0, payload: Payload::Sample(sample) }
    }

    pub fn with_ack(mut self, ack_sequence_number: u64) -> Self {
        self.ack_sequence_number = ack_sequence_number;
        self
    }

    /// Sample payload, if this is a sample message
    pub fn as_sample(&self) -> Option<&MediaSample> {
        match &self.payload {
            Payload::Sample(sample) => Some(sample),
            Payload::Descriptor(_) => None,
        }
    }

    /// Descriptor payload, if this is a handshake message
    pub fn as_descriptor(&self) -> Option<&StreamDescriptor> {
        match &self.payload {
            Payload::Descriptor(descriptor) => Some(descriptor),
            Payload::Sample(_) => None,
        }
    }
}

/// Message payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Descriptor(StreamDescriptor),
    Sample(MediaSample),
}
