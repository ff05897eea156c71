//! Attachment processing pipeline.
//!
//! Every inbound email flows through:
//! 1. `event`: bus notification → `InboundEvent`
//! 2. `resolver`: local recipient + sender authorisation
//! 3. `classifier`: accept, convert, or drop each attachment
//! 4. `packer`: size-bounded bins, at most `MAX_BINS` per destination
//! 5. `processor`: orchestration and guaranteed cleanup

pub mod classifier;
pub mod event;
pub mod packer;
pub mod processor;
pub mod resolver;
pub mod types;

pub use processor::{EventProcessor, ProcessorDeps, ProcessorSettings};
pub use types::{DeliveryReport, InboundEvent, PolicyRecord};
