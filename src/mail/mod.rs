//! Mail I/O: inbound attachment extraction, outbound assembly and submission.

pub mod assembler;
pub mod parser;
pub mod transport;

pub use assembler::MailAssembler;
pub use transport::{MailTransport, SmtpRelay};
