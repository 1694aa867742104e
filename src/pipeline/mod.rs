//! Streaming response processing.
//!
//! ```text
//! Raw Bytes → LineBuffer → adapter.parse_stream_chunk → UnifiedStreamIncrement
//!     │            │                 │
//!   HTTP     line framing,      vendor JSON,
//!            CR stripping       sentinel check
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`decode::StreamDecoder`] | Cancellable, single-pass decoder for one response body |
//! | [`decode::LineBuffer`] | Partial-line buffering across chunk boundaries |

pub mod decode;

pub use decode::{IncrementStream, LineBuffer, StreamDecoder};
