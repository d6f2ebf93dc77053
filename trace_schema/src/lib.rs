#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![allow(clippy::needless_return)]

//! Wire-format types shared by everything that speaks the EventHeader
//! tracepoint convention: the fixed event prefix, its extension chain, and
//! the closed sum types (severity level, opcode, extension kind) that give
//! those bytes meaning.
//!
//! This crate is intentionally tiny and dependency-free: it is the bottom of
//! the dependency graph, shared by the decoder and by anything that walks
//! `perf.data` captures.

pub mod enums;
pub mod header;

pub use enums::ExtensionKind;
pub use enums::HeaderFlags;
pub use enums::Level;
pub use enums::Opcode;
pub use header::EventHeader;
pub use header::EventHeaderExtension;
