//! Shared types for the epg.db cache importer.
//!
//! This crate holds everything the importer needs that does not touch the
//! database: parsing of composite DVB service references, the buffered event
//! type handed over by EPG source collectors, and the identity helpers used
//! to derive the values the native EPG cache expects.
//!
//! # Identity rules
//!
//! The native cache stores 32-bit hashes and DVB namespaces as signed
//! integers, and has no natural key for events coming from listings
//! sources. The helpers in [`identity`] reproduce its conventions:
//!
//! ```rust
//! use epgdb_types::identity::{normalize_namespace, synthetic_event_id};
//!
//! // DVB-T namespaces EEEExxxx collapse to EEEE0000, then wrap to signed.
//! assert_eq!(normalize_namespace(0xEEEE_1234), 0xEEEE_0000_i64 - 4_294_967_296);
//!
//! // Event ids derived from begin time stay below 65536.
//! assert!(synthetic_event_id(1_700_000_000) < 65536);
//! ```
//!
//! # Service references
//!
//! ```rust
//! use epgdb_types::ServiceRef;
//!
//! let service = ServiceRef::parse("1:0:1:1A2B:3:4:1FFFF:0:0:0:").unwrap();
//! assert_eq!(service.sid, 0x1A2B);
//! assert_eq!(service.dvb_namespace(), 0x1FFFF);
//! ```

pub mod error;
pub mod identity;
pub mod types;
pub mod window;

pub use error::ParseError;
pub use identity::{clamp_duration, normalize_hash, normalize_namespace, split_description, synthetic_event_id};
pub use types::{EpgEvent, ServiceRef, MAX_TITLE_CHARS};
pub use window::ImportWindow;
