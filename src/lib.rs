//! # cardfile
//!
//! File-backed structured storage in two independent pieces:
//!
//! - **RecordStore**: an ordered collection of string-valued records held in
//!   one JSON document, with atomic whole-document replace on every mutation
//! - **AppendLog**: an append-only text file of timestamped lines, tailed
//!   backward in bounded chunks
//!
//! Neither component depends on the other, and neither holds state between
//! calls: every operation goes back to disk.
//!
//! ## Example
//!
//! ```ignore
//! use cardfile::{AppendLog, Record, RecordStore, StoreConfig};
//!
//! let store = RecordStore::new(StoreConfig {
//!     path: "./contacts.json".into(),
//!     ..Default::default()
//! });
//!
//! store.append(Record::new()
//!     .field("name", "Ada")
//!     .field("phone", "555-0100"))?;
//! store.remove_by_key("Ada")?;
//!
//! let log = AppendLog::new("./logs/app.log");
//! log.append("program started")?;
//! for line in log.tail(5)? {
//!     println!("{line}");
//! }
//! ```

pub mod clock;
pub mod error;
pub mod log;
pub mod store;
pub mod types;

// Re-exports
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, StoreError};
pub use log::AppendLog;
pub use store::{RecordStore, StoreConfig};
pub use types::{Collection, Record};
