//! Segdelta: segment-map binary diffing over stitched virtual sources.
//!
//! The crate provides:
//! - Virtual byte sources over memory buffers, files, or ordered segment
//!   compositions (`source`)
//! - A concurrency proxy giving many logical cursors over one physically
//!   shared source (`shared`)
//! - A positional difference engine producing observable segment maps
//!   (`diff`)
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use segdelta::diff::{CancellationToken, DifferenceEngine};
//! use segdelta::source::VirtualSource;
//!
//! let old = Arc::new(VirtualSource::from_bytes(b"hello old world".to_vec()).unwrap());
//! let new = Arc::new(VirtualSource::from_bytes(b"hello new world".to_vec()).unwrap());
//!
//! let mut engine = DifferenceEngine::new();
//! engine
//!     .calculate(Some(&old), &new, None, &CancellationToken::new())
//!     .unwrap();
//!
//! // Stitching the result back together reproduces the new version.
//! let stitched = VirtualSource::from_segments(engine.result().to_vec()).unwrap();
//! let mut bytes = vec![0u8; stitched.len() as usize];
//! stitched.read(&mut bytes).unwrap();
//! assert_eq!(bytes, b"hello new world");
//! ```

pub mod diff;
pub mod error;
pub mod shared;
pub mod source;

pub use diff::{CancellationToken, DifferenceEngine};
pub use error::{Error, Result};
pub use shared::{SharedSource, SourceView};
pub use source::{SegmentDescriptor, VirtualSource};
