//! # postline-mime
//!
//! MIME building blocks for composing outgoing mail.
//!
//! ## Features
//!
//! - **Content types**: `type/subtype` with ordered parameters
//! - **Content type inference**: an injectable extension table for attachments
//! - **Parts**: attachment parts with their headers and body lines
//! - **Multipart**: `multipart/mixed` delimiters around a fixed boundary
//!
//! ## Quick Start
//!
//! ```
//! use postline_mime::{ContentTypeTable, Multipart, Part};
//!
//! let table = ContentTypeTable::default();
//! let attachment = Part::attachment("holiday/photo.JPG", vec![0xff, 0xd8], &table);
//! assert_eq!(attachment.content_type.to_string(), "image/jpg");
//!
//! let multipart = Multipart::default();
//! assert_eq!(multipart.delimiter(), "--boundary1");
//! ```
//!
//! Parts carry raw bytes; no content-transfer-encoding is applied.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod multipart;
mod part;
mod table;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use multipart::{DEFAULT_BOUNDARY, Multipart};
pub use part::{Part, body_lines};
pub use table::{ContentTypeTable, extension_of, file_name_of};
