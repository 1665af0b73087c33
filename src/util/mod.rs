//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **URL validation**: media references and outbound service endpoints
//! - **Text processing**: control-character stripping, HTML escaping, date display
//!
//! # Examples
//!
//! ```
//! use gazette::util::{escape_html, validate_media_url};
//!
//! let url = validate_media_url("https://cdn.example.com/cover.webp").unwrap();
//! assert_eq!(url.host_str(), Some("cdn.example.com"));
//!
//! assert_eq!(escape_html("<b>"), "&lt;b&gt;");
//! ```

mod text;
mod url_validator;

pub use text::{escape_html, format_publication_date, strip_control_chars, to_single_line};
pub use url_validator::{validate_endpoint, validate_media_url, UrlValidationError};
