//! Small helpers shared by the rendering layer.
//!
//! - **Text**: sanitising network-supplied titles, width-aware truncation,
//!   relative ages and link hosts
//! - **Links**: checking a story URL before handing it to the browser

mod link;
mod text;

pub use link::{validate_url_for_open, UrlValidationError};
pub use text::{format_age, sanitize_title, truncate_to_width, url_host};
