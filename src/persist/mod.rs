//! Scene persistence inside exported images

pub mod png_text;

pub use png_text::{embed_payload, extract_payload, is_container_format};
