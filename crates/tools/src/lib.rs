pub mod text;

pub use text::{contains_ignore_ascii_case, is_html_content_type, left_clip, space_crunch};
