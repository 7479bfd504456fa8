pub mod inline;

pub use inline::{encode_inline, inline_get};
