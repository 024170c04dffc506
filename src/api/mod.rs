pub mod format;
pub mod responses;

pub use format::{decode_body, MessageResponse, ResponseBody, ResponseFormat};
