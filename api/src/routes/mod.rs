pub mod ask;
pub mod docs;
pub mod upload;
