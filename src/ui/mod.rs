pub mod panels;
pub mod viewport;
