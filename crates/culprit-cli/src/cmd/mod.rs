pub mod completions;
pub mod hunt;
pub mod sim;
