pub mod output;
pub mod progress;
pub mod template;
