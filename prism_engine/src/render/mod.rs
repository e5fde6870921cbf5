/// Render module - backend-neutral rendering types and logic

pub mod types;
pub mod config;
pub mod output;
pub mod pass;
pub mod attachment;
pub mod command_state;
pub mod frame;
pub mod reflection;
pub mod vertex_layout;
pub mod output_binding;
pub mod descriptor;
pub mod pipeline_key;
pub mod mipmap;

pub use types::*;
pub use config::*;
pub use output::*;
pub use pass::*;
pub use attachment::*;
pub use command_state::*;
pub use frame::*;
pub use reflection::*;
pub use vertex_layout::*;
pub use output_binding::*;
pub use descriptor::*;
pub use pipeline_key::*;
pub use mipmap::*;
