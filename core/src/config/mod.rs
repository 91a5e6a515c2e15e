pub mod load;
pub mod types;

pub use load::{apply_env_overrides, get_swarm_data_dir, load_default, load_from_path, validate};
pub use types::*;
