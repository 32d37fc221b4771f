mod server;

pub use server::{CONFIG_FILE_NAME, FileConfig, ServerConfig};
