pub mod server;

pub use server::{PeerlensMcpServer, run_server};
