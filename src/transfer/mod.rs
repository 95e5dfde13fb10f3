//! Transfer module
//!
//! Data-channel collaborators: PASV/PORT channel setup, opening the
//! per-transfer data stream, and streaming file content and listings.

pub mod data_channel;
pub mod file_ops;
pub mod modes;

pub use data_channel::{DataChannel, open_data_stream, setup_active, setup_passive};
pub use file_ops::{append_file, receive_file, send_file, send_listing};
pub use modes::TransferType;
