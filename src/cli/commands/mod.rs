mod harvest;
mod init;
mod status;

pub use harvest::cmd_harvest;
pub use init::cmd_init;
pub use status::cmd_status;
