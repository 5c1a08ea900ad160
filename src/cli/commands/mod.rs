mod init;
mod serve;
mod setup;
mod users;

pub use init::cmd_init;
pub use serve::cmd_serve;
pub use setup::{cmd_reset, cmd_setup};
pub use users::{cmd_list_users, cmd_set_active};
