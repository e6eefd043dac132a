pub mod cmd;
pub mod mount_table;
pub mod symlink;
