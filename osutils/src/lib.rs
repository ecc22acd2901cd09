pub mod block_devices;
pub mod exe;
pub mod files;
pub mod lsblk;

pub(crate) mod crate_private {
    pub trait Sealed {}
}
