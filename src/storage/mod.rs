pub mod device;
pub mod layout;
pub mod store;

pub use device::{BlockDevice, FileDisk, MemDisk};
pub use layout::Inum;
pub use store::{BlockStore, DiskStore, StoreStats};
