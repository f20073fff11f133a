//! Typed wrappers around the external tools the engine drives.

pub mod fs;
pub mod image;
pub mod mounts;
pub mod nbd;
pub mod parted;
pub mod sfdisk;

pub use fs::{check_and_resize, make_filesystem, make_swap, FilesystemType};
pub use image::write_image_to_disk;
pub use mounts::unmount_disk;
pub use nbd::{NbdAttachment, NbdSettings};
pub use parted::{PartEnd, Parted, PartitionTable};
pub use sfdisk::{delete_partitions, partprobe, udev_settle, write_gpt_label};
