//! Partition layout planning.
//!
//! Planning is pure: it turns the configured sizes and the root partition
//! slot into an ordered list of [`LayoutOp`]s. Start offsets are not known
//! until the previous operation has run, so creations always start at the
//! free-space start reported at execution time.

use std::fmt;

use crate::error::{ProvisionError, Result};
use crate::size::{MiB, Size, SizeSpec};

/// Added to every computed end offset so adjacent partitions never overlap
/// under parted's inclusive-end semantics.
pub const END_GUARD: MiB = MiB(1);

/// End offset of a `size` partition starting at `start`, guard included.
pub fn partition_end(start: MiB, size: MiB) -> Result<MiB> {
    start
        .checked_add(size)
        .and_then(|end| end.checked_add(END_GUARD))
        .ok_or_else(|| ProvisionError::InvalidSize(format!("{size} from {start}")))
}

/// How far a partition extends from its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    Sized(MiB),
    /// To the end of the disk.
    Rest,
}

impl From<SizeSpec> for Extent {
    fn from(spec: SizeSpec) -> Self {
        match spec {
            SizeSpec::Fixed(size) => Extent::Sized(size.to_mib()),
            SizeSpec::Rest => Extent::Rest,
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::Sized(mib) => write!(f, "{mib}"),
            Extent::Rest => f.write_str("rest of disk"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Swap,
    Root,
    Data,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Swap => "swap",
            Role::Root => "root",
            Role::Data => "data",
        })
    }
}

/// One partition-editing or formatting operation on the root disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOp {
    /// Move the end of the root partition; a sized extent counts from its start.
    ResizeRoot { ordinal: u32, extent: Extent },
    RemovePartition { ordinal: u32 },
    /// Create a partition at the current free-space start.
    CreatePartition { ordinal: u32, extent: Extent, role: Role },
    FormatSwap { ordinal: u32 },
    FormatData { ordinal: u32 },
    /// Populate the partition from the staged image.
    CopyImage { ordinal: u32 },
}

impl fmt::Display for LayoutOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutOp::ResizeRoot { ordinal, extent } => {
                write!(f, "resize root partition {ordinal} to {extent}")
            }
            LayoutOp::RemovePartition { ordinal } => write!(f, "remove partition {ordinal}"),
            LayoutOp::CreatePartition {
                ordinal,
                extent,
                role,
            } => write!(f, "create {role} partition {ordinal} ({extent})"),
            LayoutOp::FormatSwap { ordinal } => write!(f, "format partition {ordinal} as swap"),
            LayoutOp::FormatData { ordinal } => {
                write!(f, "format partition {ordinal} with data filesystem")
            }
            LayoutOp::CopyImage { ordinal } => {
                write!(f, "copy image root into partition {ordinal}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    RootOnly,
    SwapPlusRoot,
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayoutKind::RootOnly => "root only",
            LayoutKind::SwapPlusRoot => "swap + root",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    pub kind: LayoutKind,
    pub ops: Vec<LayoutOp>,
}

/// Plan the root disk layout.
///
/// Without swap the image's root partition is kept and resized in place.
/// With swap the root partition is removed, swap takes its slot, a new root
/// partition follows it and is populated from the image.
pub fn plan_layout(root: SizeSpec, swap: Option<Size>, root_ordinal: u32) -> LayoutPlan {
    let root_extent = Extent::from(root);

    let Some(swap) = swap else {
        let mut ops = vec![LayoutOp::ResizeRoot {
            ordinal: root_ordinal,
            extent: root_extent,
        }];
        if !root.is_rest() {
            let data = root_ordinal + 1;
            ops.push(LayoutOp::CreatePartition {
                ordinal: data,
                extent: Extent::Rest,
                role: Role::Data,
            });
            ops.push(LayoutOp::FormatData { ordinal: data });
        }
        return LayoutPlan {
            kind: LayoutKind::RootOnly,
            ops,
        };
    };

    let swap_slot = root_ordinal;
    let root_slot = root_ordinal + 1;
    let mut ops = vec![
        LayoutOp::RemovePartition {
            ordinal: root_ordinal,
        },
        LayoutOp::CreatePartition {
            ordinal: swap_slot,
            extent: Extent::Sized(swap.to_mib()),
            role: Role::Swap,
        },
        LayoutOp::FormatSwap { ordinal: swap_slot },
        LayoutOp::CreatePartition {
            ordinal: root_slot,
            extent: root_extent,
            role: Role::Root,
        },
    ];
    if !root.is_rest() {
        let data = root_slot + 1;
        ops.push(LayoutOp::CreatePartition {
            ordinal: data,
            extent: Extent::Rest,
            role: Role::Data,
        });
        ops.push(LayoutOp::FormatData { ordinal: data });
    }
    ops.push(LayoutOp::CopyImage { ordinal: root_slot });

    LayoutPlan {
        kind: LayoutKind::SwapPlusRoot,
        ops,
    }
}
