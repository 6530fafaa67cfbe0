mod nudge;
mod workbench;

pub use crate::state::nudge::*;
pub use crate::state::workbench::*;
