mod feedback;
mod galaxy;
mod helpers;
mod log;
mod moments;
mod stats;
mod summary;
mod sync;

pub(crate) use feedback::cmd_feedback;
pub(crate) use galaxy::cmd_galaxy;
pub(crate) use log::cmd_log;
pub(crate) use moments::{cmd_delete, cmd_favorite, cmd_list};
pub(crate) use stats::cmd_stats;
pub(crate) use summary::cmd_summary;
pub(crate) use sync::cmd_sync;
