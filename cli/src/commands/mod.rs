mod helpers;
mod saved;
mod search;

pub(crate) use helpers::{Theme, UiConfig};
pub(crate) use saved::{ExportFormat, cmd_delete, cmd_export, cmd_note, cmd_save, cmd_saved};
pub(crate) use search::{cmd_filters, cmd_random, cmd_search};
