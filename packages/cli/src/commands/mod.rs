pub mod apply;
pub mod check;
pub mod export;

pub use apply::{apply, ApplyArgs};
pub use check::{check, CheckArgs};
pub use export::{export, ExportArgs};
