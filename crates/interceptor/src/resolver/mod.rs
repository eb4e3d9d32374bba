#![forbid(unsafe_code)]

mod name;
mod process;

pub use name::{FileNameInfo, NameContext, resolve_file_path};
pub use process::{ProcessTable, ProcfsProcessTable, resolve_process_path};
