//! Path construction for the output tree.

pub mod layout;
pub mod sanitize;

pub use layout::{
    build_folder, create_folder, ensure_unique_path, format_file_size, relative_link,
    unique_path_with,
};
pub use sanitize::{fit_file_name, sanitize};
