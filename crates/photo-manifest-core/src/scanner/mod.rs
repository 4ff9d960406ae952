pub mod walk;

pub use walk::collect_files;
