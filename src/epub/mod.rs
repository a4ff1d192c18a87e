//! EPUB container packaging.

mod writer;

pub use writer::{EpubPackager, write_epub_dir, write_epub_dir_to_writer};
