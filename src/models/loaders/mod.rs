pub mod text_loader;
pub mod toml_loader;

pub use text_loader::load_all_answer_files;
pub use toml_loader::load_exam;
