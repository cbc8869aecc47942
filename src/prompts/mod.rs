pub mod composer;
pub mod parser;
pub mod themes;
pub mod title;

pub use composer::{compose, transformation_prompt};
pub use parser::StructuredResponseParser;
pub use themes::{ThemeCatalog, ThemeConfig, DEFAULT_THEME};
pub use title::{refine_title, TitleOutcome};
