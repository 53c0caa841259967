pub mod report;

pub use report::{render_users, sort_users, OutputFormat, SortField, SortOrder};
