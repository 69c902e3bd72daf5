mod commands;
mod handlers;
mod page;

pub use commands::{Cli, Commands, PageOptions};
pub use handlers::{handle_list, handle_read, handle_write};
pub use page::{PageCommand, PAGE_HELP};
