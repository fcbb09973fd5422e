mod command_input;
mod input;
mod key_result;
mod search_form;

pub use command_input::{CommandEvent, CommandInput};
pub use key_result::KeyResult;
pub use search_form::{non_blank, FormEvent, FormField, FormValues, SearchForm};
