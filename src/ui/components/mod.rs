mod confirm;
mod input;
mod key_result;
mod prompt_input;

pub use confirm::ConfirmPrompt;
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use prompt_input::{PromptEvent, PromptInput};
