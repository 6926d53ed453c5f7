mod command_registry;
mod command_parser;

pub use command_parser::{parse_command, parse_noise_level, parse_toggle, ShellCommand};
pub use command_registry::{CommandAction, SHELL_HELP_COMMANDS};
