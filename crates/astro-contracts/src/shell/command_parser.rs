use super::command_registry::{
    CommandAction, CommandSpec, NO_ARG_COMMANDS, RAW_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
};
use crate::request::{NOISE_LEVEL_MAX, NOISE_LEVEL_MIN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Noop,
    Run { action: CommandAction, arg: String },
    Unknown { command: String, arg: String },
    Text(String),
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<CommandAction> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_single_path_arg(arg: &str) -> String {
    if arg.trim().is_empty() {
        return String::new();
    }
    let parts: Vec<String> = match shell_words::split(arg) {
        Ok(parts) => parts.into_iter().filter(|value| !value.is_empty()).collect(),
        Err(_) => arg.split_whitespace().map(str::to_string).collect(),
    };
    parts.join(" ")
}

pub fn parse_command(text: &str) -> ShellCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return ShellCommand::Noop;
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        return ShellCommand::Text(raw_trimmed.to_string());
    };
    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if command_len == 0 {
        return ShellCommand::Text(raw_trimmed.to_string());
    }

    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
        return ShellCommand::Run {
            action,
            arg: arg.to_string(),
        };
    }
    if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
        return ShellCommand::Run {
            action,
            arg: parse_single_path_arg(arg),
        };
    }
    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return ShellCommand::Run {
            action,
            arg: String::new(),
        };
    }

    ShellCommand::Unknown {
        command,
        arg: arg.to_string(),
    }
}

/// Parses a slider value, rejecting anything outside `[0, 50]`.
pub fn parse_noise_level(arg: &str) -> Result<f64, String> {
    let value: f64 = arg
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", arg.trim()))?;
    if !value.is_finite() || !(NOISE_LEVEL_MIN..=NOISE_LEVEL_MAX).contains(&value) {
        return Err(format!(
            "noise level must be between {NOISE_LEVEL_MIN:.0} and {NOISE_LEVEL_MAX:.0}"
        ));
    }
    Ok(value)
}

/// `None` for an empty argument (toggle); `Err` for anything unrecognized.
pub fn parse_toggle(arg: &str) -> Result<Option<bool>, String> {
    match arg.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "on" | "true" | "yes" | "1" => Ok(Some(true)),
        "off" | "false" | "no" | "0" => Ok(Some(false)),
        other => Err(format!("expected on or off, got '{other}'")),
    }
}
