#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandAction {
    SelectImage,
    SelectModel,
    SelectPreset,
    SetPrompt,
    SetNoiseLevel,
    SetScientificMode,
    ListModels,
    ListPresets,
    ShowSettings,
    Enhance,
    Show,
    Download,
    Compare,
    Preview,
    Help,
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: CommandAction,
}

/// Commands whose argument is passed through verbatim (names contain spaces).
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "model",
        action: CommandAction::SelectModel,
    },
    CommandSpec {
        command: "preset",
        action: CommandAction::SelectPreset,
    },
    CommandSpec {
        command: "prompt",
        action: CommandAction::SetPrompt,
    },
    CommandSpec {
        command: "noise",
        action: CommandAction::SetNoiseLevel,
    },
    CommandSpec {
        command: "scientific",
        action: CommandAction::SetScientificMode,
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "image",
        action: CommandAction::SelectImage,
    },
    CommandSpec {
        command: "upload",
        action: CommandAction::SelectImage,
    },
    CommandSpec {
        command: "download",
        action: CommandAction::Download,
    },
    CommandSpec {
        command: "compare",
        action: CommandAction::Compare,
    },
    CommandSpec {
        command: "preview",
        action: CommandAction::Preview,
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "models",
        action: CommandAction::ListModels,
    },
    CommandSpec {
        command: "presets",
        action: CommandAction::ListPresets,
    },
    CommandSpec {
        command: "settings",
        action: CommandAction::ShowSettings,
    },
    CommandSpec {
        command: "enhance",
        action: CommandAction::Enhance,
    },
    CommandSpec {
        command: "show",
        action: CommandAction::Show,
    },
    CommandSpec {
        command: "help",
        action: CommandAction::Help,
    },
    CommandSpec {
        command: "quit",
        action: CommandAction::Quit,
    },
    CommandSpec {
        command: "exit",
        action: CommandAction::Quit,
    },
];

pub const SHELL_HELP_COMMANDS: &[&str] = &[
    "/image PATH",
    "/model NAME|N",
    "/preset NAME|N",
    "/prompt [TEXT]",
    "/noise 0-50",
    "/scientific [on|off]",
    "/models",
    "/presets",
    "/settings",
    "/enhance",
    "/show",
    "/download [DIR]",
    "/compare [DIR]",
    "/preview [PATH]",
    "/help",
    "/quit",
];
