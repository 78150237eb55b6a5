#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandEntry {
    pub command: &'static str,
    pub action: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TextCommandEntry {
    pub command: &'static str,
    pub action: &'static str,
    pub arg_key: &'static str,
}

/// Commands whose whole remainder is one free-text argument.
pub(crate) const TEXT_ARG_COMMANDS: &[TextCommandEntry] = &[
    TextCommandEntry {
        command: "mode",
        action: "set_mode",
        arg_key: "mode",
    },
    TextCommandEntry {
        command: "style",
        action: "set_style",
        arg_key: "style",
    },
    TextCommandEntry {
        command: "items",
        action: "set_items",
        arg_key: "items",
    },
    TextCommandEntry {
        command: "refine",
        action: "refine",
        arg_key: "instruction",
    },
    TextCommandEntry {
        command: "palette",
        action: "apply_palette",
        arg_key: "palette",
    },
    TextCommandEntry {
        command: "save",
        action: "toggle_save",
        arg_key: "index",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        command: "upload",
        action: "upload",
    },
    CommandEntry {
        command: "export",
        action: "export",
    },
];

/// Commands taking several shell-quoted arguments.
pub(crate) const MULTI_ARG_COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        command: "link",
        action: "update_link",
    },
    CommandEntry {
        command: "add_item",
        action: "add_item",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        command: "help",
        action: "help",
    },
    CommandEntry {
        command: "generate",
        action: "generate",
    },
    CommandEntry {
        command: "revert",
        action: "revert",
    },
    CommandEntry {
        command: "undo",
        action: "revert",
    },
    CommandEntry {
        command: "redo",
        action: "redo",
    },
    CommandEntry {
        command: "history",
        action: "history",
    },
    CommandEntry {
        command: "list",
        action: "list",
    },
    CommandEntry {
        command: "saved",
        action: "saved",
    },
    CommandEntry {
        command: "styles",
        action: "styles",
    },
    CommandEntry {
        command: "palettes",
        action: "palettes",
    },
    CommandEntry {
        command: "status",
        action: "status",
    },
    CommandEntry {
        command: "dismiss",
        action: "dismiss",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/upload",
    "/mode",
    "/style",
    "/styles",
    "/items",
    "/generate",
    "/refine",
    "/palettes",
    "/palette",
    "/revert",
    "/redo",
    "/history",
    "/list",
    "/save",
    "/saved",
    "/link",
    "/add_item",
    "/status",
    "/dismiss",
    "/export",
];
