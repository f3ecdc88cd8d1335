#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "text_model",
        action: "set_text_model",
    },
    CommandSpec {
        command: "image_model",
        action: "set_image_model",
    },
    CommandSpec {
        command: "locale",
        action: "set_locale",
    },
];

pub(crate) const SINGLE_ID_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "show",
        action: "show_entry",
    },
    CommandSpec {
        command: "json",
        action: "dump_entry",
    },
    CommandSpec {
        command: "load",
        action: "load_entry",
    },
    CommandSpec {
        command: "delete",
        action: "delete_entry",
    },
];

pub(crate) const MULTI_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "guided",
        action: "guided",
    },
    CommandSpec {
        command: "battle",
        action: "battle",
    },
    CommandSpec {
        command: "save_image",
        action: "save_image",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "archive",
        action: "list_archive",
    },
    CommandSpec {
        command: "clear",
        action: "clear_archive",
    },
    CommandSpec {
        command: "options",
        action: "list_options",
    },
    CommandSpec {
        command: "status",
        action: "show_status",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/guided",
    "/options",
    "/locale",
    "/text_model",
    "/image_model",
    "/status",
    "/archive",
    "/show",
    "/json",
    "/load",
    "/delete",
    "/clear",
    "/battle",
    "/save_image",
    "/quit",
];
