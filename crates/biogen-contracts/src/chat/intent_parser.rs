use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, MULTI_ARG_COMMANDS, NO_ARG_COMMANDS, RAW_ARG_COMMANDS, SINGLE_ID_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub prompt: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            prompt: None,
            command_args: BTreeMap::new(),
        }
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn arg_list(&self, key: &str) -> Vec<String> {
        self.command_args
            .get(key)
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_arg(arg: &str) -> String {
    let parts = split_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

/// Classifies one line of chat input. Slash commands map to actions; any
/// other non-blank text is a direct generation prompt.
pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                let key = if action == "set_locale" {
                    "locale"
                } else {
                    "model"
                };
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert(key.to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, SINGLE_ID_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert("id".to_string(), Value::String(parse_single_arg(arg)));
                return intent;
            }

            if let Some(action) = find_action(&command, MULTI_ARG_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent.command_args.insert(
                    "args".to_string(),
                    Value::Array(split_args(arg).into_iter().map(Value::String).collect()),
                );
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("generate", text);
    intent.prompt = Some(raw_trimmed.to_string());
    intent
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn plain_text_is_a_generate_prompt() {
        let intent = parse_intent("  a glass-winged desert moth  ");
        assert_eq!(intent.action, "generate");
        assert_eq!(intent.prompt.as_deref(), Some("a glass-winged desert moth"));
    }

    #[test]
    fn blank_line_is_noop() {
        assert_eq!(parse_intent("   ").action, "noop");
    }

    #[test]
    fn parse_guided_pairs() {
        let intent = parse_intent("/guided habitat=Ocean \"diet=Energy Feeder\"");
        assert_eq!(intent.action, "guided");
        assert_eq!(
            intent.command_args["args"],
            json!(["habitat=Ocean", "diet=Energy Feeder"])
        );
        assert_eq!(intent.arg_list("args").len(), 2);

        let empty = parse_intent("/guided");
        assert_eq!(empty.command_args["args"], json!([]));
    }

    #[test]
    fn parse_battle_ids() {
        let intent = parse_intent("/battle abyss-01 \"glass stalker\"");
        assert_eq!(intent.action, "battle");
        assert_eq!(intent.arg_list("args"), vec!["abyss-01", "glass stalker"]);
    }

    #[test]
    fn parse_single_id_commands() {
        let show = parse_intent("/show abyss-01");
        assert_eq!(show.action, "show_entry");
        assert_eq!(show.arg_str("id"), Some("abyss-01"));

        let delete = parse_intent("/delete \"two words\"");
        assert_eq!(delete.action, "delete_entry");
        assert_eq!(delete.command_args["id"], json!("two words"));

        assert_eq!(parse_intent("/load x").action, "load_entry");
        assert_eq!(parse_intent("/json x").action, "dump_entry");
        assert_eq!(parse_intent("/show").arg_str("id"), None);
    }

    #[test]
    fn parse_settings_commands() {
        let locale = parse_intent("/locale ko");
        assert_eq!(locale.action, "set_locale");
        assert_eq!(locale.arg_str("locale"), Some("ko"));

        let model = parse_intent("/image_model dryrun-image-1");
        assert_eq!(model.action, "set_image_model");
        assert_eq!(model.arg_str("model"), Some("dryrun-image-1"));
    }

    #[test]
    fn parse_no_arg_commands() {
        assert_eq!(parse_intent("/archive").action, "list_archive");
        assert_eq!(parse_intent("/CLEAR").action, "clear_archive");
        assert_eq!(parse_intent("/exit").action, "quit");
        assert_eq!(parse_intent("/help").action, "help");
    }

    #[test]
    fn parse_unknown_command() {
        let intent = parse_intent("/summon foo bar");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("summon"));
        assert_eq!(intent.command_args["arg"], json!("foo bar"));
    }

    #[test]
    fn lone_slash_is_treated_as_prompt() {
        let intent = parse_intent("/ ");
        assert_eq!(intent.action, "generate");
    }
}
