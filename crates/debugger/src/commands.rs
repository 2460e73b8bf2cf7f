//! Translation of `evaluate` expressions into debug server commands.

use std::sync::LazyLock;

use regex::Regex;

/// Command the debug server runs a Lua chunk with.
pub const RUN_CODE: &str = "run_code";
/// Command that answers with the entries of a variable scope or table.
pub const REQUEST_VARIABLE: &str = "request_variable";

static CONSOLE_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!([^ ]+) ?(.*)").expect("must compile"));

/// `!name a b` becomes the server command `name` with arguments `["a", "b"]`,
/// anything else is run as Lua code.
pub fn parse_expression(expression: &str) -> (String, Vec<String>) {
    match CONSOLE_COMMAND.captures(expression) {
        Some(caps) => {
            let rest = &caps[2];
            let args = if rest.is_empty() {
                Vec::new()
            } else {
                rest.split(' ').map(str::to_string).collect()
            };
            (caps[1].to_string(), args)
        }
        None => (RUN_CODE.to_string(), vec![expression.to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_command_with_arguments() {
        let (command, args) = parse_expression("!start race editor");
        assert_eq!(command, "start");
        assert_eq!(args, vec!["race", "editor"]);
    }

    #[test]
    fn console_command_without_arguments() {
        let (command, args) = parse_expression("!refreshall");
        assert_eq!(command, "refreshall");
        assert!(args.is_empty());
    }

    #[test]
    fn double_spaces_give_empty_arguments() {
        let (_, args) = parse_expression("!say a  b");
        assert_eq!(args, vec!["a", "", "b"]);
    }

    #[test]
    fn plain_expression_is_lua_code() {
        assert_eq!(
            parse_expression("getPlayerCount()"),
            (RUN_CODE.to_string(), vec!["getPlayerCount()".to_string()])
        );
        // a lone bang has no command name
        assert_eq!(
            parse_expression("!"),
            (RUN_CODE.to_string(), vec!["!".to_string()])
        );
    }
}
