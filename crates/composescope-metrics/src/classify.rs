use crate::commands::CommandSet;

const HELP_FLAG: &str = "--help";
const END_OF_OPTIONS: &str = "--";

/// Reduces an argument vector to a privacy-safe command signature
#[derive(Clone, Debug, Default)]
pub struct CommandClassifier {
    commands: CommandSet,
}

impl CommandClassifier {
    pub fn new(commands: CommandSet) -> Self {
        Self { commands }
    }

    /// Classify the arguments (without the executable name) of an invocation
    ///
    /// Only known commands, known command flags and `--help` are kept.
    /// `--help` always leads the result. Nothing after `--` is inspected, and
    /// once a non-management command is seen only command flags are matched.
    pub fn classify<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut result = String::new();
        let mut only_flags = false;

        for arg in args {
            let arg = arg.as_ref();
            if arg == HELP_FLAG {
                result = format!("{} {}", arg, result).trim().to_string();
                continue;
            }
            if arg == END_OF_OPTIONS {
                break;
            }

            let is_command = self.commands.is_command(arg);
            if self.commands.is_command_flag(arg) || (!only_flags && is_command) {
                result = format!("{} {}", result, arg).trim().to_string();
                if is_command && !self.commands.is_management_command(arg) {
                    only_flags = true;
                }
            }
        }

        result
    }
}

/// Whether the arguments carry an exact `--quiet` or `-q` token
pub fn has_quiet_flag<S: AsRef<str>>(args: &[S]) -> bool {
    args.iter()
        .any(|a| matches!(a.as_ref(), "--quiet" | "-q"))
}
