use std::collections::BTreeSet;

/// Top-level command names known to the CLI
const COMMANDS: &[&str] = &[
    "attach", "build", "commit", "convert", "cp", "create", "diff", "down", "events", "exec",
    "export", "history", "images", "import", "info", "inspect", "kill", "load", "login", "logout",
    "logs", "ls", "pause", "port", "ps", "pull", "push", "rename", "restart", "rm", "rmi", "run",
    "save", "scale", "search", "show", "start", "stats", "stop", "tag", "top", "unpause", "up",
    "update", "use", "version", "wait",
];

/// Command groups that take a subcommand
const MANAGEMENT_COMMANDS: &[&str] = &[
    "builder",
    "buildx",
    "checkpoint",
    "compose",
    "config",
    "container",
    "context",
    "ecs",
    "image",
    "manifest",
    "network",
    "node",
    "plugin",
    "scan",
    "secret",
    "service",
    "stack",
    "swarm",
    "system",
    "trust",
    "volume",
];

/// Flags that identify a command on their own
const COMMAND_FLAGS: &[&str] = &["--version", "-v"];

/// Immutable reference sets used to classify an argument vector
///
/// Built once at startup and handed to [`crate::CommandClassifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSet {
    commands: BTreeSet<String>,
    management_commands: BTreeSet<String>,
    command_flags: BTreeSet<String>,
}

impl CommandSet {
    /// Create an empty set (nothing is telemetry-relevant)
    pub fn empty() -> Self {
        Self {
            commands: BTreeSet::new(),
            management_commands: BTreeSet::new(),
            command_flags: BTreeSet::new(),
        }
    }

    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn with_management_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.management_commands
            .extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn with_command_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// A top-level command or a management command
    pub fn is_command(&self, word: &str) -> bool {
        self.commands.contains(word) || self.is_management_command(word)
    }

    pub fn is_management_command(&self, word: &str) -> bool {
        self.management_commands.contains(word)
    }

    pub fn is_command_flag(&self, word: &str) -> bool {
        self.command_flags.contains(word)
    }
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::empty()
            .with_commands(COMMANDS.iter().copied())
            .with_management_commands(MANAGEMENT_COMMANDS.iter().copied())
            .with_command_flags(COMMAND_FLAGS.iter().copied())
    }
}
