//! Escape-verb registry for `\?` help output and verb discovery.
//!
//! Every meta-command is a backslash followed by a single verb character.
//! The registry holds structured metadata for each verb, enabling
//! categorized help and lookup by escape character.

/// Categories for grouping verbs in `\?` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerbCategory {
    Session,
    Conversation,
    Management,
    Diagnostics,
}

impl VerbCategory {
    pub fn label(&self) -> &'static str {
        match self {
            VerbCategory::Session => "Session",
            VerbCategory::Conversation => "Conversation",
            VerbCategory::Management => "Management",
            VerbCategory::Diagnostics => "Diagnostics",
        }
    }

    pub fn all() -> &'static [VerbCategory] {
        &[
            VerbCategory::Session,
            VerbCategory::Conversation,
            VerbCategory::Management,
            VerbCategory::Diagnostics,
        ]
    }
}

impl std::fmt::Display for VerbCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Metadata describing one escape verb.
#[derive(Debug, Clone)]
pub struct VerbInfo {
    /// The character following the backslash, e.g. 'a' for `\a`.
    pub escape: char,
    /// Spelled-out verb name shown in help.
    pub name: &'static str,
    /// One-line description shown in `\?`.
    pub description: &'static str,
    /// Usage pattern, e.g. `\a list | stop <id>`.
    pub usage: &'static str,
    /// Category for grouping in `\?`.
    pub category: VerbCategory,
}

/// Registry holding all escape verbs with their metadata.
pub struct VerbRegistry {
    verbs: Vec<VerbInfo>,
}

#[allow(dead_code)]
impl VerbRegistry {
    pub fn new() -> Self {
        Self { verbs: Vec::new() }
    }

    /// Create a registry pre-populated with every built-in verb.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    pub fn register(&mut self, info: VerbInfo) {
        self.verbs.push(info);
    }

    fn register_defaults(&mut self) {
        self.register(VerbInfo {
            escape: 'q',
            name: "quit",
            description: "Close the engine and exit",
            usage: "\\q",
            category: VerbCategory::Session,
        });
        self.register(VerbInfo {
            escape: '?',
            name: "help",
            description: "Show this help message",
            usage: "\\?",
            category: VerbCategory::Session,
        });

        self.register(VerbInfo {
            escape: 'r',
            name: "raw",
            description: "Send a pre-parsed JSON command to the assistant",
            usage: "\\r <json>",
            category: VerbCategory::Conversation,
        });
        self.register(VerbInfo {
            escape: 't',
            name: "thingtalk",
            description: "Execute a ThingTalk program directly",
            usage: "\\t <code>",
            category: VerbCategory::Conversation,
        });
        self.register(VerbInfo {
            escape: 'c',
            name: "choice",
            description: "Answer a pending choice by its number",
            usage: "\\c <number>",
            category: VerbCategory::Conversation,
        });

        self.register(VerbInfo {
            escape: 'a',
            name: "app",
            description: "List or stop running automations",
            usage: "\\a list | stop <id>",
            category: VerbCategory::Management,
        });
        self.register(VerbInfo {
            escape: 'd',
            name: "device",
            description: "List paired devices or run OAuth pairing",
            usage: "\\d list | start-oauth2 <kind> | complete-oauth2 <url>",
            category: VerbCategory::Management,
        });
        self.register(VerbInfo {
            escape: 'm',
            name: "messaging",
            description: "Inspect messaging identities and accounts",
            usage: "\\m self | identity <id> | search <name>",
            category: VerbCategory::Management,
        });
        self.register(VerbInfo {
            escape: 'p',
            name: "permission",
            description: "List or revoke granted permissions",
            usage: "\\p list | revoke <id>",
            category: VerbCategory::Management,
        });

        self.register(VerbInfo {
            escape: 'i',
            name: "diagnostic",
            description: "Run the read-only diagnostic query battery",
            usage: "\\i",
            category: VerbCategory::Diagnostics,
        });
    }

    /// Look up a verb by its escape character.
    pub fn lookup(&self, escape: char) -> Option<&VerbInfo> {
        self.verbs.iter().find(|v| v.escape == escape)
    }

    /// Generate categorized help text.
    pub fn help_text(&self) -> String {
        let mut output = String::from("\nCommands start with '\\'; anything else goes to the assistant.\n");

        for category in VerbCategory::all() {
            let verbs: Vec<&VerbInfo> = self
                .verbs
                .iter()
                .filter(|v| v.category == *category)
                .collect();

            if verbs.is_empty() {
                continue;
            }

            output.push_str(&format!("\n  {}:\n", category.label()));
            for verb in verbs {
                output.push_str(&format!(
                    "    {:<12} {:<48} {}\n",
                    verb.name, verb.usage, verb.description
                ));
            }
        }

        output
    }

    pub fn all(&self) -> &[VerbInfo] {
        &self.verbs
    }

    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }
}
