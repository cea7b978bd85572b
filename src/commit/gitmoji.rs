//! Commit type tables used by the default system prompt.

/// A conventional commit type and how it is annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitKind {
    pub name: &'static str,
    pub emoji: &'static str,
    pub description: &'static str,
    pub example_scopes: &'static str,
}

/// Conventional types, each with its gitmoji.
pub const CONVENTIONAL_TYPES: &[CommitKind] = &[
    CommitKind {
        name: "feat",
        emoji: "✨",
        description: "New feature",
        example_scopes: "user, payment",
    },
    CommitKind {
        name: "fix",
        emoji: "🐛",
        description: "Bug fix",
        example_scopes: "auth, data",
    },
    CommitKind {
        name: "docs",
        emoji: "📝",
        description: "Documentation",
        example_scopes: "README, API",
    },
    CommitKind {
        name: "style",
        emoji: "💄",
        description: "Code style",
        example_scopes: "formatting",
    },
    CommitKind {
        name: "refactor",
        emoji: "♻️",
        description: "Code refactoring",
        example_scopes: "utils, helpers",
    },
    CommitKind {
        name: "perf",
        emoji: "⚡️",
        description: "Performance",
        example_scopes: "query, cache",
    },
    CommitKind {
        name: "test",
        emoji: "✅",
        description: "Testing",
        example_scopes: "unit, e2e",
    },
    CommitKind {
        name: "build",
        emoji: "📦",
        description: "Build system",
        example_scopes: "cargo, npm",
    },
    CommitKind {
        name: "ci",
        emoji: "👷",
        description: "CI config",
        example_scopes: "actions, jenkins",
    },
    CommitKind {
        name: "chore",
        emoji: "🔧",
        description: "Other changes",
        example_scopes: "scripts, config",
    },
    CommitKind {
        name: "i18n",
        emoji: "🌐",
        description: "Internationalization",
        example_scopes: "locale, translation",
    },
];

/// One entry of the full gitmoji vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gitmoji {
    pub emoji: &'static str,
    pub description: &'static str,
}

/// The broader gitmoji set offered when full gitmoji mode is on.
pub const FULL_GITMOJI: &[Gitmoji] = &[
    Gitmoji {
        emoji: "🎨",
        description: "Improve structure / format of the code",
    },
    Gitmoji {
        emoji: "⚡️",
        description: "Improve performance",
    },
    Gitmoji {
        emoji: "🔥",
        description: "Remove code or files",
    },
    Gitmoji {
        emoji: "🐛",
        description: "Fix a bug",
    },
    Gitmoji {
        emoji: "🚑️",
        description: "Critical hotfix",
    },
    Gitmoji {
        emoji: "✨",
        description: "Introduce new features",
    },
    Gitmoji {
        emoji: "📝",
        description: "Add or update documentation",
    },
    Gitmoji {
        emoji: "🚀",
        description: "Deploy stuff",
    },
    Gitmoji {
        emoji: "💄",
        description: "Add or update the UI and style files",
    },
    Gitmoji {
        emoji: "🎉",
        description: "Begin a project",
    },
    Gitmoji {
        emoji: "✅",
        description: "Add, update, or pass tests",
    },
    Gitmoji {
        emoji: "🔒️",
        description: "Fix security or privacy issues",
    },
    Gitmoji {
        emoji: "🔐",
        description: "Add or update secrets",
    },
    Gitmoji {
        emoji: "🔖",
        description: "Release / version tags",
    },
    Gitmoji {
        emoji: "🚨",
        description: "Fix compiler / linter warnings",
    },
    Gitmoji {
        emoji: "🚧",
        description: "Work in progress",
    },
    Gitmoji {
        emoji: "💚",
        description: "Fix CI build",
    },
    Gitmoji {
        emoji: "⬇️",
        description: "Downgrade dependencies",
    },
    Gitmoji {
        emoji: "⬆️",
        description: "Upgrade dependencies",
    },
    Gitmoji {
        emoji: "📌",
        description: "Pin dependencies to specific versions",
    },
    Gitmoji {
        emoji: "👷",
        description: "Add or update CI build system",
    },
    Gitmoji {
        emoji: "📈",
        description: "Add or update analytics or track code",
    },
    Gitmoji {
        emoji: "♻️",
        description: "Refactor code",
    },
    Gitmoji {
        emoji: "➕",
        description: "Add a dependency",
    },
    Gitmoji {
        emoji: "➖",
        description: "Remove a dependency",
    },
    Gitmoji {
        emoji: "🔧",
        description: "Add or update configuration files",
    },
    Gitmoji {
        emoji: "🔨",
        description: "Add or update development scripts",
    },
    Gitmoji {
        emoji: "🌐",
        description: "Internationalization and localization",
    },
    Gitmoji {
        emoji: "✏️",
        description: "Fix typos",
    },
    Gitmoji {
        emoji: "⏪️",
        description: "Revert changes",
    },
    Gitmoji {
        emoji: "🔀",
        description: "Merge branches",
    },
    Gitmoji {
        emoji: "📦️",
        description: "Add or update compiled files or packages",
    },
    Gitmoji {
        emoji: "👽️",
        description: "Update code due to external API changes",
    },
    Gitmoji {
        emoji: "🚚",
        description: "Move or rename resources",
    },
    Gitmoji {
        emoji: "📄",
        description: "Add or update license",
    },
    Gitmoji {
        emoji: "💥",
        description: "Introduce breaking changes",
    },
    Gitmoji {
        emoji: "🍱",
        description: "Add or update assets",
    },
    Gitmoji {
        emoji: "♿️",
        description: "Improve accessibility",
    },
    Gitmoji {
        emoji: "💡",
        description: "Add or update comments in source code",
    },
    Gitmoji {
        emoji: "🗃️",
        description: "Perform database related changes",
    },
    Gitmoji {
        emoji: "🔊",
        description: "Add or update logs",
    },
    Gitmoji {
        emoji: "🔇",
        description: "Remove logs",
    },
    Gitmoji {
        emoji: "🏗️",
        description: "Make architectural changes",
    },
    Gitmoji {
        emoji: "🤡",
        description: "Mock things",
    },
    Gitmoji {
        emoji: "🙈",
        description: "Add or update a .gitignore file",
    },
    Gitmoji {
        emoji: "🏷️",
        description: "Add or update types",
    },
    Gitmoji {
        emoji: "🥅",
        description: "Catch errors",
    },
    Gitmoji {
        emoji: "🗑️",
        description: "Deprecate code that needs to be cleaned up",
    },
    Gitmoji {
        emoji: "⚰️",
        description: "Remove dead code",
    },
    Gitmoji {
        emoji: "🧪",
        description: "Add a failing test",
    },
    Gitmoji {
        emoji: "🩹",
        description: "Simple fix for a non-critical issue",
    },
    Gitmoji {
        emoji: "🧵",
        description: "Add or update code related to multithreading or concurrency",
    },
    Gitmoji {
        emoji: "🦺",
        description: "Add or update code related to validation",
    },
];

/// Markdown table of the conventional types, with an emoji column when
/// `with_emoji` is set.
pub fn type_table(with_emoji: bool) -> String {
    let mut table = if with_emoji {
        String::from(
            "| Type | Emoji | Description | Example Scopes |\n| --- | --- | --- | --- |\n",
        )
    } else {
        String::from("| Type | Description | Example Scopes |\n| --- | --- | --- |\n")
    };

    for kind in CONVENTIONAL_TYPES {
        if with_emoji {
            table.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                kind.name, kind.emoji, kind.description, kind.example_scopes
            ));
        } else {
            table.push_str(&format!(
                "| {} | {} | {} |\n",
                kind.name, kind.description, kind.example_scopes
            ));
        }
    }
    table
}

/// Bulleted list of every gitmoji in [`FULL_GITMOJI`].
pub fn full_gitmoji_list() -> String {
    FULL_GITMOJI
        .iter()
        .map(|g| format!("- {} {}", g.emoji, g.description))
        .collect::<Vec<_>>()
        .join("\n")
}
