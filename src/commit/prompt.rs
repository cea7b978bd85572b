//! Chat transcript construction for commit message generation.
//!
//! The transcript is always `system → [example user, example assistant] →
//! user diff`. Building it is a pure function of its inputs.

use crate::config::Settings;
use crate::llm::ChatMessage;

use super::gitmoji::{full_gitmoji_list, type_table};

/// Worked example embedded in the default system prompt.
const TEMPLATE_EXAMPLE_DIFF: &str = r#"diff --git a/src/server.ts b/src/server.ts
index ad4db42..f3b18a9 100644
--- a/src/server.ts
+++ b/src/server.ts
@@ -10,7 +10,7 @@ import {
 initWinstonLogger();

 const app = express();
-const port = 7799;
+const PORT = 7799;

 app.use(express.json());

@@ -34,6 +34,6 @@ app.use((_, res, next) => {
 // ROUTES
 app.use(PROTECTED_ROUTER_URL, protectedRouter);

-app.listen(port, () => {
-  console.log(`Server listening on port ${port}`);
+app.listen(process.env.PORT || PORT, () => {
+  console.log(`Server listening on port ${PORT}`);
 });"#;

const TEMPLATE_EXAMPLE_SUBJECT: &str = "refactor(server): optimize server port configuration";
const TEMPLATE_EXAMPLE_BODY: &str = "- rename port variable to uppercase (PORT) to follow constant naming convention\n- add environment variable port support for flexible deployment";

/// Diff of the priming exchange sent when one-shot mode is on.
const ONE_SHOT_DIFF: &str = r#"diff --git a/src/cache.rs b/src/cache.rs
index 3e1c0a2..9b7d4f1 100644
--- a/src/cache.rs
+++ b/src/cache.rs
@@ -1,12 +1,18 @@
 use std::collections::HashMap;
+use std::time::{Duration, Instant};

 pub struct Cache {
-    entries: HashMap<String, String>,
+    entries: HashMap<String, (String, Instant)>,
+    ttl: Duration,
 }

 impl Cache {
-    pub fn get(&self, key: &str) -> Option<&String> {
-        self.entries.get(key)
+    pub fn get(&self, key: &str) -> Option<&String> {
+        self.entries
+            .get(key)
+            .filter(|(_, at)| at.elapsed() < self.ttl)
+            .map(|(value, _)| value)
     }
 }"#;

const ONE_SHOT_SUBJECT: &str = "feat(cache): expire entries after a ttl";
const ONE_SHOT_BODY: &str = "- store the insertion time next to each cached value\n- skip entries older than the configured ttl on lookup";

/// The settings that shape a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSettings {
    pub language: String,
    pub emoji_enabled: bool,
    pub full_gitmoji_spec: bool,
    pub system_prompt: Option<String>,
    pub one_shot_example: bool,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for PromptSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            language: settings.language().to_string(),
            emoji_enabled: settings.emoji_enabled,
            full_gitmoji_spec: settings.full_gitmoji_spec,
            system_prompt: settings.system_prompt().map(str::to_string),
            one_shot_example: settings.one_shot_example,
        }
    }
}

/// Build the transcript for one diff.
///
/// `extra_context` is free text the user already typed as the commit
/// message; blank context is dropped.
pub fn build_prompt(
    diff: &str,
    extra_context: Option<&str>,
    settings: &PromptSettings,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(4);
    messages.push(ChatMessage::system(system_prompt(settings)));

    if settings.one_shot_example {
        messages.push(ChatMessage::user(ONE_SHOT_DIFF));
        messages.push(ChatMessage::assistant(styled_message(
            settings,
            "✨",
            ONE_SHOT_SUBJECT,
            ONE_SHOT_BODY,
        )));
    }

    let user = match extra_context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!("Additional context:\n{}\n\n{}", context, diff),
        None => diff.to_string(),
    };
    messages.push(ChatMessage::user(user));
    messages
}

/// The configured override verbatim, or the default template.
pub fn system_prompt(settings: &PromptSettings) -> String {
    if let Some(custom) = settings
        .system_prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
    {
        return custom.to_string();
    }
    default_system_prompt(settings)
}

fn styled_message(settings: &PromptSettings, emoji: &str, subject: &str, body: &str) -> String {
    if settings.emoji_enabled {
        format!("{} {}\n\n{}", emoji, subject, body)
    } else {
        format!("{}\n\n{}", subject, body)
    }
}

fn default_system_prompt(settings: &PromptSettings) -> String {
    let language = settings.language.as_str();
    let header = if settings.emoji_enabled {
        "<emoji> <type>(<scope>): <subject>"
    } else {
        "<type>(<scope>): <subject>"
    };

    let gitmoji_section = if settings.emoji_enabled && settings.full_gitmoji_spec {
        format!(
            "\n## Gitmoji Reference\n\nPick the emoji that best matches the change from the full gitmoji set:\n\n{}\n",
            full_gitmoji_list()
        )
    } else {
        String::new()
    };

    let emoji_rule = if settings.emoji_enabled {
        "- Start the subject line with the emoji of its type\n"
    } else {
        "- Do not use emoji\n"
    };

    let example_output = styled_message(
        settings,
        "♻️",
        TEMPLATE_EXAMPLE_SUBJECT,
        TEMPLATE_EXAMPLE_BODY,
    );

    format!(
        r#"# Git Commit Message Guide

## Role and Purpose

You are a git commit message generator. When you receive a git diff, output ONLY the commit message itself. No explanations, no questions, no additional comments.

## Output Format

### Single Type Changes

```
{header}

<body>
```

### Multiple Type Changes

```
{header}

<body of type 1>

{header}

<body of type 2>
```

## Type Reference

{table}{gitmoji_section}
## Writing Rules

### Subject Line

- Scope must be in English
- Imperative mood
- No capitalization
- No period at end
- Max 50 characters
{emoji_rule}- Must be in {language}

### Body

- Bullet points with "-"
- Max 72 characters per line
- Explain what changed and why
- Must be in {language}

## Critical Requirements

1. Output ONLY the commit message
2. Write ONLY in {language}
3. NO additional text or explanations
4. NO questions or comments
5. NO formatting instructions or metadata

## Additional Context

The user message may start with an "Additional context:" block before the diff. Let it guide the commit message while keeping every rule above.

## Example

INPUT:

{example_diff}

OUTPUT:

{example_output}

Remember: all output MUST be in {language}. Respond with the commit message and nothing else."#,
        header = header,
        table = type_table(settings.emoji_enabled),
        gitmoji_section = gitmoji_section,
        emoji_rule = emoji_rule,
        language = language,
        example_diff = TEMPLATE_EXAMPLE_DIFF,
        example_output = example_output,
    )
}
