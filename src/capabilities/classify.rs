//! Name-based behavior classification.
//!
//! Pure and deterministic: the same `(name, kind)` always yields the same
//! class. Declarations that cannot be called are always `read`; callables
//! are tokenized and matched against four vocabularies in priority order
//! (dangerous, admin, write, read).

use super::symbol::{BehaviorClass, SymbolKind};

const DANGEROUS: &[&str] = &[
    "ban", "purge", "destroy", "wipe", "prune", "nuke", "bulk", "terminate", "obliterate",
];

const ADMIN: &[&str] = &[
    "kick", "unban", "role", "roles", "webhook", "webhooks", "permission", "permissions",
    "overwrite", "overwrites", "timeout", "moderate", "moderation", "integration",
    "integrations", "owner", "ownership", "transfer", "disable", "enable", "lock", "unlock",
    "mute", "unmute", "deafen", "undeafen",
];

const WRITE: &[&str] = &[
    "create", "send", "set", "remove", "delete", "edit", "update", "add", "post", "put",
    "patch", "reply", "react", "pin", "unpin", "crosspost", "clone", "join", "leave",
    "archive", "unarchive", "move", "upload", "clear", "follow", "start", "end", "stop",
    "publish", "trigger", "suppress", "modify", "sweep", "defer", "respond", "register",
    "sync", "apply", "append", "insert", "push", "write", "reset", "rename", "splice",
];

const READ: &[&str] = &[
    "get", "list", "fetch", "has", "is", "can", "find", "resolve", "search", "count", "to",
    "json", "equals", "includes", "filter", "map", "first", "last", "random", "keys",
    "values", "entries", "deconstruct", "generate", "format", "escape", "mention", "parse",
    "view", "read", "compare", "at", "from", "preview", "timestamp",
];

/// Split a symbol name into lowercase word tokens.
///
/// Separators are `.`, `#`, `_`, `-`, whitespace and any other
/// non-alphanumeric character. Words also break on camelCase boundaries and
/// at the end of an acronym (`HTTPServer` → `http`, `server`).
pub fn tokenize(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            flush(&mut current, &mut tokens);
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            // a non-empty token implies chars[i - 1] is alphanumeric
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                flush(&mut current, &mut tokens);
            }
        }
        current.extend(c.to_lowercase());
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// Classify a symbol by name and kind.
pub fn classify(name: &str, kind: SymbolKind) -> BehaviorClass {
    if !kind.is_callable() {
        return BehaviorClass::Read;
    }

    let tokens = tokenize(name);
    let has_any = |vocab: &[&str]| tokens.iter().any(|t| vocab.contains(&t.as_str()));

    if has_any(DANGEROUS) {
        BehaviorClass::Dangerous
    } else if has_any(ADMIN) {
        BehaviorClass::Admin
    } else if has_any(WRITE) {
        BehaviorClass::Write
    } else if has_any(READ) {
        BehaviorClass::Read
    } else {
        BehaviorClass::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_boundaries() {
        assert_eq!(tokenize("purgeMessages"), vec!["purge", "messages"]);
        assert_eq!(tokenize("GUILD_CREATE"), vec!["guild", "create"]);
        assert_eq!(tokenize("TextChannel#bulkDelete"), vec!["text", "channel", "bulk", "delete"]);
        assert_eq!(tokenize("HTTPServer.start"), vec!["http", "server", "start"]);
        assert_eq!(tokenize("setURL"), vec!["set", "url"]);
        assert_eq!(tokenize("fetch-user name"), vec!["fetch", "user", "name"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_classify_known_examples() {
        assert_eq!(classify("purgeMessages", SymbolKind::Function), BehaviorClass::Dangerous);
        assert_eq!(classify("fetchUser", SymbolKind::Function), BehaviorClass::Read);
        assert_eq!(classify("GUILD_CREATE", SymbolKind::Event), BehaviorClass::Read);
    }

    #[test]
    fn test_priority_order() {
        // dangerous beats write
        assert_eq!(classify("TextChannel#bulkDelete", SymbolKind::Function), BehaviorClass::Dangerous);
        // admin beats read
        assert_eq!(classify("Guild#fetchWebhooks", SymbolKind::Function), BehaviorClass::Admin);
        // write beats read
        assert_eq!(classify("Message#edit", SymbolKind::Function), BehaviorClass::Write);
        assert_eq!(classify("GuildMember#kick", SymbolKind::Function), BehaviorClass::Admin);
    }

    #[test]
    fn test_exact_token_match_only() {
        // "unban" is its own token and does not contain the "ban" token
        assert_eq!(classify("GuildMemberManager#unban", SymbolKind::Function), BehaviorClass::Admin);
        // "bans" is not "ban"
        assert_eq!(classify("Guild#fetchBans", SymbolKind::Function), BehaviorClass::Read);
    }

    #[test]
    fn test_declarations_are_read() {
        assert_eq!(classify("GUILD_BAN_ADD", SymbolKind::Event), BehaviorClass::Read);
        assert_eq!(classify("PermissionFlagsBits", SymbolKind::Enum), BehaviorClass::Read);
        assert_eq!(classify("MessageCreateOptions", SymbolKind::Interface), BehaviorClass::Read);
    }

    #[test]
    fn test_unknown_when_no_vocabulary_matches() {
        assert_eq!(classify("bold", SymbolKind::Function), BehaviorClass::Unknown);
        assert_eq!(classify("hyperlink", SymbolKind::Function), BehaviorClass::Unknown);
    }
}
