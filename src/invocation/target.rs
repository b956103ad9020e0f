//! Target forms of symbol names.

use std::fmt;

/// How a symbol name binds at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetForm {
    /// `Class#method`: bound against a resolved target object
    Instance { class: String, method: String },
    /// `Class.method`: bound against the class itself
    Static { class: String, method: String },
    /// A bare top-level export
    TopLevel { name: String },
}

impl TargetForm {
    pub fn parse(name: &str) -> Self {
        if let Some((class, method)) = name.split_once('#') {
            return Self::Instance {
                class: class.to_string(),
                method: method.to_string(),
            };
        }
        if let Some((class, method)) = name.split_once('.') {
            return Self::Static {
                class: class.to_string(),
                method: method.to_string(),
            };
        }
        Self::TopLevel {
            name: name.to_string(),
        }
    }

    pub fn class(&self) -> Option<&str> {
        match self {
            Self::Instance { class, .. } | Self::Static { class, .. } => Some(class),
            Self::TopLevel { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Instance { .. } => "instance",
            Self::Static { .. } => "static",
            Self::TopLevel { .. } => "top_level",
        }
    }
}

impl fmt::Display for TargetForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance { class, method } => write!(f, "{}#{}", class, method),
            Self::Static { class, method } => write!(f, "{}.{}", class, method),
            Self::TopLevel { name } => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            TargetForm::parse("TextChannel#send"),
            TargetForm::Instance { class: "TextChannel".into(), method: "send".into() }
        );
        assert_eq!(
            TargetForm::parse("PermissionsBitField.resolve"),
            TargetForm::Static { class: "PermissionsBitField".into(), method: "resolve".into() }
        );
        assert_eq!(TargetForm::parse("userMention").class(), None);
        assert_eq!(TargetForm::parse("Guild#fetch").to_string(), "Guild#fetch");
    }
}
