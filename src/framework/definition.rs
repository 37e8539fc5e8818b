//! Static command definitions as announced to the platform.
//!
//! A [`CommandDefinition`] serializes to the exact JSON object the bulk
//! overwrite endpoints expect, so the publisher can hand a slice of them
//! straight to the HTTP client.

use regex::Regex;
use serde::{Serialize, Serializer};
use serenity::model::Permissions;
use std::sync::LazyLock;
use thiserror::Error;

/// Platform limit on the number of options (and choices) per command.
pub const MAX_OPTIONS: usize = 25;
/// Platform limit on description length, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 100;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-_\p{Ll}\p{N}]{1,32}$")
        .expect("command name pattern is valid")
});

/// Reasons a definition would be rejected by the platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("invalid name '{0}': expected 1-32 lowercase letters, digits, '-' or '_'")]
    InvalidName(String),

    #[error("'{0}': description must be 1-{MAX_DESCRIPTION_LENGTH} characters")]
    InvalidDescription(String),

    #[error("'{name}': at most {MAX_OPTIONS} {what} allowed, got {count}")]
    TooMany {
        name: String,
        what: &'static str,
        count: usize,
    },

    #[error("'{0}': duplicate option name '{1}'")]
    DuplicateOption(String, String),

    #[error("'{0}': required options must precede optional ones")]
    RequiredAfterOptional(String),
}

/// Parameter types understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl OptionKind {
    /// Wire value of the option type.
    pub fn code(self) -> u8 {
        match self {
            OptionKind::SubCommand => 1,
            OptionKind::SubCommandGroup => 2,
            OptionKind::String => 3,
            OptionKind::Integer => 4,
            OptionKind::Boolean => 5,
            OptionKind::User => 6,
            OptionKind::Channel => 7,
            OptionKind::Role => 8,
            OptionKind::Mentionable => 9,
            OptionKind::Number => 10,
            OptionKind::Attachment => 11,
        }
    }

    fn is_subcommand(self) -> bool {
        matches!(self, OptionKind::SubCommand | OptionKind::SubCommandGroup)
    }
}

impl Serialize for OptionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// A fixed value the user may pick for an option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: serde_json::Value,
}

/// One typed parameter of a command (or a sub-command with its own options).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOption {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    pub fn new(kind: OptionKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            choices: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Adds a string choice.
    pub fn choice(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.choices.push(OptionChoice {
            name: name.into(),
            value: serde_json::Value::String(value.into()),
        });
        self
    }

    /// Adds a nested option; only meaningful for sub-commands.
    pub fn sub_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    fn validate(&self, command: &str) -> Result<(), DefinitionError> {
        check_name(&self.name)?;
        check_description(&self.name, &self.description)?;
        if self.choices.len() > MAX_OPTIONS {
            return Err(DefinitionError::TooMany {
                name: format!("{command}.{}", self.name),
                what: "choices",
                count: self.choices.len(),
            });
        }
        if self.kind.is_subcommand() {
            validate_options(&format!("{command}.{}", self.name), &self.options)?;
        }
        Ok(())
    }
}

/// A named, immutable description of an invokable slash command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    pub options: Vec<CommandOption>,
    #[serde(serialize_with = "serialize_permissions")]
    pub default_member_permissions: Option<Permissions>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            default_member_permissions: None,
        }
    }

    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Minimum privilege a member needs before the platform offers the command.
    pub fn default_member_permissions(mut self, permissions: Permissions) -> Self {
        self.default_member_permissions = Some(permissions);
        self
    }

    /// Checks the definition against the platform's naming and size rules.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        check_name(&self.name)?;
        check_description(&self.name, &self.description)?;
        validate_options(&self.name, &self.options)
    }
}

fn validate_options(command: &str, options: &[CommandOption]) -> Result<(), DefinitionError> {
    if options.len() > MAX_OPTIONS {
        return Err(DefinitionError::TooMany {
            name: command.to_string(),
            what: "options",
            count: options.len(),
        });
    }

    let mut seen_optional = false;
    for (i, option) in options.iter().enumerate() {
        option.validate(command)?;
        if options[..i].iter().any(|o| o.name == option.name) {
            return Err(DefinitionError::DuplicateOption(
                command.to_string(),
                option.name.clone(),
            ));
        }
        if option.required && seen_optional {
            return Err(DefinitionError::RequiredAfterOptional(command.to_string()));
        }
        seen_optional |= !option.required && !option.kind.is_subcommand();
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), DefinitionError> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(DefinitionError::InvalidName(name.to_string()))
    }
}

fn check_description(name: &str, description: &str) -> Result<(), DefinitionError> {
    let len = description.chars().count();
    if (1..=MAX_DESCRIPTION_LENGTH).contains(&len) {
        Ok(())
    } else {
        Err(DefinitionError::InvalidDescription(name.to_string()))
    }
}

// The platform expects the permission bitfield as a decimal string.
fn serialize_permissions<S: Serializer>(
    permissions: &Option<Permissions>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match permissions {
        Some(permissions) => serializer.serialize_str(&permissions.bits().to_string()),
        None => serializer.serialize_none(),
    }
}
