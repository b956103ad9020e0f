//! The optional `builders` package: message component and command builders.

use super::{Binding, ClassSpec, PackageSpec};
use crate::capabilities::symbol::SymbolKind;
use crate::invocation::handlers::{BuilderHandler, BuilderOp};

pub const ALIAS: &str = "builders";

fn embed() -> ClassSpec {
    let b = |op| BuilderHandler::new("EmbedBuilder", op);
    ClassSpec::new("EmbedBuilder", Binding::Local)
        .describe("Rich embed")
        .static_method("from", &["data"], b(BuilderOp::From))
        .method("setTitle", &["title"], b(BuilderOp::Set("title")))
        .method("setDescription", &["description"], b(BuilderOp::Set("description")))
        .method("setURL", &["url"], b(BuilderOp::Set("url")))
        .method("setColor", &["color"], b(BuilderOp::SetColor("color")))
        .method("setTimestamp", &["timestamp"], b(BuilderOp::SetTimestamp("timestamp")))
        .method("setAuthor", &["options"], b(BuilderOp::Set("author")))
        .method("setFooter", &["options"], b(BuilderOp::Set("footer")))
        .method("setImage", &["url"], b(BuilderOp::Set("image")))
        .method("setThumbnail", &["url"], b(BuilderOp::Set("thumbnail")))
        .method("addFields", &["fields"], b(BuilderOp::Push("fields")))
        .method("setFields", &["fields"], b(BuilderOp::Replace("fields")))
        .method("toJSON", &[], b(BuilderOp::ToJson))
}

fn button() -> ClassSpec {
    let b = |op| BuilderHandler::new("ButtonBuilder", op);
    ClassSpec::new("ButtonBuilder", Binding::Local)
        .describe("Message button component")
        .static_method("from", &["data"], b(BuilderOp::From))
        .method("setCustomId", &["customId"], b(BuilderOp::Set("custom_id")))
        .method("setLabel", &["label"], b(BuilderOp::Set("label")))
        .method("setStyle", &["style"], b(BuilderOp::Set("style")))
        .method("setURL", &["url"], b(BuilderOp::Set("url")))
        .method("setEmoji", &["emoji"], b(BuilderOp::Set("emoji")))
        .method("setDisabled", &["disabled"], b(BuilderOp::Set("disabled")))
        .method("toJSON", &[], b(BuilderOp::ToJson))
}

fn action_row() -> ClassSpec {
    let b = |op| BuilderHandler::new("ActionRowBuilder", op);
    ClassSpec::new("ActionRowBuilder", Binding::Local)
        .describe("Row of message components")
        .static_method("from", &["data"], b(BuilderOp::From))
        .method("addComponents", &["components"], b(BuilderOp::Push("components")))
        .method("setComponents", &["components"], b(BuilderOp::Replace("components")))
        .method("toJSON", &[], b(BuilderOp::ToJson))
}

fn slash_command() -> ClassSpec {
    let b = |op| BuilderHandler::new("SlashCommandBuilder", op);
    ClassSpec::new("SlashCommandBuilder", Binding::Local)
        .describe("Chat input application command")
        .method("setName", &["name"], b(BuilderOp::Set("name")))
        .method("setDescription", &["description"], b(BuilderOp::Set("description")))
        .method("setDefaultMemberPermissions", &["permissions"], b(BuilderOp::Set("default_member_permissions")))
        .method("setNSFW", &["nsfw"], b(BuilderOp::Set("nsfw")))
        .method("addStringOption", &["option"], b(BuilderOp::PushOption(3)))
        .method("addIntegerOption", &["option"], b(BuilderOp::PushOption(4)))
        .method("addBooleanOption", &["option"], b(BuilderOp::PushOption(5)))
        .method("addUserOption", &["option"], b(BuilderOp::PushOption(6)))
        .method("addChannelOption", &["option"], b(BuilderOp::PushOption(7)))
        .method("addRoleOption", &["option"], b(BuilderOp::PushOption(8)))
        .method("toJSON", &[], b(BuilderOp::ToJson))
}

fn attachment() -> ClassSpec {
    let b = |op| BuilderHandler::new("AttachmentBuilder", op).binary("attachment");
    ClassSpec::new("AttachmentBuilder", Binding::Local)
        .describe("File attachment; content is base64 in `attachment`")
        .static_method("from", &["data"], b(BuilderOp::From))
        .method("setFile", &["attachment"], b(BuilderOp::Set("attachment")))
        .method("setName", &["name"], b(BuilderOp::Set("name")))
        .method("setDescription", &["description"], b(BuilderOp::Set("description")))
        .method("setSpoiler", &["spoiler"], b(BuilderOp::Set("spoiler")))
}

pub fn package() -> PackageSpec {
    PackageSpec {
        alias: ALIAS,
        name: "@discordjs/builders",
        version: "1.9.0",
        description: "Builders for embeds, components, commands and attachments",
        required: false,
        docs_base: Some("https://discord.js.org/docs/packages/builders/1.9.0"),
        classes: vec![embed(), button(), action_row(), slash_command(), attachment()],
        functions: Vec::new(),
        declarations: Vec::new(),
    }
    .declare(SymbolKind::Variable, &["version"], "Package version")
    .declare(
        SymbolKind::Interface,
        &["APIEmbed", "APIButtonComponent", "APIActionRowComponent", "RESTPostAPIChatInputApplicationCommandsJSONBody"],
        "Wire shape",
    )
}
