//! The `discord` package: client, entities, managers, utilities and the
//! declarations exported next to them.

use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Value};

use super::{Binding, ClassSpec, PackageSpec};
use crate::capabilities::symbol::SymbolKind;
use crate::context::TargetKind;
use crate::invocation::handlers::native;
use crate::invocation::handlers::{arg, opt_arg, BodyScope, HandlerError, NativeHandler, RouteHandler};

pub const ALIAS: &str = "discord";
pub const DOCS_BASE: &str = "https://discord.js.org/docs/packages/discord.js/14.16.3";

/// Longest timeout Discord accepts, in milliseconds.
const MAX_TIMEOUT_MS: i64 = 28 * 24 * 60 * 60 * 1000;

fn message_options(args: &[Value], index: usize) -> Result<Value, HandlerError> {
    match arg(args, index, "options")? {
        Value::String(content) => Ok(json!({ "content": content })),
        Value::Object(map) => Ok(Value::Object(map.clone())),
        other => Err(HandlerError::InvalidArgument {
            index,
            message: format!("message options must be a string or an object, got {}", other),
        }),
    }
}

fn message_body(scope: &BodyScope<'_>) -> Result<Value, HandlerError> {
    message_options(scope.args, 0)
}

fn reply_body(scope: &BodyScope<'_>) -> Result<Value, HandlerError> {
    let target = scope
        .target_id
        .ok_or_else(|| HandlerError::MissingContext("message".to_string()))?;
    let mut body = message_options(scope.args, 0)?;
    body["message_reference"] = json!({ "message_id": target, "fail_if_not_exists": false });
    Ok(body)
}

fn bulk_delete_body(scope: &BodyScope<'_>) -> Result<Value, HandlerError> {
    let ids = arg(scope.args, 0, "messages")?
        .as_array()
        .filter(|ids| (2..=100).contains(&ids.len()))
        .ok_or_else(|| HandlerError::InvalidArgument {
            index: 0,
            message: "messages must be a list of 2 to 100 message ids".to_string(),
        })?;
    Ok(json!({ "messages": ids }))
}

fn bulk_ban_body(scope: &BodyScope<'_>) -> Result<Value, HandlerError> {
    let users = arg(scope.args, 0, "users")?
        .as_array()
        .filter(|ids| !ids.is_empty() && ids.len() <= 200)
        .ok_or_else(|| HandlerError::InvalidArgument {
            index: 0,
            message: "users must be a list of 1 to 200 user ids".to_string(),
        })?;
    let mut body = json!({ "user_ids": users });
    if let Some(seconds) = opt_arg(scope.args, 1).and_then(|o| o.get("deleteMessageSeconds")) {
        body["delete_message_seconds"] = seconds.clone();
    }
    Ok(body)
}

fn timeout_body(scope: &BodyScope<'_>) -> Result<Value, HandlerError> {
    let until = match opt_arg(scope.args, 0) {
        None => Value::Null,
        Some(duration) => {
            let ms = duration
                .as_i64()
                .filter(|ms| (0..=MAX_TIMEOUT_MS).contains(ms))
                .ok_or_else(|| HandlerError::InvalidArgument {
                    index: 0,
                    message: format!("timeout must be 0 to {} milliseconds, got {}", MAX_TIMEOUT_MS, duration),
                })?;
            json!((Utc::now() + Duration::milliseconds(ms)).to_rfc3339_opts(SecondsFormat::Millis, true))
        }
    };
    Ok(json!({ "communication_disabled_until": until }))
}

fn dm_body(scope: &BodyScope<'_>) -> Result<Value, HandlerError> {
    let user = scope
        .target_id
        .ok_or_else(|| HandlerError::MissingContext("user".to_string()))?;
    Ok(json!({ "recipient_id": user }))
}

fn role_position_body(scope: &BodyScope<'_>) -> Result<Value, HandlerError> {
    let role = scope
        .target_id
        .ok_or_else(|| HandlerError::MissingContext("role".to_string()))?;
    let position = arg(scope.args, 0, "position")?
        .as_u64()
        .ok_or_else(|| HandlerError::InvalidArgument {
            index: 0,
            message: "position must be a non-negative integer".to_string(),
        })?;
    Ok(json!([{ "id": role, "position": position }]))
}

fn suppress_embeds_body(scope: &BodyScope<'_>) -> Result<Value, HandlerError> {
    let suppress = opt_arg(scope.args, 0).and_then(Value::as_bool).unwrap_or(true);
    Ok(json!({ "flags": if suppress { 1 << 2 } else { 0 } }))
}

fn client() -> ClassSpec {
    ClassSpec::new("Client", Binding::Client)
        .describe("The connected application; entry point for fetching by id")
        .method("fetchUser", &["user"], RouteHandler::get("/users/{arg0}").entity("User"))
        .method("fetchGuild", &["guild"], RouteHandler::get("/guilds/{arg0}").entity("Guild"))
        .method("fetchGuilds", &["options"], RouteHandler::get("/users/@me/guilds").query_arg(0).collection("OAuth2Guild", "id"))
        .method("fetchGuildPreview", &["guild"], RouteHandler::get("/guilds/{arg0}/preview").entity("GuildPreview"))
        .method("fetchChannel", &["channel"], RouteHandler::get("/channels/{arg0}").entity("Channel"))
        .method("fetchInvite", &["invite", "options"], RouteHandler::get("/invites/{arg0}").query_arg(1).entity("Invite"))
        .method("fetchWebhook", &["webhook"], RouteHandler::get("/webhooks/{arg0}").entity("Webhook"))
        .method("fetchSticker", &["sticker"], RouteHandler::get("/stickers/{arg0}").entity("Sticker"))
        .method("fetchStickerPacks", &[], RouteHandler::get("/sticker-packs"))
        .method("fetchVoiceRegions", &[], RouteHandler::get("/voice/regions").collection("VoiceRegion", "id"))
        .method("fetchApplication", &[], RouteHandler::get("/applications/@me").entity("ClientApplication"))
}

fn guild() -> ClassSpec {
    ClassSpec::new("Guild", Binding::Live(TargetKind::Guild))
        .describe("A guild (server)")
        .method("fetch", &[], RouteHandler::get("/guilds/{target}").entity("Guild"))
        .method("edit", &["options"], RouteHandler::patch("/guilds/{target}").body_arg(0).reason_arg(0).entity("Guild"))
        .method("setName", &["name", "reason"], RouteHandler::patch("/guilds/{target}").fields(&[("name", 0)]).reason_arg(1).entity("Guild"))
        .method("setIcon", &["icon", "reason"], RouteHandler::patch("/guilds/{target}").fields(&[("icon", 0)]).reason_arg(1).entity("Guild"))
        .method("setSystemChannel", &["channel", "reason"], RouteHandler::patch("/guilds/{target}").fields(&[("system_channel_id", 0)]).reason_arg(1).entity("Guild"))
        .method("setVerificationLevel", &["level", "reason"], RouteHandler::patch("/guilds/{target}").fields(&[("verification_level", 0)]).reason_arg(1).entity("Guild"))
        .method("leave", &[], RouteHandler::delete("/users/@me/guilds/{target}").nothing())
        .method("delete", &[], RouteHandler::delete("/guilds/{target}").nothing())
        .method("fetchAuditLogs", &["options"], RouteHandler::get("/guilds/{target}/audit-logs").query_arg(0).entity("GuildAuditLogs"))
        .method("fetchBans", &["options"], RouteHandler::get("/guilds/{target}/bans").query_arg(0).collection("GuildBan", "user.id"))
        .method("fetchIntegrations", &[], RouteHandler::get("/guilds/{target}/integrations").collection("Integration", "id"))
        .method("fetchWebhooks", &[], RouteHandler::get("/guilds/{target}/webhooks").collection("Webhook", "id"))
        .method("fetchVanityData", &[], RouteHandler::get("/guilds/{target}/vanity-url"))
        .method("fetchWidgetSettings", &[], RouteHandler::get("/guilds/{target}/widget").entity("GuildWidgetSettings"))
        .method("fetchPreview", &[], RouteHandler::get("/guilds/{target}/preview").entity("GuildPreview"))
        .method("fetchOnboarding", &[], RouteHandler::get("/guilds/{target}/onboarding").entity("GuildOnboarding"))
}

fn guild_member_manager() -> ClassSpec {
    ClassSpec::new("GuildMemberManager", Binding::Live(TargetKind::Guild))
        .describe("Members of a guild")
        .method("fetch", &["user"], RouteHandler::get("/guilds/{target}/members/{arg0}").entity("GuildMember"))
        .method("list", &["options"], RouteHandler::get("/guilds/{target}/members").query_arg(0).collection("GuildMember", "user.id"))
        .method("search", &["options"], RouteHandler::get("/guilds/{target}/members/search").query_arg(0).collection("GuildMember", "user.id"))
        .method("edit", &["user", "options"], RouteHandler::patch("/guilds/{target}/members/{arg0}").body_arg(1).reason_arg(1).entity("GuildMember"))
        .method("addRole", &["user", "role", "reason"], RouteHandler::put("/guilds/{target}/members/{arg0}/roles/{arg1}").reason_arg(2).nothing())
        .method("removeRole", &["user", "role", "reason"], RouteHandler::delete("/guilds/{target}/members/{arg0}/roles/{arg1}").reason_arg(2).nothing())
        .method("kick", &["user", "reason"], RouteHandler::delete("/guilds/{target}/members/{arg0}").reason_arg(1).nothing())
        .method("ban", &["user", "options"], RouteHandler::put("/guilds/{target}/bans/{arg0}").body_arg(1).reason_arg(1).nothing())
        .method("bulkBan", &["users", "options"], RouteHandler::post("/guilds/{target}/bulk-ban").computed(bulk_ban_body).reason_arg(1))
        .method("unban", &["user", "reason"], RouteHandler::delete("/guilds/{target}/bans/{arg0}").reason_arg(1).nothing())
        .method("prune", &["options"], RouteHandler::post("/guilds/{target}/prune").body_arg(0).reason_arg(0))
}

fn guild_ban_manager() -> ClassSpec {
    ClassSpec::new("GuildBanManager", Binding::Live(TargetKind::Guild))
        .describe("Bans of a guild")
        .method("fetch", &["user"], RouteHandler::get("/guilds/{target}/bans/{arg0}").entity("GuildBan"))
        .method("create", &["user", "options"], RouteHandler::put("/guilds/{target}/bans/{arg0}").body_arg(1).reason_arg(1).nothing())
        .method("remove", &["user", "reason"], RouteHandler::delete("/guilds/{target}/bans/{arg0}").reason_arg(1).nothing())
}

fn role_manager() -> ClassSpec {
    ClassSpec::new("RoleManager", Binding::Live(TargetKind::Guild))
        .describe("Roles of a guild")
        .method("fetch", &[], RouteHandler::get("/guilds/{target}/roles").collection("Role", "id"))
        .method("create", &["options"], RouteHandler::post("/guilds/{target}/roles").body_arg(0).reason_arg(0).entity("Role"))
        .method("edit", &["role", "options"], RouteHandler::patch("/guilds/{target}/roles/{arg0}").body_arg(1).reason_arg(1).entity("Role"))
        .method("delete", &["role", "reason"], RouteHandler::delete("/guilds/{target}/roles/{arg0}").reason_arg(1).nothing())
        .method("setPositions", &["positions"], RouteHandler::patch("/guilds/{target}/roles").body_arg(0).collection("Role", "id"))
}

fn guild_channel_manager() -> ClassSpec {
    ClassSpec::new("GuildChannelManager", Binding::Live(TargetKind::Guild))
        .describe("Channels of a guild")
        .method("fetch", &[], RouteHandler::get("/guilds/{target}/channels").collection("GuildChannel", "id"))
        .method("create", &["options"], RouteHandler::post("/guilds/{target}/channels").body_arg(0).reason_arg(0).entity("GuildChannel"))
        .method("setPositions", &["positions"], RouteHandler::patch("/guilds/{target}/channels").body_arg(0).nothing())
        .method("fetchActiveThreads", &[], RouteHandler::get("/guilds/{target}/threads/active"))
}

fn guild_emoji_manager() -> ClassSpec {
    ClassSpec::new("GuildEmojiManager", Binding::Live(TargetKind::Guild))
        .describe("Custom emojis of a guild")
        .method("fetch", &[], RouteHandler::get("/guilds/{target}/emojis").collection("GuildEmoji", "id"))
        .method("create", &["options"], RouteHandler::post("/guilds/{target}/emojis").body_arg(0).reason_arg(0).entity("GuildEmoji"))
        .method("edit", &["emoji", "options"], RouteHandler::patch("/guilds/{target}/emojis/{arg0}").body_arg(1).reason_arg(1).entity("GuildEmoji"))
        .method("delete", &["emoji", "reason"], RouteHandler::delete("/guilds/{target}/emojis/{arg0}").reason_arg(1).nothing())
}

fn guild_sticker_manager() -> ClassSpec {
    ClassSpec::new("GuildStickerManager", Binding::Live(TargetKind::Guild))
        .describe("Custom stickers of a guild")
        .method("fetch", &[], RouteHandler::get("/guilds/{target}/stickers").collection("Sticker", "id"))
        .method("edit", &["sticker", "options"], RouteHandler::patch("/guilds/{target}/stickers/{arg0}").body_arg(1).reason_arg(1).entity("Sticker"))
        .method("delete", &["sticker", "reason"], RouteHandler::delete("/guilds/{target}/stickers/{arg0}").reason_arg(1).nothing())
}

fn guild_scheduled_event_manager() -> ClassSpec {
    ClassSpec::new("GuildScheduledEventManager", Binding::Live(TargetKind::Guild))
        .describe("Scheduled events of a guild")
        .method("fetch", &["options"], RouteHandler::get("/guilds/{target}/scheduled-events").query_arg(0).collection("GuildScheduledEvent", "id"))
        .method("create", &["options"], RouteHandler::post("/guilds/{target}/scheduled-events").body_arg(0).reason_arg(0).entity("GuildScheduledEvent"))
        .method("edit", &["event", "options"], RouteHandler::patch("/guilds/{target}/scheduled-events/{arg0}").body_arg(1).reason_arg(1).entity("GuildScheduledEvent"))
        .method("delete", &["event"], RouteHandler::delete("/guilds/{target}/scheduled-events/{arg0}").nothing())
        .method("fetchSubscribers", &["event", "options"], RouteHandler::get("/guilds/{target}/scheduled-events/{arg0}/users").query_arg(1))
}

fn guild_invite_manager() -> ClassSpec {
    ClassSpec::new("GuildInviteManager", Binding::Live(TargetKind::Guild))
        .describe("Invites of a guild")
        .method("fetch", &[], RouteHandler::get("/guilds/{target}/invites").collection("Invite", "code"))
        .method("create", &["channel", "options"], RouteHandler::post("/channels/{arg0}/invites").body_arg(1).reason_arg(1).entity("Invite"))
        .method("delete", &["invite", "reason"], RouteHandler::delete("/invites/{arg0}").reason_arg(1).nothing())
}

fn channels() -> Vec<ClassSpec> {
    vec![
        ClassSpec::new("BaseChannel", Binding::Live(TargetKind::Channel))
            .describe("Any channel")
            .method("fetch", &[], RouteHandler::get("/channels/{target}").entity("Channel"))
            .method("delete", &["reason"], RouteHandler::delete("/channels/{target}").reason_arg(0).entity("Channel")),
        ClassSpec::new("TextBasedChannel", Binding::Live(TargetKind::Channel))
            .describe("Methods shared by every channel that holds messages")
            .method("send", &["options"], RouteHandler::post("/channels/{target}/messages").computed(message_body).entity("Message"))
            .method("sendTyping", &[], RouteHandler::post("/channels/{target}/typing").nothing())
            .method("bulkDelete", &["messages"], RouteHandler::post("/channels/{target}/messages/bulk-delete").computed(bulk_delete_body).nothing()),
        ClassSpec::new("GuildChannel", Binding::Live(TargetKind::Channel))
            .extends(&["BaseChannel"])
            .describe("A channel inside a guild")
            .method("edit", &["options", "reason"], RouteHandler::patch("/channels/{target}").body_arg(0).reason_arg(1).entity("GuildChannel"))
            .method("setName", &["name", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("name", 0)]).reason_arg(1).entity("GuildChannel"))
            .method("setPosition", &["position", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("position", 0)]).reason_arg(1).entity("GuildChannel"))
            .method("setParent", &["channel", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("parent_id", 0)]).reason_arg(1).entity("GuildChannel"))
            .method("createInvite", &["options"], RouteHandler::post("/channels/{target}/invites").body_arg(0).reason_arg(0).entity("Invite"))
            .method("fetchInvites", &[], RouteHandler::get("/channels/{target}/invites").collection("Invite", "code")),
        ClassSpec::new("TextChannel", Binding::Live(TargetKind::Channel))
            .extends(&["GuildChannel", "TextBasedChannel"])
            .describe("A guild text channel")
            .method("setTopic", &["topic", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("topic", 0)]).reason_arg(1).entity("TextChannel"))
            .method("setRateLimitPerUser", &["seconds", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("rate_limit_per_user", 0)]).reason_arg(1).entity("TextChannel"))
            .method("setNSFW", &["nsfw", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("nsfw", 0)]).reason_arg(1).entity("TextChannel"))
            .method("createWebhook", &["options"], RouteHandler::post("/channels/{target}/webhooks").body_arg(0).reason_arg(0).entity("Webhook"))
            .method("fetchWebhooks", &[], RouteHandler::get("/channels/{target}/webhooks").collection("Webhook", "id")),
        ClassSpec::new("NewsChannel", Binding::Live(TargetKind::Channel))
            .extends(&["TextChannel"])
            .describe("An announcement channel")
            .method("addFollower", &["channel", "reason"], RouteHandler::post("/channels/{target}/followers").fields(&[("webhook_channel_id", 0)]).reason_arg(1)),
        ClassSpec::new("VoiceChannel", Binding::Live(TargetKind::Channel))
            .extends(&["GuildChannel", "TextBasedChannel"])
            .describe("A guild voice channel")
            .method("setBitrate", &["bitrate", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("bitrate", 0)]).reason_arg(1).entity("VoiceChannel"))
            .method("setUserLimit", &["userLimit", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("user_limit", 0)]).reason_arg(1).entity("VoiceChannel"))
            .method("setRTCRegion", &["region", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("rtc_region", 0)]).reason_arg(1).entity("VoiceChannel")),
        ClassSpec::new("CategoryChannel", Binding::Live(TargetKind::Channel))
            .extends(&["GuildChannel"])
            .describe("A channel category"),
        ClassSpec::new("DMChannel", Binding::Live(TargetKind::Channel))
            .extends(&["BaseChannel", "TextBasedChannel"])
            .describe("A direct message channel"),
        ClassSpec::new("ThreadChannel", Binding::Live(TargetKind::Thread))
            .extends(&["BaseChannel", "TextBasedChannel"])
            .describe("A thread")
            .method("edit", &["options", "reason"], RouteHandler::patch("/channels/{target}").body_arg(0).reason_arg(1).entity("ThreadChannel"))
            .method("setName", &["name", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("name", 0)]).reason_arg(1).entity("ThreadChannel"))
            .method("setArchived", &["archived", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("archived", 0)]).reason_arg(1).entity("ThreadChannel"))
            .method("setLocked", &["locked", "reason"], RouteHandler::patch("/channels/{target}").fields(&[("locked", 0)]).reason_arg(1).entity("ThreadChannel"))
            .method("join", &[], RouteHandler::put("/channels/{target}/thread-members/@me").nothing())
            .method("leave", &[], RouteHandler::delete("/channels/{target}/thread-members/@me").nothing()),
        ClassSpec::new("ThreadMemberManager", Binding::Live(TargetKind::Thread))
            .describe("Members of a thread")
            .method("fetch", &["options"], RouteHandler::get("/channels/{target}/thread-members").query_arg(0).collection("ThreadMember", "user_id"))
            .method("add", &["user"], RouteHandler::put("/channels/{target}/thread-members/{arg0}").nothing())
            .method("remove", &["user"], RouteHandler::delete("/channels/{target}/thread-members/{arg0}").nothing()),
        ClassSpec::new("GuildTextThreadManager", Binding::Live(TargetKind::Channel))
            .describe("Threads under a text channel")
            .method("create", &["options"], RouteHandler::post("/channels/{target}/threads").body_arg(0).reason_arg(0).entity("ThreadChannel"))
            .method("fetchArchived", &["options"], RouteHandler::get("/channels/{target}/threads/archived/public").query_arg(0)),
        ClassSpec::new("PermissionOverwriteManager", Binding::Live(TargetKind::Channel))
            .describe("Permission overwrites of a guild channel")
            .method("edit", &["userOrRole", "options", "reason"], RouteHandler::put("/channels/{target}/permissions/{arg0}").body_arg(1).reason_arg(2).nothing())
            .method("delete", &["userOrRole", "reason"], RouteHandler::delete("/channels/{target}/permissions/{arg0}").reason_arg(1).nothing()),
    ]
}

fn messages() -> Vec<ClassSpec> {
    vec![
        ClassSpec::new("MessageManager", Binding::Live(TargetKind::Channel))
            .describe("Messages of a text-based channel")
            .method("fetch", &["options"], RouteHandler::get("/channels/{target}/messages").query_arg(0).collection("Message", "id"))
            .method("fetchPinned", &[], RouteHandler::get("/channels/{target}/pins").collection("Message", "id"))
            .method("edit", &["message", "options"], RouteHandler::patch("/channels/{target}/messages/{arg0}").body_arg(1).entity("Message"))
            .method("delete", &["message"], RouteHandler::delete("/channels/{target}/messages/{arg0}").nothing())
            .method("pin", &["message", "reason"], RouteHandler::put("/channels/{target}/pins/{arg0}").reason_arg(1).nothing())
            .method("unpin", &["message", "reason"], RouteHandler::delete("/channels/{target}/pins/{arg0}").reason_arg(1).nothing())
            .method("react", &["message", "emoji"], RouteHandler::put("/channels/{target}/messages/{arg0}/reactions/{arg1}/@me").nothing())
            .method("crosspost", &["message"], RouteHandler::post("/channels/{target}/messages/{arg0}/crosspost").entity("Message")),
        ClassSpec::new("Message", Binding::Live(TargetKind::Message))
            .describe("A message in a channel")
            .method("fetch", &[], RouteHandler::get("/channels/{channel}/messages/{target}").entity("Message"))
            .method("edit", &["options"], RouteHandler::patch("/channels/{channel}/messages/{target}").computed(message_body).entity("Message"))
            .method("delete", &[], RouteHandler::delete("/channels/{channel}/messages/{target}").nothing())
            .method("reply", &["options"], RouteHandler::post("/channels/{channel}/messages").computed(reply_body).entity("Message"))
            .method("react", &["emoji"], RouteHandler::put("/channels/{channel}/messages/{target}/reactions/{arg0}/@me").nothing())
            .method("pin", &["reason"], RouteHandler::put("/channels/{channel}/pins/{target}").reason_arg(0).nothing())
            .method("unpin", &["reason"], RouteHandler::delete("/channels/{channel}/pins/{target}").reason_arg(0).nothing())
            .method("crosspost", &[], RouteHandler::post("/channels/{channel}/messages/{target}/crosspost").entity("Message"))
            .method("startThread", &["options"], RouteHandler::post("/channels/{channel}/messages/{target}/threads").body_arg(0).reason_arg(0).entity("ThreadChannel"))
            .method("suppressEmbeds", &["suppress"], RouteHandler::patch("/channels/{channel}/messages/{target}").computed(suppress_embeds_body).entity("Message")),
        ClassSpec::new("ReactionManager", Binding::Live(TargetKind::Message))
            .describe("Reactions on a message")
            .method("removeAll", &[], RouteHandler::delete("/channels/{channel}/messages/{target}/reactions").nothing())
            .method("fetchUsers", &["emoji", "options"], RouteHandler::get("/channels/{channel}/messages/{target}/reactions/{arg0}").query_arg(1).collection("User", "id")),
    ]
}

fn members_and_users() -> Vec<ClassSpec> {
    vec![
        ClassSpec::new("GuildMember", Binding::Live(TargetKind::Member))
            .describe("A user's membership in a guild")
            .method("fetch", &[], RouteHandler::get("/guilds/{guild}/members/{target}").entity("GuildMember"))
            .method("edit", &["options", "reason"], RouteHandler::patch("/guilds/{guild}/members/{target}").body_arg(0).reason_arg(1).entity("GuildMember"))
            .method("setNickname", &["nick", "reason"], RouteHandler::patch("/guilds/{guild}/members/{target}").fields(&[("nick", 0)]).reason_arg(1).entity("GuildMember"))
            .method("timeout", &["timeout", "reason"], RouteHandler::patch("/guilds/{guild}/members/{target}").computed(timeout_body).reason_arg(1).entity("GuildMember"))
            .method("kick", &["reason"], RouteHandler::delete("/guilds/{guild}/members/{target}").reason_arg(0).nothing())
            .method("ban", &["options"], RouteHandler::put("/guilds/{guild}/bans/{target}").body_arg(0).reason_arg(0).nothing())
            .method("createDM", &[], RouteHandler::post("/users/@me/channels").computed(dm_body).entity("DMChannel")),
        ClassSpec::new("GuildMemberRoleManager", Binding::Live(TargetKind::Member))
            .describe("Roles held by a guild member")
            .method("add", &["role", "reason"], RouteHandler::put("/guilds/{guild}/members/{target}/roles/{arg0}").reason_arg(1).nothing())
            .method("remove", &["role", "reason"], RouteHandler::delete("/guilds/{guild}/members/{target}/roles/{arg0}").reason_arg(1).nothing()),
        ClassSpec::new("User", Binding::Live(TargetKind::User))
            .describe("A Discord user")
            .method("fetch", &[], RouteHandler::get("/users/{target}").entity("User"))
            .method("createDM", &[], RouteHandler::post("/users/@me/channels").computed(dm_body).entity("DMChannel")),
    ]
}

fn guild_entities() -> Vec<ClassSpec> {
    vec![
        ClassSpec::new("Role", Binding::Live(TargetKind::Role))
            .describe("A guild role")
            .method("fetch", &[], RouteHandler::get("/guilds/{guild}/roles/{target}").entity("Role"))
            .method("edit", &["options", "reason"], RouteHandler::patch("/guilds/{guild}/roles/{target}").body_arg(0).reason_arg(1).entity("Role"))
            .method("delete", &["reason"], RouteHandler::delete("/guilds/{guild}/roles/{target}").reason_arg(0).nothing())
            .method("setName", &["name", "reason"], RouteHandler::patch("/guilds/{guild}/roles/{target}").fields(&[("name", 0)]).reason_arg(1).entity("Role"))
            .method("setColor", &["color", "reason"], RouteHandler::patch("/guilds/{guild}/roles/{target}").fields(&[("color", 0)]).reason_arg(1).entity("Role"))
            .method("setPermissions", &["permissions", "reason"], RouteHandler::patch("/guilds/{guild}/roles/{target}").fields(&[("permissions", 0)]).reason_arg(1).entity("Role"))
            .method("setHoist", &["hoist", "reason"], RouteHandler::patch("/guilds/{guild}/roles/{target}").fields(&[("hoist", 0)]).reason_arg(1).entity("Role"))
            .method("setMentionable", &["mentionable", "reason"], RouteHandler::patch("/guilds/{guild}/roles/{target}").fields(&[("mentionable", 0)]).reason_arg(1).entity("Role"))
            .method("setPosition", &["position", "reason"], RouteHandler::patch("/guilds/{guild}/roles").computed(role_position_body).reason_arg(1).collection("Role", "id")),
        ClassSpec::new("GuildEmoji", Binding::Live(TargetKind::Emoji))
            .describe("A custom guild emoji")
            .method("fetch", &[], RouteHandler::get("/guilds/{guild}/emojis/{target}").entity("GuildEmoji"))
            .method("edit", &["options", "reason"], RouteHandler::patch("/guilds/{guild}/emojis/{target}").body_arg(0).reason_arg(1).entity("GuildEmoji"))
            .method("setName", &["name", "reason"], RouteHandler::patch("/guilds/{guild}/emojis/{target}").fields(&[("name", 0)]).reason_arg(1).entity("GuildEmoji"))
            .method("delete", &["reason"], RouteHandler::delete("/guilds/{guild}/emojis/{target}").reason_arg(0).nothing()),
        ClassSpec::new("Sticker", Binding::Live(TargetKind::Sticker))
            .describe("A sticker")
            .method("fetch", &[], RouteHandler::get("/stickers/{target}").entity("Sticker"))
            .method("edit", &["options", "reason"], RouteHandler::patch("/guilds/{guild}/stickers/{target}").body_arg(0).reason_arg(1).entity("Sticker"))
            .method("delete", &["reason"], RouteHandler::delete("/guilds/{guild}/stickers/{target}").reason_arg(0).nothing()),
        ClassSpec::new("GuildScheduledEvent", Binding::Live(TargetKind::Event))
            .describe("A scheduled guild event")
            .method("fetch", &[], RouteHandler::get("/guilds/{guild}/scheduled-events/{target}").entity("GuildScheduledEvent"))
            .method("edit", &["options", "reason"], RouteHandler::patch("/guilds/{guild}/scheduled-events/{target}").body_arg(0).reason_arg(1).entity("GuildScheduledEvent"))
            .method("setStatus", &["status", "reason"], RouteHandler::patch("/guilds/{guild}/scheduled-events/{target}").fields(&[("status", 0)]).reason_arg(1).entity("GuildScheduledEvent"))
            .method("delete", &[], RouteHandler::delete("/guilds/{guild}/scheduled-events/{target}").nothing())
            .method("fetchSubscribers", &["options"], RouteHandler::get("/guilds/{guild}/scheduled-events/{target}/users").query_arg(0)),
        ClassSpec::new("Invite", Binding::Live(TargetKind::Invite))
            .describe("A guild or group invite")
            .method("fetch", &["options"], RouteHandler::get("/invites/{target}").query_arg(0).entity("Invite"))
            .method("delete", &["reason"], RouteHandler::delete("/invites/{target}").reason_arg(0).nothing()),
        ClassSpec::new("Webhook", Binding::Live(TargetKind::Webhook))
            .describe("A channel webhook")
            .method("fetch", &[], RouteHandler::get("/webhooks/{target}").entity("Webhook"))
            .method("edit", &["options"], RouteHandler::patch("/webhooks/{target}").body_arg(0).reason_arg(0).entity("Webhook"))
            .method("delete", &["reason"], RouteHandler::delete("/webhooks/{target}").reason_arg(0).nothing()),
    ]
}

fn utilities() -> Vec<ClassSpec> {
    vec![
        ClassSpec::new("Collection", Binding::Local)
            .describe("Keyed collection; pass the current entries as target data")
            .method("get", &["key"], NativeHandler::new("Collection#get", native::collection_get))
            .method("has", &["key"], NativeHandler::new("Collection#has", native::collection_has))
            .method("set", &["key", "value"], NativeHandler::new("Collection#set", native::collection_set))
            .method("delete", &["key"], NativeHandler::new("Collection#delete", native::collection_delete))
            .method("clear", &[], NativeHandler::new("Collection#clear", native::collection_clear))
            .method("keys", &[], NativeHandler::new("Collection#keys", native::collection_keys))
            .method("values", &[], NativeHandler::new("Collection#values", native::collection_values))
            .method("first", &["amount"], NativeHandler::new("Collection#first", native::collection_first))
            .method("last", &["amount"], NativeHandler::new("Collection#last", native::collection_last)),
        ClassSpec::new("PermissionsBitField", Binding::Local)
            .describe("Permission bitfield; pass the current bitfield as target data")
            .static_method("resolve", &["permission"], NativeHandler::new("PermissionsBitField.resolve", native::permissions_resolve))
            .method("has", &["permission", "checkAdmin"], NativeHandler::new("PermissionsBitField#has", native::permissions_has))
            .method("add", &["permissions"], NativeHandler::new("PermissionsBitField#add", native::permissions_add))
            .method("remove", &["permissions"], NativeHandler::new("PermissionsBitField#remove", native::permissions_remove))
            .method("toArray", &[], NativeHandler::new("PermissionsBitField#toArray", native::permissions_to_array)),
        ClassSpec::new("SnowflakeUtil", Binding::Static)
            .describe("Snowflake helpers")
            .static_method("deconstruct", &["snowflake"], NativeHandler::new("SnowflakeUtil.deconstruct", native::snowflake_deconstruct))
            .static_method("timestampFrom", &["snowflake"], NativeHandler::new("SnowflakeUtil.timestampFrom", native::snowflake_timestamp_from))
            .static_method("generate", &["options"], NativeHandler::new("SnowflakeUtil.generate", native::snowflake_generate)),
    ]
}

pub fn package() -> PackageSpec {
    let mut classes = vec![
        client(),
        guild(),
        guild_member_manager(),
        guild_ban_manager(),
        role_manager(),
        guild_channel_manager(),
        guild_emoji_manager(),
        guild_sticker_manager(),
        guild_scheduled_event_manager(),
        guild_invite_manager(),
    ];
    classes.extend(channels());
    classes.extend(messages());
    classes.extend(members_and_users());
    classes.extend(guild_entities());
    classes.extend(utilities());

    PackageSpec {
        alias: ALIAS,
        name: "discord.js",
        version: "14.16.3",
        description: "Discord client: guilds, channels, messages, members, moderation and utilities",
        required: true,
        docs_base: Some(DOCS_BASE),
        classes,
        functions: Vec::new(),
        declarations: Vec::new(),
    }
    .function("userMention", &["userId"], "Mention a user", NativeHandler::new("userMention", native::user_mention))
    .function("channelMention", &["channelId"], "Mention a channel", NativeHandler::new("channelMention", native::channel_mention))
    .function("roleMention", &["roleId"], "Mention a role", NativeHandler::new("roleMention", native::role_mention))
    .function("bold", &["content"], "Bold markdown", NativeHandler::new("bold", native::bold))
    .function("italic", &["content"], "Italic markdown", NativeHandler::new("italic", native::italic))
    .function("underline", &["content"], "Underline markdown", NativeHandler::new("underline", native::underline))
    .function("strikethrough", &["content"], "Strikethrough markdown", NativeHandler::new("strikethrough", native::strikethrough))
    .function("spoiler", &["content"], "Spoiler markdown", NativeHandler::new("spoiler", native::spoiler))
    .function("inlineCode", &["content"], "Inline code markdown", NativeHandler::new("inlineCode", native::inline_code))
    .function("quote", &["content"], "Single-line quote", NativeHandler::new("quote", native::quote))
    .function("blockQuote", &["content"], "Multi-line quote", NativeHandler::new("blockQuote", native::block_quote))
    .function("codeBlock", &["language", "content"], "Fenced code block", NativeHandler::new("codeBlock", native::code_block))
    .function("hyperlink", &["content", "url", "title"], "Masked link", NativeHandler::new("hyperlink", native::hyperlink))
    .function("escapeMarkdown", &["text"], "Escape markdown syntax", NativeHandler::new("escapeMarkdown", native::escape_markdown))
    .function("formatEmoji", &["emojiId", "animated"], "Custom emoji markup", NativeHandler::new("formatEmoji", native::format_emoji))
    .function("time", &["date", "style"], "Timestamp markup", NativeHandler::new("time", native::time))
    .declare(
        SymbolKind::Enum,
        &[
            "ActivityType",
            "ApplicationCommandOptionType",
            "AuditLogEvent",
            "ButtonStyle",
            "ChannelType",
            "Colors",
            "ComponentType",
            "Events",
            "GatewayIntentBits",
            "GuildScheduledEventEntityType",
            "GuildScheduledEventStatus",
            "MessageFlags",
            "Partials",
            "PermissionFlagsBits",
            "TimestampStyles",
        ],
        "Enumeration",
    )
    .declare(
        SymbolKind::Event,
        &[
            "channelCreate",
            "channelDelete",
            "clientReady",
            "guildBanAdd",
            "guildCreate",
            "guildDelete",
            "guildMemberAdd",
            "guildMemberRemove",
            "interactionCreate",
            "messageCreate",
            "messageDelete",
            "messageUpdate",
            "roleCreate",
            "roleDelete",
            "threadCreate",
            "voiceStateUpdate",
        ],
        "Client event",
    )
    .declare(SymbolKind::Const, &["version", "DefaultRestOptions", "Routes"], "Constant")
    .declare(
        SymbolKind::Interface,
        &[
            "BanOptions",
            "ClientOptions",
            "FetchMessagesOptions",
            "GuildChannelCreateOptions",
            "GuildMemberEditOptions",
            "GuildScheduledEventCreateOptions",
            "InviteCreateOptions",
            "MessageCreateOptions",
            "MessageEditOptions",
            "RoleCreateOptions",
            "ThreadCreateOptions",
            "WebhookCreateOptions",
        ],
        "Options shape",
    )
    .declare(
        SymbolKind::Type,
        &[
            "Awaitable",
            "ColorResolvable",
            "EmojiIdentifierResolvable",
            "GuildResolvable",
            "PermissionResolvable",
            "Snowflake",
            "UserResolvable",
        ],
        "Type alias",
    )
    .declare(SymbolKind::Namespace, &["Formatters"], "Formatting helpers namespace")
    .declare(SymbolKind::External, &["REST", "WebSocketManager"], "Re-exported from a sibling package")
}
