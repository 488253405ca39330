//! GC message ids used by the relay (without the structured-schema flag).

// ============================================================================
// System
// ============================================================================

pub const CLIENT_WELCOME: u32 = 4004;
pub const SERVER_WELCOME: u32 = 4005;

// ============================================================================
// Shared objects
// ============================================================================

pub const SO_CREATE: u32 = 21;
pub const SO_UPDATE: u32 = 22;
pub const SO_DESTROY: u32 = 23;
pub const SO_CACHE_SUBSCRIBED: u32 = 24;
pub const SO_CACHE_UNSUBSCRIBED: u32 = 25;
pub const SO_UPDATE_MULTIPLE: u32 = 26;

// ============================================================================
// Match flow
// ============================================================================

pub const GAME_MATCH_SIGN_OUT: u32 = 7004;
pub const GAME_MATCH_SIGN_OUT_RESPONSE: u32 = 7005;
pub const PLAYER_STATS_MATCH_SIGN_OUT: u32 = 7014;
pub const CONNECTED_PLAYERS: u32 = 7034;
pub const PLAYER_FAILED_TO_CONNECT: u32 = 7073;
pub const GC_TO_RELAY_CONNECT: u32 = 7089;
pub const LIVE_SCOREBOARD_UPDATE: u32 = 7145;
pub const GAME_MATCH_SIGN_OUT_PERMISSION_REQUEST: u32 = 7381;
pub const GAME_MATCH_SIGN_OUT_PERMISSION_RESPONSE: u32 = 7382;
pub const GC_TO_SERVER_CONSOLE_COMMAND: u32 = 7418;
pub const REQUEST_BATCH_PLAYER_RESOURCES: u32 = 7450;
pub const REQUEST_BATCH_PLAYER_RESOURCES_RESPONSE: u32 = 7451;
pub const SIGN_OUT_COMMUNICATION_SUMMARY: u32 = 7618;

/// Short name for logging. Unknown ids map to `"unknown"`.
pub fn name(id: u32) -> &'static str {
    match crate::codec::base_type(id) {
        CLIENT_WELCOME => "ClientWelcome",
        SERVER_WELCOME => "ServerWelcome",
        SO_CREATE => "SOCreate",
        SO_UPDATE => "SOUpdate",
        SO_DESTROY => "SODestroy",
        SO_CACHE_SUBSCRIBED => "SOCacheSubscribed",
        SO_CACHE_UNSUBSCRIBED => "SOCacheUnsubscribed",
        SO_UPDATE_MULTIPLE => "SOUpdateMultiple",
        GAME_MATCH_SIGN_OUT => "GameMatchSignOut",
        GAME_MATCH_SIGN_OUT_RESPONSE => "GameMatchSignOutResponse",
        PLAYER_STATS_MATCH_SIGN_OUT => "PlayerStatsMatchSignOut",
        CONNECTED_PLAYERS => "ConnectedPlayers",
        PLAYER_FAILED_TO_CONNECT => "PlayerFailedToConnect",
        GC_TO_RELAY_CONNECT => "GCToRelayConnect",
        LIVE_SCOREBOARD_UPDATE => "LiveScoreboardUpdate",
        GAME_MATCH_SIGN_OUT_PERMISSION_REQUEST => "GameMatchSignOutPermissionRequest",
        GAME_MATCH_SIGN_OUT_PERMISSION_RESPONSE => "GameMatchSignOutPermissionResponse",
        GC_TO_SERVER_CONSOLE_COMMAND => "GCToServerConsoleCommand",
        REQUEST_BATCH_PLAYER_RESOURCES => "RequestBatchPlayerResources",
        REQUEST_BATCH_PLAYER_RESOURCES_RESPONSE => "RequestBatchPlayerResourcesResponse",
        SIGN_OUT_COMMUNICATION_SUMMARY => "SignOutCommunicationSummary",
        _ => "unknown",
    }
}
