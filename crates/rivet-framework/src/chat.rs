//! Chat line classification.
//!
//! Incoming chat is plain text. A fixed, ordered list of matchers turns the
//! lines Rivet cares about into structured values; everything else is
//! ignored. [`classify`] returns the first match.
//!
//! Private lines carry their recipient. Whether a line was meant for the
//! bot is decided by [`ChatMatch::is_addressed_to`].
//!
//! | order | matcher | example |
//! |-------|---------|---------|
//! | 1 | [`match_private_command`] | `[alice -> 您] /warp home` |
//! | 2 | [`match_private_message`] | `[alice -> 您] hello` |
//! | 3 | [`match_teleport_request`] | `[系統] alice 想要傳送到 你 的位置` |

use std::sync::LazyLock;

use regex::Regex;

static PRIVATE_COMMAND: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<sender>[^\]]+?)\s*->\s*(?P<recipient>[^\]]+)\]\s+/(?P<body>.+)$").ok()
});

static PRIVATE_MESSAGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<sender>[^\]]+?)\s*->\s*(?P<recipient>[^\]]+)\]\s+(?P<body>.+)$").ok()
});

static TELEPORT_REQUEST: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\[系統\]\s+(?P<requester>.+?)\s+想要你?傳送到\s+(?:該玩家|你)\s+的位置$").ok()
});

/// A recognised chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMatch {
    /// A private message whose body starts with `/`. `body` excludes the
    /// slash.
    PrivateCommand {
        sender: String,
        recipient: String,
        body: String,
    },
    /// Any other private message.
    PrivateMessage {
        sender: String,
        recipient: String,
        body: String,
    },
    /// A server notice that `requester` asked to teleport.
    TeleportRequest { requester: String },
}

impl ChatMatch {
    /// The player the line came from.
    pub fn sender(&self) -> &str {
        match self {
            Self::PrivateCommand { sender, .. } | Self::PrivateMessage { sender, .. } => sender,
            Self::TeleportRequest { requester } => requester,
        }
    }

    /// Whether a private line names the bot as recipient, either by one of
    /// the server's second-person markers or by `identity`. Teleport
    /// notices are always addressed to the bot.
    pub fn is_addressed_to(&self, identity: &str) -> bool {
        match self {
            Self::PrivateCommand { recipient, .. } | Self::PrivateMessage { recipient, .. } => {
                RECIPIENT_MARKERS.contains(&recipient.as_str())
                    || recipient.eq_ignore_ascii_case(identity)
            }
            Self::TeleportRequest { .. } => true,
        }
    }
}

/// Recipient names the server uses for the receiving player.
pub const RECIPIENT_MARKERS: &[&str] = &["您", "你", "you"];

/// A single chat matcher.
pub type Matcher = fn(&str) -> Option<ChatMatch>;

/// All matchers, in the order [`classify`] tries them.
pub const MATCHERS: [(&str, Matcher); 3] = [
    ("private_command", match_private_command),
    ("private_message", match_private_message),
    ("teleport_request", match_teleport_request),
];

/// Returns the first matcher result for `line`.
pub fn classify(line: &str) -> Option<ChatMatch> {
    MATCHERS.iter().find_map(|(_, matcher)| matcher(line))
}

/// `"[X -> R] /rest"`.
pub fn match_private_command(line: &str) -> Option<ChatMatch> {
    let caps = PRIVATE_COMMAND.as_ref()?.captures(line)?;
    Some(ChatMatch::PrivateCommand {
        sender: caps["sender"].trim().to_string(),
        recipient: caps["recipient"].trim().to_string(),
        body: caps["body"].to_string(),
    })
}

/// `"[X -> R] rest"`.
pub fn match_private_message(line: &str) -> Option<ChatMatch> {
    let caps = PRIVATE_MESSAGE.as_ref()?.captures(line)?;
    Some(ChatMatch::PrivateMessage {
        sender: caps["sender"].trim().to_string(),
        recipient: caps["recipient"].trim().to_string(),
        body: caps["body"].to_string(),
    })
}

/// `"[系統] X 想要你傳送到 該玩家 的位置"` or `"[系統] X 想要傳送到 你 的位置"`.
pub fn match_teleport_request(line: &str) -> Option<ChatMatch> {
    let caps = TELEPORT_REQUEST.as_ref()?.captures(line)?;
    Some(ChatMatch::TeleportRequest {
        requester: caps["requester"].trim().to_string(),
    })
}
