//! Capability, domain and direction definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

/// Domain a capability belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Terminal session control and I/O
    Session,
    /// File access
    File,
    /// System information queries
    System,
    /// Socket control
    Socket,
}

impl Domain {
    /// All domains, in display order
    pub const ALL: [Domain; 4] = [Domain::Session, Domain::File, Domain::System, Domain::Socket];

    /// Lowercase domain name
    pub const fn as_str(self) -> &'static str {
        match self {
            Domain::Session => "session",
            Domain::File => "file",
            Domain::System => "system",
            Domain::Socket => "socket",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(Domain::Session),
            "file" => Ok(Domain::File),
            "system" => Ok(Domain::System),
            "socket" => Ok(Domain::Socket),
            other => Err(CapabilityError::UnknownDomain(other.to_string())),
        }
    }
}

/// Which way messages for a capability travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Front end to back end (requests and notifications)
    ToBackend,
    /// Back end to front end (events)
    ToFrontend,
    /// Either way
    Bidirectional,
}

/// An operation name permitted to cross the trust boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "terminal:execute")]
    TerminalExecute,
    #[serde(rename = "terminal:write")]
    TerminalWrite,
    #[serde(rename = "terminal:resize")]
    TerminalResize,
    #[serde(rename = "terminal:kill")]
    TerminalKill,
    #[serde(rename = "terminal:data")]
    TerminalData,
    #[serde(rename = "terminal:exit")]
    TerminalExit,
    #[serde(rename = "file:read")]
    FileRead,
    #[serde(rename = "file:write")]
    FileWrite,
    #[serde(rename = "file:delete")]
    FileDelete,
    #[serde(rename = "file:list")]
    FileList,
    #[serde(rename = "file:stats")]
    FileStats,
    #[serde(rename = "system:info")]
    SystemInfo,
    #[serde(rename = "system:cwd")]
    SystemCwd,
    #[serde(rename = "system:env")]
    SystemEnv,
    #[serde(rename = "websocket:connect")]
    WebsocketConnect,
    #[serde(rename = "websocket:disconnect")]
    WebsocketDisconnect,
    #[serde(rename = "websocket:send")]
    WebsocketSend,
    #[serde(rename = "websocket:message")]
    WebsocketMessage,
}

impl Capability {
    /// Every capability, in declaration order
    pub const ALL: [Capability; 18] = [
        Capability::TerminalExecute,
        Capability::TerminalWrite,
        Capability::TerminalResize,
        Capability::TerminalKill,
        Capability::TerminalData,
        Capability::TerminalExit,
        Capability::FileRead,
        Capability::FileWrite,
        Capability::FileDelete,
        Capability::FileList,
        Capability::FileStats,
        Capability::SystemInfo,
        Capability::SystemCwd,
        Capability::SystemEnv,
        Capability::WebsocketConnect,
        Capability::WebsocketDisconnect,
        Capability::WebsocketSend,
        Capability::WebsocketMessage,
    ];

    /// Wire name, e.g. `terminal:resize`
    pub const fn as_str(self) -> &'static str {
        match self {
            Capability::TerminalExecute => "terminal:execute",
            Capability::TerminalWrite => "terminal:write",
            Capability::TerminalResize => "terminal:resize",
            Capability::TerminalKill => "terminal:kill",
            Capability::TerminalData => "terminal:data",
            Capability::TerminalExit => "terminal:exit",
            Capability::FileRead => "file:read",
            Capability::FileWrite => "file:write",
            Capability::FileDelete => "file:delete",
            Capability::FileList => "file:list",
            Capability::FileStats => "file:stats",
            Capability::SystemInfo => "system:info",
            Capability::SystemCwd => "system:cwd",
            Capability::SystemEnv => "system:env",
            Capability::WebsocketConnect => "websocket:connect",
            Capability::WebsocketDisconnect => "websocket:disconnect",
            Capability::WebsocketSend => "websocket:send",
            Capability::WebsocketMessage => "websocket:message",
        }
    }

    /// Look up a capability by its exact wire name.
    ///
    /// Matching is case-sensitive and allocation-free; anything that is not
    /// one of the closed set of names yields `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let capability = match name {
            "terminal:execute" => Capability::TerminalExecute,
            "terminal:write" => Capability::TerminalWrite,
            "terminal:resize" => Capability::TerminalResize,
            "terminal:kill" => Capability::TerminalKill,
            "terminal:data" => Capability::TerminalData,
            "terminal:exit" => Capability::TerminalExit,
            "file:read" => Capability::FileRead,
            "file:write" => Capability::FileWrite,
            "file:delete" => Capability::FileDelete,
            "file:list" => Capability::FileList,
            "file:stats" => Capability::FileStats,
            "system:info" => Capability::SystemInfo,
            "system:cwd" => Capability::SystemCwd,
            "system:env" => Capability::SystemEnv,
            "websocket:connect" => Capability::WebsocketConnect,
            "websocket:disconnect" => Capability::WebsocketDisconnect,
            "websocket:send" => Capability::WebsocketSend,
            "websocket:message" => Capability::WebsocketMessage,
            _ => return None,
        };
        Some(capability)
    }

    /// Domain this capability belongs to
    pub const fn domain(self) -> Domain {
        match self {
            Capability::TerminalExecute
            | Capability::TerminalWrite
            | Capability::TerminalResize
            | Capability::TerminalKill
            | Capability::TerminalData
            | Capability::TerminalExit => Domain::Session,
            Capability::FileRead
            | Capability::FileWrite
            | Capability::FileDelete
            | Capability::FileList
            | Capability::FileStats => Domain::File,
            Capability::SystemInfo | Capability::SystemCwd | Capability::SystemEnv => Domain::System,
            Capability::WebsocketConnect
            | Capability::WebsocketDisconnect
            | Capability::WebsocketSend
            | Capability::WebsocketMessage => Domain::Socket,
        }
    }

    /// Direction messages for this capability travel
    pub const fn direction(self) -> Direction {
        match self {
            Capability::TerminalData | Capability::TerminalExit => Direction::ToFrontend,
            Capability::WebsocketConnect
            | Capability::WebsocketDisconnect
            | Capability::WebsocketSend
            | Capability::WebsocketMessage => Direction::Bidirectional,
            _ => Direction::ToBackend,
        }
    }

    pub(crate) const fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::from_name(s).ok_or_else(|| CapabilityError::UnknownCapability(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for capability in Capability::ALL {
            assert_eq!(Capability::from_name(capability.as_str()), Some(capability));
            assert_eq!(capability.as_str().parse::<Capability>().unwrap(), capability);
        }
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert_eq!(Capability::from_name("Terminal:Resize"), None);
        assert_eq!(Capability::from_name("TERMINAL:RESIZE"), None);
        assert_eq!(Capability::from_name(" terminal:resize"), None);
    }

    #[test]
    fn test_name_prefix_is_domain() {
        for capability in Capability::ALL {
            let prefix = capability.as_str().split(':').next().unwrap();
            let expected = match capability.domain() {
                Domain::Session => "terminal",
                Domain::File => "file",
                Domain::System => "system",
                Domain::Socket => "websocket",
            };
            assert_eq!(prefix, expected, "{capability} has the wrong domain");
        }
    }

    #[test]
    fn test_bits_are_distinct() {
        let mut seen = 0u32;
        for capability in Capability::ALL {
            assert_eq!(seen & capability.bit(), 0);
            seen |= capability.bit();
        }
        assert_eq!(seen.count_ones() as usize, Capability::ALL.len());
    }

    #[test]
    fn test_direction() {
        assert_eq!(Capability::TerminalData.direction(), Direction::ToFrontend);
        assert_eq!(Capability::TerminalExit.direction(), Direction::ToFrontend);
        assert_eq!(Capability::TerminalExecute.direction(), Direction::ToBackend);
        assert_eq!(Capability::SystemInfo.direction(), Direction::ToBackend);
        assert_eq!(Capability::WebsocketMessage.direction(), Direction::Bidirectional);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Capability::FileStats).unwrap();
        assert_eq!(json, "\"file:stats\"");

        let parsed: Capability = serde_json::from_str("\"websocket:send\"").unwrap();
        assert_eq!(parsed, Capability::WebsocketSend);
        assert!(serde_json::from_str::<Capability>("\"shell:exec\"").is_err());
    }

    #[test]
    fn test_domain_parse() {
        assert_eq!("file".parse::<Domain>().unwrap(), Domain::File);
        assert_eq!(
            "network".parse::<Domain>(),
            Err(CapabilityError::UnknownDomain("network".to_string()))
        );
    }
}
