//! Session phase tracking

use parking_lot::Mutex;
use std::fmt;

/// Where the client is in the connect-login-play sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Initial,
    ConnectingToConnectServer,
    ConnectedToConnectServer,
    RequestingServerList,
    ReceivedServerList,
    RequestingConnectionInfo,
    ReceivedConnectionInfo,
    ConnectingToGameServer,
    ConnectedToGameServer,
    Authenticating,
    SelectingCharacter,
    InGame,
    Disconnected,
}

impl ConnectionState {
    /// The single forward successor, if any
    pub fn next(self) -> Option<ConnectionState> {
        use ConnectionState::*;
        match self {
            Initial => Some(ConnectingToConnectServer),
            ConnectingToConnectServer => Some(ConnectedToConnectServer),
            ConnectedToConnectServer => Some(RequestingServerList),
            RequestingServerList => Some(ReceivedServerList),
            ReceivedServerList => Some(RequestingConnectionInfo),
            RequestingConnectionInfo => Some(ReceivedConnectionInfo),
            ReceivedConnectionInfo => Some(ConnectingToGameServer),
            ConnectingToGameServer => Some(ConnectedToGameServer),
            ConnectedToGameServer => Some(Authenticating),
            Authenticating => Some(SelectingCharacter),
            SelectingCharacter => Some(InGame),
            InGame | Disconnected => None,
        }
    }

    pub fn can_transition_to(self, target: ConnectionState) -> bool {
        target == ConnectionState::Disconnected
            || self.next() == Some(target)
            || (self == ConnectionState::InGame && target == ConnectionState::ConnectedToGameServer)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Gated holder of the current [`ConnectionState`]
#[derive(Debug)]
pub struct ConnectionStateMachine {
    state: Mutex<ConnectionState>,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Initial),
        }
    }

    pub fn current(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn is(&self, state: ConnectionState) -> bool {
        self.current() == state
    }

    /// Move to `target` if the gate allows it; out-of-gate requests are
    /// logged and ignored
    pub fn transition(&self, target: ConnectionState) -> bool {
        let mut state = self.state.lock();
        if state.can_transition_to(target) {
            tracing::debug!("Connection state {} -> {}", *state, target);
            *state = target;
            true
        } else {
            tracing::warn!("Ignoring connection state transition {} -> {}", *state, target);
            false
        }
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_walk_to_in_game() {
        let machine = ConnectionStateMachine::new();
        let mut state = machine.current();
        while let Some(next) = state.next() {
            assert!(machine.transition(next));
            state = next;
        }
        assert_eq!(machine.current(), ConnectionState::InGame);
    }

    #[test]
    fn test_skipping_is_rejected() {
        let machine = ConnectionStateMachine::new();
        assert!(!machine.transition(ConnectionState::ReceivedServerList));
        assert_eq!(machine.current(), ConnectionState::Initial);
        assert!(!machine.transition(ConnectionState::Initial));
    }

    #[test]
    fn test_disconnect_from_anywhere() {
        for state in [
            ConnectionState::Initial,
            ConnectionState::RequestingConnectionInfo,
            ConnectionState::InGame,
        ] {
            assert!(state.can_transition_to(ConnectionState::Disconnected));
        }
        assert_eq!(ConnectionState::Disconnected.next(), None);
    }

    #[test]
    fn test_leave_game_branch() {
        assert!(ConnectionState::InGame.can_transition_to(ConnectionState::ConnectedToGameServer));
        assert!(!ConnectionState::SelectingCharacter.can_transition_to(ConnectionState::ConnectedToGameServer));
    }
}
