use std::fmt;

use serde::Serialize;

use crate::{
    controller::{Variant, ViewState},
    portal::TransactionHandle,
    wave::Wave,
};

/// What the screen shows for a given controller state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum View {
    Loading,
    Ready(Screen),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Screen {
    pub session: Option<String>,
    pub total_waves: u64,
    pub last_transaction: Option<TransactionHandle>,
    /// Draft message; `None` for the plain contract, which takes no message.
    pub message: Option<String>,
    pub can_wave: bool,
    pub show_connect: bool,
    pub waves: Vec<Wave>,
}

impl View {
    pub(crate) fn render(state: &ViewState, variant: Variant) -> Self {
        if state.busy {
            return View::Loading;
        }

        let connected = state.session.is_some();
        let (message, can_wave) = match variant {
            Variant::Plain => (None, connected),
            Variant::WithMessages => (
                Some(state.message.clone()),
                connected && !state.message.is_empty(),
            ),
        };

        View::Ready(Screen {
            session: state.session.clone(),
            total_waves: state.counter,
            last_transaction: state.last_transaction,
            message,
            can_wave,
            show_connect: !connected,
            waves: state.waves.clone(),
        })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, View::Loading)
    }

    pub fn can_wave(&self) -> bool {
        matches!(self, View::Ready(screen) if screen.can_wave)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let screen = match self {
            View::Loading => return writeln!(f, "Loading"),
            View::Ready(screen) => screen,
        };

        writeln!(f, "Hey there!")?;
        writeln!(f, "Connect your Ethereum wallet and wave at me!")?;
        if let Some(session) = &screen.session {
            writeln!(f, "Account : {}", session)?;
        }
        if let Some(message) = &screen.message {
            writeln!(f, "Message : {}", message)?;
        }
        writeln!(f, "Total Waves : {}", screen.total_waves)?;
        if let Some(handle) = &screen.last_transaction {
            writeln!(f, "Your last wave txn hash : {}", handle)?;
        }

        let state = if screen.can_wave { "" } else { " (disabled)" };
        writeln!(f, "[Wave at Me]{}", state)?;
        if screen.show_connect {
            writeln!(f, "[Connect Wallet]")?;
        }

        for wave in &screen.waves {
            writeln!(f)?;
            writeln!(f, "Address: {}", wave.address)?;
            writeln!(f, "Time: {}", wave.timestamp.to_rfc2822())?;
            writeln!(f, "Message: {}", wave.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(message: &str) -> ViewState {
        ViewState {
            session: Some("0xABC".to_string()),
            message: message.to_string(),
            ..ViewState::default()
        }
    }

    #[test]
    fn busy_state_renders_loading() {
        let state = ViewState {
            busy: true,
            ..connected("hi")
        };
        let view = View::render(&state, Variant::WithMessages);

        assert!(view.is_loading());
        assert_eq!(view.to_string(), "Loading\n");
    }

    #[test]
    fn wave_needs_a_session_and_a_message() {
        assert!(View::render(&connected("hi"), Variant::WithMessages).can_wave());
        assert!(!View::render(&connected(""), Variant::WithMessages).can_wave());
        assert!(!View::render(&ViewState::default(), Variant::WithMessages).can_wave());
    }

    #[test]
    fn plain_contract_only_needs_a_session() {
        assert!(View::render(&connected(""), Variant::Plain).can_wave());
        assert!(!View::render(&ViewState::default(), Variant::Plain).can_wave());
    }

    #[test]
    fn connect_button_hides_once_connected() {
        let View::Ready(screen) = View::render(&ViewState::default(), Variant::Plain) else {
            panic!("expected a ready screen");
        };
        assert!(screen.show_connect);
        assert!(View::render(&ViewState::default(), Variant::Plain)
            .to_string()
            .contains("[Connect Wallet]"));

        let View::Ready(screen) = View::render(&connected(""), Variant::Plain) else {
            panic!("expected a ready screen");
        };
        assert!(!screen.show_connect);
    }

    #[test]
    fn serializes_with_a_state_tag() {
        let json = serde_json::to_value(View::render(&connected("hi"), Variant::WithMessages)).unwrap();

        assert_eq!(json["state"], "ready");
        assert_eq!(json["session"], "0xABC");
        assert_eq!(json["can_wave"], true);
        assert_eq!(serde_json::to_value(View::Loading).unwrap()["state"], "loading");
    }
}
