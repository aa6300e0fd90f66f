//! Lobby membership: who is in which lobby, in which role, and who is ready.
//!
//! `LobbyRegistry` is a plain map and is not thread-safe by itself. The
//! server reaches it through [`SharedLobbies`](crate::SharedLobbies), which
//! wraps it in a mutex together with the ledger.

use std::collections::HashMap;

use holdout_protocol::{LobbyId, LobbyRole, PlayerId, RosterEntry};

use crate::LobbyError;

/// One connection's seat in a lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub player_id: PlayerId,
    pub nickname: String,
    pub role: LobbyRole,
    pub ready: bool,
}

impl Member {
    fn entry(&self) -> RosterEntry {
        RosterEntry {
            player_id: self.player_id,
            nickname: self.nickname.clone(),
        }
    }
}

/// Result of a successful [`LobbyRegistry::leave`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub lobby_id: LobbyId,
    /// The lobby had no members left and was removed.
    pub closed: bool,
}

/// Tracks every lobby and which lobby each player is in.
///
/// A player is a member of at most ONE lobby at a time.
#[derive(Debug, Default)]
pub struct LobbyRegistry {
    /// Members per lobby, in join order.
    lobbies: HashMap<LobbyId, Vec<Member>>,
    player_lobby: HashMap<PlayerId, LobbyId>,
}

impl LobbyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player to `lobby`, creating it if needed.
    ///
    /// A player who is in a different lobby moves; the old lobby is
    /// returned. Moving is refused while they are ready.
    pub fn join(
        &mut self,
        lobby: LobbyId,
        player_id: PlayerId,
        nickname: impl Into<String>,
        role: LobbyRole,
    ) -> Result<Option<Departure>, LobbyError> {
        let previous = match self.player_lobby.get(&player_id).cloned() {
            Some(current) if current == lobby => {
                return Err(LobbyError::AlreadyInLobby(player_id, lobby));
            }
            Some(_) => Some(self.leave(player_id)?),
            None => None,
        };

        self.lobbies.entry(lobby.clone()).or_default().push(Member {
            player_id,
            nickname: nickname.into(),
            role,
            ready: false,
        });
        tracing::info!(%player_id, lobby_id = %lobby, ?role, "player joined lobby");
        self.player_lobby.insert(player_id, lobby);
        Ok(previous)
    }

    /// Removes a player from their lobby. An emptied lobby is dropped.
    pub fn leave(&mut self, player_id: PlayerId) -> Result<Departure, LobbyError> {
        let member = self.member(player_id)?;
        if member.ready {
            return Err(LobbyError::LeaveWhileReady(player_id));
        }

        let lobby_id = self
            .player_lobby
            .remove(&player_id)
            .ok_or(LobbyError::NotInLobby(player_id))?;
        let mut closed = false;
        if let Some(members) = self.lobbies.get_mut(&lobby_id) {
            members.retain(|m| m.player_id != player_id);
            if members.is_empty() {
                self.lobbies.remove(&lobby_id);
                closed = true;
            }
        }

        tracing::info!(%player_id, %lobby_id, closed, "player left lobby");
        Ok(Departure { lobby_id, closed })
    }

    /// Sets the ready flag. Returns `true` if it changed.
    pub fn set_ready(&mut self, player_id: PlayerId, ready: bool) -> Result<bool, LobbyError> {
        let member = self.member_mut(player_id)?;
        if member.role != LobbyRole::Player {
            return Err(LobbyError::NotAPlayer(player_id));
        }
        let changed = member.ready != ready;
        member.ready = ready;
        Ok(changed)
    }

    /// Clears every ready flag in `lobby` and returns who was ready.
    pub fn reset_ready(&mut self, lobby: &LobbyId) -> Vec<PlayerId> {
        let Some(members) = self.lobbies.get_mut(lobby) else {
            return Vec::new();
        };
        members
            .iter_mut()
            .filter(|m| m.ready)
            .map(|m| {
                m.ready = false;
                m.player_id
            })
            .collect()
    }

    /// Ready members with the player role.
    pub fn ready_players(&self, lobby: &LobbyId) -> Vec<RosterEntry> {
        self.members(lobby)
            .iter()
            .filter(|m| m.role == LobbyRole::Player && m.ready)
            .map(Member::entry)
            .collect()
    }

    /// Every member with the player role, ready or not.
    pub fn roster(&self, lobby: &LobbyId) -> Vec<RosterEntry> {
        self.members(lobby)
            .iter()
            .filter(|m| m.role == LobbyRole::Player)
            .map(Member::entry)
            .collect()
    }

    pub fn members(&self, lobby: &LobbyId) -> &[Member] {
        self.lobbies.get(lobby).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn lobby_of(&self, player_id: PlayerId) -> Option<&LobbyId> {
        self.player_lobby.get(&player_id)
    }

    pub fn member(&self, player_id: PlayerId) -> Result<&Member, LobbyError> {
        self.player_lobby
            .get(&player_id)
            .and_then(|lobby| self.lobbies.get(lobby))
            .and_then(|members| members.iter().find(|m| m.player_id == player_id))
            .ok_or(LobbyError::NotInLobby(player_id))
    }

    fn member_mut(&mut self, player_id: PlayerId) -> Result<&mut Member, LobbyError> {
        let lobby = self
            .player_lobby
            .get(&player_id)
            .ok_or(LobbyError::NotInLobby(player_id))?;
        self.lobbies
            .get_mut(lobby)
            .and_then(|members| members.iter_mut().find(|m| m.player_id == player_id))
            .ok_or(LobbyError::NotInLobby(player_id))
    }

    pub fn lobby_count(&self) -> usize {
        self.lobbies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn lobby(name: &str) -> LobbyId {
        LobbyId::new(name)
    }

    #[test]
    fn test_join_creates_lobby_and_indexes_player() {
        let mut reg = LobbyRegistry::new();
        assert!(reg.join(lobby("a"), pid(1), "ann", LobbyRole::Player).unwrap().is_none());

        assert_eq!(reg.lobby_count(), 1);
        assert_eq!(reg.lobby_of(pid(1)), Some(&lobby("a")));
        assert_eq!(reg.members(&lobby("a")).len(), 1);
    }

    #[test]
    fn test_join_same_lobby_twice_fails() {
        let mut reg = LobbyRegistry::new();
        reg.join(lobby("a"), pid(1), "ann", LobbyRole::Player).unwrap();
        let err = reg.join(lobby("a"), pid(1), "ann", LobbyRole::Player).unwrap_err();
        assert!(matches!(err, LobbyError::AlreadyInLobby(p, _) if p == pid(1)));
    }

    #[test]
    fn test_join_other_lobby_moves_player() {
        let mut reg = LobbyRegistry::new();
        reg.join(lobby("a"), pid(1), "ann", LobbyRole::Player).unwrap();
        let moved = reg.join(lobby("b"), pid(1), "ann", LobbyRole::Player).unwrap();

        assert_eq!(
            moved,
            Some(Departure {
                lobby_id: lobby("a"),
                closed: true,
            })
        );
        assert_eq!(reg.lobby_of(pid(1)), Some(&lobby("b")));
        assert!(reg.members(&lobby("a")).is_empty());
    }

    #[test]
    fn test_leave_while_ready_fails() {
        let mut reg = LobbyRegistry::new();
        reg.join(lobby("a"), pid(1), "ann", LobbyRole::Player).unwrap();
        reg.set_ready(pid(1), true).unwrap();

        assert!(matches!(reg.leave(pid(1)), Err(LobbyError::LeaveWhileReady(_))));
        assert!(matches!(
            reg.join(lobby("b"), pid(1), "ann", LobbyRole::Player),
            Err(LobbyError::LeaveWhileReady(_))
        ));
        assert_eq!(reg.lobby_of(pid(1)), Some(&lobby("a")));
    }

    #[test]
    fn test_leave_last_member_closes_lobby() {
        let mut reg = LobbyRegistry::new();
        reg.join(lobby("a"), pid(1), "ann", LobbyRole::Player).unwrap();
        reg.join(lobby("a"), pid(2), "bob", LobbyRole::Player).unwrap();

        assert!(!reg.leave(pid(1)).unwrap().closed);
        assert!(reg.leave(pid(2)).unwrap().closed);
        assert_eq!(reg.lobby_count(), 0);
        assert!(matches!(reg.leave(pid(2)), Err(LobbyError::NotInLobby(_))));
    }

    #[test]
    fn test_observers_and_operators_cannot_ready() {
        let mut reg = LobbyRegistry::new();
        reg.join(lobby("a"), pid(1), "eye", LobbyRole::Observer).unwrap();
        reg.join(lobby("a"), pid(2), "op", LobbyRole::Operator).unwrap();

        assert!(matches!(reg.set_ready(pid(1), true), Err(LobbyError::NotAPlayer(_))));
        assert!(matches!(reg.set_ready(pid(2), true), Err(LobbyError::NotAPlayer(_))));
    }

    #[test]
    fn test_ready_players_and_roster_exclude_non_players() {
        let mut reg = LobbyRegistry::new();
        reg.join(lobby("a"), pid(1), "ann", LobbyRole::Player).unwrap();
        reg.join(lobby("a"), pid(2), "bob", LobbyRole::Player).unwrap();
        reg.join(lobby("a"), pid(3), "eye", LobbyRole::Observer).unwrap();
        reg.join(lobby("a"), pid(4), "op", LobbyRole::Operator).unwrap();
        reg.set_ready(pid(2), true).unwrap();

        let ready: Vec<_> = reg.ready_players(&lobby("a")).iter().map(|e| e.player_id).collect();
        let roster: Vec<_> = reg.roster(&lobby("a")).iter().map(|e| e.player_id).collect();
        assert_eq!(ready, vec![pid(2)]);
        assert_eq!(roster, vec![pid(1), pid(2)]);
    }

    #[test]
    fn test_set_ready_reports_change() {
        let mut reg = LobbyRegistry::new();
        reg.join(lobby("a"), pid(1), "ann", LobbyRole::Player).unwrap();
        assert!(reg.set_ready(pid(1), true).unwrap());
        assert!(!reg.set_ready(pid(1), true).unwrap());
        assert!(reg.set_ready(pid(1), false).unwrap());
    }

    #[test]
    fn test_reset_ready_clears_flags() {
        let mut reg = LobbyRegistry::new();
        reg.join(lobby("a"), pid(1), "ann", LobbyRole::Player).unwrap();
        reg.join(lobby("a"), pid(2), "bob", LobbyRole::Player).unwrap();
        reg.set_ready(pid(1), true).unwrap();

        assert_eq!(reg.reset_ready(&lobby("a")), vec![pid(1)]);
        assert!(reg.ready_players(&lobby("a")).is_empty());
        assert!(reg.reset_ready(&lobby("missing")).is_empty());
    }
}
