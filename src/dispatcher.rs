//////////////////////////
// dispatcher.rs
//////////////////////////

//! Turns inbound command envelopes into engine calls and room broadcasts.
//!
//! Every command runs its checks first, then mutates a private copy of the
//! game and saves it. Broadcasts only go out after the save succeeds, so a
//! rejected command never leaves a room half-updated.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{MoveError, SessionError};
use crate::game::MoveOutcome;
use crate::session::{ConnectionId, Outbox, SessionRegistry};
use crate::store::{GameRecord, GameStore, IdentityResolver, Role};
use crate::types::*;

/// What the connection worker should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

type GameLocks = DashMap<GameId, Arc<Mutex<()>>>;

pub struct Dispatcher {
    identity: Arc<dyn IdentityResolver>,
    games: Arc<dyn GameStore>,
    registry: Arc<SessionRegistry>,
    game_locks: GameLocks,
}

impl Dispatcher {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        games: Arc<dyn GameStore>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Dispatcher {
            identity,
            games,
            registry,
            game_locks: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Handles one raw text frame from `conn`. Failures are answered with an
    /// `ERROR` on `outbox` and never reach anyone else.
    pub async fn handle(&self, conn: ConnectionId, outbox: &Outbox, text: &str) -> Flow {
        match self.dispatch(conn, outbox, text).await {
            Ok(flow) => flow,
            Err(err) => {
                tracing::warn!(%conn, error = %err, "command rejected");
                let _ = outbox.send(ServerMessage::error(&err));
                Flow::Continue
            }
        }
    }

    /// Membership cleanup when a socket closes or errors. The game itself is
    /// left alone so players can reconnect.
    pub fn disconnect(&self, conn: ConnectionId) {
        if let Some(member) = self.registry.leave(conn) {
            tracing::info!(%conn, game_id = member.game_id, user = %member.username, "connection closed");
        }
    }

    async fn dispatch(
        &self,
        conn: ConnectionId,
        outbox: &Outbox,
        text: &str,
    ) -> Result<Flow, SessionError> {
        let command: UserGameCommand = serde_json::from_str(text)?;
        tracing::debug!(%conn, command = ?command.command_type, game_id = command.game_id, "command received");

        match command.command_type {
            CommandType::Connect => self.connect(conn, outbox, &command).await,
            CommandType::MakeMove => {
                let mv = command
                    .chess_move
                    .ok_or_else(|| SessionError::Protocol("MAKE_MOVE needs a move".to_string()))?;
                self.make_move(conn, &command, mv).await
            }
            CommandType::Resign => self.resign(conn, &command).await,
            CommandType::Leave => self.leave(conn).await,
        }
    }

    fn game_lock(&self, game_id: GameId) -> Arc<Mutex<()>> {
        self.game_locks
            .entry(game_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Resolves the sender and confirms the game exists. Runs before a lock
    /// entry is created, so unknown games never reach `game_locks`.
    fn precheck(&self, command: &UserGameCommand) -> Result<String, SessionError> {
        let username = self.identity.resolve_identity(&command.auth_token)?;
        self.games.load_game(command.game_id)?;
        Ok(username)
    }

    async fn connect(
        &self,
        conn: ConnectionId,
        outbox: &Outbox,
        command: &UserGameCommand,
    ) -> Result<Flow, SessionError> {
        let game_id = command.game_id;
        let username = self.precheck(command)?;
        let lock = self.game_lock(game_id);
        let _guard = lock.lock().await;

        // Snapshot and room entry happen under the lock so no move commits
        // between the two.
        let record = self.games.load_game(game_id)?;
        let role = record.role_of(&username);

        self.registry.join(conn, &username, game_id, outbox.clone());
        self.registry
            .send_to(conn, ServerMessage::LoadGame { game: record });
        self.registry.broadcast(
            game_id,
            &ServerMessage::notification(format!("{} joined as {}", username, role)),
            Some(conn),
        );
        tracing::info!(%conn, game_id, user = %username, %role, "connected");
        Ok(Flow::Continue)
    }

    /// Checks that `username` holds a seat in the game.
    fn seated_player(
        record: &GameRecord,
        username: &str,
        action: &str,
    ) -> Result<Color, SessionError> {
        match record.role_of(username) {
            Role::Player(color) => Ok(color),
            Role::Observer => Err(SessionError::Unauthorized(format!(
                "only players can {}",
                action
            ))),
        }
    }

    async fn make_move(
        &self,
        conn: ConnectionId,
        command: &UserGameCommand,
        mv: ChessMove,
    ) -> Result<Flow, SessionError> {
        let game_id = command.game_id;
        let username = self.precheck(command)?;
        let lock = self.game_lock(game_id);
        let _guard = lock.lock().await;

        let mut record = self.games.load_game(game_id)?;
        let color = Self::seated_player(&record, &username, "move")?;
        if record.game.is_over() {
            return Err(MoveError::GameOver.into());
        }
        if record.game.turn() != color {
            return Err(MoveError::WrongTurn.into());
        }

        let outcome = record.game.make_move(mv)?;
        self.games.save_game(game_id, &record.game)?;
        tracing::info!(%conn, game_id, user = %username, %mv, ?outcome, "move applied");
        tracing::debug!(game_id, "\n{}", record.game);

        let status = match outcome {
            MoveOutcome::Normal => None,
            MoveOutcome::Check(side) => {
                Some(format!("{} is in check", record.display_name(side)))
            }
            MoveOutcome::Checkmate(side) => {
                Some(format!("{} is in checkmate", record.display_name(side)))
            }
            MoveOutcome::Stalemate(side) => {
                Some(format!("{} is in stalemate", record.display_name(side)))
            }
        };

        self.registry
            .broadcast(game_id, &ServerMessage::LoadGame { game: record }, None);
        self.registry.broadcast(
            game_id,
            &ServerMessage::notification(format!("{} moved {}", username, mv)),
            Some(conn),
        );
        if let Some(status) = status {
            self.registry
                .broadcast(game_id, &ServerMessage::notification(status), None);
        }
        Ok(Flow::Continue)
    }

    async fn resign(
        &self,
        conn: ConnectionId,
        command: &UserGameCommand,
    ) -> Result<Flow, SessionError> {
        let game_id = command.game_id;
        let username = self.precheck(command)?;
        let lock = self.game_lock(game_id);
        let _guard = lock.lock().await;

        let mut record = self.games.load_game(game_id)?;
        Self::seated_player(&record, &username, "resign")?;
        if record.game.is_over() {
            return Err(MoveError::GameOver.into());
        }

        record.game.resign();
        self.games.save_game(game_id, &record.game)?;
        tracing::info!(%conn, game_id, user = %username, "resigned");

        self.registry.broadcast(
            game_id,
            &ServerMessage::notification(format!("{} resigned", username)),
            None,
        );
        Ok(Flow::Continue)
    }

    async fn leave(&self, conn: ConnectionId) -> Result<Flow, SessionError> {
        let Some(member) = self.registry.member(conn) else {
            return Ok(Flow::Close);
        };
        let game_id = member.game_id;
        {
            let lock = self.game_lock(game_id);
            let _guard = lock.lock().await;
            if let Err(err) = self.games.clear_seat(game_id, &member.username) {
                tracing::warn!(%conn, game_id, error = %err, "could not free seat");
            }
        }

        self.registry.leave(conn);
        self.registry.broadcast(
            game_id,
            &ServerMessage::notification(format!("{} left the game", member.username)),
            None,
        );
        tracing::info!(%conn, game_id, user = %member.username, "left game");
        Ok(Flow::Close)
    }
}
