//! Unified error type for SketchBoard.

use sketchboard_area::AreaError;
use sketchboard_client::ClientError;
use sketchboard_protocol::ProtocolError;
use sketchboard_session::SessionError;
use sketchboard_transport::TransportError;

use crate::AuthError;

/// Wraps every crate-specific error so `?` works across layers.
#[derive(Debug, thiserror::Error)]
pub enum SketchBoardError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Area(#[from] AreaError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}
