// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error handling for minimpi operations

use std::fmt;

/// Error codes for every failure class the runtime can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    /// Invalid bootstrap parameters or call arguments
    ArgumentError,
    /// Malformed wire frame
    ProtocolError,
    /// Socket create/bind/listen/accept/connect/read/write failure
    TransportError,
    /// Operation addressed to an unregistered rank
    RoutingError,
    /// Operation attempted outside the required lifecycle state
    StateError,
    /// Unrecognized datatype
    TypeError,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::ArgumentError => write!(f, "Argument error"),
            Code::ProtocolError => write!(f, "Protocol error"),
            Code::TransportError => write!(f, "Transport error"),
            Code::RoutingError => write!(f, "Routing error"),
            Code::StateError => write!(f, "State error"),
            Code::TypeError => write!(f, "Type error"),
        }
    }
}

/// Main error type for minimpi operations
#[derive(thiserror::Error, Debug)]
pub enum MpiError {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("routing error: {0}")]
    Routing(String),

    #[error("invalid state: {0}")]
    State(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MpiError {
    /// Create a new error with a specific code and message
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            Code::ArgumentError => MpiError::Argument(message),
            Code::ProtocolError => MpiError::Protocol(message),
            Code::TransportError => MpiError::Transport(message),
            Code::RoutingError => MpiError::Routing(message),
            Code::StateError => MpiError::State(message),
            Code::TypeError => MpiError::Type(message),
        }
    }

    /// Get the error code
    pub fn code(&self) -> Code {
        match self {
            MpiError::Argument(_) => Code::ArgumentError,
            MpiError::Protocol(_) => Code::ProtocolError,
            MpiError::Transport(_) => Code::TransportError,
            MpiError::Routing(_) => Code::RoutingError,
            MpiError::State(_) => Code::StateError,
            MpiError::Type(_) => Code::TypeError,
            MpiError::Io(_) => Code::TransportError,
        }
    }
}

/// Type alias for Results using MpiError
pub type MpiResult<T> = Result<T, MpiError>;
