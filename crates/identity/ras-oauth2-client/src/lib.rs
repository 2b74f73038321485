//! OAuth2 authorization-code client with token lifecycle management.
//!
//! [`OAuth2Flow`] drives the authorization-code grant against one identity
//! provider, keeps the resulting access/refresh token pair current, persists
//! it through a [`TokenStore`], and signs resource requests with the access
//! token so provider adapters never handle tokens themselves.

mod clock;
mod config;
mod error;
mod flow;
mod store;
mod tokens;
mod transport;
mod types;


pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ApplicationCredentials, EndpointConfig, ProviderOptions};
pub use error::{OAuth2Error, OAuth2Result};
pub use flow::{FlowState, OAuth2Flow, RefreshOutcome, RefreshSkipReason};
pub use store::{FileTokenStore, InMemoryTokenStore, StoreError, TokenStore, token_key};
pub use tokens::{TokenResponse, TokenSet};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportConfig,
    TransportError,
};
pub use types::{CallbackParams, Parameters};
