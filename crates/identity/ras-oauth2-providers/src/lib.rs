//! Provider adapters for the OAuth2 client.
//!
//! Each [`ProviderAdapter`] supplies a provider's endpoints, login options and
//! response mapping; [`ProviderSession`] runs it over a generic
//! [`OAuth2Flow`](ras_oauth2_client::OAuth2Flow) so adapters never handle
//! tokens.

mod adapter;
mod facebook;
mod google;
mod profile;
mod session;


pub use adapter::ProviderAdapter;
pub use facebook::{FACEBOOK_PROVIDER_ID, FacebookAdapter};
pub use google::{GOOGLE_PROVIDER_ID, GoogleAdapter};
pub use profile::{UserContact, UserProfile};
pub use session::ProviderSession;
