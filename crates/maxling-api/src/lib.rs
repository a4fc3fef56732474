//! HTTP transport for the Max Bot API.
//!
//! The [`MaxApi`] trait is the seam between the platform and the rest of the
//! framework: the poll loop in `maxling-runtime` fetches update pages through
//! it, handlers send replies through it, and tests substitute a mock for it.
//!
//! [`MaxClient`] is the production implementation, a thin `reqwest` client
//! for `https://platform-api.max.ru`.

mod api;
mod client;
mod error;

pub use api::{ChatAction, MaxApi, SendOptions, SendTarget, UpdatePage};
pub use client::{DEFAULT_API_URL, MaxClient};
pub use error::{ApiError, ApiResult};
