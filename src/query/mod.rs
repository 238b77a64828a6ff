//! Keyed response cache with polling.
//!
//! SYSTEM CONTEXT
//! ==============
//! `store` owns cached JSON per `QueryKey` and the fetch/refetch rules;
//! `poll` runs fixed-interval refetches for views that track server-side
//! status changes. A `QueryStore` is constructed once by the caller and
//! cloned into whichever views need it.

pub mod poll;
pub mod store;

pub use poll::{PollEvent, PollHandle};
pub use store::{
    FetchMode, QueryKey, QueryOptions, QueryStore, Staleness, UnauthorizedBehavior, decode, fetch_from_api,
};
