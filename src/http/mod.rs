//! Operator HTTP surface (spec.md §6 "HTTP (out of scope for core, consumed
//! by operator tooling)"): CRUD over Subscriptions/Items/Clips, the
//! `approve` endpoint, plus `/health`/`/version` and a `/debug/dispatcher`
//! stats endpoint — the teacher-shaped sibling of `/debug/cache` and
//! `/debug/streams`. Request validation and auth beyond basic existence
//! checks stay out of scope, as spec.md §1 names them an external
//! collaborator's responsibility.

pub mod handlers;
pub mod routes;

pub use routes::create_router;
